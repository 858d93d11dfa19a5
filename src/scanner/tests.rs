#[allow(unused)]
use pretty_assertions::{assert_eq, assert_ne};

use crate::{
    config::{LexerConfig, SyntaxVersion},
    diagnostic::{Diagnostic, DiagnosticKind, Level},
    encoding::EString,
    error::LexError,
    literal::{LiteralKind, LiteralState},
    pos::{pos_in, CodeRange},
    token::{Comment, Token, TokenKind, TokenValue},
};

use super::{HeredocLine, Interpolation, LiteralOptions, ScannerState, TryClose};


/// A deliberately small driver: enough code-mode lexing to exercise the
/// literal core the way a full lexer would.
struct Driver<'a> {
    state: ScannerState<'a>,
    src: &'a [u8],
    pos: usize,
    heredoc_line_end: Option<usize>,
    value_end: bool,
    after_identifier: bool,
    spaced: bool,
}

struct Lexed {
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    diagnostics: Vec<Diagnostic>,
    result: Result<(), LexError>,
}

impl<'a> Driver<'a> {
    fn new(src: &'a str, config: LexerConfig) -> Self {
        Driver {
            state: ScannerState::new(src, config),
            src: src.as_bytes(),
            pos: 0,
            heredoc_line_end: None,
            value_end: false,
            after_identifier: false,
            spaced: false,
        }
    }

    fn run(&mut self) -> Result<(), LexError> {
        while self.pos < self.src.len() {
            let accumulating = self
                .state
                .literal()
                .is_some_and(|literal| literal.state() == LiteralState::Accumulating);
            if accumulating {
                self.literal_step()?;
            } else {
                self.code_step()?;
            }
        }
        self.state.finish(self.pos)
    }

    fn byte(&self, pos: usize) -> u8 {
        self.src.get(pos).copied().unwrap_or(0)
    }

    fn line_end(&self, pos: usize) -> usize {
        self.src[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.src.len(), |i| pos + i + 1)
    }

    fn literal_step(&mut self) -> Result<(), LexError> {
        let Some(literal) = self.state.literal() else {
            return Ok(());
        };
        let interpolates = literal.interpolates();
        let heredoc = literal.heredoc().is_some();
        let (open, close) = (literal.start_delimiter(), literal.end_delimiter());

        let limit = if heredoc {
            match self.heredoc_line_end {
                Some(end) if self.pos < end => end,
                _ => {
                    let end = self.line_end(self.pos);
                    match self.state.feed_heredoc_line(self.pos..end)? {
                        HeredocLine::Body => {
                            self.heredoc_line_end = Some(end);
                            end
                        }
                        HeredocLine::Terminator { resume_at } => {
                            self.heredoc_line_end = None;
                            self.pos = resume_at;
                            if self.state.has_pending_heredocs() {
                                self.state.begin_heredoc_body(self.pos)?;
                            }
                            return Ok(());
                        }
                    }
                }
            }
        } else {
            self.src.len()
        };

        let is_delimiter =
            |b: u8| !heredoc && b.is_ascii() && (b as char == open || b as char == close);
        let is_special = |b: u8| b == b'\\' || (interpolates && b == b'#') || is_delimiter(b);

        let b = self.src[self.pos];
        let interpolation = if interpolates && b == b'#' {
            self.state.interpolation_at(self.pos)
        } else {
            None
        };
        if b == b'\\' {
            let escape = self.state.feed_escape(self.pos)?;
            self.pos = escape.range.end;
        } else if let Some(interpolation) = interpolation {
            match interpolation {
                Interpolation::Block { end } => {
                    self.state.begin_interpolation(self.pos..end)?;
                    self.value_end = false;
                    self.pos = end;
                }
                Interpolation::Variable { end, .. } => {
                    self.state.interpolate_variable(self.pos..end)?;
                    self.pos = end;
                }
            }
        } else if is_delimiter(b) {
            let outcome = self.state.try_close(self.pos)?;
            self.pos = outcome.resume_at();
            self.value_end = outcome.is_closed();
        } else {
            let mut end = self.pos + 1;
            while end < limit && !is_special(self.src[end]) {
                end += 1;
            }
            self.state.feed_content(self.pos..end)?;
            self.pos = end;
        }
        Ok(())
    }

    fn code_step(&mut self) -> Result<(), LexError> {
        let pos = self.pos;
        let b = self.src[pos];
        let next = self.byte(pos + 1);
        let spaced = self.spaced;
        let after_identifier = self.after_identifier;
        self.spaced = false;
        self.after_identifier = false;
        // `foo /x/`, `foo %(x)`, `foo <<EOS`: literal when spaced before but
        // not after.
        let command_arg = after_identifier && spaced && !matches!(next, b' ' | b'\t' | b'\n' | b'=');
        let literal_allowed = !self.value_end || command_arg;

        match b {
            b' ' | b'\t' | b'\r' => {
                self.pos += 1;
                self.spaced = true;
                self.after_identifier = after_identifier;
            }
            b'\n' => {
                self.emit(TokenKind::Newline, pos..pos + 1);
                self.pos += 1;
                self.value_end = false;
                if self.state.has_pending_heredocs() {
                    self.state.begin_heredoc_body(self.pos)?;
                }
            }
            b'#' => {
                let end = self.line_end(pos);
                let end = if self.byte(end - 1) == b'\n' { end - 1 } else { end };
                self.state.emit_comment(pos..end);
                self.pos = end;
            }
            b'0'..=b'9' => {
                let end = self.numeric_end(pos);
                self.pos = self.state.emit_numeric(pos..end)?;
                self.value_end = true;
            }
            b'"' | b'\'' | b'`' => {
                let options = LiteralOptions::default().label_allowed(b != b'`');
                self.open(CodeRange::new(pos, pos + 1), options)?;
            }
            b':' if matches!(next, b'"' | b'\'') => {
                self.open(CodeRange::new(pos, pos + 2), LiteralOptions::default())?;
            }
            b'%' | b'/' if literal_allowed => {
                let end = match b {
                    b'%' if next.is_ascii_alphabetic() => pos + 3,
                    b'%' => pos + 2,
                    _ => pos + 1,
                };
                let options = LiteralOptions::default().ambiguous(self.value_end);
                self.open(CodeRange::new(pos, end), options)?;
            }
            b'<' if next == b'<' && literal_allowed && self.heredoc_follows(pos + 2) => {
                let end = self.heredoc_opener_end(pos + 2);
                self.state.open_heredoc(pos..end)?;
                self.pos = end;
                self.value_end = true;
            }
            b'{' => {
                self.state.open_interp_brace();
                self.emit(TokenKind::LBrace, pos..pos + 1);
                self.pos += 1;
                self.value_end = false;
            }
            b'}' => {
                if !self.state.end_interpolation(pos..pos + 1) {
                    self.emit(TokenKind::RBrace, pos..pos + 1);
                }
                self.pos += 1;
                self.value_end = true;
            }
            b'(' | b',' | b';' => {
                let kind = match b {
                    b'(' => TokenKind::LParen,
                    b',' => TokenKind::Comma,
                    _ => TokenKind::Semicolon,
                };
                self.emit(kind, pos..pos + 1);
                self.pos += 1;
                self.value_end = false;
            }
            b')' => {
                self.emit(TokenKind::RParen, pos..pos + 1);
                self.pos += 1;
                self.value_end = true;
            }
            _ if b.is_ascii_alphabetic() || b == b'_' || b >= 0x80 => {
                let mut end = pos + 1;
                while end < self.src.len() && is_ident_byte(self.src[end]) {
                    end += 1;
                }
                let kind = if b.is_ascii_uppercase() {
                    TokenKind::Constant
                } else {
                    TokenKind::Identifier
                };
                let text = self.state.source().slice(pos..end).to_estring();
                self.state.emit_token(kind, TokenValue::String(text), pos..end);
                self.pos = end;
                self.value_end = true;
                self.after_identifier = kind == TokenKind::Identifier;
            }
            _ => {
                self.emit(TokenKind::Operator, pos..pos + 1);
                self.pos += 1;
                self.value_end = false;
            }
        }
        Ok(())
    }

    fn emit(&mut self, kind: TokenKind, range: std::ops::Range<usize>) {
        self.state.emit_token(kind, TokenValue::None, range);
    }

    fn open(&mut self, range: CodeRange, options: LiteralOptions) -> Result<(), LexError> {
        self.state.open_literal_at(range, options)?;
        self.pos = range.end;
        self.value_end = false;
        Ok(())
    }

    fn numeric_end(&self, start: usize) -> usize {
        let mut end = start;
        while end < self.src.len() {
            let b = self.src[end];
            let exponent_sign =
                matches!(b, b'+' | b'-') && matches!(self.byte(end - 1), b'e' | b'E');
            if b.is_ascii_alphanumeric()
                || b == b'_'
                || (b == b'.' && self.byte(end + 1).is_ascii_digit())
                || exponent_sign
            {
                end += 1;
            } else {
                break;
            }
        }
        end
    }

    fn heredoc_follows(&self, pos: usize) -> bool {
        let pos = if matches!(self.byte(pos), b'-' | b'~') { pos + 1 } else { pos };
        let b = self.byte(pos);
        matches!(b, b'\'' | b'"' | b'`') || b.is_ascii_alphabetic() || b == b'_'
    }

    fn heredoc_opener_end(&self, pos: usize) -> usize {
        let mut end = if matches!(self.byte(pos), b'-' | b'~') { pos + 1 } else { pos };
        let quote = self.byte(end);
        if matches!(quote, b'\'' | b'"' | b'`') {
            end += 1;
            while end < self.src.len() && self.src[end] != quote && self.src[end] != b'\n' {
                end += 1;
            }
            return (end + 1).min(self.src.len());
        }
        while end < self.src.len() && is_ident_byte(self.src[end]) {
            end += 1;
        }
        end
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn lex_with(src: &str, config: LexerConfig) -> Lexed {
    let mut driver = Driver::new(src, config);
    let result = driver.run();
    let mut state = driver.state;
    Lexed {
        tokens: state.take_tokens(),
        comments: state.comments().to_vec(),
        diagnostics: state.take_diagnostics(),
        result,
    }
}

fn lex(src: &str) -> Lexed {
    lex_with(src, LexerConfig::default())
}

#[track_caller]
fn assert_lex<'a, F>(src: &'a str, expected: F)
where
    F: FnOnce(&'a str) -> Vec<Token>,
{
    let lexed = lex(src);
    assert_eq!(lexed.result, Ok(()));
    assert_eq!(lexed.diagnostics, Vec::new());
    assert_eq!(lexed.tokens, expected(src));
}

fn tok(kind: TokenKind, text: &str, range: CodeRange) -> Token {
    Token {
        kind,
        value: TokenValue::String(EString::from(text)),
        range,
    }
}

fn bare(kind: TokenKind, range: CodeRange) -> Token {
    Token {
        kind,
        value: TokenValue::None,
        range,
    }
}

fn diag_kinds(diagnostics: &[Diagnostic]) -> Vec<(Level, DiagnosticKind)> {
    diagnostics.iter().map(|d| (d.level, d.kind)).collect()
}

fn token_kinds(tokens: &[Token]) -> Vec<TokenKind> {
    tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn test_feed_content_without_literal_is_protocol_error() {
    let mut state = ScannerState::new("abc", LexerConfig::default());
    assert_eq!(
        state.feed_content(0..3),
        Err(LexError::Protocol("feed_content"))
    );
    assert_eq!(state.try_close(0), Err(LexError::Protocol("try_close")));
}

#[test]
fn test_open_literal_rejects_heredoc_kinds() {
    let mut state = ScannerState::new("<<EOS", LexerConfig::default());
    assert!(state
        .open_literal(
            LiteralKind::HeredocDouble,
            '\n',
            0..5,
            LiteralOptions::default()
        )
        .is_err());
}

#[test]
fn test_bracket_nesting_by_hand() -> anyhow::Result<()> {
    let src = "%(a(b)c)";
    let mut state = ScannerState::new(src, LexerConfig::default());
    state.open_literal(LiteralKind::BarePercent, '(', 0..2, LiteralOptions::default())?;
    state.feed_content(2..3)?;
    assert_eq!(state.try_close(3)?, TryClose::Open { resume_at: 4 });
    assert_eq!(state.literal().map(|l| l.nesting()), Some(1));
    state.feed_content(4..5)?;
    assert_eq!(state.try_close(5)?, TryClose::Open { resume_at: 6 });
    assert_eq!(state.literal().map(|l| l.nesting()), Some(0));
    state.feed_content(6..7)?;
    assert_eq!(state.try_close(7)?, TryClose::Closed { resume_at: 8 });
    assert_eq!(state.literal_depth(), 0);
    assert_eq!(
        state.take_tokens(),
        vec![tok(TokenKind::String, "a(b)c", pos_in(src, src, 0))]
    );
    Ok(())
}

#[test]
fn test_emission_interface() -> anyhow::Result<()> {
    let src = "x # note";
    let mut state = ScannerState::new(src, LexerConfig::default());
    state.emit_token(TokenKind::Identifier, TokenValue::None, 0..1);
    state.emit_comment(pos_in(src, "# note", 0));
    state.diagnostic(
        Level::Note,
        DiagnosticKind::AmbiguousPrefix,
        0..1,
        vec![("prefix", "*".to_owned())],
    )?;
    assert_eq!(state.tokens().len(), 1);
    assert_eq!(
        state.comments().to_vec(),
        vec![Comment {
            range: pos_in(src, "# note", 0),
            text: EString::from("# note"),
        }]
    );
    assert_eq!(state.diagnostics()[0].arg("prefix"), Some("*"));

    let err = state.diagnostic(Level::Fatal, DiagnosticKind::StringEof, 0..1, Vec::new());
    assert_eq!(
        err.as_ref().err().and_then(|e| e.diagnostic()).map(|d| d.kind),
        Some(DiagnosticKind::StringEof)
    );
    assert_eq!(state.diagnostics().len(), 2);
    Ok(())
}

#[test]
fn test_warnings_can_be_ignored() {
    let lexed = lex_with("foo /x/", LexerConfig::default().ignore_warnings(true));
    assert_eq!(lexed.result, Ok(()));
    assert_eq!(lexed.diagnostics, Vec::new());
}

#[test]
fn test_errors_can_be_fatal() {
    let lexed = lex_with("\"\\xZ\"", LexerConfig::default().all_errors_are_fatal(true));
    assert_eq!(
        lexed.result.as_ref().err().and_then(|e| e.diagnostic()).map(|d| d.kind),
        Some(DiagnosticKind::InvalidHexEscape)
    );
}

#[test]
fn test_context_stacks_are_saved_and_restored() {
    let mut state = ScannerState::new("", LexerConfig::default());
    state.cond_mut().push(true);
    state.cmdarg_mut().push(true);
    state.save_cond();
    state.save_cmdarg();
    assert!(!state.cond().active());
    assert!(!state.cmdarg().active());
    state.cond_mut().push(false);
    state.restore_cond();
    state.restore_cmdarg();
    assert!(state.cond().active());
    assert_eq!(state.cond().depth(), 1);
    assert!(state.cmdarg().active());
}

#[test]
fn test_lexpop_merges_top_two() {
    let mut state = ScannerState::new("", LexerConfig::default());
    state.cond_mut().push(true);
    state.cond_mut().push(false);
    state.cond_mut().lexpop();
    assert!(state.cond().active());
    assert_eq!(state.cond().depth(), 1);
    assert!(state.cond_mut().pop());
    assert_eq!(state.cond().depth(), 0);
}

#[test]
fn test_driver_state_stack() {
    let mut state = ScannerState::new("", LexerConfig::default());
    state.push_driver_state(3);
    state.push_driver_state(7);
    assert_eq!(state.pop_driver_state(), 7);
    assert_eq!(state.pop_driver_state(), 3);
    assert_eq!(state.pop_driver_state(), 0);
}

#[test]
fn test_numparams_follow_scopes() {
    let mut state = ScannerState::new("", LexerConfig::default());
    state.numparams_mut().push();
    state.numparams_mut().register(2);
    assert!(state.numparams().has_numparams());
    state.numparams_mut().pop();
    assert!(state.numparams().is_empty());
}

#[test]
fn test_numeric_tokens() {
    let lexed = lex("12 0b101 1.5 2r 3i 1e3");
    assert_eq!(lexed.result, Ok(()));
    assert_eq!(lexed.diagnostics, Vec::new());
    assert_eq!(
        token_kinds(&lexed.tokens),
        vec![
            TokenKind::Integer,
            TokenKind::Integer,
            TokenKind::Float,
            TokenKind::Rational,
            TokenKind::Imaginary,
            TokenKind::Float,
        ]
    );
    assert_eq!(lexed.tokens[1].range, CodeRange::new(3, 8));
}

#[test]
fn test_numeric_trailing_underscore() {
    let lexed = lex("1__2");
    assert_eq!(lexed.result, Ok(()));
    assert_eq!(
        diag_kinds(&lexed.diagnostics),
        vec![(Level::Error, DiagnosticKind::TrailingInNumber)]
    );
    assert_eq!(token_kinds(&lexed.tokens), vec![TokenKind::Integer]);
}

#[test]
fn test_comments_are_collected() {
    let src = "x # hi\ny";
    let lexed = lex(src);
    assert_eq!(
        lexed.comments,
        vec![Comment {
            range: pos_in(src, "# hi", 0),
            text: EString::from("# hi"),
        }]
    );
    assert_eq!(
        token_kinds(&lexed.tokens),
        vec![TokenKind::Identifier, TokenKind::Newline, TokenKind::Identifier]
    );
}

#[test]
fn test_symbol_arrays_need_ruby_20() {
    let src = "%i[a]";
    let lexed = lex_with(src, LexerConfig::default().version(SyntaxVersion::RUBY_19));
    assert_eq!(lexed.result, Ok(()));
    assert_eq!(
        diag_kinds(&lexed.diagnostics),
        vec![(Level::Error, DiagnosticKind::UnexpectedPercentStr)]
    );
    assert_eq!(lexed.diagnostics[0].range, pos_in(src, "%i[", 0));
    assert_eq!(
        lexed.tokens,
        vec![
            tok(TokenKind::QWordsBegin, "%w", pos_in(src, "%i[", 0)),
            tok(TokenKind::StringContent, "a", pos_in(src, "a", 0)),
            bare(TokenKind::Space, CodeRange::empty_at(4)),
            tok(TokenKind::StringEnd, "]", pos_in(src, "]", 0)),
        ]
    );
}
