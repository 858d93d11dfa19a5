use std::{collections::VecDeque, mem};

use tracing::{debug, trace};

use crate::{
    config::LexerConfig,
    context::{ContextStack, NumparamStack},
    diagnostic::{Diagnostic, DiagnosticKind, Level},
    encoding::{EStrRef, EString},
    error::LexError,
    escape::{self, Escape, EscapeValue},
    literal::{dedent, HeldContent, Heredoc, Literal, LiteralKind, LiteralState},
    numeric,
    pos::CodeRange,
    stack::Stack,
    token::{Comment, Token, TokenKind, TokenValue},
};

const REGEXP_OPTIONS: &[u8] = b"imxouesn";

/// Driver-supplied facts about a literal being opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralOptions {
    /// A `:` right after the closing quote makes the literal a label.
    pub label_allowed: bool,
    /// The driver chose the literal reading of an ambiguous opener
    /// (`foo /x/`, `foo %(x)`).
    pub ambiguous: bool,
}

impl LiteralOptions {
    pub fn label_allowed(mut self, allowed: bool) -> Self {
        self.label_allowed = allowed;
        self
    }

    pub fn ambiguous(mut self, ambiguous: bool) -> Self {
        self.ambiguous = ambiguous;
        self
    }
}

/// Outcome of handing a delimiter character to [`ScannerState::try_close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryClose {
    /// The character was content (nested bracket).
    Open { resume_at: usize },
    /// The literal was emitted and popped.
    Closed { resume_at: usize },
}

impl TryClose {
    pub fn is_closed(&self) -> bool {
        matches!(self, TryClose::Closed { .. })
    }

    pub fn resume_at(&self) -> usize {
        match *self {
            TryClose::Open { resume_at } | TryClose::Closed { resume_at } => resume_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeredocLine {
    /// The line is body; the driver feeds its content next.
    Body,
    /// The line was the terminator. Scanning continues after it.
    Terminator { resume_at: usize },
}

/// What an interpolating literal sees at a `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// `#{`
    Block { end: usize },
    /// `#@foo`, `#@@foo`, `#$foo`
    Variable { kind: TokenKind, end: usize },
}

/// Per-source-unit state of the literal scanning core.
///
/// The driver owns the cursor and calls in whenever it recognizes a literal
/// boundary; this type keeps the nested literal state and queues the
/// resulting tokens, comments and diagnostics.
#[derive(Debug)]
pub struct ScannerState<'a> {
    source: EStrRef<'a>,
    config: LexerConfig,
    tokens: Vec<Token>,
    /// Tokens already handed out by `take_tokens`.
    drained: usize,
    comments: Vec<Comment>,
    diagnostics: Vec<Diagnostic>,
    literals: Stack<Literal>,
    pending_heredocs: VecDeque<Literal>,
    cond: ContextStack,
    cmdarg: ContextStack,
    cond_stack: Stack<ContextStack>,
    cmdarg_stack: Stack<ContextStack>,
    driver_states: Stack<u32>,
    numparams: NumparamStack,
}

impl<'a> ScannerState<'a> {
    pub fn new(source: impl Into<EStrRef<'a>>, config: LexerConfig) -> Self {
        Self {
            source: source.into(),
            config,
            tokens: Vec::new(),
            drained: 0,
            comments: Vec::new(),
            diagnostics: Vec::new(),
            literals: Stack::new(),
            pending_heredocs: VecDeque::new(),
            cond: ContextStack::new(),
            cmdarg: ContextStack::new(),
            cond_stack: Stack::new(),
            cmdarg_stack: Stack::new(),
            driver_states: Stack::new(),
            numparams: NumparamStack::new(),
        }
    }

    pub fn source(&self) -> EStrRef<'a> {
        self.source
    }

    pub fn config(&self) -> &LexerConfig {
        &self.config
    }

    // Emission

    pub fn emit_token(&mut self, kind: TokenKind, value: TokenValue, range: impl Into<CodeRange>) {
        let range = range.into();
        trace!(?kind, start = range.start, end = range.end, "emit token");
        self.tokens.push(Token { kind, value, range });
    }

    pub fn emit_comment(&mut self, range: impl Into<CodeRange>) {
        let range = range.into();
        let text = self.source.slice(range.range()).to_estring();
        self.comments.push(Comment { range, text });
    }

    /// Records a diagnostic. Fails only when it stops scanning: `fatal`
    /// level, or `error` with `all_errors_are_fatal`.
    pub fn diagnostic(
        &mut self,
        level: Level,
        kind: DiagnosticKind,
        range: impl Into<CodeRange>,
        args: Vec<(&'static str, String)>,
    ) -> Result<(), LexError> {
        self.report(Diagnostic {
            level,
            kind,
            range: range.into(),
            args,
        })
    }

    fn report(&mut self, diag: Diagnostic) -> Result<(), LexError> {
        if diag.level == Level::Warning && self.config.ignore_warnings {
            return Ok(());
        }
        let stops = diag.level == Level::Fatal
            || (diag.level == Level::Error && self.config.all_errors_are_fatal);
        self.diagnostics.push(diag.clone());
        if stops {
            debug!(kind = diag.kind.tag(), start = diag.range.start, "fatal diagnostic");
            return Err(LexError::Fatal(Box::new(diag)));
        }
        Ok(())
    }

    fn report_all(&mut self, diag: Vec<Diagnostic>) -> Result<(), LexError> {
        diag.into_iter().try_for_each(|d| self.report(d))
    }

    /// Tokens ready for the consumer. Content of an open squiggly heredoc
    /// stays queued until its indentation is known.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens[..self.releasable()]
    }

    pub fn take_tokens(&mut self) -> Vec<Token> {
        let limit = self.releasable();
        self.drained += limit;
        self.tokens.drain(..limit).collect()
    }

    fn releasable(&self) -> usize {
        let held = self
            .literals
            .iter()
            .filter_map(|literal| literal.heredoc.as_ref()?.hold_from)
            .min();
        match held {
            Some(index) => index - self.drained,
            None => self.tokens.len(),
        }
    }

    fn next_token_index(&self) -> usize {
        self.drained + self.tokens.len()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        mem::take(&mut self.diagnostics)
    }

    // Context stacks

    pub fn cond(&self) -> &ContextStack {
        &self.cond
    }

    pub fn cond_mut(&mut self) -> &mut ContextStack {
        &mut self.cond
    }

    pub fn cmdarg(&self) -> &ContextStack {
        &self.cmdarg
    }

    pub fn cmdarg_mut(&mut self) -> &mut ContextStack {
        &mut self.cmdarg
    }

    /// Saves `cond` and starts a fresh one, e.g. on entering a block.
    pub fn save_cond(&mut self) {
        let saved = mem::take(&mut self.cond);
        self.cond_stack.push(saved);
    }

    pub fn restore_cond(&mut self) {
        self.cond = self.cond_stack.pop_or_default();
    }

    pub fn save_cmdarg(&mut self) {
        let saved = mem::take(&mut self.cmdarg);
        self.cmdarg_stack.push(saved);
    }

    pub fn restore_cmdarg(&mut self) {
        self.cmdarg = self.cmdarg_stack.pop_or_default();
    }

    /// Opaque driver states, saved across interpolation.
    pub fn push_driver_state(&mut self, state: u32) {
        self.driver_states.push(state);
    }

    pub fn pop_driver_state(&mut self) -> u32 {
        self.driver_states.pop_or_default()
    }

    pub fn numparams(&self) -> &NumparamStack {
        &self.numparams
    }

    pub fn numparams_mut(&mut self) -> &mut NumparamStack {
        &mut self.numparams
    }

    // Literal stack

    /// The literal receiving content.
    pub fn literal(&self) -> Option<&Literal> {
        self.literals.top()
    }

    pub fn literal_depth(&self) -> usize {
        self.literals.len()
    }

    pub fn has_pending_heredocs(&self) -> bool {
        !self.pending_heredocs.is_empty()
    }

    fn take_top(&mut self, op: &'static str) -> Result<Literal, LexError> {
        self.literals.pop().ok_or(LexError::Protocol(op))
    }

    /// Pops the top literal, which must be accumulating content.
    fn take_accumulating(&mut self, op: &'static str) -> Result<Literal, LexError> {
        let literal = self.take_top(op)?;
        if literal.state != LiteralState::Accumulating {
            self.literals.push(literal);
            return Err(LexError::Protocol(op));
        }
        Ok(literal)
    }

    pub fn open_literal(
        &mut self,
        kind: LiteralKind,
        delimiter: char,
        range: impl Into<CodeRange>,
        options: LiteralOptions,
    ) -> Result<&Literal, LexError> {
        let range = range.into();
        if kind.is_heredoc() {
            return Err(LexError::Protocol("open_literal: heredocs open with open_heredoc"));
        }
        let mut kind = kind;
        if kind.is_symbols_list() && !self.config.version.has_symbol_arrays() {
            self.report(
                Diagnostic::error(DiagnosticKind::UnexpectedPercentStr, range)
                    .with_arg("type", kind.prefix()),
            )?;
            kind = match kind {
                LiteralKind::PercentI => LiteralKind::PercentW,
                _ => LiteralKind::BigPercentW,
            };
        }
        if options.ambiguous {
            self.report(Diagnostic::warning(DiagnosticKind::AmbiguousLiteral, range))?;
        }

        let label_allowed = options.label_allowed && self.config.version.has_quoted_labels();
        let literal = Literal::new(kind, delimiter, range, label_allowed, self.source.encoding());
        if !literal.monolithic {
            self.emit_start_token(&literal);
        }
        debug!(?kind, depth = self.literals.len() + 1, "literal opened");
        self.literals.push(literal);
        self.literals.top().ok_or(LexError::Protocol("open_literal"))
    }

    /// Opens a literal from its opener text: `"`, `:'`, `%w[`, `%(`.
    pub fn open_literal_at(
        &mut self,
        range: impl Into<CodeRange>,
        options: LiteralOptions,
    ) -> Result<&Literal, LexError> {
        let range = range.into();
        let text = self.source.slice(range.range()).as_bytes();
        let Some((&delimiter, head)) = text.split_last() else {
            return Err(LexError::Protocol("open_literal_at: empty opener"));
        };
        if !delimiter.is_ascii() {
            return Err(LexError::Protocol("open_literal_at: non-ASCII delimiter"));
        }
        let prefix = if text[0] == b'%' { head } else { text };
        let prefix = std::str::from_utf8(prefix)
            .map_err(|_| LexError::Protocol("open_literal_at: unknown opener"))?;

        let kind = match LiteralKind::from_prefix(prefix) {
            Some(kind) => kind,
            None if prefix.starts_with('%') => {
                self.report(
                    Diagnostic::error(DiagnosticKind::UnexpectedPercentStr, range)
                        .with_arg("type", prefix),
                )?;
                LiteralKind::BigPercentQ
            }
            None => return Err(LexError::Protocol("open_literal_at: unknown opener")),
        };
        self.open_literal(kind, delimiter as char, range, options)
    }

    /// Declares a heredoc from its `<<EOS`, `<<-EOS`, `<<~'EOS'` token.
    ///
    /// The start token is emitted right away; the body waits until the driver
    /// reaches the end of the declaration line and calls
    /// [`begin_heredoc_body`](Self::begin_heredoc_body).
    pub fn open_heredoc(&mut self, range: impl Into<CodeRange>) -> Result<(), LexError> {
        let range = range.into();
        let text = self.source.slice(range.range()).as_bytes();
        let Some(mut rest) = text.strip_prefix(b"<<") else {
            return Err(LexError::Protocol("open_heredoc: missing <<"));
        };
        let mut indent = false;
        let mut squiggly = false;
        match rest.first() {
            Some(b'-') => {
                indent = true;
                rest = &rest[1..];
            }
            Some(b'~') => {
                indent = true;
                squiggly = true;
                rest = &rest[1..];
            }
            _ => {}
        }
        let (kind, terminator) = match rest.first() {
            Some(&quote @ (b'\'' | b'"' | b'`')) => {
                let Some(terminator) = rest[1..].strip_suffix(&[quote]) else {
                    return Err(LexError::Protocol("open_heredoc: unbalanced quote"));
                };
                let kind = match quote {
                    b'\'' => LiteralKind::HeredocSingle,
                    b'`' => LiteralKind::HeredocBacktick,
                    _ => LiteralKind::HeredocDouble,
                };
                (kind, terminator)
            }
            _ => (LiteralKind::HeredocDouble, rest),
        };
        if terminator.is_empty() {
            return Err(LexError::Protocol("open_heredoc: empty terminator"));
        }
        if squiggly && !self.config.version.has_squiggly_heredoc() {
            self.report(
                Diagnostic::error(DiagnosticKind::UnexpectedPercentStr, range)
                    .with_arg("type", "<<~"),
            )?;
            squiggly = false;
        }

        let heredoc = Heredoc {
            terminator: terminator.to_vec(),
            indent,
            squiggly_dedent: squiggly,
            declaration_start: range.start,
            heredoc_end_pos: range.end,
            body_start_pos: None,
            dedent_indent_level: None,
            at_line_start: false,
            held: Vec::new(),
            hold_from: None,
        };
        let literal = Literal::new_heredoc(kind, range, heredoc, self.source.encoding());
        self.emit_start_token(&literal);
        debug!(?kind, pending = self.pending_heredocs.len() + 1, "heredoc declared");
        self.pending_heredocs.push_back(literal);
        Ok(())
    }

    /// Starts the body of the oldest pending heredoc at `pos`, the beginning
    /// of the line after its declaration (or after the previous heredoc's
    /// terminator). Returns `false` if no heredoc is pending.
    pub fn begin_heredoc_body(&mut self, pos: usize) -> Result<bool, LexError> {
        let Some(mut literal) = self.pending_heredocs.pop_front() else {
            return Ok(false);
        };
        let next_index = self.next_token_index();
        if let Some(heredoc) = literal.heredoc.as_mut() {
            heredoc.body_start_pos = Some(pos);
            heredoc.at_line_start = true;
            if heredoc.squiggly_dedent {
                heredoc.hold_from = Some(next_index);
            }
        }
        debug!(body_start = pos, "heredoc body started");
        self.literals.push(literal);
        Ok(true)
    }

    /// Offers a body line (newline included) of the top heredoc.
    pub fn feed_heredoc_line(&mut self, line: impl Into<CodeRange>) -> Result<HeredocLine, LexError> {
        let line = line.into();
        let bytes = self.source.slice(line.range()).as_bytes();
        let mut literal = self.take_accumulating("feed_heredoc_line")?;
        let Some(heredoc) = literal.heredoc.as_mut() else {
            self.literals.push(literal);
            return Err(LexError::Protocol("feed_heredoc_line"));
        };

        if !heredoc.matches_terminator(bytes) {
            heredoc.infer_indent_level(bytes);
            if literal.buffer.is_empty() {
                heredoc.at_line_start = true;
            }
            self.literals.push(literal);
            return Ok(HeredocLine::Body);
        }

        self.flush(&mut literal);
        if let Some(heredoc) = literal.heredoc.take() {
            if heredoc.squiggly_dedent {
                let level = heredoc.dedent_indent_level.unwrap_or(0);
                for held in heredoc.held.iter().filter(|held| held.at_line_start) {
                    if let Some(token) = self.tokens.get_mut(held.token - self.drained) {
                        if let TokenValue::String(content) = &mut token.value {
                            dedent(content, level);
                        }
                    }
                }
            }
            let content_len = bytes
                .iter()
                .rposition(|&b| b != b'\n' && b != b'\r')
                .map_or(0, |i| i + 1);
            let indent = bytes[..content_len]
                .iter()
                .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\x0b' | b'\x0c'))
                .count();
            let terminator = EString::from_bytes(heredoc.terminator, self.source.encoding());
            self.emit_token(
                TokenKind::StringEnd,
                TokenValue::String(terminator),
                CodeRange::new(line.start + indent, line.start + content_len),
            );
        }
        debug!(resume_at = line.end, "heredoc closed");
        Ok(HeredocLine::Terminator {
            resume_at: line.end,
        })
    }

    /// Appends plain source text. A source newline ends a content token;
    /// inside word lists whitespace separates elements.
    pub fn feed_content(&mut self, range: impl Into<CodeRange>) -> Result<(), LexError> {
        let range = range.into();
        let mut literal = self.take_accumulating("feed_content")?;
        let source = self.source;
        let text = source.slice(range.range());
        let words = literal.kind.splits_on_whitespace();
        let mut run_start = range.start;
        for (r, next) in text.char_indices() {
            let ch = next.unicode();
            let char_range = CodeRange::new(range.start + r.start, range.start + r.end);
            if words && matches!(ch, Some(' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')) {
                let run = CodeRange::new(run_start, char_range.start);
                literal.extend_bytes(source.slice(run.range()).as_bytes(), run);
                self.extend_space(&mut literal, char_range);
                run_start = char_range.end;
            } else if ch == Some('\n') {
                let run = CodeRange::new(run_start, char_range.end);
                literal.extend_bytes(source.slice(run.range()).as_bytes(), run);
                self.flush(&mut literal);
                run_start = char_range.end;
            }
        }
        let run = CodeRange::new(run_start, range.end.max(run_start));
        literal.extend_bytes(source.slice(run.range()).as_bytes(), run);
        self.literals.push(literal);
        Ok(())
    }

    /// Decodes the escape whose backslash is at `pos` into the top literal.
    /// The driver continues at the end of the returned range.
    pub fn feed_escape(&mut self, pos: usize) -> Result<Escape, LexError> {
        let mut literal = self.take_accumulating("feed_escape")?;
        let ctx = literal.escape_context(&self.config);
        let mut diag = Vec::new();
        let escape = escape::decode_escape(self.source, pos, &ctx, &mut diag);
        let mixed = match &escape.value {
            EscapeValue::Char(ch) => literal.buffer.mixes_with(*ch),
            EscapeValue::Chars(chars) => chars.iter().any(|&ch| literal.buffer.mixes_with(ch)),
            _ => false,
        };
        if mixed {
            let encoding = literal.buffer.encoding().name();
            diag.push(
                Diagnostic::error(DiagnosticKind::MixedEncoding, escape.range)
                    .with_arg("encoding", encoding),
            );
        }
        match &escape.value {
            EscapeValue::Char(ch) => literal.extend_char(*ch, escape.range),
            EscapeValue::Chars(chars) => {
                for &ch in chars {
                    literal.extend_char(ch, escape.range);
                }
            }
            EscapeValue::Byte(b) => literal.extend_byte(*b, escape.range),
            EscapeValue::Verbatim => {
                let text = self.source.slice(escape.range.range()).as_bytes();
                literal.extend_bytes(text, escape.range);
                if text.ends_with(b"\n") {
                    self.flush(&mut literal);
                }
            }
            EscapeValue::Nothing => {}
        }
        self.literals.push(literal);
        self.report_all(diag)?;
        Ok(escape)
    }

    /// Classifies an interpolation introducer at `pos` (a `#`).
    pub fn interpolation_at(&self, pos: usize) -> Option<Interpolation> {
        let src = self.source;
        if src.byte_at(pos) != b'#' {
            return None;
        }
        let (kind, name_start) = match (src.byte_at(pos + 1), src.byte_at(pos + 2)) {
            (b'{', _) => return Some(Interpolation::Block { end: pos + 2 }),
            (b'@', b'@') => (TokenKind::Cvar, pos + 3),
            (b'@', _) => (TokenKind::Ivar, pos + 2),
            (b'$', _) => (TokenKind::Gvar, pos + 2),
            _ => return None,
        };
        let mut end = name_start;
        while end < src.len() && is_ident_continue(src.byte_at(end)) {
            end += 1;
        }
        if end == name_start {
            return None;
        }
        Some(Interpolation::Variable { kind, end })
    }

    /// `#{`: flushes pending content and hands control to the driver.
    pub fn begin_interpolation(&mut self, range: impl Into<CodeRange>) -> Result<(), LexError> {
        let range = range.into();
        let mut literal = self.take_accumulating("begin_interpolation")?;
        if !literal.interpolates() {
            self.literals.push(literal);
            return Err(LexError::Protocol("begin_interpolation"));
        }
        self.flush(&mut literal);
        literal.space_emitted = false;
        self.emit_token(TokenKind::StringDbeg, TokenValue::None, range);
        literal.state = LiteralState::Interpolating;
        literal.interp_brace_depth = 1;
        self.literals.push(literal);
        Ok(())
    }

    /// A `{` in interpolated code. Returns whether it was counted.
    pub fn open_interp_brace(&mut self) -> bool {
        match self.literals.top_mut() {
            Some(literal) if literal.state == LiteralState::Interpolating => {
                literal.interp_brace_depth += 1;
                true
            }
            _ => false,
        }
    }

    /// A `}` in interpolated code. Returns `true` if it closed the
    /// interpolation; otherwise it is an ordinary brace for the driver.
    pub fn end_interpolation(&mut self, range: impl Into<CodeRange>) -> bool {
        let Some(literal) = self.literals.top_mut() else {
            return false;
        };
        if literal.state != LiteralState::Interpolating {
            return false;
        }
        literal.interp_brace_depth -= 1;
        if literal.interp_brace_depth > 0 {
            return false;
        }
        literal.state = LiteralState::Accumulating;
        self.emit_token(TokenKind::StringDend, TokenValue::None, range);
        true
    }

    /// `#@foo`, `#@@foo`, `#$foo` over `range`.
    pub fn interpolate_variable(&mut self, range: impl Into<CodeRange>) -> Result<(), LexError> {
        let range = range.into();
        let text = self.source.slice(range.range()).as_bytes();
        let mut literal = self.take_accumulating("interpolate_variable")?;
        let kind = match (text.get(1), text.get(2)) {
            _ if !literal.interpolates() || text.first() != Some(&b'#') => None,
            (Some(&b'@'), Some(&b'@')) => Some(TokenKind::Cvar),
            (Some(&b'@'), _) => Some(TokenKind::Ivar),
            (Some(&b'$'), _) => Some(TokenKind::Gvar),
            _ => None,
        };
        let Some(kind) = kind else {
            self.literals.push(literal);
            return Err(LexError::Protocol("interpolate_variable"));
        };
        let var_range = CodeRange::new(range.start + 1, range.end);
        let sigil_len = if kind == TokenKind::Cvar { 2 } else { 1 };

        if kind != TokenKind::Gvar && text.get(1 + sigil_len).is_some_and(u8::is_ascii_digit) {
            literal.extend_bytes(text, range);
            self.literals.push(literal);
            let diag_kind = if kind == TokenKind::Cvar {
                DiagnosticKind::BadCvarName
            } else {
                DiagnosticKind::BadIvarName
            };
            return self.report(
                Diagnostic::error(diag_kind, var_range)
                    .with_arg("name", String::from_utf8_lossy(&text[1..])),
            );
        }

        self.flush(&mut literal);
        literal.space_emitted = false;
        self.emit_token(
            TokenKind::StringDvar,
            TokenValue::None,
            CodeRange::new(range.start, var_range.start),
        );
        let name = EString::from_bytes(text[1..].to_vec(), self.source.encoding());
        self.emit_token(kind, TokenValue::String(name), var_range);
        self.literals.push(literal);
        Ok(())
    }

    /// Hands over a delimiter character at `pos`. Nested bracket characters
    /// become content; the matching end delimiter closes the literal.
    pub fn try_close(&mut self, pos: usize) -> Result<TryClose, LexError> {
        let source = self.source;
        let Some(next) = source.char_at(pos) else {
            return Err(LexError::Protocol("try_close: end of input"));
        };
        let range = CodeRange::new(pos, pos + next.len());
        let ch = next.unicode();
        let mut literal = self.take_accumulating("try_close")?;
        if literal.heredoc.is_some() {
            self.literals.push(literal);
            return Err(LexError::Protocol("try_close: heredoc"));
        }

        let opens = literal.is_bracket() && ch == Some(literal.start_delimiter);
        let closes = ch == Some(literal.end_delimiter);
        if opens || (closes && literal.nesting > 0) || !closes {
            if opens {
                literal.nesting += 1;
            } else if closes {
                literal.nesting -= 1;
            }
            literal.extend_bytes(source.slice(range.range()).as_bytes(), range);
            self.literals.push(literal);
            return Ok(TryClose::Open {
                resume_at: range.end,
            });
        }
        self.close_literal(literal, range)
    }

    fn close_literal(&mut self, mut literal: Literal, range: CodeRange) -> Result<TryClose, LexError> {
        let source = self.source;
        if literal.kind.splits_on_whitespace() {
            self.extend_space(&mut literal, CodeRange::empty_at(range.start));
        }

        let mut resume_at = range.end;
        let is_label = literal.label_allowed
            && literal.kind.start_token() == TokenKind::StringBegin
            && source.byte_at(range.end) == b':'
            && source.byte_at(range.end + 1) != b':';
        if is_label {
            self.flush(&mut literal);
            resume_at = range.end + 1;
            let label_end = CodeRange::new(range.start, resume_at);
            self.emit_token(
                TokenKind::StringEndColon,
                TokenValue::String(source.slice(label_end.range()).to_estring()),
                label_end,
            );
        } else if literal.monolithic {
            let kind = if literal.kind.start_token() == TokenKind::SymbolBegin {
                TokenKind::Symbol
            } else {
                TokenKind::String
            };
            let value = literal.buffer.take();
            self.emit_token(
                kind,
                TokenValue::String(value),
                CodeRange::new(literal.start_range.start, range.end),
            );
        } else {
            self.flush(&mut literal);
            self.emit_token(
                TokenKind::StringEnd,
                TokenValue::String(source.slice(range.range()).to_estring()),
                range,
            );
        }
        debug!(kind = ?literal.kind, depth = self.literals.len(), "literal closed");

        if literal.kind.is_regexp() {
            resume_at = self.scan_regexp_options(range.end)?;
        }
        Ok(TryClose::Closed { resume_at })
    }

    fn scan_regexp_options(&mut self, pos: usize) -> Result<usize, LexError> {
        let source = self.source;
        let mut end = pos;
        while source.byte_at(end).is_ascii_alphabetic() {
            end += 1;
        }
        let options = source.slice(pos..end);
        let unknown: String = options
            .as_bytes()
            .iter()
            .filter(|&&b| !REGEXP_OPTIONS.contains(&b))
            .map(|&b| b as char)
            .collect();
        self.emit_token(
            TokenKind::RegexpOptions,
            TokenValue::String(options.to_estring()),
            pos..end,
        );
        if !unknown.is_empty() {
            self.report(
                Diagnostic::error(DiagnosticKind::RegexpOptions, CodeRange::new(pos, end))
                    .with_arg("options", unknown),
            )?;
        }
        Ok(end)
    }

    /// Classifies the numeric run at `range` and emits its token. Returns
    /// where the driver continues.
    pub fn emit_numeric(&mut self, range: impl Into<CodeRange>) -> Result<usize, LexError> {
        let range = range.into();
        let text = self.source.slice(range.range()).as_bytes();
        let mut diag = Vec::new();
        let (literal, len) = numeric::classify(text, range.start, self.config.version, &mut diag);
        self.emit_token(
            literal.token_kind(),
            TokenValue::Numeric(literal),
            CodeRange::new(range.start, range.start + len),
        );
        self.report_all(diag)?;
        Ok(range.end)
    }

    /// End of input. Any literal still open is fatal.
    pub fn finish(&mut self, pos: usize) -> Result<(), LexError> {
        let open = self
            .literals
            .top()
            .or_else(|| self.pending_heredocs.front())
            .map(|literal| literal.start_range);
        if let Some(start_range) = open {
            debug!(eof = pos, "literal open at end of input");
            self.report(Diagnostic::new(
                Level::Fatal,
                DiagnosticKind::StringEof,
                start_range,
            ))?;
        }
        Ok(())
    }

    fn emit_start_token(&mut self, literal: &Literal) {
        self.emit_token(
            literal.kind.start_token(),
            TokenValue::String(EString::from(literal.kind.prefix())),
            literal.start_range,
        );
    }

    /// Emits the buffered content as one token.
    fn flush(&mut self, literal: &mut Literal) {
        if literal.monolithic {
            self.emit_start_token(literal);
            literal.monolithic = false;
        }
        if !literal.buffer.is_empty() {
            let index = self.next_token_index();
            if let Some(heredoc) = literal.heredoc.as_mut() {
                if heredoc.squiggly_dedent {
                    heredoc.held.push(HeldContent {
                        token: index,
                        at_line_start: heredoc.at_line_start,
                    });
                }
            }
            let range = literal
                .buffer_range
                .take()
                .unwrap_or(CodeRange::empty_at(literal.start_range.end));
            let content = literal.buffer.take();
            self.emit_token(TokenKind::StringContent, TokenValue::String(content), range);
            literal.space_emitted = false;
        }
        if let Some(heredoc) = literal.heredoc.as_mut() {
            heredoc.at_line_start = false;
        }
    }

    fn extend_space(&mut self, literal: &mut Literal, range: CodeRange) {
        self.flush(literal);
        if !literal.space_emitted {
            self.emit_token(TokenKind::Space, TokenValue::None, range);
            literal.space_emitted = true;
        } else if let Some(last) = self.tokens.last_mut() {
            if last.kind == TokenKind::Space && last.range.end == range.start {
                last.range.end = range.end;
            }
        }
    }
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

#[cfg(test)]
mod tests;
