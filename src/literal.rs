use crate::{
    config::LexerConfig,
    encoding::{EString, Encoding},
    escape::{EscapeContext, EscapeMode},
    pos::CodeRange,
    token::TokenKind,
};

const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    /// `'foo'`
    SingleQuote,
    /// `"foo"`
    DoubleQuote,
    /// `%q(foo)`
    PercentQ,
    /// `%Q(foo)`
    BigPercentQ,
    /// `<<'EOS'`
    HeredocSingle,
    /// `<<EOS`, `<<"EOS"`
    HeredocDouble,
    /// `%(foo)`
    BarePercent,
    /// `%w(foo bar)`
    PercentW,
    /// `%W(foo bar)`
    BigPercentW,
    /// `%i(foo bar)`
    PercentI,
    /// `%I(foo bar)`
    BigPercentI,
    /// `:'foo'`
    SymbolSingle,
    /// `:"foo"`
    SymbolDouble,
    /// `%s(foo)`
    PercentS,
    /// `/foo/`
    Slash,
    /// `%r(foo)`
    PercentR,
    /// `%x(foo)`
    PercentX,
    /// `` `foo` ``
    Backtick,
    /// ``<<`EOS` ``
    HeredocBacktick,
}

impl LiteralKind {
    pub const ALL: [LiteralKind; 19] = [
        LiteralKind::SingleQuote,
        LiteralKind::DoubleQuote,
        LiteralKind::PercentQ,
        LiteralKind::BigPercentQ,
        LiteralKind::HeredocSingle,
        LiteralKind::HeredocDouble,
        LiteralKind::BarePercent,
        LiteralKind::PercentW,
        LiteralKind::BigPercentW,
        LiteralKind::PercentI,
        LiteralKind::BigPercentI,
        LiteralKind::SymbolSingle,
        LiteralKind::SymbolDouble,
        LiteralKind::PercentS,
        LiteralKind::Slash,
        LiteralKind::PercentR,
        LiteralKind::PercentX,
        LiteralKind::Backtick,
        LiteralKind::HeredocBacktick,
    ];

    /// The opener without its delimiter.
    pub fn prefix(&self) -> &'static str {
        match self {
            LiteralKind::SingleQuote => "'",
            LiteralKind::DoubleQuote => "\"",
            LiteralKind::PercentQ => "%q",
            LiteralKind::BigPercentQ => "%Q",
            LiteralKind::HeredocSingle => "<<'",
            LiteralKind::HeredocDouble => "<<\"",
            LiteralKind::BarePercent => "%",
            LiteralKind::PercentW => "%w",
            LiteralKind::BigPercentW => "%W",
            LiteralKind::PercentI => "%i",
            LiteralKind::BigPercentI => "%I",
            LiteralKind::SymbolSingle => ":'",
            LiteralKind::SymbolDouble => ":\"",
            LiteralKind::PercentS => "%s",
            LiteralKind::Slash => "/",
            LiteralKind::PercentR => "%r",
            LiteralKind::PercentX => "%x",
            LiteralKind::Backtick => "`",
            LiteralKind::HeredocBacktick => "<<`",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<LiteralKind> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }

    pub fn start_token(&self) -> TokenKind {
        match self {
            LiteralKind::SingleQuote
            | LiteralKind::DoubleQuote
            | LiteralKind::PercentQ
            | LiteralKind::BigPercentQ
            | LiteralKind::HeredocSingle
            | LiteralKind::HeredocDouble
            | LiteralKind::BarePercent => TokenKind::StringBegin,
            LiteralKind::PercentW => TokenKind::QWordsBegin,
            LiteralKind::BigPercentW => TokenKind::WordsBegin,
            LiteralKind::PercentI => TokenKind::QSymbolsBegin,
            LiteralKind::BigPercentI => TokenKind::SymbolsBegin,
            LiteralKind::SymbolSingle | LiteralKind::SymbolDouble | LiteralKind::PercentS => {
                TokenKind::SymbolBegin
            }
            LiteralKind::Slash | LiteralKind::PercentR => TokenKind::RegexpBegin,
            LiteralKind::PercentX | LiteralKind::Backtick | LiteralKind::HeredocBacktick => {
                TokenKind::XStringBegin
            }
        }
    }

    pub fn interpolates(&self) -> bool {
        !matches!(
            self,
            LiteralKind::SingleQuote
                | LiteralKind::PercentQ
                | LiteralKind::HeredocSingle
                | LiteralKind::PercentW
                | LiteralKind::PercentI
                | LiteralKind::SymbolSingle
                | LiteralKind::PercentS
        )
    }

    pub fn is_words_list(&self) -> bool {
        matches!(self, LiteralKind::PercentW | LiteralKind::BigPercentW)
    }

    pub fn is_symbols_list(&self) -> bool {
        matches!(self, LiteralKind::PercentI | LiteralKind::BigPercentI)
    }

    /// Content is split into elements on whitespace.
    pub fn splits_on_whitespace(&self) -> bool {
        self.is_words_list() || self.is_symbols_list()
    }

    pub fn is_regexp(&self) -> bool {
        matches!(self, LiteralKind::Slash | LiteralKind::PercentR)
    }

    pub fn is_heredoc(&self) -> bool {
        matches!(
            self,
            LiteralKind::HeredocSingle | LiteralKind::HeredocDouble | LiteralKind::HeredocBacktick
        )
    }

    pub fn escape_mode(&self) -> EscapeMode {
        if *self == LiteralKind::HeredocSingle {
            EscapeMode::Verbatim
        } else if self.is_regexp() {
            EscapeMode::Regexp
        } else if self.interpolates() {
            EscapeMode::Interpolated
        } else {
            EscapeMode::Quoted
        }
    }
}

/// Closing character of a bracket-style delimiter.
pub fn closing_delimiter(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        '<' => Some('>'),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralState {
    Accumulating,
    /// Inside `#{...}`; the driver is scanning code.
    Interpolating,
}

#[derive(Debug, Clone)]
pub struct Heredoc {
    pub(crate) terminator: Vec<u8>,
    pub(crate) indent: bool,
    pub(crate) squiggly_dedent: bool,
    pub(crate) declaration_start: usize,
    pub(crate) heredoc_end_pos: usize,
    pub(crate) body_start_pos: Option<usize>,
    pub(crate) dedent_indent_level: Option<usize>,
    /// Whether the pending buffer began at the start of a body line.
    pub(crate) at_line_start: bool,
    /// Content tokens waiting for the dedent, by absolute queue index.
    pub(crate) held: Vec<HeldContent>,
    pub(crate) hold_from: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct HeldContent {
    pub(crate) token: usize,
    pub(crate) at_line_start: bool,
}

impl Heredoc {
    pub fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    /// `<<-EOS` or `<<~EOS`
    pub fn indent(&self) -> bool {
        self.indent
    }

    pub fn squiggly_dedent(&self) -> bool {
        self.squiggly_dedent
    }

    /// Start of the `<<EOS` token. Informational: the driver resumes after
    /// the terminator line, not here.
    pub fn declaration_start(&self) -> usize {
        self.declaration_start
    }

    /// End of the `<<EOS` token on the declaration line, where code scanning
    /// continued while the body was pending.
    pub fn heredoc_end_pos(&self) -> usize {
        self.heredoc_end_pos
    }

    pub fn body_start_pos(&self) -> Option<usize> {
        self.body_start_pos
    }

    pub fn dedent_indent_level(&self) -> Option<usize> {
        self.dedent_indent_level
    }

    pub(crate) fn matches_terminator(&self, line: &[u8]) -> bool {
        let mut line = line.strip_suffix(b"\n").unwrap_or(line);
        while let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
        if self.indent {
            let indent = line
                .iter()
                .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\x0b' | b'\x0c'))
                .count();
            line = &line[indent..];
        }
        line == self.terminator.as_slice()
    }

    /// Folds the indentation of a body line into the dedent level.
    /// Lines holding only whitespace do not count.
    pub(crate) fn infer_indent_level(&mut self, line: &[u8]) {
        if !self.squiggly_dedent {
            return;
        }
        let mut level = 0;
        for &b in line {
            match b {
                b' ' => level += 1,
                b'\t' => level += TAB_WIDTH - level % TAB_WIDTH,
                b'\n' | b'\r' => return,
                _ => {
                    if self.dedent_indent_level.map_or(true, |current| level < current) {
                        self.dedent_indent_level = Some(level);
                    }
                    return;
                }
            }
        }
    }
}

/// Removes up to `level` columns of leading whitespace from `content`.
pub(crate) fn dedent(content: &mut EString, level: usize) {
    let mut column = 0;
    let mut len = 0;
    for &b in content.as_bytes() {
        if column >= level {
            break;
        }
        match b {
            b' ' => column += 1,
            b'\t' => {
                let next = column + TAB_WIDTH - column % TAB_WIDTH;
                if next > level {
                    break;
                }
                column = next;
            }
            _ => break,
        }
        len += 1;
    }
    content.remove_prefix(len);
}

/// One in-progress literal.
#[derive(Debug, Clone)]
pub struct Literal {
    pub(crate) kind: LiteralKind,
    pub(crate) start_delimiter: char,
    pub(crate) end_delimiter: char,
    pub(crate) nesting: usize,
    pub(crate) state: LiteralState,
    pub(crate) interp_brace_depth: usize,
    pub(crate) buffer: EString,
    pub(crate) buffer_range: Option<CodeRange>,
    pub(crate) label_allowed: bool,
    pub(crate) space_emitted: bool,
    pub(crate) monolithic: bool,
    /// The opener: `"`, `%w[`, `<<~EOS`.
    pub(crate) start_range: CodeRange,
    pub(crate) heredoc: Option<Heredoc>,
}

impl Literal {
    pub(crate) fn new(
        kind: LiteralKind,
        delimiter: char,
        start_range: CodeRange,
        label_allowed: bool,
        encoding: Encoding,
    ) -> Self {
        let monolithic = matches!(
            kind.start_token(),
            TokenKind::StringBegin | TokenKind::SymbolBegin
        ) && !kind.is_heredoc();
        Literal {
            kind,
            start_delimiter: delimiter,
            end_delimiter: closing_delimiter(delimiter).unwrap_or(delimiter),
            nesting: 0,
            state: LiteralState::Accumulating,
            interp_brace_depth: 0,
            buffer: EString::with_encoding(encoding),
            buffer_range: None,
            label_allowed,
            space_emitted: true,
            monolithic,
            start_range,
            heredoc: None,
        }
    }

    pub(crate) fn new_heredoc(
        kind: LiteralKind,
        start_range: CodeRange,
        heredoc: Heredoc,
        encoding: Encoding,
    ) -> Self {
        let mut literal = Literal::new(kind, '\n', start_range, false, encoding);
        literal.heredoc = Some(heredoc);
        literal
    }

    pub fn kind(&self) -> LiteralKind {
        self.kind
    }

    pub fn start_delimiter(&self) -> char {
        self.start_delimiter
    }

    pub fn end_delimiter(&self) -> char {
        self.end_delimiter
    }

    pub fn is_bracket(&self) -> bool {
        self.start_delimiter != self.end_delimiter
    }

    pub fn nesting(&self) -> usize {
        self.nesting
    }

    pub fn state(&self) -> LiteralState {
        self.state
    }

    pub fn interpolates(&self) -> bool {
        self.kind.interpolates()
    }

    pub fn interp_brace_depth(&self) -> usize {
        self.interp_brace_depth
    }

    pub fn buffer(&self) -> &EString {
        &self.buffer
    }

    pub fn is_monolithic(&self) -> bool {
        self.monolithic
    }

    pub fn label_allowed(&self) -> bool {
        self.label_allowed
    }

    pub fn start_range(&self) -> CodeRange {
        self.start_range
    }

    pub fn heredoc(&self) -> Option<&Heredoc> {
        self.heredoc.as_ref()
    }

    /// Whether the driver must hand `ch` to `try_close` instead of feeding
    /// it as content. Heredocs close on lines, never on characters.
    pub fn is_delimiter(&self, ch: char) -> bool {
        self.heredoc.is_none()
            && (ch == self.end_delimiter || (self.is_bracket() && ch == self.start_delimiter))
    }

    pub(crate) fn escape_context(&self, config: &LexerConfig) -> EscapeContext {
        EscapeContext {
            mode: self.kind.escape_mode(),
            start_delimiter: self.start_delimiter,
            end_delimiter: self.end_delimiter,
            words: self.kind.splits_on_whitespace(),
            version: config.version,
            strict: config.strict_escapes,
        }
    }

    fn cover(&mut self, range: CodeRange) {
        self.buffer_range = Some(match self.buffer_range {
            Some(current) => current | range,
            None => range,
        });
    }

    pub(crate) fn extend_bytes(&mut self, bytes: &[u8], range: CodeRange) {
        if bytes.is_empty() {
            return;
        }
        self.buffer.push_bytes(bytes);
        self.cover(range);
    }

    pub(crate) fn extend_char(&mut self, ch: char, range: CodeRange) {
        self.buffer.push_char(ch);
        self.cover(range);
    }

    pub(crate) fn extend_byte(&mut self, b: u8, range: CodeRange) {
        self.buffer.push_byte(b);
        self.cover(range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heredoc(terminator: &str, indent: bool, squiggly: bool) -> Heredoc {
        Heredoc {
            terminator: terminator.as_bytes().to_vec(),
            indent,
            squiggly_dedent: squiggly,
            declaration_start: 0,
            heredoc_end_pos: 0,
            body_start_pos: None,
            dedent_indent_level: None,
            at_line_start: false,
            held: Vec::new(),
            hold_from: None,
        }
    }

    #[test]
    fn test_every_kind_round_trips_its_prefix() {
        for kind in LiteralKind::ALL {
            assert_eq!(LiteralKind::from_prefix(kind.prefix()), Some(kind));
        }
        assert_eq!(LiteralKind::from_prefix("%z"), None);
    }

    #[test]
    fn test_kind_properties() {
        assert_eq!(LiteralKind::PercentW.start_token(), TokenKind::QWordsBegin);
        assert_eq!(LiteralKind::BigPercentI.start_token(), TokenKind::SymbolsBegin);
        assert_eq!(LiteralKind::HeredocBacktick.start_token(), TokenKind::XStringBegin);
        assert!(!LiteralKind::PercentS.interpolates());
        assert!(LiteralKind::Slash.interpolates());
        assert_eq!(LiteralKind::HeredocSingle.escape_mode(), EscapeMode::Verbatim);
        assert_eq!(LiteralKind::PercentR.escape_mode(), EscapeMode::Regexp);
        assert_eq!(LiteralKind::PercentI.escape_mode(), EscapeMode::Quoted);
        assert_eq!(LiteralKind::BigPercentW.escape_mode(), EscapeMode::Interpolated);
    }

    #[test]
    fn test_bracket_delimiters() {
        let literal = Literal::new(
            LiteralKind::BarePercent,
            '(',
            CodeRange::new(0, 2),
            false,
            Encoding::UTF_8,
        );
        assert_eq!(literal.end_delimiter(), ')');
        assert!(literal.is_bracket());
        assert!(literal.is_delimiter('('));
        assert!(literal.is_delimiter(')'));
        assert!(literal.is_monolithic());

        let literal = Literal::new(
            LiteralKind::PercentQ,
            '|',
            CodeRange::new(0, 3),
            false,
            Encoding::UTF_8,
        );
        assert!(!literal.is_bracket());
        assert!(literal.is_delimiter('|'));
    }

    #[test]
    fn test_words_are_not_monolithic() {
        let literal = Literal::new(
            LiteralKind::PercentW,
            '[',
            CodeRange::new(0, 3),
            false,
            Encoding::UTF_8,
        );
        assert!(!literal.is_monolithic());
    }

    #[test]
    fn test_terminator_matching() {
        let plain = heredoc("EOS", false, false);
        assert!(plain.matches_terminator(b"EOS\n"));
        assert!(plain.matches_terminator(b"EOS\r\n"));
        assert!(plain.matches_terminator(b"EOS"));
        assert!(!plain.matches_terminator(b"  EOS\n"));
        assert!(!plain.matches_terminator(b"EOS \n"));

        let dash = heredoc("EOS", true, false);
        assert!(dash.matches_terminator(b"  \tEOS\n"));
    }

    #[test]
    fn test_indent_level_inference() {
        let mut squiggly = heredoc("EOS", true, true);
        squiggly.infer_indent_level(b"    a\n");
        squiggly.infer_indent_level(b"\n");
        squiggly.infer_indent_level(b"   \n");
        squiggly.infer_indent_level(b"  b\n");
        squiggly.infer_indent_level(b"      c\n");
        assert_eq!(squiggly.dedent_indent_level(), Some(2));

        let mut tabbed = heredoc("EOS", true, true);
        tabbed.infer_indent_level(b" \tx\n");
        assert_eq!(tabbed.dedent_indent_level(), Some(8));
    }

    #[test]
    fn test_dedent() {
        let mut content = EString::from("    a\n");
        dedent(&mut content, 2);
        assert_eq!(content, EString::from("  a\n"));

        let mut content = EString::from(" \tb\n");
        dedent(&mut content, 4);
        assert_eq!(content, EString::from("\tb\n"));

        let mut content = EString::from("\tc\n");
        dedent(&mut content, 8);
        assert_eq!(content, EString::from("c\n"));
    }
}
