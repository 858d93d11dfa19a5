use std::fmt;

use crate::pos::CodeRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Note,
    Warning,
    Error,
    /// Scanning cannot continue.
    Fatal,
}

impl Level {
    pub fn name(&self) -> &'static str {
        match self {
            Level::Note => "note",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// `\C-` or `\M-` without a usable character, or an unknown escape in
    /// strict mode
    InvalidEscape,
    /// backslash at the end of input
    IncompleteEscape,
    /// a control or meta modifier applied twice
    InvalidEscapeUse,
    /// `\x` without hex digits
    InvalidHexEscape,
    /// `8` or `9` where an octal digit is expected
    InvalidOctal,
    /// `\u` not followed by four hex digits, or a surrogate codepoint
    InvalidUnicodeEscape,
    /// `#@1`
    BadIvarName,
    /// `#@@1`
    BadCvarName,
    /// codepoint above U+10FFFF
    UnicodePointTooLarge,
    /// `\u{` without `}`
    UnterminatedUnicode,
    /// `\u` codepoint after raw high bytes in a non-Unicode literal
    MixedEncoding,
    /// `0x`, `0b`, `0d` without digits
    EmptyNumeric,
    /// misplaced `_` or garbage after a number
    TrailingInNumber,
    /// literal still open at the end of input
    StringEof,
    AmbiguousLiteral,
    AmbiguousPrefix,
    /// `%z(...)`
    UnexpectedPercentStr,
    /// unknown regexp option letters
    RegexpOptions,
}

impl DiagnosticKind {
    pub fn tag(&self) -> &'static str {
        match self {
            DiagnosticKind::InvalidEscape => "invalid_escape",
            DiagnosticKind::IncompleteEscape => "incomplete_escape",
            DiagnosticKind::InvalidEscapeUse => "invalid_escape_use",
            DiagnosticKind::InvalidHexEscape => "invalid_hex_escape",
            DiagnosticKind::InvalidOctal => "invalid_octal",
            DiagnosticKind::InvalidUnicodeEscape => "invalid_unicode_escape",
            DiagnosticKind::BadIvarName => "bad_ivar_name",
            DiagnosticKind::BadCvarName => "bad_cvar_name",
            DiagnosticKind::UnicodePointTooLarge => "unicode_point_too_large",
            DiagnosticKind::UnterminatedUnicode => "unterminated_unicode",
            DiagnosticKind::MixedEncoding => "mixed_encoding",
            DiagnosticKind::EmptyNumeric => "empty_numeric",
            DiagnosticKind::TrailingInNumber => "trailing_in_number",
            DiagnosticKind::StringEof => "string_eof",
            DiagnosticKind::AmbiguousLiteral => "ambiguous_literal",
            DiagnosticKind::AmbiguousPrefix => "ambiguous_prefix",
            DiagnosticKind::UnexpectedPercentStr => "unexpected_percent_str",
            DiagnosticKind::RegexpOptions => "regexp_options",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub level: Level,
    pub kind: DiagnosticKind,
    pub range: CodeRange,
    /// Named context values, e.g. `("character", "_")`.
    pub args: Vec<(&'static str, String)>,
}

impl Diagnostic {
    pub fn new(level: Level, kind: DiagnosticKind, range: CodeRange) -> Self {
        Diagnostic {
            level,
            kind,
            range,
            args: Vec::new(),
        }
    }

    pub fn error(kind: DiagnosticKind, range: CodeRange) -> Self {
        Self::new(Level::Error, kind, range)
    }

    pub fn warning(kind: DiagnosticKind, range: CodeRange) -> Self {
        Self::new(Level::Warning, kind, range)
    }

    pub fn with_arg(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.args.push((name, value.into()));
        self
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}..{}",
            self.level.name(),
            self.kind.tag(),
            self.range.start,
            self.range.end
        )?;
        for (name, value) in &self.args {
            write!(f, " {}={:?}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(Level::Note < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_display_with_args() {
        let diag = Diagnostic::error(DiagnosticKind::TrailingInNumber, CodeRange::new(3, 4))
            .with_arg("character", "_");
        assert_eq!(
            diag.to_string(),
            "error: trailing_in_number at 3..4 character=\"_\""
        );
        assert_eq!(diag.arg("character"), Some("_"));
    }
}
