use std::fmt;

/// Ruby syntax version the source is scanned for.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyntaxVersion {
    pub major: u8,
    pub minor: u8,
}

impl SyntaxVersion {
    pub const RUBY_18: SyntaxVersion = SyntaxVersion::new(1, 8);
    pub const RUBY_19: SyntaxVersion = SyntaxVersion::new(1, 9);
    pub const RUBY_20: SyntaxVersion = SyntaxVersion::new(2, 0);
    pub const RUBY_21: SyntaxVersion = SyntaxVersion::new(2, 1);
    pub const RUBY_22: SyntaxVersion = SyntaxVersion::new(2, 2);
    pub const RUBY_23: SyntaxVersion = SyntaxVersion::new(2, 3);
    pub const RUBY_33: SyntaxVersion = SyntaxVersion::new(3, 3);

    pub const fn new(major: u8, minor: u8) -> Self {
        SyntaxVersion { major, minor }
    }

    /// `\u` escapes
    pub fn has_unicode_escapes(&self) -> bool {
        *self >= Self::RUBY_19
    }

    /// `%i[]` and `%I[]`
    pub fn has_symbol_arrays(&self) -> bool {
        *self >= Self::RUBY_20
    }

    /// `r` and `i` numeric suffixes
    pub fn has_numeric_suffixes(&self) -> bool {
        *self >= Self::RUBY_21
    }

    /// `"label": value`
    pub fn has_quoted_labels(&self) -> bool {
        *self >= Self::RUBY_22
    }

    /// `<<~EOS`
    pub fn has_squiggly_heredoc(&self) -> bool {
        *self >= Self::RUBY_23
    }
}

impl Default for SyntaxVersion {
    fn default() -> Self {
        Self::RUBY_33
    }
}

impl fmt::Debug for SyntaxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ruby {}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexerConfig {
    pub version: SyntaxVersion,
    /// Diagnose unknown escapes and `\8`/`\9` instead of passing them through.
    pub strict_escapes: bool,
    pub all_errors_are_fatal: bool,
    pub ignore_warnings: bool,
}

impl LexerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: SyntaxVersion) -> Self {
        self.version = version;
        self
    }

    pub fn strict_escapes(mut self, strict: bool) -> Self {
        self.strict_escapes = strict;
        self
    }

    pub fn all_errors_are_fatal(mut self, fatal: bool) -> Self {
        self.all_errors_are_fatal = fatal;
        self
    }

    pub fn ignore_warnings(mut self, ignore: bool) -> Self {
        self.ignore_warnings = ignore;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_gates() {
        assert!(!SyntaxVersion::RUBY_18.has_unicode_escapes());
        assert!(SyntaxVersion::RUBY_19.has_unicode_escapes());
        assert!(!SyntaxVersion::RUBY_22.has_squiggly_heredoc());
        assert!(SyntaxVersion::default().has_squiggly_heredoc());
    }

    #[test]
    fn test_builder() {
        let config = LexerConfig::new()
            .version(SyntaxVersion::RUBY_21)
            .strict_escapes(true);
        assert_eq!(config.version, SyntaxVersion::RUBY_21);
        assert!(config.strict_escapes);
        assert!(!config.all_errors_are_fatal);
    }
}
