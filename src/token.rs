use crate::{encoding::EString, numeric::NumericLiteral, pos::CodeRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub range: CodeRange,
}

impl Token {
    pub fn string_value(&self) -> Option<&EString> {
        match &self.value {
            TokenValue::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenValue {
    #[default]
    None,
    String(EString),
    Numeric(NumericLiteral),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `'`, `"`, `%q(`, `%Q(`, `%(`, `<<EOS`, namely `tSTRING_BEG`
    StringBegin,
    /// `` ` ``, `%x(`, ``<<`EOS` ``, namely `tXSTRING_BEG`
    XStringBegin,
    /// `/`, `%r(`, namely `tREGEXP_BEG`
    RegexpBegin,
    /// `%W(`, namely `tWORDS_BEG`
    WordsBegin,
    /// `%w(`, namely `tQWORDS_BEG`
    QWordsBegin,
    /// `%I(`, namely `tSYMBOLS_BEG`
    SymbolsBegin,
    /// `%i(`, namely `tQSYMBOLS_BEG`
    QSymbolsBegin,
    /// `:'`, `:"`, `%s(`, namely `tSYMBEG`
    SymbolBegin,
    /// A string literal scanned in one piece, namely `tSTRING`
    String,
    /// A symbol literal scanned in one piece, namely `tSYMBOL`
    Symbol,
    /// namely `tSTRING_CONTENT`
    StringContent,
    /// namely `tSTRING_END`
    StringEnd,
    /// `":` closing a quoted label, namely `tLABEL_END`
    StringEndColon,
    /// separator between elements of `%w` and friends, namely `tSPACE`
    Space,
    /// `#{`, namely `tSTRING_DBEG`
    StringDbeg,
    /// `}` closing an interpolation, namely `tSTRING_DEND`
    StringDend,
    /// `#` of `#@foo`, namely `tSTRING_DVAR`
    StringDvar,
    /// namely `tREGEXP_OPT`
    RegexpOptions,
    /// `@foo`, namely `tIVAR`
    Ivar,
    /// `@@foo`, namely `tCVAR`
    Cvar,
    /// `$foo`, namely `tGVAR`
    Gvar,
    /// `123`, namely `tINTEGER`
    Integer,
    /// `1.5`, namely `tFLOAT`
    Float,
    /// `3r`, namely `tRATIONAL`
    Rational,
    /// `2i`, namely `tIMAGINARY`
    Imaginary,

    // Emitted by the driver outside literals.
    Identifier,
    Constant,
    Label,
    Newline,
    Semicolon,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Operator,
}

impl TokenKind {
    pub fn is_literal_begin(&self) -> bool {
        matches!(
            self,
            TokenKind::StringBegin
                | TokenKind::XStringBegin
                | TokenKind::RegexpBegin
                | TokenKind::WordsBegin
                | TokenKind::QWordsBegin
                | TokenKind::SymbolsBegin
                | TokenKind::QSymbolsBegin
                | TokenKind::SymbolBegin
        )
    }
}

/// A `#` comment as handed over by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub range: CodeRange,
    pub text: EString,
}
