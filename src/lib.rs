//! Literal scanning core of a Ruby lexer: strings, symbols, regexps, word
//! lists, heredocs and numeric literals.
//!
//! A driver owns the cursor and the code-level lexing; it hands literal
//! boundaries to [`ScannerState`], which emits the resulting [`Token`]s,
//! [`Comment`]s and [`Diagnostic`]s.

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod encoding;
pub mod error;
pub mod escape;
pub mod literal;
pub mod numeric;
pub mod pos;
pub mod scanner;
pub mod stack;
pub mod token;

pub use config::{LexerConfig, SyntaxVersion};
pub use context::{ContextStack, NumparamStack};
pub use diagnostic::{Diagnostic, DiagnosticKind, Level};
pub use encoding::{EStrRef, EString, Encoding};
pub use error::LexError;
pub use literal::{Literal, LiteralKind, LiteralState};
pub use numeric::{Decimal, NumericLiteral, NumericToken, NumericValue};
pub use pos::CodeRange;
pub use scanner::{HeredocLine, Interpolation, LiteralOptions, ScannerState, TryClose};
pub use stack::Stack;
pub use token::{Comment, Token, TokenKind, TokenValue};
