use crate::diagnostic::Diagnostic;

/// Reason the scanner has to stop.
///
/// Recoverable problems never show up here; they are recorded as
/// [`Diagnostic`]s and scanning goes on with a substitute value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("{0}")]
    Fatal(Box<Diagnostic>),
    /// The driver called an operation that does not apply to the current
    /// literal state.
    #[error("scanner protocol violation: {0}")]
    Protocol(&'static str),
}

impl LexError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            LexError::Fatal(diag) => Some(diag),
            LexError::Protocol(_) => None,
        }
    }
}
