use snapsql_core::Position;

/// An error raised while tokenizing a template.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TokenizeError {
    /// A `'...'` string literal was never closed.
    #[error("unterminated string literal starting at {start}")]
    UnterminatedString {
        /// Where the opening quote was found.
        start: Position,
    },
    /// A `/* ... */` (ordinary or annotation) comment was never closed.
    #[error("unterminated comment starting at {start}")]
    UnterminatedComment {
        /// Where the opening `/*` was found.
        start: Position,
    },
    /// A `/*= ... */`, `/*# ... */`, or `/*@ ... */` annotation was malformed,
    /// e.g. missing its sigil character or containing no body.
    #[error("invalid annotation form at {at}: {reason}")]
    InvalidAnnotation {
        /// Where the annotation starts.
        at: Position,
        /// Why it was rejected.
        reason: String,
    },
}

impl TokenizeError {
    /// The position this error occurred at, for diagnostic rendering.
    pub fn position(&self) -> Position {
        match self {
            Self::UnterminatedString { start } => *start,
            Self::UnterminatedComment { start } => *start,
            Self::InvalidAnnotation { at, .. } => *at,
        }
    }
}
