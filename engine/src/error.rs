//! Error types for the Mockbase engine.

use thiserror::Error;

/// All possible errors from the Mockbase engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Path errors
    #[error("invalid path '{path}': segment '{segment}' contains a reserved character")]
    InvalidPath { path: String, segment: String },

    #[error("the root can only hold an object or null")]
    NonObjectRoot,

    // Query building errors
    #[error("equalTo cannot take a key argument when ordering by key")]
    AmbiguousEqualTo,

    #[error("unknown event type: {0}")]
    InvalidEventType(String),

    // State errors
    #[error("invalid seed document: {0}")]
    InvalidSeed(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::InvalidPath {
            path: "users/a#b".into(),
            segment: "a#b".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid path 'users/a#b': segment 'a#b' contains a reserved character"
        );

        let err = Error::NonObjectRoot;
        assert_eq!(err.to_string(), "the root can only hold an object or null");

        let err = Error::AmbiguousEqualTo;
        assert_eq!(
            err.to_string(),
            "equalTo cannot take a key argument when ordering by key"
        );

        let err = Error::InvalidEventType("child_exploded".into());
        assert_eq!(err.to_string(), "unknown event type: child_exploded");

        let err = Error::InvalidSeed("expected an object".into());
        assert_eq!(err.to_string(), "invalid seed document: expected an object");
    }
}
