//! Unified error handling for the emulator.

use mockbase_engine::EventType;

/// Emulator error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Engine error: {0}")]
    Engine(#[from] mockbase_engine::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("once() does not support '{0}' events")]
    UnsupportedEvent(EventType),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown delay profile '{0}'")]
    UnknownDelayProfile(String),

    #[error("invalid delay range: min {min} ms exceeds max {max} ms")]
    InvalidDelayRange { min: u64, max: u64 },

    #[error("invalid delay value: {0}")]
    InvalidDelay(String),
}

/// Result type alias for emulator calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::from(ConfigError::UnknownDelayProfile("3g".into()));
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown delay profile '3g'"
        );

        let err = ConfigError::InvalidDelayRange { min: 50, max: 10 };
        assert_eq!(
            err.to_string(),
            "invalid delay range: min 50 ms exceeds max 10 ms"
        );

        let err = Error::UnsupportedEvent(EventType::ChildAdded);
        assert_eq!(err.to_string(), "once() does not support 'child_added' events");

        let err = Error::from(mockbase_engine::Error::AmbiguousEqualTo);
        assert!(err.to_string().starts_with("Engine error: "));
    }
}
