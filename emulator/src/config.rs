//! Configuration management for the emulator.

use crate::delay::DelayProfile;
use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;

/// Environment variable holding the delay profile.
pub const DELAY_VAR: &str = "MOCKBASE_DELAY";
/// Environment variable pointing at a JSON seed document.
pub const SEED_VAR: &str = "MOCKBASE_SEED";

/// Emulator configuration loaded from environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Latency applied to every public call
    pub delay: DelayProfile,
    /// JSON document loaded into the tree at startup
    pub seed_path: Option<PathBuf>,
}

impl Config {
    /// Load `.env` if present, then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let delay = match lookup(DELAY_VAR) {
            Some(raw) => raw.parse()?,
            None => DelayProfile::default(),
        };

        let seed_path = lookup(SEED_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self { delay, seed_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::NetworkProfile;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.delay, DelayProfile::Fixed(5));
        assert_eq!(config.seed_path, None);
    }

    #[test]
    fn reads_variables() {
        let config = Config::from_lookup(lookup(&[
            (DELAY_VAR, "wifi"),
            (SEED_VAR, "fixtures/seed.json"),
        ]))
        .unwrap();
        assert_eq!(config.delay, DelayProfile::Named(NetworkProfile::Wifi));
        assert_eq!(config.seed_path, Some(PathBuf::from("fixtures/seed.json")));
    }

    #[test]
    fn rejects_bad_delay() {
        let err = Config::from_lookup(lookup(&[(DELAY_VAR, "dial-up")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownDelayProfile("dial-up".into()));
    }
}
