//! Delay simulator.
//!
//! Every public call resolves after an artificial latency drawn from the
//! active [`DelayProfile`]. The work itself happens before the wait; only
//! the caller's view of completion is delayed.

use crate::error::ConfigError;
use futures::future::BoxFuture;
use futures::FutureExt;
use rand::Rng;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default latency in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 5;

/// Named network conditions, each a randomized latency range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkProfile {
    Random,
    WeakMobile,
    Mobile,
    Wifi,
}

impl NetworkProfile {
    /// Inclusive latency bounds in milliseconds.
    pub fn range(&self) -> (u64, u64) {
        match self {
            NetworkProfile::Random => (10, 1000),
            NetworkProfile::WeakMobile => (400, 1000),
            NetworkProfile::Mobile => (300, 500),
            NetworkProfile::Wifi => (10, 100),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkProfile::Random => "random",
            NetworkProfile::WeakMobile => "weak-mobile",
            NetworkProfile::Mobile => "mobile",
            NetworkProfile::Wifi => "WIFI",
        }
    }
}

impl FromStr for NetworkProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "random" => Ok(NetworkProfile::Random),
            "weak-mobile" | "weakmobile" => Ok(NetworkProfile::WeakMobile),
            "mobile" => Ok(NetworkProfile::Mobile),
            "wifi" => Ok(NetworkProfile::Wifi),
            _ => Err(ConfigError::UnknownDelayProfile(s.to_string())),
        }
    }
}

/// How long each call waits before resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayProfile {
    /// Always the same number of milliseconds
    Fixed(u64),
    /// Uniformly random within `min..=max` milliseconds
    Range { min: u64, max: u64 },
    Named(NetworkProfile),
}

impl Default for DelayProfile {
    fn default() -> Self {
        DelayProfile::Fixed(DEFAULT_DELAY_MS)
    }
}

impl DelayProfile {
    /// Build a range profile, rejecting `min > max`.
    pub fn range(min: u64, max: u64) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidDelayRange { min, max });
        }
        Ok(DelayProfile::Range { min, max })
    }

    /// Inclusive latency bounds in milliseconds.
    pub fn bounds(&self) -> (u64, u64) {
        match self {
            DelayProfile::Fixed(ms) => (*ms, *ms),
            DelayProfile::Range { min, max } => (*min, *max),
            DelayProfile::Named(profile) => profile.range(),
        }
    }
}

impl fmt::Display for DelayProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayProfile::Fixed(ms) => write!(f, "{}ms", ms),
            DelayProfile::Range { min, max } => write!(f, "{}..{}ms", min, max),
            DelayProfile::Named(profile) => f.write_str(profile.as_str()),
        }
    }
}

fn parse_ms(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidDelay(raw.to_string()))
}

fn json_ms(value: &Value) -> Result<u64, ConfigError> {
    value
        .as_u64()
        .ok_or_else(|| ConfigError::InvalidDelay(value.to_string()))
}

/// Accepts `"250"`, `"10..100"`, `"10-100"` or a profile name.
impl FromStr for DelayProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::InvalidDelay(s.to_string()));
        }
        if let Ok(profile) = s.parse::<NetworkProfile>() {
            return Ok(DelayProfile::Named(profile));
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return Ok(DelayProfile::Fixed(parse_ms(s)?));
        }

        let bounds = s.split_once("..").or_else(|| s.split_once('-'));
        match bounds {
            Some((min, max)) if min.trim().starts_with(|c: char| c.is_ascii_digit()) => {
                DelayProfile::range(parse_ms(min)?, parse_ms(max)?)
            }
            _ => Err(ConfigError::UnknownDelayProfile(s.to_string())),
        }
    }
}

/// Accepts a number, `[min, max]`, `{"min": .., "max": ..}` or a string.
impl TryFrom<&Value> for DelayProfile {
    type Error = ConfigError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(_) => Ok(DelayProfile::Fixed(json_ms(value)?)),
            Value::String(s) => s.parse(),
            Value::Array(items) => match items.as_slice() {
                [min, max] => DelayProfile::range(json_ms(min)?, json_ms(max)?),
                _ => Err(ConfigError::InvalidDelay(value.to_string())),
            },
            Value::Object(map) => match (map.get("min"), map.get("max")) {
                (Some(min), Some(max)) => DelayProfile::range(json_ms(min)?, json_ms(max)?),
                _ => Err(ConfigError::InvalidDelay(value.to_string())),
            },
            _ => Err(ConfigError::UnknownDelayProfile(value.to_string())),
        }
    }
}

/// Samples latencies from a profile.
#[derive(Debug, Clone, Default)]
pub struct Delay {
    profile: DelayProfile,
}

impl Delay {
    pub fn new(profile: DelayProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> DelayProfile {
        self.profile
    }

    pub fn set_profile(&mut self, profile: DelayProfile) {
        tracing::debug!(profile = %profile, "delay profile changed");
        self.profile = profile;
    }

    /// Draw the latency for the next call.
    pub fn next(&self) -> Duration {
        let (min, max) = self.profile.bounds();
        let ms = if min == max {
            min
        } else {
            rand::thread_rng().gen_range(min..=max)
        };
        Duration::from_millis(ms)
    }
}

/// A future that yields `value` once `duration` has elapsed.
pub fn delayed<T: Send + 'static>(value: T, duration: Duration) -> BoxFuture<'static, T> {
    async move {
        tokio::time::sleep(duration).await;
        value
    }
    .boxed()
}
