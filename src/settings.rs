//! Engine settings from environment. Call `dotenvy::dotenv().ok()` first to pick up a `.env` file.

use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_CACHE_CAPACITY: usize = 500;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_EAGER_DEPTH: usize = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub default_language: String,
    pub max_depth: usize,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub max_eager_depth: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            default_language: DEFAULT_LANGUAGE.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
            max_eager_depth: DEFAULT_MAX_EAGER_DEPTH,
        }
    }
}

impl EngineSettings {
    /// Reads `RELGRAPH_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = EngineSettings::default();
        Ok(EngineSettings {
            default_language: lookup("RELGRAPH_DEFAULT_LANGUAGE")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.default_language),
            max_depth: parse_var(&lookup, "RELGRAPH_MAX_DEPTH")?.unwrap_or(defaults.max_depth),
            cache_capacity: parse_var(&lookup, "RELGRAPH_CACHE_CAPACITY")?
                .unwrap_or(defaults.cache_capacity),
            cache_ttl: parse_var::<u64>(&lookup, "RELGRAPH_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            max_eager_depth: parse_var(&lookup, "RELGRAPH_MAX_EAGER_DEPTH")?
                .unwrap_or(defaults.max_eager_depth),
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Validation(format!("{} must be a number, got '{}'", key, raw))),
    }
}
