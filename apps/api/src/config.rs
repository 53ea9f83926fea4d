use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; a malformed value fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Directory holding `general.json` and `research.json`. Bundled fixtures when unset.
    pub profile_fixture_dir: Option<PathBuf>,
    pub analysis_delay_ms: u64,
    pub analysis_max_attempts: u32,
    pub max_retained_artifacts: usize,
    pub max_retained_sessions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            profile_fixture_dir: None,
            analysis_delay_ms: 2000,
            analysis_max_attempts: 3,
            max_retained_artifacts: 256,
            max_retained_sessions: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let config = Config {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
            profile_fixture_dir: lookup("PROFILE_FIXTURE_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            analysis_delay_ms: parse_or(&lookup, "ANALYSIS_DELAY_MS", defaults.analysis_delay_ms)?,
            analysis_max_attempts: parse_or(
                &lookup,
                "ANALYSIS_MAX_ATTEMPTS",
                defaults.analysis_max_attempts,
            )?,
            max_retained_artifacts: parse_or(
                &lookup,
                "MAX_RETAINED_ARTIFACTS",
                defaults.max_retained_artifacts,
            )?,
            max_retained_sessions: parse_or(
                &lookup,
                "MAX_RETAINED_SESSIONS",
                defaults.max_retained_sessions,
            )?,
        };

        if config.analysis_max_attempts == 0 {
            anyhow::bail!("ANALYSIS_MAX_ATTEMPTS must be at least 1");
        }
        if config.max_retained_artifacts == 0 {
            anyhow::bail!("MAX_RETAINED_ARTIFACTS must be at least 1");
        }
        if config.max_retained_sessions == 0 {
            anyhow::bail!("MAX_RETAINED_SESSIONS must be at least 1");
        }
        Ok(config)
    }

    pub fn analysis_delay(&self) -> Duration {
        Duration::from_millis(self.analysis_delay_ms)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
