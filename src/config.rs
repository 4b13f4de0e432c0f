//! Runtime settings loaded from the environment

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config_error;
use crate::error::Result;
use crate::types::{FetchConfig, ScoringConfig};

/// Default location of the append-only suggestion log
pub const DEFAULT_STORE_PATH: &str = "output/keywords.jsonl";

/// Default market data endpoint
pub const DEFAULT_MARKET_BASE_URL: &str = "http://apis.5118.com";

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub fetch: FetchConfig,
    pub scoring: ScoringConfig,
    pub store_path: PathBuf,
    pub market_api_key: Option<String>,
    pub market_base_url: String,
    /// Finished runs are dropped from the progress registry after this long
    pub session_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            scoring: ScoringConfig::default(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            market_api_key: None,
            market_base_url: DEFAULT_MARKET_BASE_URL.to_string(),
            session_ttl: Duration::from_secs(3600),
        }
    }
}

impl Settings {
    /// Build settings from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::default();

        if let Ok(url) = env::var("SUGGEST_URL") {
            settings.fetch.suggest_url = url;
        }
        if let Some(secs) = parse_var::<u64>("REQUEST_TIMEOUT_SECS")? {
            settings.fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<f64>("REQUEST_DELAY_MIN_SECS")? {
            settings.fetch.delay_min = secs_to_duration("REQUEST_DELAY_MIN_SECS", secs)?;
        }
        if let Some(secs) = parse_var::<f64>("REQUEST_DELAY_MAX_SECS")? {
            settings.fetch.delay_max = secs_to_duration("REQUEST_DELAY_MAX_SECS", secs)?;
        }
        if let Some(retries) = parse_var::<u32>("MAX_RETRIES")? {
            settings.fetch.max_retries = retries;
        }
        if let Some(concurrency) = parse_var::<usize>("FETCH_CONCURRENCY")? {
            settings.fetch.concurrency = concurrency;
        }
        if let Some(interval) = parse_var::<usize>("CHECKPOINT_INTERVAL")? {
            settings.fetch.checkpoint_interval = interval;
        }
        if let Ok(path) = env::var("STORE_PATH") {
            settings.store_path = PathBuf::from(path);
        }
        settings.market_api_key = env::var("MARKET_API_KEY").ok().filter(|k| !k.trim().is_empty());
        if let Ok(url) = env::var("MARKET_BASE_URL") {
            settings.market_base_url = url;
        }
        if let Ok(flag) = env::var("USE_MARKET_DATA") {
            settings.scoring.use_market_data = parse_bool("USE_MARKET_DATA", &flag)?;
        }
        if let Some(secs) = parse_var::<u64>("SESSION_TTL_SECS")? {
            settings.session_ttl = Duration::from_secs(secs);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations that would stall or panic at runtime
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_retries == 0 {
            return Err(config_error!("MAX_RETRIES must be at least 1"));
        }
        if self.fetch.concurrency == 0 {
            return Err(config_error!("FETCH_CONCURRENCY must be at least 1"));
        }
        if self.fetch.checkpoint_interval == 0 {
            return Err(config_error!("CHECKPOINT_INTERVAL must be at least 1"));
        }
        if self.fetch.delay_min > self.fetch.delay_max {
            return Err(config_error!(
                "REQUEST_DELAY_MIN_SECS ({:?}) is larger than REQUEST_DELAY_MAX_SECS ({:?})",
                self.fetch.delay_min,
                self.fetch.delay_max
            ));
        }
        Ok(())
    }

    /// Whether provider-backed scoring can be attempted at all
    pub fn market_data_enabled(&self) -> bool {
        self.scoring.use_market_data && self.market_api_key.is_some()
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| config_error!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(None),
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(config_error!("{} has an invalid value: {}", name, raw)),
    }
}

fn secs_to_duration(name: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(config_error!("{} must be a non-negative number", name));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.fetch.max_retries, 3);
        assert_eq!(settings.fetch.checkpoint_interval, 10);
        assert!(!settings.market_data_enabled());
    }

    #[test]
    fn test_inverted_delays_rejected() {
        let mut settings = Settings::default();
        settings.fetch.delay_min = Duration::from_secs(5);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "Yes").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
