use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Runtime configuration for the payments core. Every knob can come from the
/// environment (or a `.env` file) so deployments never need code changes.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Number of user ids packed into one cache-invalidation task
    #[arg(long, env, default_value_t = 500)]
    pub invalidation_chunk_size: usize,

    /// Lower bound in seconds for the randomized invalidation delay
    #[arg(long, env, default_value_t = 1)]
    pub invalidation_jitter_min_secs: u64,

    /// Upper bound in seconds for the randomized invalidation delay
    #[arg(long, env, default_value_t = 10)]
    pub invalidation_jitter_max_secs: u64,

    /// Number of recipients packed into one notification batch
    #[arg(long, env, default_value_t = 500)]
    pub notification_chunk_size: usize,

    /// Pause in milliseconds between consecutive notification batches,
    /// to respect downstream delivery rate limits
    #[arg(long, env, default_value_t = 250)]
    pub notification_batch_pause_ms: u64,

    /// Key prefix for per-user payment-summary cache entries
    #[arg(long, env, default_value = "payment_summary")]
    pub cache_key_prefix: String,

    /// TTL in seconds for cached payment summaries. This is the self-healing
    /// backstop for a dropped invalidation task.
    #[arg(long, env, default_value_t = 900)]
    pub cache_ttl_secs: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// The randomized-delay window for invalidation chunks.
    pub fn invalidation_jitter_window(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.invalidation_jitter_min_secs),
            Duration::from_secs(self.invalidation_jitter_max_secs),
        )
    }

    pub fn notification_batch_pause(&self) -> Duration {
        Duration::from_millis(self.notification_batch_pause_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_empty() -> Config {
        // Parse with no CLI arguments so only the defaults apply
        Config::try_parse_from(["pagos_platform_rs"]).unwrap()
    }

    #[test]
    fn test_reference_chunk_size_is_500() {
        let config = parse_empty();
        assert_eq!(config.invalidation_chunk_size, 500);
        assert_eq!(config.notification_chunk_size, 500);
    }

    #[test]
    fn test_reference_jitter_window_is_1_to_10_seconds() {
        let config = parse_empty();
        let (min, max) = config.invalidation_jitter_window();
        assert_eq!(min, Duration::from_secs(1));
        assert_eq!(max, Duration::from_secs(10));
    }

    #[test]
    fn test_cache_defaults() {
        let config = parse_empty();
        assert_eq!(config.cache_key_prefix, "payment_summary");
        assert_eq!(config.cache_ttl(), Duration::from_secs(900));
    }

    #[test]
    fn test_chunk_size_override_from_args() {
        let config =
            Config::try_parse_from(["pagos_platform_rs", "--invalidation-chunk-size", "100"])
                .unwrap();
        assert_eq!(config.invalidation_chunk_size, 100);
    }
}
