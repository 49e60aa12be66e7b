use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use validator::Validate;

use crate::core::SelectorRules;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    #[validate(nested)]
    pub fetcher: FetcherSettings,
    #[validate(nested)]
    pub analysis: AnalysisSettings,
    pub selectors: SelectorRules,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub base_url: String,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://swgoh.gg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct FetcherSettings {
    /// Rendering service endpoint; plain HTTP fetches when unset
    pub render_endpoint: Option<String>,
    pub wait_until: String,
    /// Extra wait after the page settles, before the HTML is captured
    #[validate(range(min = 0.0, max = 60.0))]
    pub settle_delay_secs: f64,
    /// No timeout when unset
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            render_endpoint: None,
            wait_until: "networkidle".to_string(),
            settle_delay_secs: 2.0,
            timeout_secs: None,
            user_agent: concat!("gac-scout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// What to do when a single match page cannot be fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFailurePolicy {
    /// Treat the page as empty and carry on
    #[default]
    BestEffort,
    /// End the stream with an error
    FailFast,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct AnalysisSettings {
    /// At most 80, so every match still advances the progress bar
    #[validate(range(min = 1, max = 80))]
    pub max_matches: usize,
    #[validate(range(min = 1))]
    pub top_limit: usize,
    pub match_failure_policy: MatchFailurePolicy,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_matches: default_max_matches(),
            top_limit: default_top_limit(),
            match_failure_policy: MatchFailurePolicy::default(),
        }
    }
}

fn default_max_matches() -> usize { 6 }
fn default_top_limit() -> usize { 10 }

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with GACSCOUT__)
    /// 5. `PORT`, as assigned by hosting platforms
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., GACSCOUT__ANALYSIS__MAX_MATCHES -> analysis.max_matches
            .add_source(env_source())
            .build()?;

        let settings = apply_port_override(settings, std::env::var("PORT").ok())?;

        Self::finish(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        Self::finish(settings)
    }

    fn finish(settings: Config) -> Result<Self, ConfigError> {
        let settings: Settings = settings.try_deserialize()?;
        settings
            .validate()
            .map_err(|e| ConfigError::Message(format!("Invalid configuration: {}", e)))?;
        Ok(settings)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("GACSCOUT")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// The bare `PORT` variable wins over every other port source
fn apply_port_override(settings: Config, port: Option<String>) -> Result<Config, ConfigError> {
    match port.filter(|p| !p.trim().is_empty()) {
        Some(port) => {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Message(format!("PORT must be a valid port number, got {:?}", port)))?;
            Config::builder()
                .add_source(settings)
                .set_override("server.port", i64::from(port))?
                .build()
        }
        None => Ok(settings),
    }
}
