use dotenv::dotenv;
use log::{info, warn};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 400;
pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub environment: Environment,
    /// Backend origin. Empty means paths are used as given.
    pub api_url: String,
    pub debounce: Duration,
    pub page_size: u32,
    pub request_timeout: Duration,
    /// `Duration::ZERO` disables the response cache.
    pub cache_ttl: Duration,
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            api_url: String::new(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            token: None,
        }
    }
}

impl ClientConfig {
    /// Loads `.env` (or the file named by `ENV_FILE_PATH`) and then reads the
    /// `COURTSIDE_*` variables.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        match env::var("ENV_FILE_PATH") {
            Ok(path) if !path.is_empty() => {
                info!("Loading environment from ENV_FILE_PATH: {}", path);
                dotenv::from_filename(&path).ok();
            }
            _ => {
                dotenv().ok();
            }
        }

        let config = Self::from_lookup(|key| env::var(key).ok());
        config.validate()?;
        config.log_configuration();
        Ok(config)
    }

    /// Builds a configuration from any key lookup; unset or unparsable
    /// values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("RUST_ENV")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();

        Self {
            environment,
            api_url: lookup("COURTSIDE_API_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .unwrap_or_default(),
            debounce: Duration::from_millis(parse_or(
                &lookup,
                "COURTSIDE_DEBOUNCE_MS",
                DEFAULT_DEBOUNCE_MS,
            )),
            page_size: match parse_or(&lookup, "COURTSIDE_PAGE_SIZE", DEFAULT_PAGE_SIZE) {
                0 => {
                    warn!("COURTSIDE_PAGE_SIZE must be positive, using {}", DEFAULT_PAGE_SIZE);
                    DEFAULT_PAGE_SIZE
                }
                size => size,
            },
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "COURTSIDE_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "COURTSIDE_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )),
            token: lookup("COURTSIDE_TOKEN")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.api_url.is_empty()
            && !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://"))
        {
            return Err(format!("COURTSIDE_API_URL must be an http(s) URL, got {}", self.api_url).into());
        }
        if self.environment == Environment::Production && self.api_url.starts_with("http://") {
            return Err("Production COURTSIDE_API_URL must use https".into());
        }
        if self.request_timeout.is_zero() {
            return Err("COURTSIDE_REQUEST_TIMEOUT_SECS cannot be 0".into());
        }
        Ok(())
    }

    /// Absolute URL for a backend path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    pub fn cache_enabled(&self) -> bool {
        !self.cache_ttl.is_zero()
    }

    fn log_configuration(&self) {
        info!("Configuration loaded successfully");
        info!("Environment: {:?}", self.environment);
        info!(
            "API: {} (timeout {:?}, page size {})",
            if self.api_url.is_empty() { "<same origin>" } else { &self.api_url },
            self.request_timeout,
            self.page_size
        );
        info!(
            "Debounce: {:?}, cache TTL: {:?}",
            self.debounce, self.cache_ttl
        );
        if !self.cache_enabled() {
            warn!("Response cache disabled");
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value {:?} for {}, using default {}", raw, key, default);
            default
        }),
    }
}
