use std::fmt;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{Error, Result};

pub const API_KEY_VAR: &str = "TRANSPORT_API_KEY";
pub const MONGO_URL_VAR: &str = "MONGO_DB_URL";

/// Raw settings as read from the environment and `vehiclepos.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Transport for NSW open data API key
    pub transport_api_key: Option<String>,

    /// MongoDB connection string (`mongodb://` or `mongodb+srv://`)
    pub mongo_db_url: Option<String>,

    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    #[serde(default = "default_mongo_database")]
    pub mongo_database: String,

    #[serde(default = "default_mongo_collection")]
    pub mongo_collection: String,

    /// Upper bound on the whole connect handshake, in seconds
    #[serde(default = "default_mongo_connect_timeout_secs")]
    pub mongo_connect_timeout_secs: u64,

    /// Write absent optional fields as `null` instead of leaving them out
    #[serde(default)]
    pub store_missing_as_null: bool,
}

fn default_feed_url() -> String {
    "https://api.transport.nsw.gov.au/v1/gtfs/vehiclepos/sydneytrains".to_string()
}

fn default_mongo_database() -> String {
    "sydneytrains".to_string()
}

fn default_mongo_collection() -> String {
    "vehiclepos".to_string()
}

fn default_mongo_connect_timeout_secs() -> u64 {
    10
}

impl Settings {
    /// Read settings from `vehiclepos.toml` (if present) and the process
    /// environment, the environment winning.
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::new("vehiclepos.toml", FileFormat::Toml).required(false))
            .add_source(Environment::default())
            .build()?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        Ok(config.try_deserialize()?)
    }

    /// Check every required value before any I/O happens.
    pub fn validate(self) -> Result<AppConfig> {
        let api_key = required(self.transport_api_key, API_KEY_VAR)?;
        let mongo_url = required(self.mongo_db_url, MONGO_URL_VAR)?;

        Ok(AppConfig {
            api_key,
            mongo_url,
            feed_url: self.feed_url,
            database: self.mongo_database,
            collection: self.mongo_collection,
            connect_timeout: Duration::from_secs(self.mongo_connect_timeout_secs),
            missing_as_null: self.store_missing_as_null,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::MissingConfig(name)),
    }
}

/// Validated configuration handed to the fetcher and the writer.
#[derive(Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub mongo_url: String,
    pub feed_url: String,
    pub database: String,
    pub collection: String,
    pub connect_timeout: Duration,
    pub missing_as_null: bool,
}

impl AppConfig {
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

// Both secrets stay out of log output.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("mongo_url", &"<redacted>")
            .field("feed_url", &self.feed_url)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("connect_timeout", &self.connect_timeout)
            .field("missing_as_null", &self.missing_as_null)
            .finish()
    }
}
