use std::collections::HashMap;

use url::Url;

pub const DEFAULT_DATABASE_NAME: &str = "Orleans";
pub const DEFAULT_URL: &str = "http://localhost:8529";
pub const DEFAULT_USERNAME: &str = "root";
pub const DEFAULT_PASSWORD: &str = "password";

/// Connection settings for an ArangoDB backed adapter.
///
/// Build one directly, or from the option map a runtime passes to a storage
/// provider with [`StorageConfig::from_properties`].
#[derive(Clone)]
pub struct StorageConfig {
    /// The database holding one collection per actor type
    pub database_name: String,
    /// Base URL of the server (e.g. "http://localhost:8529")
    pub url: Url,
    pub username: String,
    pub password: String,
    /// Whether the server should sync to disk before acknowledging collection
    /// creation and document writes
    pub wait_for_sync: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid Url {value:?}: {reason}")]
    InvalidUrl { value: String, reason: String },
    #[error("invalid boolean {value:?} for {option}")]
    InvalidBool { option: &'static str, value: String },
    #[error("DatabaseName must not be empty")]
    EmptyDatabaseName,
}

impl StorageConfig {
    /// Read the provider options `DatabaseName`, `Url`, `Username`,
    /// `Password` and `WaitForSync`, falling back to the defaults for any that
    /// are missing. Other options are ignored.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(name) = properties.get("DatabaseName") {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyDatabaseName);
            }
            config.database_name = name.clone();
        }
        if let Some(url) = properties.get("Url") {
            config.url = parse_url(url)?;
        }
        if let Some(username) = properties.get("Username") {
            config.username = username.clone();
        }
        if let Some(password) = properties.get("Password") {
            config.password = password.clone();
        }
        if let Some(wait_for_sync) = properties.get("WaitForSync") {
            config.wait_for_sync = parse_bool("WaitForSync", wait_for_sync)?;
        }
        Ok(config)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            url: Url::parse(DEFAULT_URL).expect("default url is valid"),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            wait_for_sync: true,
        }
    }
}

// Keep the password out of logs
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("database_name", &self.database_name)
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("wait_for_sync", &self.wait_for_sync)
            .finish_non_exhaustive()
    }
}

fn parse_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl {
            value: value.to_string(),
            reason: "not a base URL".to_string(),
        });
    }
    Ok(url)
}

fn parse_bool(option: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            option,
            value: value.to_string(),
        }),
    }
}
