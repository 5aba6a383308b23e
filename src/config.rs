use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_STORAGE_DIR: &str = "storage";
pub const DEFAULT_DAILY_ALLOWANCE: i64 = 10_000;

/// Runtime settings for the server and CLI.
///
/// Read from `MEALBOOK_*` environment variables; anything unset falls back
/// to the defaults above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub storage_dir: PathBuf,
    /// Folder inside the store that holds the semester folders.
    pub storage_prefix: String,
    pub holidays_file: Option<PathBuf>,
    pub daily_allowance: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            storage_prefix: String::new(),
            holidays_file: None,
            daily_allowance: DEFAULT_DAILY_ALLOWANCE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Build a config from `(key, value)` pairs. Blank values count as unset.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(k, v)| k.starts_with("MEALBOOK_") && !v.trim().is_empty())
            .collect();
        let mut config = AppConfig::default();

        if let Some(bind) = vars.get("MEALBOOK_BIND") {
            config.bind = bind.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "MEALBOOK_BIND",
                value: bind.clone(),
            })?;
        }
        if let Some(dir) = vars.get("MEALBOOK_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir.trim());
        }
        if let Some(prefix) = vars.get("MEALBOOK_STORAGE_PREFIX") {
            config.storage_prefix = prefix.trim().trim_matches('/').to_string();
        }
        if let Some(path) = vars.get("MEALBOOK_HOLIDAYS") {
            config.holidays_file = Some(PathBuf::from(path.trim()));
        }
        if let Some(amount) = vars.get("MEALBOOK_DAILY_ALLOWANCE") {
            config.daily_allowance = amount
                .trim()
                .parse()
                .ok()
                .filter(|a: &i64| *a >= 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "MEALBOOK_DAILY_ALLOWANCE",
                    value: amount.clone(),
                })?;
        }

        Ok(config)
    }
}
