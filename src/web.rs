#![cfg(not(tarpaulin_include))]

use mealbook::app;
use mealbook::config::AppConfig;
use std::env;

/// Main entry point for the meal book server
///
/// Settings come from the `MEALBOOK_*` environment variables. Two optional
/// positional arguments override the bind address and the storage directory.
///
/// # Arguments
/// * `[bind]` - Address to listen on, e.g. `0.0.0.0:3000`
/// * `[storage_dir]` - Directory holding the semester folders
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = AppConfig::from_env()?;

    if let Some(bind) = args.get(1) {
        config.bind = bind.parse()?;
    }
    if let Some(dir) = args.get(2) {
        config.storage_dir = dir.into();
    }

    app::run(config).await
}
