//! Runtime settings: defaults, then an optional `replay-catalog.toml`, then
//! `CATALOG_*` environment variables (a `.env` file is loaded first by `main`).

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use rc_core::fetch::OUTPUT_DIR;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// e.g. "sqlite:catalog.db"
    pub database_url: String,
    pub output_dir: PathBuf,
    /// Downloader executable, looked up in PATH
    pub downloader: String,
    /// Extra downloader arguments, space separated in the environment
    pub downloader_args: Vec<String>,
    pub fetch_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(Environment::with_prefix("CATALOG"))
    }

    fn build(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("database_url", "sqlite:catalog.db")?
            .set_default("output_dir", OUTPUT_DIR)?
            .set_default("downloader", "rtmpdump")?
            .set_default("downloader_args", Vec::<String>::new())?
            .add_source(File::with_name("replay-catalog").required(false))
            .add_source(
                env.try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("downloader_args"),
            )
            .build()?
            .try_deserialize()
    }
}
