//! # replay-catalog Binary
//!
//! The entry point that assembles the catalog based on compile-time features.

mod commands;
mod settings;
mod snapshot;

use anyhow::Context;
use clap::Parser;

use commands::Cli;
use settings::Settings;

// Feature-gated imports
#[cfg(feature = "db-sqlite")]
use rc_db_sqlite::SqliteCatalogRepo;

#[cfg(not(feature = "db-sqlite"))]
compile_error!("replay-catalog needs a catalog store: enable the `db-sqlite` feature");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let mut settings = Settings::load().context("failed to load settings")?;
    if let Some(url) = cli.database_url {
        settings.database_url = url;
    }

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteCatalogRepo::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open {}", settings.database_url))?;

    log::debug!("using {:?}", settings);

    commands::run(cli.command, &settings, &repo).await
}
