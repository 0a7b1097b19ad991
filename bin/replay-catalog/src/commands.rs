//! Subcommands of the `replay-catalog` binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rc_core::error::CatalogError;
use rc_core::traits::CatalogRepo;

use crate::settings::Settings;
use crate::snapshot::{self, Catalog, Snapshot};

#[derive(Debug, Parser)]
#[command(name = "replay-catalog", version, about = "Catalog of broadcaster replay videos")]
pub struct Cli {
    /// Overrides CATALOG_DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the catalog tables
    Init,
    /// Load a JSON snapshot written by the scraper
    Import {
        path: PathBuf,
        /// Skip records rejected by a uniqueness constraint instead of aborting
        #[arg(long)]
        skip_existing: bool,
    },
    /// List themes
    Themes,
    /// Print themes, categories, emissions, videos and streams
    Tree,
    /// Show the stream that would be downloaded for a video
    Best { vid: i64 },
    /// Download the best stream of a video
    Fetch { vid: i64 },
}

pub async fn run<R>(command: Command, settings: &Settings, repo: &R) -> anyhow::Result<()>
where
    R: CatalogRepo + ?Sized,
{
    match command {
        Command::Init => {
            repo.init_schema().await?;
            log::info!("catalog ready at {}", settings.database_url);
        }
        Command::Import { path, skip_existing } => {
            let catalog = Catalog::try_from(Snapshot::from_path(&path)?)
                .with_context(|| format!("invalid record in {}", path.display()))?;
            let report = snapshot::import(repo, catalog, skip_existing).await?;
            println!("{} inserted, {} skipped", report.inserted, report.skipped);
        }
        Command::Themes => {
            for theme in repo.list_themes().await? {
                println!("{}\t{}\t{}", theme.tid(), theme.text(), theme.url());
            }
        }
        Command::Tree => print_tree(repo).await?,
        Command::Best { vid } => {
            let video = repo
                .get_video(vid)
                .await?
                .ok_or_else(|| CatalogError::not_found("Video", vid))?;
            match repo.best_stream(&video).await? {
                Some(stream) => println!("{}\t{}", stream.quality(), stream.url()),
                None => println!("{video} has no stream"),
            }
        }
        Command::Fetch { vid } => fetch(settings, repo, vid).await?,
    }
    Ok(())
}

async fn print_tree<R>(repo: &R) -> anyhow::Result<()>
where
    R: CatalogRepo + ?Sized,
{
    for theme in repo.list_themes().await? {
        println!("{theme}");
        for category in repo.categories_of_theme(theme.tid()).await? {
            println!("  {category}");
            for emission in repo.emissions_of_category(category.text()).await? {
                println!("    {emission}");
                for video in repo.videos_of_emission(emission.pid()).await? {
                    println!("      {video}");
                    for stream in repo.streams_of_video(video.vid()).await? {
                        println!("        {stream}");
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(feature = "fetch-rtmpdump")]
async fn fetch<R>(settings: &Settings, repo: &R, vid: i64) -> anyhow::Result<()>
where
    R: CatalogRepo + ?Sized,
{
    use rc_fetch_rtmpdump::RtmpdumpFetcher;
    use std::time::Duration;

    let mut fetcher = RtmpdumpFetcher::new(&settings.downloader, &settings.output_dir)
        .with_args(&settings.downloader_args);
    if let Some(secs) = settings.fetch_timeout_secs {
        fetcher = fetcher.with_timeout(Duration::from_secs(secs));
    }

    match rc_core::services::fetch_best_stream(repo, &fetcher, vid).await? {
        Some(outcome) if outcome.success => {
            println!("{}", outcome.destination.display());
        }
        Some(outcome) => {
            anyhow::bail!(
                "downloader failed on {} (exit code {:?})",
                outcome.source_url,
                outcome.exit_code
            );
        }
        None => log::info!("video {} has no stream to fetch", vid),
    }
    Ok(())
}

#[cfg(not(feature = "fetch-rtmpdump"))]
async fn fetch<R>(_settings: &Settings, _repo: &R, _vid: i64) -> anyhow::Result<()>
where
    R: CatalogRepo + ?Sized,
{
    anyhow::bail!("built without a fetch plugin: enable the `fetch-rtmpdump` feature")
}
