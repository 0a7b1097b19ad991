//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::fetch::FetchOutcome;
use crate::models::{Category, Emission, Stream, Theme, Video};
use crate::selection;

/// Persistence contract for the catalog hierarchy.
///
/// Inserts fail with `CatalogError::ConstraintViolation` when a unique or
/// foreign-key constraint rejects the row; the error is never retried.
/// Collections come back in no guaranteed order.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// Creates the tables if they do not exist yet.
    async fn init_schema(&self) -> Result<()>;

    // Insert Operations
    async fn insert_theme(&self, theme: &Theme) -> Result<()>;
    async fn insert_category(&self, category: &Category) -> Result<()>;
    async fn insert_emission(&self, emission: &Emission) -> Result<()>;
    async fn insert_video(&self, video: &Video) -> Result<()>;
    async fn insert_stream(&self, stream: &Stream) -> Result<()>;

    /// Stores a video and all its streams, or nothing at all.
    async fn insert_video_with_streams(&self, video: &Video, streams: &[Stream]) -> Result<()>;

    // Lookups
    async fn get_theme(&self, tid: i64) -> Result<Option<Theme>>;
    async fn get_category(&self, text: &str) -> Result<Option<Category>>;
    async fn get_emission(&self, pid: i64) -> Result<Option<Emission>>;
    async fn get_video(&self, vid: i64) -> Result<Option<Video>>;
    async fn get_stream(&self, vid: i64, quality: &str) -> Result<Option<Stream>>;

    // Parent -> children
    async fn list_themes(&self) -> Result<Vec<Theme>>;
    async fn categories_of_theme(&self, tid: i64) -> Result<Vec<Category>>;
    async fn emissions_of_category(&self, cid: &str) -> Result<Vec<Emission>>;
    async fn videos_of_emission(&self, pid: i64) -> Result<Vec<Video>>;
    async fn streams_of_video(&self, vid: i64) -> Result<Vec<Stream>>;

    /// Removes a theme and everything below it. Returns whether it existed.
    async fn delete_theme(&self, tid: i64) -> Result<bool>;

    /// Loads the streams of `video` and applies [`selection::best_stream`].
    async fn best_stream(&self, video: &Video) -> Result<Option<Stream>> {
        let streams = self.streams_of_video(video.vid()).await?;
        Ok(selection::best_stream(video, &streams).cloned())
    }
}

/// Retrieval contract for stream content.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Where the content of `stream` will be written.
    fn output_path(&self, stream: &Stream) -> PathBuf;

    /// Downloads `stream` to [`MediaFetcher::output_path`].
    ///
    /// A downloader that ran but failed is reported through
    /// `FetchOutcome::success`, not as an error.
    async fn fetch(&self, stream: &Stream) -> Result<FetchOutcome>;
}
