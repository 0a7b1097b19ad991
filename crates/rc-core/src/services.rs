//! Orchestration across ports.

use crate::error::{CatalogError, Result};
use crate::fetch::FetchOutcome;
use crate::traits::{CatalogRepo, MediaFetcher};

/// Downloads the best stream of video `vid`.
///
/// # Returns
/// - `Ok(None)` if the video has no stream to fetch.
/// # Errors
/// - `CatalogError::NotFound` if the video is not in the store.
/// - any error raised by the store or the fetcher.
pub async fn fetch_best_stream<R, F>(repo: &R, fetcher: &F, vid: i64) -> Result<Option<FetchOutcome>>
where
    R: CatalogRepo + ?Sized,
    F: MediaFetcher + ?Sized,
{
    let video = repo
        .get_video(vid)
        .await?
        .ok_or_else(|| CatalogError::not_found("Video", vid))?;

    match repo.best_stream(&video).await? {
        Some(stream) => fetcher.fetch(&stream).await.map(Some),
        None => Ok(None),
    }
}
