//! JSON snapshots written by the scraper and loaded by `replay-catalog import`.
//!
//! Ids may arrive as JSON numbers or as the text found on the page; both go
//! through the same integer coercion as hand-built entities.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use rc_core::error::{CatalogError, Result as CatalogResult};
use rc_core::models::{Category, Emission, IntoKey, Quality, Stream, Theme, Video};
use rc_core::traits::CatalogRepo;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawKey {
    Int(i64),
    Text(String),
}

impl IntoKey for RawKey {
    fn into_key(self, field: &'static str) -> CatalogResult<i64> {
        match self {
            RawKey::Int(value) => Ok(value),
            RawKey::Text(text) => text.into_key(field),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ThemeRecord {
    pub tid: RawKey,
    pub url: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRecord {
    pub text: String,
    #[serde(default)]
    pub tid: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct EmissionRecord {
    pub pid: RawKey,
    pub cid: String,
    pub url: String,
    pub text: String,
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct VideoRecord {
    pub vid: RawKey,
    pub pid: RawKey,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamRecord {
    pub vid: RawKey,
    pub quality: Quality,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub themes: Vec<ThemeRecord>,
    pub categories: Vec<CategoryRecord>,
    pub emissions: Vec<EmissionRecord>,
    pub videos: Vec<VideoRecord>,
    pub streams: Vec<StreamRecord>,
}

impl Snapshot {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read snapshot {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("malformed snapshot {}", path.display()))
    }
}

/// Entities built from a snapshot, ready to be stored parents first.
#[derive(Debug, Default)]
pub struct Catalog {
    pub themes: Vec<Theme>,
    pub categories: Vec<Category>,
    pub emissions: Vec<Emission>,
    /// Each video with the streams found for it
    pub videos: Vec<(Video, Vec<Stream>)>,
    /// Streams whose video is not part of the snapshot
    pub loose_streams: Vec<Stream>,
}

impl TryFrom<Snapshot> for Catalog {
    type Error = CatalogError;

    /// Fails on the first record that does not build.
    fn try_from(snapshot: Snapshot) -> CatalogResult<Self> {
        let themes = snapshot
            .themes
            .into_iter()
            .map(|r| Theme::new(r.tid, r.url, r.text))
            .collect::<CatalogResult<Vec<_>>>()?;

        let categories = snapshot
            .categories
            .into_iter()
            .map(|r| Category::new(r.text, r.tid))
            .collect();

        let emissions = snapshot
            .emissions
            .into_iter()
            .map(|r| {
                let emission = Emission::new(r.pid, r.cid, r.url, r.text)?;
                Ok(match r.ts {
                    Some(ts) => emission.with_timestamp(ts),
                    None => emission,
                })
            })
            .collect::<CatalogResult<Vec<_>>>()?;

        let mut videos = snapshot
            .videos
            .into_iter()
            .map(|r| Ok((Video::new(r.vid, r.pid, r.text)?, Vec::new())))
            .collect::<CatalogResult<Vec<(Video, Vec<Stream>)>>>()?;

        let index: HashMap<i64, usize> = videos
            .iter()
            .enumerate()
            .map(|(i, (video, _))| (video.vid(), i))
            .collect();

        let mut loose_streams = Vec::new();
        for r in snapshot.streams {
            let stream = Stream::new(r.vid, r.quality, &r.url)?;
            match index.get(&stream.vid()) {
                Some(&i) => videos[i].1.push(stream),
                None => loose_streams.push(stream),
            }
        }

        Ok(Self {
            themes,
            categories,
            emissions,
            videos,
            loose_streams,
        })
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    /// Records rejected by a store constraint (only with `skip_conflicts`)
    pub skipped: usize,
}

impl ImportReport {
    /// Counts the `rows` written (or rejected) by one store call. Constraint
    /// violations abort the import unless `skip_conflicts` is set.
    fn record(
        &mut self,
        result: CatalogResult<()>,
        rows: usize,
        what: &dyn std::fmt::Display,
        skip_conflicts: bool,
    ) -> CatalogResult<()> {
        match result {
            Ok(()) => {
                self.inserted += rows;
                Ok(())
            }
            Err(CatalogError::ConstraintViolation(reason)) if skip_conflicts => {
                log::warn!("skipping {}: {}", what, reason);
                self.skipped += rows;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Stores `catalog` top-down. A video and its streams go in as one batch,
/// split into single rows when `skip_conflicts` meets a rejected batch.
pub async fn import<R>(repo: &R, catalog: Catalog, skip_conflicts: bool) -> CatalogResult<ImportReport>
where
    R: CatalogRepo + ?Sized,
{
    let mut report = ImportReport::default();

    for theme in &catalog.themes {
        report.record(repo.insert_theme(theme).await, 1, theme, skip_conflicts)?;
    }
    for category in &catalog.categories {
        report.record(repo.insert_category(category).await, 1, category, skip_conflicts)?;
    }
    for emission in &catalog.emissions {
        report.record(repo.insert_emission(emission).await, 1, emission, skip_conflicts)?;
    }
    for (video, streams) in &catalog.videos {
        match repo.insert_video_with_streams(video, streams).await {
            // The batch is all or nothing; retry row by row so new streams of
            // an already stored video still land.
            Err(CatalogError::ConstraintViolation(reason)) if skip_conflicts => {
                log::debug!("batch for {} rejected ({}), inserting rows one by one", video, reason);
                report.record(repo.insert_video(video).await, 1, video, true)?;
                for stream in streams {
                    report.record(repo.insert_stream(stream).await, 1, stream, true)?;
                }
            }
            result => report.record(result, 1 + streams.len(), video, skip_conflicts)?,
        }
    }
    for stream in &catalog.loose_streams {
        report.record(repo.insert_stream(stream).await, 1, stream, skip_conflicts)?;
    }

    log::info!(
        "import finished: {} inserted, {} skipped",
        report.inserted,
        report.skipped
    );
    Ok(report)
}

#[cfg(all(test, feature = "db-sqlite"))]
mod tests {
    use super::*;
    use rc_db_sqlite::SqliteCatalogRepo;

    const SNAPSHOT: &str = r#"{
        "themes": [{"tid": 1, "url": "http://site/theme/1", "text": "Divertissement"}],
        "categories": [{"text": "Humour", "tid": 1}],
        "emissions": [
            {"pid": "42", "cid": "Humour", "url": "http://site/emission/42", "text": "Le Zapping",
             "ts": "2011-05-02T20:15:00Z"}
        ],
        "videos": [{"vid": "1001", "pid": 42, "text": "Zapping du lundi"}],
        "streams": [
            {"vid": 1001, "quality": "BAS_DEBIT", "url": "rtmp://fms/ondemand/zap_bas.flv"},
            {"vid": 1001, "quality": "HD", "url": "rtmp://fms/ondemand/zap_hd.flv"}
        ]
    }"#;

    fn catalog(json: &str) -> Catalog {
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        Catalog::try_from(snapshot).unwrap()
    }

    #[test]
    fn test_snapshot_builds_entities() {
        let catalog = catalog(SNAPSHOT);
        assert_eq!(catalog.themes.len(), 1);
        assert_eq!(catalog.emissions[0].pid(), 42);
        assert!(catalog.emissions[0].ts().is_some());
        assert_eq!(catalog.videos[0].0.vid(), 1001);
        assert_eq!(catalog.videos[0].1.len(), 2);
        assert!(catalog.loose_streams.is_empty());
    }

    #[test]
    fn test_snapshot_bad_pid_fails() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{"emissions": [{"pid": "abc", "cid": "c", "url": "http://e", "text": "t"}]}"#,
        )
        .unwrap();
        let err = Catalog::try_from(snapshot).unwrap_err();
        assert!(matches!(err, CatalogError::Format { field: "pid", .. }));
    }

    #[test]
    fn test_snapshot_bad_stream_url_fails() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{"streams": [{"vid": 1, "quality": "HD", "url": ""}]}"#,
        )
        .unwrap();
        let err = Catalog::try_from(snapshot).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_import_then_reimport() {
        let repo = SqliteCatalogRepo::new("sqlite::memory:").await.unwrap();

        let report = import(&repo, catalog(SNAPSHOT), false).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 6, skipped: 0 });

        let video = repo.get_video(1001).await.unwrap().unwrap();
        let best = repo.best_stream(&video).await.unwrap().unwrap();
        assert_eq!(best.url(), "rtmp://fms/ondemand/zap_hd.flv");

        let err = import(&repo, catalog(SNAPSHOT), false).await.unwrap_err();
        assert!(matches!(err, CatalogError::ConstraintViolation(_)));

        let report = import(&repo, catalog(SNAPSHOT), true).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 0, skipped: 6 });
    }

    #[tokio::test]
    async fn test_reimport_keeps_new_streams_of_known_video() {
        let repo = SqliteCatalogRepo::new("sqlite::memory:").await.unwrap();
        let mut first_scrape: Snapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let hd = first_scrape.streams.pop().unwrap();
        assert_eq!(hd.quality, Quality::Hd);
        let report = import(&repo, Catalog::try_from(first_scrape).unwrap(), false).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 5, skipped: 0 });
        assert_eq!(repo.streams_of_video(1001).await.unwrap().len(), 1);

        let report = import(&repo, catalog(SNAPSHOT), true).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 1, skipped: 5 });

        let streams = repo.streams_of_video(1001).await.unwrap();
        assert_eq!(streams.len(), 2);
        assert!(repo.get_stream(1001, "HD").await.unwrap().is_some());
    }
}
