use std::collections::HashMap;

use rc_core::{best_stream, CatalogError, CatalogRepo, Category, Emission, Quality, Stream, Theme, Video};
use rc_db_sqlite::SqliteCatalogRepo;

async fn store() -> SqliteCatalogRepo {
    SqliteCatalogRepo::new("sqlite::memory:").await.unwrap()
}

/// Scrape order: parents first, a video with the streams of its description.
async fn scrape_into(repo: &SqliteCatalogRepo) {
    repo.insert_theme(&Theme::new(1, "http://site/theme/1", "Divertissement").unwrap())
        .await
        .unwrap();
    repo.insert_theme(&Theme::new(2, "http://site/theme/2", "Sport").unwrap())
        .await
        .unwrap();
    repo.insert_category(&Category::new("Humour", Some(1))).await.unwrap();
    repo.insert_category(&Category::new("Football", Some(2))).await.unwrap();
    repo.insert_emission(&Emission::new("42", "Humour", "http://site/e/42", "Le Zapping").unwrap())
        .await
        .unwrap();
    repo.insert_emission(&Emission::new("77", "Football", "http://site/e/77", "Jour de foot").unwrap())
        .await
        .unwrap();

    let zap = Video::new("1001", "42", "Zapping du lundi").unwrap();
    repo.insert_video_with_streams(
        &zap,
        &[
            Stream::new(1001, "BAS_DEBIT", "rtmp://fms/ondemand/zap_bas.flv").unwrap(),
            Stream::new(1001, "HD", "rtmp://fms/ondemand/zap_hd.flv").unwrap(),
        ],
    )
    .await
    .unwrap();

    let foot = Video::new("2001", "77", "Resume").unwrap();
    repo.insert_video_with_streams(
        &foot,
        &[Stream::new(2001, "4K", "rtmp://fms/ondemand/foot_4k.flv").unwrap()],
    )
    .await
    .unwrap();

    let empty = Video::new("2002", "77", "Bientot disponible").unwrap();
    repo.insert_video(&empty).await.unwrap();
}

#[tokio::test]
async fn test_best_stream_per_video() {
    let repo = store().await;
    scrape_into(&repo).await;

    let mut picks = HashMap::new();
    for emission in [42, 77] {
        for video in repo.videos_of_emission(emission).await.unwrap() {
            let best = repo.best_stream(&video).await.unwrap();
            picks.insert(video.vid(), best.map(|s| s.quality().clone()));
        }
    }

    assert_eq!(picks[&1001], Some(Quality::Hd));
    assert_eq!(picks[&2001], Some(Quality::Other("4K".into())));
    assert_eq!(picks[&2002], None);
}

#[tokio::test]
async fn test_rescraped_theme_is_same_record_but_store_rejects_it() {
    let repo = store().await;
    scrape_into(&repo).await;

    let rescraped = Theme::new("1", "http://site/theme/1", "Divertissement (nouveau)").unwrap();
    let stored = repo.get_theme(1).await.unwrap().unwrap();
    assert_eq!(rescraped, stored);
    assert_ne!(rescraped.text(), stored.text());

    let err = repo.insert_theme(&rescraped).await.unwrap_err();
    assert!(matches!(err, CatalogError::ConstraintViolation(_)));
}

#[tokio::test]
async fn test_selection_over_loaded_collection_matches_store() {
    let repo = store().await;
    scrape_into(&repo).await;

    let video = repo.get_video(1001).await.unwrap().unwrap();
    let streams = repo.streams_of_video(1001).await.unwrap();
    let in_memory = best_stream(&video, &streams).cloned();
    let from_store = repo.best_stream(&video).await.unwrap();
    assert_eq!(in_memory.map(|s| s.url().to_string()), from_store.map(|s| s.url().to_string()));
}

#[tokio::test]
async fn test_delete_theme_leaves_other_subtrees() {
    let repo = store().await;
    scrape_into(&repo).await;

    assert!(repo.delete_theme(2).await.unwrap());
    assert!(repo.get_video(2001).await.unwrap().is_none());
    assert!(repo.get_video(2002).await.unwrap().is_none());
    assert!(repo.get_video(1001).await.unwrap().is_some());
    assert_eq!(repo.list_themes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_database_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("catalog.db").display());

    {
        let repo = SqliteCatalogRepo::new(&url).await.unwrap();
        scrape_into(&repo).await;
        repo.pool().close().await;
    }

    let repo = SqliteCatalogRepo::new(&url).await.unwrap();
    let themes = repo.list_themes().await.unwrap();
    assert_eq!(themes.len(), 2);
    assert_eq!(repo.streams_of_video(1001).await.unwrap().len(), 2);
}
