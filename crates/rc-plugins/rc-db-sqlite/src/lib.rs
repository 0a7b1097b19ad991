//! # rc-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rc-core` domain models.

mod schema;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rc_core::error::{CatalogError, Result};
use rc_core::models::{Category, Emission, Stream, Theme, Video};
use rc_core::traits::CatalogRepo;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

pub use schema::SCHEMA;

pub struct SqliteCatalogRepo {
    pool: SqlitePool,
}

impl SqliteCatalogRepo {
    /// Opens (or creates) the database at `database_url` and ensures the schema.
    ///
    /// The pool holds a single long-lived connection: catalog writes are
    /// sequential, and a `sqlite::memory:` database only exists as long as
    /// its connection does.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(map_db_err)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(map_db_err)?;

        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    /// Wraps an existing pool. The schema is not touched.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Store failures are split between constraint rejections, surfaced as-is to
/// the caller, and everything else.
fn map_db_err(err: sqlx::Error) -> CatalogError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = matches!(
            db.kind(),
            ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
        ) || db.message().contains("constraint failed");

        if constraint {
            return CatalogError::ConstraintViolation(db.message().to_string());
        }
    }
    CatalogError::Internal(err.to_string())
}

// Row mapping. Entities are rebuilt through their constructors so a corrupt
// row fails the same way a bad scrape would.

fn theme_from_row(row: &SqliteRow) -> Result<Theme> {
    Theme::new(
        row.try_get::<i64, _>("tid").map_err(map_db_err)?,
        row.try_get::<String, _>("url").map_err(map_db_err)?,
        row.try_get::<String, _>("desc").map_err(map_db_err)?,
    )
}

fn category_from_row(row: &SqliteRow) -> Result<Category> {
    Ok(Category::new(
        row.try_get::<String, _>("desc").map_err(map_db_err)?,
        row.try_get::<Option<i64>, _>("tid").map_err(map_db_err)?,
    ))
}

fn emission_from_row(row: &SqliteRow) -> Result<Emission> {
    let emission = Emission::new(
        row.try_get::<i64, _>("pid").map_err(map_db_err)?,
        row.try_get::<String, _>("cid").map_err(map_db_err)?,
        row.try_get::<String, _>("url").map_err(map_db_err)?,
        row.try_get::<String, _>("desc").map_err(map_db_err)?,
    )?;
    let ts = row
        .try_get::<Option<DateTime<Utc>>, _>("ts")
        .map_err(map_db_err)?;
    Ok(match ts {
        Some(ts) => emission.with_timestamp(ts),
        None => emission,
    })
}

fn video_from_row(row: &SqliteRow) -> Result<Video> {
    Video::new(
        row.try_get::<i64, _>("vid").map_err(map_db_err)?,
        row.try_get::<i64, _>("pid").map_err(map_db_err)?,
        row.try_get::<String, _>("desc").map_err(map_db_err)?,
    )
}

fn stream_from_row(row: &SqliteRow) -> Result<Stream> {
    Stream::new(
        row.try_get::<i64, _>("vid").map_err(map_db_err)?,
        row.try_get::<String, _>("quality").map_err(map_db_err)?,
        &row.try_get::<String, _>("url").map_err(map_db_err)?,
    )
}

async fn insert_video_in(conn: &mut SqliteConnection, video: &Video) -> Result<()> {
    sqlx::query(r#"INSERT INTO videos (vid, pid, "desc", url) VALUES (?, ?, ?, ?)"#)
        .bind(video.vid())
        .bind(video.pid())
        .bind(video.text())
        .bind(video.url())
        .execute(&mut *conn)
        .await
        .map_err(map_db_err)?;
    Ok(())
}

async fn insert_stream_in(conn: &mut SqliteConnection, stream: &Stream) -> Result<()> {
    sqlx::query("INSERT INTO streams (vid, quality, url) VALUES (?, ?, ?)")
        .bind(stream.vid())
        .bind(stream.quality().as_str())
        .bind(stream.url())
        .execute(&mut *conn)
        .await
        .map_err(map_db_err)?;
    Ok(())
}

#[async_trait]
impl CatalogRepo for SqliteCatalogRepo {
    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        log::debug!("catalog schema ready");
        Ok(())
    }

    async fn insert_theme(&self, theme: &Theme) -> Result<()> {
        sqlx::query(r#"INSERT INTO themes (tid, url, "desc") VALUES (?, ?, ?)"#)
            .bind(theme.tid())
            .bind(theme.url())
            .bind(theme.text())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        sqlx::query(r#"INSERT INTO categories (tid, "desc") VALUES (?, ?)"#)
            .bind(category.tid())
            .bind(category.text())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_emission(&self, emission: &Emission) -> Result<()> {
        sqlx::query(r#"INSERT INTO emissions (pid, cid, "desc", url, ts) VALUES (?, ?, ?, ?, ?)"#)
            .bind(emission.pid())
            .bind(emission.cid())
            .bind(emission.text())
            .bind(emission.url())
            .bind(emission.ts())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_video(&self, video: &Video) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(map_db_err)?;
        insert_video_in(&mut conn, video).await
    }

    async fn insert_stream(&self, stream: &Stream) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(map_db_err)?;
        insert_stream_in(&mut conn, stream).await
    }

    /// Using a transaction ensures a video never lands without the streams
    /// parsed from its description, nor streams without their video.
    async fn insert_video_with_streams(&self, video: &Video, streams: &[Stream]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        insert_video_in(&mut tx, video).await?;
        for stream in streams {
            insert_stream_in(&mut tx, stream).await?;
        }

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    async fn get_theme(&self, tid: i64) -> Result<Option<Theme>> {
        let row = sqlx::query(r#"SELECT tid, url, "desc" FROM themes WHERE tid = ?"#)
            .bind(tid)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(theme_from_row).transpose()
    }

    async fn get_category(&self, text: &str) -> Result<Option<Category>> {
        let row = sqlx::query(r#"SELECT tid, "desc" FROM categories WHERE "desc" = ?"#)
            .bind(text)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn get_emission(&self, pid: i64) -> Result<Option<Emission>> {
        let row = sqlx::query(r#"SELECT pid, cid, "desc", url, ts FROM emissions WHERE pid = ?"#)
            .bind(pid)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(emission_from_row).transpose()
    }

    async fn get_video(&self, vid: i64) -> Result<Option<Video>> {
        let row = sqlx::query(r#"SELECT vid, pid, "desc" FROM videos WHERE vid = ?"#)
            .bind(vid)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(video_from_row).transpose()
    }

    async fn get_stream(&self, vid: i64, quality: &str) -> Result<Option<Stream>> {
        let row = sqlx::query("SELECT vid, quality, url FROM streams WHERE vid = ? AND quality = ?")
            .bind(vid)
            .bind(quality)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(stream_from_row).transpose()
    }

    async fn list_themes(&self) -> Result<Vec<Theme>> {
        sqlx::query(r#"SELECT tid, url, "desc" FROM themes ORDER BY rowid"#)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?
            .iter()
            .map(theme_from_row)
            .collect()
    }

    async fn categories_of_theme(&self, tid: i64) -> Result<Vec<Category>> {
        sqlx::query(r#"SELECT tid, "desc" FROM categories WHERE tid = ? ORDER BY rowid"#)
            .bind(tid)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?
            .iter()
            .map(category_from_row)
            .collect()
    }

    async fn emissions_of_category(&self, cid: &str) -> Result<Vec<Emission>> {
        sqlx::query(r#"SELECT pid, cid, "desc", url, ts FROM emissions WHERE cid = ? ORDER BY rowid"#)
            .bind(cid)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?
            .iter()
            .map(emission_from_row)
            .collect()
    }

    async fn videos_of_emission(&self, pid: i64) -> Result<Vec<Video>> {
        sqlx::query(r#"SELECT vid, pid, "desc" FROM videos WHERE pid = ? ORDER BY rowid"#)
            .bind(pid)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?
            .iter()
            .map(video_from_row)
            .collect()
    }

    /// Streams come back in insertion order, which the unranked fallback of
    /// the selection policy relies on.
    async fn streams_of_video(&self, vid: i64) -> Result<Vec<Stream>> {
        sqlx::query("SELECT vid, quality, url FROM streams WHERE vid = ? ORDER BY rowid")
            .bind(vid)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?
            .iter()
            .map(stream_from_row)
            .collect()
    }

    async fn delete_theme(&self, tid: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM themes WHERE tid = ?")
            .bind(tid)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        log::debug!("deleted theme {} ({} row)", tid, result.rows_affected());
        Ok(result.rows_affected() > 0)
    }
}
