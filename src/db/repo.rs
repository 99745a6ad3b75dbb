use super::model::{PhotoRow, PostRow};
use crate::cloudinary::StoredAsset;
use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, make sure the parent directory exists so a
/// first run does not fail on a missing `data/` dir. In-memory URLs and
/// non-sqlite schemes pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    url.to_string()
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn create_session(pool: &Pool) -> Result<i64> {
    let rec = sqlx::query("INSERT INTO sessions DEFAULT VALUES RETURNING id")
        .fetch_one(pool)
        .await?;
    Ok(rec.get::<i64, _>("id"))
}

/// Oldest surviving session id, if any. During normal operation there is at
/// most one, captured as "previous" at the start of a run.
#[instrument(skip_all)]
pub async fn oldest_session(pool: &Pool) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM sessions ORDER BY id ASC LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Delete everything a session owns in the database: photos, then posts,
/// then the session row itself. Individual statements, no transaction —
/// consistent with the pipeline's crash tolerance (a partial delete is
/// finished by the next run's cutover).
#[instrument(skip_all)]
pub async fn delete_session(pool: &Pool, session_id: i64) -> Result<()> {
    sqlx::query(
        "DELETE FROM photos WHERE post_id IN (SELECT id FROM posts WHERE scraping_session_id = ?)",
    )
    .bind(session_id)
    .execute(pool)
    .await?;
    sqlx::query("DELETE FROM posts WHERE scraping_session_id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_post(
    pool: &Pool,
    session_id: i64,
    category_name: &str,
    title: &str,
    permalink: &str,
    score: i64,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO posts (category_name, scraping_session_id, title, permalink, score) \
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(category_name)
    .bind(session_id)
    .bind(title)
    .bind(permalink)
    .bind(score)
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn insert_photo(
    pool: &Pool,
    post_id: i64,
    text: &str,
    score: i64,
    asset: &StoredAsset,
    is_original: bool,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO photos (post_id, text, score, stored_url, public_id, width, height, format, is_original) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(post_id)
    .bind(text)
    .bind(score)
    .bind(&asset.url)
    .bind(&asset.public_id)
    .bind(asset.width)
    .bind(asset.height)
    .bind(&asset.format)
    .bind(is_original)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn post_ids_by_category(pool: &Pool, category_name: &str) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM posts WHERE category_name = ? ORDER BY id ASC",
    )
    .bind(category_name)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Photos for a post: the original first, then photoshops by descending
/// score, insertion order breaking ties.
#[instrument(skip_all)]
pub async fn photos_by_post(pool: &Pool, post_id: i64) -> Result<Vec<PhotoRow>> {
    let rows = sqlx::query_as::<_, PhotoRow>(
        "SELECT post_id, text, score, stored_url, public_id, width, height, format, is_original \
         FROM photos WHERE post_id = ? ORDER BY is_original DESC, score DESC, id ASC",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn post_permalink(pool: &Pool, post_id: i64) -> Result<Option<String>> {
    let permalink = sqlx::query_scalar::<_, String>("SELECT permalink FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await?;
    Ok(permalink)
}

#[instrument(skip_all)]
pub async fn posts_by_session(pool: &Pool, session_id: i64) -> Result<Vec<PostRow>> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT id, category_name, scraping_session_id, title, permalink, score \
         FROM posts WHERE scraping_session_id = ? ORDER BY id ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
