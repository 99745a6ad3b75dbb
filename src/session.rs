//! Scrape-session lifecycle: generational cutover and cleanup.
//!
//! Ordering matters. The previous session's database rows are deleted
//! before any new content is fetched, so a client querying mid-run never
//! mixes stale rows into a half-populated session and never follows a row
//! to storage that is about to disappear. The previous session's storage
//! folder is deleted only after the run completes — a dangling DB reference
//! to deleted storage can never occur, while a transiently orphaned storage
//! folder is acceptable loss.
use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::cloudinary::MediaStore;
use crate::db;

/// Storage folder for one session's uploads.
pub fn session_folder(session_id: i64) -> String {
    format!("psb/session-{session_id}")
}

/// Retire the previous session's rows and open a new session. Returns the
/// new session id and, if one existed, the previous session id to clean up
/// after the run.
#[instrument(skip_all)]
pub async fn begin_session(pool: &db::Pool) -> Result<(i64, Option<i64>)> {
    let previous = db::oldest_session(pool).await?;
    if let Some(prev) = previous {
        db::delete_session(pool, prev).await?;
        info!(session = prev, "retired previous session rows");
    }
    let session_id = db::create_session(pool).await?;
    info!(session_id, "opened scrape session");
    Ok((session_id, previous))
}

/// Delete the retired session's storage namespace. Cleanup failure must not
/// block availability of the freshly ingested session, so errors are logged
/// and swallowed; the orphaned folder is removed by a later run or by hand.
#[instrument(skip_all)]
pub async fn retire_previous(store: &dyn MediaStore, previous: Option<i64>) {
    let Some(prev) = previous else {
        return;
    };
    let folder = session_folder(prev);
    match store.delete_folder(&folder).await {
        Ok(()) => info!(session = prev, "deleted retired session assets"),
        Err(err) => warn!(?err, session = prev, "failed to delete retired session assets"),
    }
}
