//! Category collection and per-post processing.
//!
//! The run is a single sequential pass: categories one at a time, posts one
//! at a time, comments one at a time. A listing fetch failure aborts the
//! run; everything below a post is fault-isolated and logged.
use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::cloudinary::MediaStore;
use crate::config::Config;
use crate::db;
use crate::imgur::ImgurLookup;
use crate::model::Category;
use crate::reddit::model::Submission;
use crate::reddit::RedditFeed;
use crate::resolver;
use crate::session;

/// One complete scrape session: cutover, collect every category, process
/// every post, then clean up the retired session's storage.
#[instrument(skip_all)]
pub async fn run_session(
    pool: &db::Pool,
    reddit: &dyn RedditFeed,
    imgur: &dyn ImgurLookup,
    store: &dyn MediaStore,
    cfg: &Config,
) -> Result<i64> {
    let (session_id, previous) = session::begin_session(pool).await?;

    for category in Category::ALL {
        // The upstream source is a single dependency: one failed listing
        // aborts the run rather than silently shipping partial categories.
        let items = reddit
            .listing(&cfg.subreddit, category, cfg.posts_per_category)
            .await
            .with_context(|| format!("failed to fetch {} listing", category.label()))?;
        info!(
            category = category.label(),
            count = items.len(),
            "collected listing"
        );
        for item in &items {
            process_post(pool, reddit, imgur, store, cfg, session_id, category, item).await;
        }
    }

    session::retire_previous(store, previous).await;
    info!(session_id, "scrape session complete");
    Ok(session_id)
}

/// Persist one post and its photos. Every step is isolated: a failed upload
/// or resolution is logged against the post and skipped, and a skipped
/// comment is never backfilled from beyond the rank-limited set.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(reddit_id = %item.id, category = category.label()))]
async fn process_post(
    pool: &db::Pool,
    reddit: &dyn RedditFeed,
    imgur: &dyn ImgurLookup,
    store: &dyn MediaStore,
    cfg: &Config,
    session_id: i64,
    category: Category,
    item: &Submission,
) {
    let post_id = match db::insert_post(
        pool,
        session_id,
        category.label(),
        &item.title,
        &item.permalink,
        item.score,
    )
    .await
    {
        Ok(id) => id,
        Err(err) => {
            warn!(?err, "failed to persist post; skipping");
            return;
        }
    };

    let folder = session::session_folder(session_id);

    match store.upload(&item.url, &folder).await {
        Ok(asset) => {
            if let Err(err) = db::insert_photo(pool, post_id, &item.title, item.score, &asset, true).await
            {
                warn!(?err, post_id, "failed to persist original photo");
            }
        }
        Err(err) => {
            // The post stays without an original; photoshops are still attempted.
            warn!(?err, post_id, url = %item.url, "failed to upload original photo");
        }
    }

    let mut comments = match reddit.top_comments(&item.id).await {
        Ok(comments) => comments,
        Err(err) => {
            warn!(?err, post_id, "failed to fetch comments; post kept as-is");
            return;
        }
    };
    // Stable sort: ties keep the feed's relative order.
    comments.sort_by(|a, b| b.score.cmp(&a.score));

    for comment in comments.into_iter().take(cfg.photoshops_per_post) {
        let Some(resolved) = resolver::resolve_comment(&comment.body, imgur).await else {
            continue;
        };
        match store.upload(&resolved.url, &folder).await {
            Ok(asset) => {
                if let Err(err) =
                    db::insert_photo(pool, post_id, &resolved.text, comment.score, &asset, false)
                        .await
                {
                    warn!(?err, post_id, "failed to persist photoshop");
                }
            }
            Err(err) => {
                warn!(?err, post_id, url = %resolved.url, "failed to upload photoshop; skipping");
            }
        }
    }
}
