use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use psb_scraper::cloudinary::{MediaStore, StoredAsset, UploadError};
use psb_scraper::config::Config;
use psb_scraper::imgur::ImgurLookup;
use psb_scraper::model::Category;
use psb_scraper::pipeline::run_session;
use psb_scraper::reddit::model::{Comment, Submission};
use psb_scraper::reddit::RedditFeed;
use psb_scraper::{db, session};

async fn setup_pool() -> db::Pool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

fn test_config(photoshops_per_post: usize) -> Config {
    let vars: HashMap<String, String> = [
        ("REDDIT_USER_AGENT", "psb-scraper tests"),
        ("REDDIT_CLIENT_ID", "cid"),
        ("REDDIT_CLIENT_SECRET", "secret"),
        ("REDDIT_REFRESH_TOKEN", "token"),
        ("IMGUR_CLIENT_ID", "imgur"),
        ("CLOUDINARY_CLOUD_NAME", "demo"),
        ("CLOUDINARY_API_KEY", "key"),
        ("CLOUDINARY_API_SECRET", "shh"),
        ("POSTS_PER_CATEGORY", "10"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let mut cfg = Config::from_lookup(&vars).unwrap();
    cfg.photoshops_per_post = photoshops_per_post;
    cfg
}

fn sub(id: &str, title: &str, url: &str, score: i64) -> Submission {
    Submission {
        id: id.to_string(),
        title: title.to_string(),
        url: url.to_string(),
        permalink: format!("/r/photoshopbattles/comments/{id}/"),
        score,
    }
}

fn comment(body: &str, score: i64) -> Comment {
    Comment {
        body: body.to_string(),
        score,
    }
}

#[derive(Default)]
struct StubReddit {
    listings: HashMap<&'static str, Vec<Submission>>,
    comments: HashMap<String, Vec<Comment>>,
    fail_category: Option<&'static str>,
}

#[async_trait]
impl RedditFeed for StubReddit {
    async fn listing(
        &self,
        _subreddit: &str,
        category: Category,
        limit: u32,
    ) -> Result<Vec<Submission>> {
        if self.fail_category == Some(category.label()) {
            return Err(anyhow!("listing unavailable"));
        }
        let mut items = self
            .listings
            .get(category.label())
            .cloned()
            .unwrap_or_default();
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn top_comments(&self, article: &str) -> Result<Vec<Comment>> {
        Ok(self.comments.get(article).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct StubImgur {
    albums: HashMap<String, String>,
    images: HashMap<String, String>,
}

#[async_trait]
impl ImgurLookup for StubImgur {
    async fn image(&self, hash: &str) -> Option<String> {
        self.images.get(hash).cloned()
    }

    async fn album(&self, hash: &str) -> Option<String> {
        self.albums.get(hash).cloned()
    }
}

/// Records every upload and folder deletion; sources in `fail_sources`
/// are rejected like an unreachable origin URL.
#[derive(Clone, Default)]
struct RecordingStore {
    uploads: Arc<Mutex<Vec<(String, String)>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    fail_sources: HashSet<String>,
    fail_delete: bool,
}

impl RecordingStore {
    fn failing_for(sources: &[&str]) -> Self {
        Self {
            fail_sources: sources.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    async fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().await.clone()
    }

    async fn deleted(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait]
impl MediaStore for RecordingStore {
    async fn upload(&self, source_url: &str, folder: &str) -> Result<StoredAsset, UploadError> {
        if self.fail_sources.contains(source_url) {
            return Err(UploadError::Rejected {
                status: 400,
                body: "source fetch failed".into(),
            });
        }
        let mut uploads = self.uploads.lock().await;
        uploads.push((source_url.to_string(), folder.to_string()));
        let n = uploads.len();
        Ok(StoredAsset {
            url: format!("https://cdn.test/{folder}/{n}.png"),
            public_id: format!("{folder}/{n}"),
            width: 800,
            height: 600,
            format: "png".into(),
        })
    }

    async fn delete_folder(&self, folder: &str) -> Result<(), UploadError> {
        if self.fail_delete {
            return Err(UploadError::Rejected {
                status: 500,
                body: "admin api down".into(),
            });
        }
        self.deleted.lock().await.push(folder.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn run_persists_ranked_photos_within_limit() {
    let pool = setup_pool().await;
    let cfg = test_config(2);
    let item = sub("p1", "battle source", "http://src/original.png", 100);
    let reddit = StubReddit {
        listings: HashMap::from([("top-week", vec![item.clone()])]),
        comments: HashMap::from([(
            "p1".to_string(),
            vec![
                comment("[low shop](http://x/low.png)", 5),
                comment("[top shop](http://x/top.png)", 50),
                comment("no link here, just words", 40),
            ],
        )]),
        ..Default::default()
    };
    let store = RecordingStore::default();

    let sid = run_session(&pool, &reddit, &StubImgur::default(), &store, &cfg)
        .await
        .unwrap();

    let posts = db::post_ids_by_category(&pool, "top-week").await.unwrap();
    assert_eq!(posts.len(), 1);
    let photos = db::photos_by_post(&pool, posts[0]).await.unwrap();

    // Original first, then photoshops by descending score.
    assert_eq!(photos.iter().filter(|p| p.is_original).count(), 1);
    assert!(photos[0].is_original);
    assert_eq!(photos[0].text, "battle source");

    // Rank limit is 2: the no-link comment (score 40) occupies the second
    // slot and is skipped without backfilling from the score-5 comment.
    let shops: Vec<_> = photos.iter().filter(|p| !p.is_original).collect();
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].text, "top shop");
    assert!(shops.len() <= cfg.photoshops_per_post);

    // Every upload went to the session's namespace.
    let folder = session::session_folder(sid);
    for (_, upload_folder) in store.uploads().await {
        assert_eq!(upload_folder, folder);
    }
}

#[tokio::test]
async fn post_appears_once_per_category() {
    let pool = setup_pool().await;
    let cfg = test_config(5);
    let item = sub("p1", "seen twice", "http://src/a.png", 10);
    let reddit = StubReddit {
        listings: HashMap::from([("hot", vec![item.clone()]), ("rising", vec![item.clone()])]),
        ..Default::default()
    };
    let store = RecordingStore::default();

    run_session(&pool, &reddit, &StubImgur::default(), &store, &cfg)
        .await
        .unwrap();

    assert_eq!(db::post_ids_by_category(&pool, "hot").await.unwrap().len(), 1);
    assert_eq!(
        db::post_ids_by_category(&pool, "rising").await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn original_upload_failure_keeps_post_and_derivatives() {
    let pool = setup_pool().await;
    let cfg = test_config(5);
    let item = sub("p1", "broken source", "http://src/gone.png", 10);
    let reddit = StubReddit {
        listings: HashMap::from([("hot", vec![item])]),
        comments: HashMap::from([(
            "p1".to_string(),
            vec![comment("[still works](http://x/shop.jpg)", 7)],
        )]),
        ..Default::default()
    };
    let store = RecordingStore::failing_for(&["http://src/gone.png"]);

    run_session(&pool, &reddit, &StubImgur::default(), &store, &cfg)
        .await
        .unwrap();

    let posts = db::post_ids_by_category(&pool, "hot").await.unwrap();
    assert_eq!(posts.len(), 1);
    let photos = db::photos_by_post(&pool, posts[0]).await.unwrap();
    assert_eq!(photos.iter().filter(|p| p.is_original).count(), 0);
    let shops: Vec<_> = photos.iter().filter(|p| !p.is_original).collect();
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].text, "still works");
}

#[tokio::test]
async fn failed_indirect_lookup_stores_nothing_for_comment() {
    let pool = setup_pool().await;
    let cfg = test_config(2);
    let item = sub("p1", "t", "http://src/a.png", 10);
    let reddit = StubReddit {
        listings: HashMap::from([("hot", vec![item])]),
        comments: HashMap::from([(
            "p1".to_string(),
            vec![
                comment("[nice](http://imgur.com/a/MISSING)", 90),
                comment("[ok](http://x/ok.jpg)", 10),
            ],
        )]),
        ..Default::default()
    };
    let store = RecordingStore::default();

    run_session(&pool, &reddit, &StubImgur::default(), &store, &cfg)
        .await
        .unwrap();

    let posts = db::post_ids_by_category(&pool, "hot").await.unwrap();
    let photos = db::photos_by_post(&pool, posts[0]).await.unwrap();
    let shops: Vec<_> = photos.iter().filter(|p| !p.is_original).collect();
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].text, "ok");
}

#[tokio::test]
async fn album_link_resolves_through_indirect_host() {
    let pool = setup_pool().await;
    let cfg = test_config(2);
    let item = sub("p1", "t", "http://src/a.png", 10);
    let reddit = StubReddit {
        listings: HashMap::from([("hot", vec![item])]),
        comments: HashMap::from([(
            "p1".to_string(),
            vec![comment("[nice](http://imgur.com/a/ABC123)", 20)],
        )]),
        ..Default::default()
    };
    let imgur = StubImgur {
        albums: HashMap::from([("ABC123".to_string(), "http://i/1.png".to_string())]),
        ..Default::default()
    };
    let store = RecordingStore::default();

    run_session(&pool, &reddit, &imgur, &store, &cfg).await.unwrap();

    let uploads = store.uploads().await;
    assert!(uploads.iter().any(|(src, _)| src == "http://i/1.png"));

    let posts = db::post_ids_by_category(&pool, "hot").await.unwrap();
    let photos = db::photos_by_post(&pool, posts[0]).await.unwrap();
    let shops: Vec<_> = photos.iter().filter(|p| !p.is_original).collect();
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].text, "nice");
}

// Current design keeps a single failed category listing fatal for the whole
// run; per-category isolation would be a deliberate semantic change.
#[tokio::test]
async fn category_fetch_failure_is_fatal() {
    let pool = setup_pool().await;
    let cfg = test_config(5);
    let reddit = StubReddit {
        fail_category: Some("hot"),
        ..Default::default()
    };
    let store = RecordingStore::default();

    let err = run_session(&pool, &reddit, &StubImgur::default(), &store, &cfg)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("hot"));
}

#[tokio::test]
async fn rerun_retires_previous_session() {
    let pool = setup_pool().await;
    let cfg = test_config(5);
    let reddit = StubReddit {
        listings: HashMap::from([("hot", vec![sub("p1", "t", "http://src/a.png", 10)])]),
        ..Default::default()
    };
    let store = RecordingStore::default();

    let first = run_session(&pool, &reddit, &StubImgur::default(), &store, &cfg)
        .await
        .unwrap();
    let second = run_session(&pool, &reddit, &StubImgur::default(), &store, &cfg)
        .await
        .unwrap();
    assert_ne!(first, second);

    // No surviving row references the retired session.
    assert!(db::posts_by_session(&pool, first).await.unwrap().is_empty());
    assert_eq!(db::oldest_session(&pool).await.unwrap(), Some(second));
    for post in db::posts_by_session(&pool, second).await.unwrap() {
        assert_eq!(post.scraping_session_id, second);
    }

    // The retired session's storage namespace was deleted after the run.
    assert_eq!(store.deleted().await, vec![session::session_folder(first)]);
}

#[tokio::test]
async fn storage_cleanup_failure_does_not_fail_run() {
    let pool = setup_pool().await;
    let cfg = test_config(5);
    let reddit = StubReddit {
        listings: HashMap::from([("hot", vec![sub("p1", "t", "http://src/a.png", 10)])]),
        ..Default::default()
    };
    let store = RecordingStore {
        fail_delete: true,
        ..Default::default()
    };

    run_session(&pool, &reddit, &StubImgur::default(), &store, &cfg)
        .await
        .unwrap();
    // Second run retires the first session; the failing folder delete is
    // logged and swallowed.
    run_session(&pool, &reddit, &StubImgur::default(), &store, &cfg)
        .await
        .unwrap();
}
