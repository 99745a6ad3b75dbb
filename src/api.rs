//! Read-only query API over the persisted rows.
//!
//! Two endpoints, shaped like the original public service: category → post
//! ids, and post → original + photoshops + source permalink. Any repo
//! error becomes a plain-text 500.
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::db;

const REDDIT_LINK_BASE: &str = "https://reddit.com";

#[derive(Debug, Serialize)]
struct CategoryResp {
    name: String,
    posts: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct PhotoResp {
    url: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct PostResp {
    id: i64,
    original: Option<PhotoResp>,
    photoshops: Vec<PhotoResp>,
    #[serde(rename = "postLink")]
    post_link: String,
}

pub fn router(pool: db::Pool) -> Router {
    Router::new()
        .route("/v1/categories/:name", get(get_category))
        .route("/v1/posts/:id", get(get_post))
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .with_state(pool)
}

async fn get_category(
    State(pool): State<db::Pool>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match db::post_ids_by_category(&pool, &name).await {
        Ok(posts) => Json(CategoryResp { name, posts }).into_response(),
        Err(err) => {
            warn!(?err, name, "failed to load posts for category");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failure to load posts").into_response()
        }
    }
}

async fn get_post(State(pool): State<db::Pool>, Path(id): Path<i64>) -> impl IntoResponse {
    let failure =
        || (StatusCode::INTERNAL_SERVER_ERROR, "Failure to load photos").into_response();

    let rows = match db::photos_by_post(&pool, id).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(?err, id, "failed to load photos");
            return failure();
        }
    };
    let permalink = match db::post_permalink(&pool, id).await {
        Ok(Some(permalink)) => permalink,
        Ok(None) => {
            warn!(id, "no such post");
            return failure();
        }
        Err(err) => {
            warn!(?err, id, "failed to load permalink");
            return failure();
        }
    };

    let mut original = None;
    let mut photoshops = Vec::new();
    for row in rows {
        let photo = PhotoResp {
            url: row.stored_url,
            text: row.text,
        };
        if row.is_original {
            original = Some(photo);
        } else {
            photoshops.push(photo);
        }
    }

    Json(PostResp {
        id,
        original,
        photoshops,
        post_link: format!("{REDDIT_LINK_BASE}{permalink}"),
    })
    .into_response()
}
