//! Route definitions for generation and the gallery.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::media;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/images", post(media::create_images))
        .route("/videos", post(media::create_video))
        .route("/media", get(media::list_media))
        .route("/media/sync", post(media::sync_media))
        .route("/media/{*id}", get(media::get_media))
}
