pub mod health;
pub mod media;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /images                 generate images (POST)
/// /videos                 submit a video job (POST)
/// /media                  gallery listing (GET)
/// /media/sync             pull-based job sync (POST)
/// /media/{*id}            one record (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(media::router())
}
