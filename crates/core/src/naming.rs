//! Object-key naming and id generation.
//!
//! A video's object key is a pure function of its record id, so its public
//! URL can be handed out before the model service has written anything.

use rand::distr::Alphanumeric;
use rand::Rng;

/// File the model service writes inside a video job's output location.
pub const VIDEO_OUTPUT_FILE: &str = "output.mp4";

/// Length of generated record ids.
pub const RANDOM_ID_LEN: usize = 16;

/// Exclusive upper bound for generated seeds.
pub const MAX_SEED: u32 = 2_147_483_647;

/// Object key for a generated image.
pub fn image_key(id: &str) -> String {
    format!("{id}.png")
}

/// Object key for a generated video.
pub fn video_key(id: &str) -> String {
    format!("{id}/{VIDEO_OUTPUT_FILE}")
}

/// Random lowercase alphanumeric record id.
pub fn random_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Random generation seed in `0..MAX_SEED`.
pub fn random_seed() -> u32 {
    rand::rng().random_range(0..MAX_SEED)
}
