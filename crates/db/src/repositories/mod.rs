//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod media_record_repo;

pub use media_record_repo::{MediaRecordRepo, PgMediaStore};
