//! Object storage for rendered media.
//!
//! [`ObjectStore`] writes blobs under a key and maps keys to public URLs
//! through a [`CdnRewrite`]. Two implementations: [`S3ObjectStore`] for
//! production and [`MemoryObjectStore`] for tests and local development.

pub mod cdn;
pub mod memory;
pub mod s3;
pub mod store;

pub use cdn::CdnRewrite;
pub use memory::MemoryObjectStore;
pub use s3::{S3ObjectStore, S3Settings};
pub use store::ObjectStore;
