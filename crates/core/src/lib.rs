//! Domain types shared by every gallery crate.
//!
//! Nothing in here performs I/O: the media record model, the job state
//! machine, the error taxonomy, object-key naming and the pluggable job
//! identity strategies all live here so the store, gateway and pipeline
//! crates agree on one vocabulary.

pub mod error;
pub mod identity;
pub mod job;
pub mod media;
pub mod naming;
pub mod request;
pub mod types;
