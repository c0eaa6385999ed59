/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Record identifiers are opaque strings: random ids for images,
/// output-location derived ids for videos.
pub type MediaId = String;

/// Boxed error used to carry the underlying cause across crate boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
