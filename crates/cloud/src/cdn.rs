//! Storage key to public URL rewrite.

/// Maps object keys onto a CDN domain: `{domain}/{key}`.
///
/// The domain is normalized once: `https://` is prepended when no scheme is
/// given and trailing slashes are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnRewrite {
    base: String,
}

impl CdnRewrite {
    pub fn new(domain: &str) -> Self {
        let domain = domain.trim().trim_end_matches('/');
        let base = if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base, key.trim_start_matches('/'))
    }
}
