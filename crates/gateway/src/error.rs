use gallery_core::error::{GenerationError, PollError};

/// Errors from the model service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum HttpGatewayError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Model service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The configured endpoint is not a usable base URL.
    #[error("Invalid model service endpoint: {0}")]
    InvalidEndpoint(String),
}

impl HttpGatewayError {
    /// Transport failures and throttling/5xx responses may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Api { status, .. } => crate::retry::is_retryable_status(*status),
            Self::Decode(_) | Self::InvalidEndpoint(_) => false,
        }
    }
}

impl From<HttpGatewayError> for GenerationError {
    fn from(err: HttpGatewayError) -> Self {
        match err {
            HttpGatewayError::Request(e) => GenerationError::Transport(Box::new(e)),
            HttpGatewayError::Api { status, body } => GenerationError::Service { status, body },
            HttpGatewayError::Decode(msg) => GenerationError::InvalidResponse(msg),
            HttpGatewayError::InvalidEndpoint(msg) => GenerationError::Transport(msg.into()),
        }
    }
}

impl From<HttpGatewayError> for PollError {
    fn from(err: HttpGatewayError) -> Self {
        match err {
            HttpGatewayError::Request(e) => PollError::Transport(Box::new(e)),
            HttpGatewayError::Api { status, body } => PollError::Service { status, body },
            HttpGatewayError::Decode(msg) => PollError::InvalidResponse(msg),
            HttpGatewayError::InvalidEndpoint(msg) => PollError::Transport(msg.into()),
        }
    }
}
