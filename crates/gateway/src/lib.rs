//! Client for the external generative-model service.
//!
//! [`GenerationGateway`] is the seam the rest of the system depends on;
//! [`HttpGateway`] is the production implementation over the service's
//! REST API.

pub mod body;
pub mod error;
pub mod gateway;
pub mod http;
pub mod retry;

pub use error::HttpGatewayError;
pub use gateway::GenerationGateway;
pub use http::{GatewayConfig, HttpGateway};
pub use retry::RetryConfig;
