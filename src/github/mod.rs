pub mod client;
pub mod rate_limiter;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::GitHubClient;
pub use rate_limiter::{RateLimitSnapshot, RateLimiter};
pub use transport::{HttpResponse, ReqwestTransport, Transport, TransportError};
