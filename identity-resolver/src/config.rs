//! Configuration for the identity resolution pipeline.

use std::time::Duration;

/// Settings applied to every `resolve_identity` call.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upper bound for one whole resolution, locks and writes included.
    ///
    /// On expiry the open transaction is dropped, which rolls it back.
    pub request_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ResolverConfig {
    pub fn with_request_timeout(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}
