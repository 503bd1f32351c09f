//! Reachability probe for remote images.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::Result;
use crate::types::{AccessReason, AccessibilityResult};

/// Map an HTTP status code to an access reason. Any 2xx is accessible.
pub fn classify_status(status: u16) -> AccessReason {
    match status {
        200..=299 => AccessReason::Ok,
        403 => AccessReason::Forbidden,
        404 => AccessReason::NotFound,
        other => AccessReason::HttpError(other),
    }
}

/// Map a transport-level failure. Timeouts are distinguished; everything else
/// (refused connection, DNS, malformed URL) is a network error.
pub fn classify_error(err: &reqwest::Error) -> AccessibilityResult {
    if err.is_timeout() {
        AccessibilityResult::from_reason(AccessReason::Timeout)
    } else {
        AccessibilityResult::network_error(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct AccessibilityChecker {
    client: reqwest::Client,
}

impl AccessibilityChecker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    /// Issue a GET and classify the outcome. Never errors: failures are values.
    pub async fn check(&self, url: &str) -> AccessibilityResult {
        let result = match self.client.get(url).send().await {
            Ok(response) => {
                AccessibilityResult::from_reason(classify_status(response.status().as_u16()))
            }
            Err(err) => classify_error(&err),
        };

        if result.is_accessible {
            info!(%url, "image URL is accessible");
        } else {
            warn!(%url, reason = ?result.reason, detail = ?result.detail, "image URL is not accessible");
        }
        result
    }
}
