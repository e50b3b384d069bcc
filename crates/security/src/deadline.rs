//! Deadline wrapper for store calls

use objacl_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run a store call, failing with [`Error::Timeout`] once `limit` elapses
pub(crate) async fn within<T, F>(operation: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "store call timed out");
            Err(Error::timeout(operation, limit))
        }
    }
}
