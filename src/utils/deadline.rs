//! Bounded store calls

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::types::*;

/// Run a store call, failing with [`StoreError::Timeout`] once `limit` elapses
pub async fn within<T, F>(limit: Duration, operation: &'static str, call: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(StoreError::Timeout {
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            }
            .into())
        }
    }
}
