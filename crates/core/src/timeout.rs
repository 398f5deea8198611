//! Timeout wrapper for store calls.
//!
//! A slow cache must not stall the authentication path, so every session
//! store and key-value call goes through [`bounded`].

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

/// Await `fut`, failing with [`StoreError::Timeout`] after `limit`.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
