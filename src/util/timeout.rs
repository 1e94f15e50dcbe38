//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::AuthError;

/// Bound a fallible future; elapsing maps to [`AuthError::Timeout`].
pub async fn with_timeout<T, E>(
    duration: Duration,
    future: impl Future<Output = Result<T, E>>,
) -> Result<T, AuthError>
where
    E: Into<AuthError>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(AuthError::Timeout),
    }
}
