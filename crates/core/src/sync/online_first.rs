//! Online-first call with transparent offline fallback.

use std::future::Future;

use log::{debug, warn};

use crate::errors::{Error, RemoteError, Result};
use crate::remote::CredentialStore;

/// Result of trying the remote call first.
#[derive(Debug)]
pub enum OnlineAttempt<T> {
    /// The server answered successfully.
    Completed(T),
    /// The call could not be made or failed transiently; the caller should
    /// take the local path. Carries the transient error, if any.
    Offline(Option<RemoteError>),
}

/// Try `call` with the current access token.
///
/// A 4xx answer is terminal and propagates as `Error::Remote`. Any other
/// failure, or a missing token, yields `OnlineAttempt::Offline`.
pub async fn attempt_online<T, F, Fut>(
    credentials: &dyn CredentialStore,
    call: F,
) -> Result<OnlineAttempt<T>>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = std::result::Result<T, RemoteError>>,
{
    let Some(token) = credentials
        .access_token()
        .filter(|value| !value.trim().is_empty())
    else {
        debug!("[OfflineSync] No access token, using local path");
        return Ok(OnlineAttempt::Offline(None));
    };

    match call(token).await {
        Ok(value) => Ok(OnlineAttempt::Completed(value)),
        Err(err) if err.is_terminal() => Err(Error::Remote(err)),
        Err(err) => {
            warn!("[OfflineSync] Remote call failed, falling back to local path: {}", err);
            Ok(OnlineAttempt::Offline(Some(err)))
        }
    }
}
