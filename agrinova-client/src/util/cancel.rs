use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, ClientResult};

/// Runs `fut` until it finishes or `token` is cancelled, whichever is first.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    if token.is_cancelled() {
        return Err(ClientError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ClientError::Cancelled),
        res = fut => res,
    }
}
