//! Bounded, cancellable cluster calls.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

/// Whether shutdown has already been requested.
pub(crate) fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Resolve once shutdown is requested or the sender is gone.
///
/// Updates that leave the flag `false` are ignored.
pub(crate) async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Run `call` under `timeout`, racing it against shutdown.
///
/// Returns `None` if shutdown fired first (the call is dropped, which
/// aborts it). A timeout is turned into an error with `on_timeout`.
pub(crate) async fn bounded<T, E, F>(
    shutdown: &mut watch::Receiver<bool>,
    timeout: Duration,
    call: F,
    on_timeout: impl FnOnce(Duration) -> E,
) -> Option<Result<T, E>>
where
    F: Future<Output = Result<T, E>>,
{
    if is_shutdown(shutdown) {
        return None;
    }

    tokio::select! {
        biased;
        _ = shutdown_signalled(shutdown) => None,
        result = tokio::time::timeout(timeout, call) => Some(match result {
            Ok(inner) => inner,
            Err(_) => Err(on_timeout(timeout)),
        }),
    }
}
