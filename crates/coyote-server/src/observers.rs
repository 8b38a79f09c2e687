//! Fire-and-forget fan-out of lifecycle events to callbacks.
//!
//! Each received event is handed to the callback on its own task. Callbacks
//! never block the emitter or each other, and two invocations of the same
//! callback carry no ordering guarantee.

use std::future::Future;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

/// Run `handler` for every event on `rx` until the channel closes.
pub fn spawn_observer<E, F, Fut>(mut rx: broadcast::Receiver<E>, handler: F) -> JoinHandle<()>
where
    E: Clone + Send + 'static,
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let _detached = tokio::spawn(handler(event));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "observer lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
