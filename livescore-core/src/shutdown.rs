//! Cooperative stop signal shared by background tasks.

use tokio::sync::watch;

/// Resolves once `rx` holds `true` or its sender has been dropped.
///
/// The borrowed value is released before returning, so the future can be
/// raced in a `select!` whose other arms await.
pub async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
