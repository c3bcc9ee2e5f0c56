//! Shutdown signalling shared by the scheduler's background loops.

use tokio::sync::watch;

/// Resolve once `shutdown` holds `true` or its sender is gone.
///
/// Resolves to `()` so no `watch::Ref` guard outlives the call, which keeps
/// `select!` loops built on it `Send`.
pub async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn resolves_when_flag_set() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { stop_requested(&mut rx).await });
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("should resolve on true")
            .unwrap();
    }

    #[tokio::test]
    async fn resolves_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), stop_requested(&mut rx))
            .await
            .expect("should resolve once the sender is gone");
    }

    #[tokio::test]
    async fn stays_pending_while_false() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(false).unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(50), stop_requested(&mut rx)).await;
        assert!(waited.is_err());
        drop(tx);
    }
}
