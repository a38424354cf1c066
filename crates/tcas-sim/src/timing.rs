//! Cancellable delays shared by the runway protocol and the task loops.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Sleep for `duration` unless the token fires first. Returns true when
/// the full duration elapsed, false when the sleep was cancelled.
pub(crate) async fn sleep_unless_cancelled(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let cancel = CancellationToken::new();
        assert!(sleep_unless_cancelled(Duration::from_millis(5), &cancel).await);
    }

    #[tokio::test]
    async fn returns_early_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = std::time::Instant::now();
        assert!(!sleep_unless_cancelled(Duration::from_secs(30), &cancel).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
