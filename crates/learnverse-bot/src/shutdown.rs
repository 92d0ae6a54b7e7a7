//! Stopping the poller and the health server together.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long tasks get to drain before shutdown gives up on them.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the token every long-running task watches.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Coordinator whose token has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that fires on shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fire the token.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether the token has fired.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fire the token, then give the named tasks `timeout` in total to
    /// finish. Stragglers are aborted. Returns the names of aborted tasks.
    pub async fn drain(
        &self,
        tasks: Vec<(&'static str, JoinHandle<()>)>,
        timeout: Duration,
    ) -> Vec<&'static str> {
        self.shutdown();
        info!(tasks = tasks.len(), timeout_ms = timeout.as_millis(), "draining");

        let deadline = tokio::time::Instant::now() + timeout;
        let mut aborted = Vec::new();
        for (name, mut handle) in tasks {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                warn!(task = name, "task did not stop in time; aborting");
                handle.abort();
                aborted.push(name);
            }
        }
        aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_follow_the_coordinator() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        assert!(!coord.is_shutting_down());
        coord.shutdown();
        coord.shutdown();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cooperative_tasks_stop_cleanly() {
        let coord = ShutdownCoordinator::new();
        let poller = coord.token();
        let server = coord.token();
        let aborted = coord
            .drain(
                vec![
                    ("poller", tokio::spawn(async move { poller.cancelled().await })),
                    ("server", tokio::spawn(async move { server.cancelled().await })),
                ],
                DEFAULT_DRAIN_TIMEOUT,
            )
            .await;
        assert!(aborted.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_tasks_are_aborted_by_name() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let aborted = coord
            .drain(
                vec![
                    ("poller", tokio::spawn(async move { token.cancelled().await })),
                    (
                        "server",
                        tokio::spawn(tokio::time::sleep(Duration::from_secs(300))),
                    ),
                ],
                Duration::from_millis(100),
            )
            .await;
        assert_eq!(aborted, ["server"]);
    }
}
