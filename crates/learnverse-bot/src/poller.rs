//! Long-poll loop.
//!
//! Fetches update batches, advances the offset past each batch, and hands
//! every update to the dispatcher on its own task. Transport errors back
//! off exponentially; platform flood control waits the advertised delay.
//! A handler that panics while serving a private chat is followed by the
//! dispatcher's apology. On shutdown the loop stops fetching and waits for
//! in-flight handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use learnverse_core::ChatId;
use learnverse_telegram::{PlatformError, TelegramClient, Update};
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Where updates come from.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Updates with id `>= offset`, waiting up to `timeout_secs` for one.
    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> learnverse_telegram::Result<Vec<Update>>;
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> learnverse_telegram::Result<Vec<Update>> {
        TelegramClient::get_updates(self, offset, timeout_secs).await
    }
}

/// Drives an [`UpdateSource`] into a [`Dispatcher`].
pub struct Poller {
    source: Arc<dyn UpdateSource>,
    dispatcher: Dispatcher,
    timeout_secs: u64,
    cancel: CancellationToken,
}

impl Poller {
    /// Poller that stops when `cancel` fires.
    pub fn new(
        source: Arc<dyn UpdateSource>,
        dispatcher: Dispatcher,
        timeout_secs: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            dispatcher,
            timeout_secs,
            cancel,
        }
    }

    /// Poll until cancelled.
    pub async fn run(self) {
        info!(timeout_secs = self.timeout_secs, "polling for updates");
        let mut offset = 0_i64;
        let mut backoff = INITIAL_BACKOFF;
        let mut handlers = InFlight::default();

        'polling: loop {
            let poll = self.source.get_updates(offset, self.timeout_secs);
            tokio::pin!(poll);
            // Finished handlers are reaped while the long poll is pending.
            let batch = loop {
                tokio::select! {
                    () = self.cancel.cancelled() => break 'polling,
                    batch = &mut poll => break batch,
                    Some(joined) = handlers.tasks.join_next_with_id() => {
                        handlers.reap(&self.dispatcher, joined);
                    }
                }
            };

            let pause = match batch {
                Ok(updates) => {
                    backoff = INITIAL_BACKOFF;
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        handlers.spawn(&self.dispatcher, update);
                    }
                    None
                }
                Err(PlatformError::RateLimited { retry_after_secs }) => {
                    warn!(retry_after_secs, "polling rate limited");
                    Some(Duration::from_secs(retry_after_secs))
                }
                Err(err) => {
                    warn!(error = %err, backoff_ms = backoff.as_millis(), "polling failed");
                    let pause = backoff;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    Some(pause)
                }
            };

            if let Some(pause) = pause {
                tokio::select! {
                    () = self.cancel.cancelled() => break,
                    () = tokio::time::sleep(pause) => {}
                }
            }
        }

        debug!(in_flight = handlers.tasks.len(), "poller stopping");
        while let Some(joined) = handlers.tasks.join_next_with_id().await {
            handlers.reap(&self.dispatcher, joined);
        }
        info!("poller stopped");
    }
}

/// Running handlers, and the private chat each one is serving.
#[derive(Default)]
struct InFlight {
    tasks: JoinSet<()>,
    chats: HashMap<task::Id, ChatId>,
}

impl InFlight {
    fn spawn(&mut self, dispatcher: &Dispatcher, update: Update) {
        let chat = update.private_chat();
        let dispatcher = dispatcher.clone();
        let handle = self.tasks.spawn(async move { dispatcher.handle(update).await });
        if let Some(chat) = chat {
            let _ = self.chats.insert(handle.id(), chat);
        }
    }

    fn reap(&mut self, dispatcher: &Dispatcher, joined: Result<(task::Id, ()), JoinError>) {
        let (id, failure) = match joined {
            Ok((id, ())) => (id, None),
            Err(e) => (e.id(), Some(e)),
        };
        let chat = self.chats.remove(&id);
        let Some(e) = failure.filter(JoinError::is_panic) else {
            return;
        };
        error!(error = %e, ?chat, "update handler panicked");
        if let Some(chat) = chat {
            let dispatcher = dispatcher.clone();
            let _ = self.tasks.spawn(async move { dispatcher.apologize(chat).await });
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
