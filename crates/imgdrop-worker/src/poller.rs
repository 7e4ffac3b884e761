//! Long-poll loop with an in-memory delivery cursor.
//!
//! One iteration fetches with the current cursor, dispatches every returned
//! update in order and advances the cursor past each update right after its
//! dispatch. Transport failures put the loop into backoff without touching the
//! cursor. The loop only ends when its [`PollerHandle`] is stopped.

use anyhow::Context;
use imgdrop_core::Config;
use imgdrop_telegram::{BotApi, TransportError, Update};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::UpdateDispatcher;

/// Upper bound on any single backoff, including server-requested ones.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Negative offsets ask for the newest updates only, however long the queue.
const LATEST_UPDATE_OFFSET: i64 = -1;

/// Next update id the loop expects. Never moves backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryCursor {
    next_offset: i64,
}

impl DeliveryCursor {
    pub fn new(next_offset: i64) -> Self {
        Self { next_offset }
    }

    pub fn next_offset(&self) -> i64 {
        self.next_offset
    }

    /// Move past `update_id` if it is not already behind the cursor.
    pub fn advance_past(&mut self, update_id: i64) {
        self.next_offset = self.next_offset.max(update_id + 1);
    }

    /// True when `update_id` was already dispatched.
    pub fn has_seen(&self, update_id: i64) -> bool {
        update_id < self.next_offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Dispatching,
    Backoff,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Server-side long-poll wait.
    pub poll_timeout_secs: u64,
    /// Fixed wait after a conflict or transport error.
    pub backoff: Duration,
    /// Skip updates that queued up while no consumer was running.
    pub drop_pending_updates: bool,
    /// Remove a configured webhook before the first poll.
    pub delete_webhook: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_timeout_secs: 30,
            backoff: Duration::from_secs(5),
            drop_pending_updates: true,
            delete_webhook: true,
        }
    }
}

impl PollerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_timeout_secs: config.poll_timeout().as_secs(),
            backoff: config.poll_backoff(),
            drop_pending_updates: config.drop_pending_updates(),
            delete_webhook: true,
        }
    }

    fn backoff_for(&self, error: &TransportError) -> Duration {
        let delay = match error {
            TransportError::RateLimited { retry_after } => {
                Duration::from_secs(*retry_after).max(self.backoff)
            }
            _ => self.backoff,
        };
        delay.min(MAX_BACKOFF)
    }
}

/// Single consumer of the Bot API update stream.
pub struct PollingLoop {
    bot: Arc<dyn BotApi>,
    dispatcher: Arc<UpdateDispatcher>,
    config: PollerConfig,
}

impl PollingLoop {
    pub fn new(
        bot: Arc<dyn BotApi>,
        dispatcher: Arc<UpdateDispatcher>,
        config: PollerConfig,
    ) -> Self {
        Self {
            bot,
            dispatcher,
            config,
        }
    }

    /// Spawn the loop on the current runtime.
    pub fn start(self) -> PollerHandle {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(PollerState::Idle);

        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token, state_tx).await });

        PollerHandle {
            cancel,
            state: state_rx,
            task,
        }
    }

    async fn run(self, cancel: CancellationToken, state: watch::Sender<PollerState>) -> DeliveryCursor {
        tracing::info!(
            poll_timeout_secs = self.config.poll_timeout_secs,
            backoff_ms = self.config.backoff.as_millis() as u64,
            "Polling loop started"
        );

        if self.config.delete_webhook {
            if let Err(e) = self.bot.delete_webhook().await {
                tracing::warn!(error = %e, "Failed to delete webhook before polling");
            }
        }

        let mut cursor = if self.config.drop_pending_updates {
            self.seed_cursor(&cancel).await
        } else {
            DeliveryCursor::default()
        };

        loop {
            if cancel.is_cancelled() {
                break;
            }

            state.send_replace(PollerState::Polling);
            let fetched = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.bot.fetch_updates(cursor.next_offset(), self.config.poll_timeout_secs) => result,
            };

            match fetched {
                Ok(updates) => {
                    if !updates.is_empty() {
                        state.send_replace(PollerState::Dispatching);
                        tracing::debug!(
                            count = updates.len(),
                            offset = cursor.next_offset(),
                            "Received updates"
                        );
                    }
                    self.dispatch_batch(&updates, &mut cursor).await;
                    state.send_replace(PollerState::Idle);
                }
                Err(e) => {
                    let delay = self.config.backoff_for(&e);
                    state.send_replace(PollerState::Backoff);
                    match &e {
                        TransportError::Conflict => tracing::warn!(
                            backoff_ms = delay.as_millis() as u64,
                            "Another consumer is polling this bot, backing off"
                        ),
                        TransportError::RateLimited { retry_after } => tracing::warn!(
                            retry_after = retry_after,
                            backoff_ms = delay.as_millis() as u64,
                            "Rate limited by Bot API, backing off"
                        ),
                        _ => tracing::error!(
                            error = %e,
                            offset = cursor.next_offset(),
                            backoff_ms = delay.as_millis() as u64,
                            "Failed to fetch updates, backing off"
                        ),
                    }

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        state.send_replace(PollerState::Stopped);
        tracing::info!(offset = cursor.next_offset(), "Polling loop stopped");
        cursor
    }

    async fn dispatch_batch(&self, updates: &[Update], cursor: &mut DeliveryCursor) {
        for update in updates {
            if cursor.has_seen(update.update_id) {
                tracing::debug!(update_id = update.update_id, "Skipping already dispatched update");
                continue;
            }
            self.dispatcher.dispatch(update).await;
            cursor.advance_past(update.update_id);
        }
    }

    /// Place the cursor past whatever queued up while nobody was polling.
    /// Only the newest queued update is fetched; the next poll with the
    /// cursor past it confirms everything older. A failed attempt leaves the
    /// cursor at zero so history is replayed.
    async fn seed_cursor(&self, cancel: &CancellationToken) -> DeliveryCursor {
        let mut cursor = DeliveryCursor::default();

        let fetched = tokio::select! {
            _ = cancel.cancelled() => return cursor,
            result = self.bot.fetch_updates(LATEST_UPDATE_OFFSET, 0) => result,
        };

        match fetched {
            Ok(updates) => {
                if let Some(last) = updates.iter().map(|u| u.update_id).max() {
                    cursor.advance_past(last);
                    tracing::info!(
                        offset = cursor.next_offset(),
                        "Skipped pending updates"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not skip pending updates, starting from offset 0");
            }
        }

        cursor
    }
}

/// Control over a running [`PollingLoop`].
pub struct PollerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<PollerState>,
    task: JoinHandle<DeliveryCursor>,
}

impl PollerHandle {
    /// Ask the loop to exit after its current iteration. An outstanding
    /// long poll is abandoned without moving the cursor.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit and return its final cursor.
    pub async fn join(self) -> anyhow::Result<DeliveryCursor> {
        self.task.await.context("Polling loop task failed")
    }
}
