// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Queue consumer
//!
//! The long-running loop that owns one consumer-group membership: poll a
//! pack, hand it to the dispatcher through the configured submit strategy,
//! wait for the pack to settle, let the processing strategy decide between
//! commit and retry, then poll again. Partition rebalances are queued and
//! applied only between packs, so a pack in flight is always fully
//! accounted against the offsets it was polled under.
//!

use crate::submit::submit_pack;
use crate::{
    ConsumerConfig, Error, Msg, MsgCallback, MsgConsumer, MsgDispatcher,
    PackOutcome, PartitionChangeEvent, ProcessingDecision,
    ProcessingStrategy,
};

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Consumer loop phases.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConsumerState {
    Stopped,
    Subscribing,
    Polling,
    Submitting,
    AwaitingCompletion,
}

/// Completion accounting for one pack attempt. Message callbacks resolve
/// into here; the consumer waits until everything settled or the pack
/// deadline passed.
struct PackContext {
    pending: Mutex<HashMap<Uuid, Msg>>,
    succeeded: Mutex<Vec<Msg>>,
    failed: Mutex<Vec<Msg>>,
    settled: Notify,
}

impl PackContext {
    fn new(msgs: &[Msg]) -> Arc<Self> {
        Arc::new(PackContext {
            pending: Mutex::new(
                msgs.iter().map(|m| (m.id, m.clone())).collect(),
            ),
            succeeded: Mutex::new(Vec::new()),
            failed: Mutex::new(Vec::new()),
            settled: Notify::new(),
        })
    }

    fn callback_for(self: &Arc<Self>, id: Uuid) -> MsgCallback {
        let on_success = self.clone();
        let on_failure = self.clone();
        MsgCallback::new(
            move || on_success.resolve(id, None),
            move |error| on_failure.resolve(id, Some(error)),
        )
    }

    // Late resolutions after the deadline drained `pending` are no-ops.
    fn resolve(&self, id: Uuid, error: Option<Error>) {
        let Some(msg) =
            self.pending.lock().ok().and_then(|mut p| p.remove(&id))
        else {
            return;
        };
        match error {
            None => {
                if let Ok(mut succeeded) = self.succeeded.lock() {
                    succeeded.push(msg);
                }
            }
            Some(error) => {
                debug!(id = %id, %error, "Message failed.");
                if let Ok(mut failed) = self.failed.lock() {
                    failed.push(msg);
                }
            }
        }
        if self.is_settled() {
            self.settled.notify_one();
        }
    }

    fn is_settled(&self) -> bool {
        self.pending.lock().map(|p| p.is_empty()).unwrap_or(true)
    }

    /// Waits for all messages to resolve; false when the deadline passed
    /// first.
    async fn wait_settled(&self, deadline: Instant) -> bool {
        loop {
            let notified = self.settled.notified();
            if self.is_settled() {
                return true;
            }
            if timeout_at(deadline, notified).await.is_err() {
                return self.is_settled();
            }
        }
    }

    /// Drains the accounting. Messages still pending count as failed when
    /// the pack timed out.
    fn outcome(&self, timed_out: bool) -> PackOutcome {
        let mut failed = self
            .failed
            .lock()
            .map(|mut f| std::mem::take(&mut *f))
            .unwrap_or_default();
        if timed_out {
            if let Ok(mut pending) = self.pending.lock() {
                failed.extend(pending.drain().map(|(_, m)| m));
            }
        }
        PackOutcome {
            succeeded: self
                .succeeded
                .lock()
                .map(|mut s| std::mem::take(&mut *s))
                .unwrap_or_default(),
            failed,
            timed_out,
        }
    }
}

/// One consumer-group member bound to one queue.
pub struct QueueConsumer {
    config: ConsumerConfig,
    consumer: Box<dyn MsgConsumer>,
    dispatcher: Arc<dyn MsgDispatcher>,
    strategy: ProcessingStrategy,
    partition_events: watch::Receiver<PartitionChangeEvent>,
    token: CancellationToken,
    state: ConsumerState,
    /// Backoff for substrate errors; unbounded, reset on any success.
    broker_backoff: ExponentialBackoff,
}

impl QueueConsumer {
    pub fn new(
        config: ConsumerConfig,
        consumer: Box<dyn MsgConsumer>,
        dispatcher: Arc<dyn MsgDispatcher>,
        partition_events: watch::Receiver<PartitionChangeEvent>,
        token: CancellationToken,
    ) -> Self {
        let strategy = config.processing();
        let broker_backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(config.poll_interval())
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(None)
            .build();
        QueueConsumer {
            config,
            consumer,
            dispatcher,
            strategy,
            partition_events,
            token,
            state: ConsumerState::Stopped,
            broker_backoff,
        }
    }

    fn broker_error_delay(&mut self) -> Duration {
        self.broker_backoff
            .next_backoff()
            .unwrap_or(Duration::from_secs(10))
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the cancellation token fires.
    pub async fn run(mut self) {
        info!(queue = %self.config.queue, "Queue consumer starting.");
        self.state = ConsumerState::Subscribing;
        loop {
            if self.token.is_cancelled() {
                break;
            }
            // Rebalances queue up in the watch channel and are applied
            // here, never while a pack is in flight.
            if self
                .partition_events
                .has_changed()
                .unwrap_or(false)
            {
                self.state = ConsumerState::Subscribing;
            }
            match self.state {
                ConsumerState::Stopped => break,
                ConsumerState::Subscribing => self.subscribe().await,
                _ => self.poll_once().await,
            }
        }
        self.state = ConsumerState::Stopped;
        info!(queue = %self.config.queue, "Queue consumer stopped.");
    }

    async fn subscribe(&mut self) {
        let partitions = self
            .partition_events
            .borrow_and_update()
            .my_partitions(&self.config.queue);
        info!(
            queue = %self.config.queue,
            partitions = partitions.len(),
            "Subscribing to owned partitions."
        );
        match self.consumer.subscribe(partitions).await {
            Ok(()) => {
                self.broker_backoff.reset();
                self.state = ConsumerState::Polling;
            }
            Err(error) => {
                let delay = self.broker_error_delay();
                warn!(%error, ?delay, "Subscribe failed, retrying.");
                sleep(delay).await;
            }
        }
    }

    async fn poll_once(&mut self) {
        self.state = ConsumerState::Polling;
        let batch =
            match self.consumer.poll(self.config.poll_interval()).await {
                Ok(batch) => {
                    self.broker_backoff.reset();
                    batch
                }
                Err(error) => {
                    let delay = self.broker_error_delay();
                    warn!(%error, ?delay, "Poll failed, retrying.");
                    sleep(delay).await;
                    return;
                }
            };
        if batch.is_empty() {
            return;
        }
        let msgs: Vec<Msg> = batch
            .iter()
            .take(self.config.pack_size)
            .filter_map(|raw| match Msg::from_bytes(&raw.payload) {
                Ok(msg) => Some(msg),
                Err(error) => {
                    // Undecodable records are dropped; their offsets are
                    // committed with the pack.
                    warn!(
                        %error,
                        partition = raw.partition,
                        offset = raw.offset,
                        "Skipping undecodable record."
                    );
                    None
                }
            })
            .collect();
        self.process_pack(msgs).await;
    }

    async fn process_pack(&mut self, mut msgs: Vec<Msg>) {
        loop {
            if msgs.is_empty() {
                break;
            }
            let ctx = PackContext::new(&msgs);
            let entries: Vec<(Msg, MsgCallback)> = msgs
                .iter()
                .map(|m| (m.clone(), ctx.callback_for(m.id)))
                .collect();
            debug!(
                queue = %self.config.queue,
                pack = entries.len(),
                "Submitting pack."
            );
            self.state = ConsumerState::Submitting;
            // Blocking strategies stall inside submit_pack on a dropped
            // callback, so the pack deadline bounds submission and
            // completion together. Abandoned submissions leave their
            // messages pending; outcome() counts those as failed.
            let deadline = Instant::now() + self.config.pack_timeout();
            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = submit_pack(
                    self.config.submit_strategy,
                    entries,
                    self.dispatcher.as_ref(),
                ) => {}
                _ = sleep_until(deadline) => {
                    warn!(
                        queue = %self.config.queue,
                        "Pack deadline passed while submitting."
                    );
                }
            }
            self.state = ConsumerState::AwaitingCompletion;
            let settled = ctx.wait_settled(deadline).await;
            match self.strategy.decide(ctx.outcome(!settled)) {
                ProcessingDecision::Commit => break,
                ProcessingDecision::Retry { msgs: retry, delay } => {
                    tokio::select! {
                        _ = self.token.cancelled() => return,
                        _ = sleep(delay) => {}
                    }
                    msgs = retry;
                }
            }
        }
        if let Err(error) = self.consumer.commit().await {
            warn!(%error, "Commit failed; pack will be redelivered.");
        }
        self.state = ConsumerState::Polling;
    }
}
