// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # In-memory queue substrate
//!
//! Append-only partition logs with committed consumer offsets, used for
//! monolith deployments and tests. Delivery is at-least-once: offsets
//! advance on poll but survive only on commit, so a consumer torn down
//! between poll and commit sees the same messages again.
//!

use crate::{Error, TopicPartitionInfo};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One record as stored by the substrate.
#[derive(Clone, Debug, PartialEq)]
pub struct RawMsg {
    pub partition: u32,
    pub offset: u64,
    pub payload: Vec<u8>,
}

/// Write side of a queue substrate.
#[async_trait]
pub trait MsgProducer: Send + Sync {
    /// Appends `payload` to the addressed partition.
    async fn send(
        &self,
        tpi: &TopicPartitionInfo,
        payload: Vec<u8>,
    ) -> Result<(), Error>;
}

/// Read side of a queue substrate, bound to one topic and consumer group.
#[async_trait]
pub trait MsgConsumer: Send + Sync {
    fn topic(&self) -> &str;

    /// Replaces the set of explicitly-assigned partitions. Positions
    /// resume from the group's committed offsets.
    async fn subscribe(
        &mut self,
        partitions: BTreeSet<u32>,
    ) -> Result<(), Error>;

    /// Returns the next batch, blocking up to `timeout` when the assigned
    /// partitions are empty. An empty vec means the timeout elapsed.
    async fn poll(&mut self, timeout: Duration) -> Result<Vec<RawMsg>, Error>;

    /// Commits the offsets of everything returned by `poll` so far.
    async fn commit(&mut self) -> Result<(), Error>;
}

#[derive(Default)]
struct BrokerState {
    /// (topic, partition) -> append-only log.
    logs: HashMap<(String, u32), Vec<Vec<u8>>>,
    /// (group, topic, partition) -> first uncommitted offset.
    committed: HashMap<(String, String, u32), u64>,
}

/// Shared in-process broker. Cloning shares the underlying logs.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    appended: Arc<Notify>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        InMemoryBroker::default()
    }

    /// New consumer for `topic` in `group`, reading at most `max_batch`
    /// records per poll. Starts with no assigned partitions.
    pub fn consumer(
        &self,
        topic: impl Into<String>,
        group: impl Into<String>,
        max_batch: usize,
    ) -> InMemoryConsumer {
        InMemoryConsumer {
            broker: self.clone(),
            topic: topic.into(),
            group: group.into(),
            max_batch,
            partitions: BTreeSet::new(),
            positions: HashMap::new(),
        }
    }

    /// Records appended to a partition, committed or not. Test hook.
    pub fn partition_len(&self, topic: &str, partition: u32) -> usize {
        self.state
            .lock()
            .map(|state| {
                state
                    .logs
                    .get(&(topic.to_owned(), partition))
                    .map(Vec::len)
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl MsgProducer for InMemoryBroker {
    async fn send(
        &self,
        tpi: &TopicPartitionInfo,
        payload: Vec<u8>,
    ) -> Result<(), Error> {
        let partition = tpi.partition.unwrap_or(0);
        let mut state = self
            .state
            .lock()
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        state
            .logs
            .entry((tpi.topic.clone(), partition))
            .or_default()
            .push(payload);
        drop(state);
        self.appended.notify_waiters();
        Ok(())
    }
}

/// Consumer over [`InMemoryBroker`] with explicit partition assignment.
pub struct InMemoryConsumer {
    broker: InMemoryBroker,
    topic: String,
    group: String,
    max_batch: usize,
    partitions: BTreeSet<u32>,
    /// Next offset to read per partition; ahead of the committed offset
    /// while a pack is in flight.
    positions: HashMap<u32, u64>,
}

impl InMemoryConsumer {
    fn fetch(&mut self) -> Result<Vec<RawMsg>, Error> {
        let state = self
            .broker
            .state
            .lock()
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        let mut batch = Vec::new();
        for partition in &self.partitions {
            let position = self.positions.entry(*partition).or_insert(0);
            let Some(log) =
                state.logs.get(&(self.topic.clone(), *partition))
            else {
                continue;
            };
            while (*position as usize) < log.len()
                && batch.len() < self.max_batch
            {
                batch.push(RawMsg {
                    partition: *partition,
                    offset: *position,
                    payload: log[*position as usize].clone(),
                });
                *position += 1;
            }
            if batch.len() >= self.max_batch {
                break;
            }
        }
        Ok(batch)
    }
}

#[async_trait]
impl MsgConsumer for InMemoryConsumer {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn subscribe(
        &mut self,
        partitions: BTreeSet<u32>,
    ) -> Result<(), Error> {
        let state = self
            .broker
            .state
            .lock()
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        self.positions = partitions
            .iter()
            .map(|p| {
                let committed = state
                    .committed
                    .get(&(self.group.clone(), self.topic.clone(), *p))
                    .copied()
                    .unwrap_or(0);
                (*p, committed)
            })
            .collect();
        self.partitions = partitions;
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Vec<RawMsg>, Error> {
        let deadline = Instant::now() + timeout;
        let notify = self.broker.appended.clone();
        loop {
            // Register before scanning so an append between the scan and
            // the wait still wakes us.
            let appended = notify.notified();
            let batch = self.fetch()?;
            if !batch.is_empty() {
                return Ok(batch);
            }
            if timeout_at(deadline, appended).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn commit(&mut self) -> Result<(), Error> {
        let mut state = self
            .broker
            .state
            .lock()
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        for (partition, position) in &self.positions {
            state.committed.insert(
                (self.group.clone(), self.topic.clone(), *partition),
                *position,
            );
        }
        Ok(())
    }
}
