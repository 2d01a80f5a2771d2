// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Consumer configuration
//!

use crate::{
    ProcessingStrategy, ProcessingStrategyKind, QueueTopology,
    SubmitStrategyKind,
};

use serde::Deserialize;

use std::time::Duration;

/// Everything one queue consumer needs, passed explicitly at construction.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Queue name, e.g. `main` or `high-priority`.
    pub queue: String,
    /// Partition count of the queue topic.
    pub partitions: u32,
    /// Poll blocking time; also the reaction latency for shutdown and
    /// rebalance while the queue is idle.
    pub poll_interval_ms: u64,
    /// Deadline for one pack to settle before unresolved messages count as
    /// failed.
    pub pack_processing_timeout_ms: u64,
    /// Upper bound on messages per pack.
    pub pack_size: usize,
    pub submit_strategy: SubmitStrategyKind,
    pub processing_strategy: ProcessingStrategyKind,
    pub max_retries: u32,
    pub retry_initial_interval_ms: u64,
    pub retry_max_interval_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            queue: "main".to_owned(),
            partitions: 10,
            poll_interval_ms: 25,
            pack_processing_timeout_ms: 2000,
            pack_size: 1000,
            submit_strategy: SubmitStrategyKind::Burst,
            processing_strategy: ProcessingStrategyKind::RetryFailed,
            max_retries: 3,
            retry_initial_interval_ms: 100,
            retry_max_interval_ms: 3000,
        }
    }
}

impl ConsumerConfig {
    pub fn named(queue: impl Into<String>) -> Self {
        ConsumerConfig {
            queue: queue.into(),
            ..Default::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pack_timeout(&self) -> Duration {
        Duration::from_millis(self.pack_processing_timeout_ms)
    }

    pub fn processing(&self) -> ProcessingStrategy {
        ProcessingStrategy::new(
            self.processing_strategy,
            self.max_retries,
            Duration::from_millis(self.retry_initial_interval_ms),
            Duration::from_millis(self.retry_max_interval_ms),
        )
    }

    pub fn topology(&self) -> QueueTopology {
        QueueTopology {
            queue: self.queue.clone(),
            partitions: self.partitions,
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ConsumerConfig::default();
        assert_eq!(config.queue, "main");
        assert!(config.partitions > 0);
        assert!(config.pack_timeout() > config.poll_interval());
    }

    #[test]
    fn named_overrides_only_the_queue() {
        let config = ConsumerConfig::named("hp");
        assert_eq!(config.queue, "hp");
        assert_eq!(config.max_retries, ConsumerConfig::default().max_retries);
        assert_eq!(config.topology().partitions, config.partitions);
    }
}
