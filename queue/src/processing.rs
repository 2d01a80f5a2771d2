// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Processing strategies
//!
//! What happens to a pack after its completion accounting settles: commit
//! regardless, retry the failed subset, or retry everything. Retries are
//! bounded and spaced by exponential backoff; a pack that exhausts its
//! retries is committed anyway so one poisoned message cannot wedge a
//! partition.
//!

use crate::Msg;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use std::time::Duration;

/// Acknowledgement discipline for one consumer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ProcessingStrategyKind {
    /// Commit the pack whatever happened; failures are only logged.
    CommitAll,
    /// Re-dispatch only the failed and timed-out messages.
    RetryFailed,
    /// Re-dispatch the whole pack when anything failed.
    RetryAll,
}

/// Settled accounting of one pack attempt.
#[derive(Debug, Default)]
pub struct PackOutcome {
    pub succeeded: Vec<Msg>,
    /// Failed messages plus messages unresolved at the pack deadline.
    pub failed: Vec<Msg>,
    pub timed_out: bool,
}

/// What the consumer does next with the pack.
#[derive(Debug)]
pub enum ProcessingDecision {
    /// Commit the consumer offsets and poll the next pack.
    Commit,
    /// Re-dispatch `msgs` after `delay`, without committing.
    Retry { msgs: Vec<Msg>, delay: Duration },
}

/// Per-consumer retry state machine. Holds the retry counter and backoff
/// across attempts of the same pack; both reset on commit.
pub struct ProcessingStrategy {
    kind: ProcessingStrategyKind,
    max_retries: u32,
    retries: u32,
    backoff: ExponentialBackoff,
    max_interval: Duration,
}

impl ProcessingStrategy {
    pub fn new(
        kind: ProcessingStrategyKind,
        max_retries: u32,
        initial_interval: Duration,
        max_interval: Duration,
    ) -> Self {
        ProcessingStrategy {
            kind,
            max_retries,
            retries: 0,
            backoff: Self::build_backoff(initial_interval, max_interval),
            max_interval,
        }
    }

    pub fn kind(&self) -> ProcessingStrategyKind {
        self.kind
    }

    /// Decides the fate of a settled pack. Retried messages carry an
    /// incremented delivery-attempt counter in their metadata.
    pub fn decide(&mut self, outcome: PackOutcome) -> ProcessingDecision {
        if outcome.failed.is_empty() {
            self.reset();
            return ProcessingDecision::Commit;
        }
        match self.kind {
            ProcessingStrategyKind::CommitAll => {
                warn!(
                    failed = outcome.failed.len(),
                    timed_out = outcome.timed_out,
                    "Committing pack with failures."
                );
                self.reset();
                ProcessingDecision::Commit
            }
            ProcessingStrategyKind::RetryFailed
            | ProcessingStrategyKind::RetryAll => {
                if self.retries >= self.max_retries {
                    error!(
                        failed = outcome.failed.len(),
                        retries = self.retries,
                        "Pack retries exhausted, committing anyway."
                    );
                    self.reset();
                    return ProcessingDecision::Commit;
                }
                self.retries += 1;
                let delay = self
                    .backoff
                    .next_backoff()
                    .unwrap_or(self.max_interval);
                let msgs: Vec<Msg> = match self.kind {
                    ProcessingStrategyKind::RetryAll => outcome
                        .succeeded
                        .iter()
                        .chain(outcome.failed.iter())
                        .map(|m| m.with_attempt(m.attempt() + 1))
                        .collect(),
                    _ => outcome
                        .failed
                        .iter()
                        .map(|m| m.with_attempt(m.attempt() + 1))
                        .collect(),
                };
                warn!(
                    retry = self.retries,
                    msgs = msgs.len(),
                    delay_millis = delay.as_millis() as u64,
                    "Retrying pack."
                );
                ProcessingDecision::Retry { msgs, delay }
            }
        }
    }

    fn reset(&mut self) {
        self.retries = 0;
        self.backoff.reset();
    }

    fn build_backoff(
        initial_interval: Duration,
        max_interval: Duration,
    ) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(initial_interval)
            .with_max_interval(max_interval)
            .with_max_elapsed_time(None)
            .build()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{EntityId, Metadata, TenantId};

    use uuid::Uuid;

    fn strategy(kind: ProcessingStrategyKind) -> ProcessingStrategy {
        ProcessingStrategy::new(
            kind,
            3,
            Duration::from_millis(10),
            Duration::from_millis(100),
        )
    }

    fn msg() -> Msg {
        Msg::new(
            EntityId::device(TenantId::random(), Uuid::new_v4()),
            "POST_TELEMETRY_REQUEST",
            Vec::new(),
            Metadata::new(),
        )
    }

    #[test]
    fn clean_pack_commits() {
        let mut strategy = strategy(ProcessingStrategyKind::RetryFailed);
        let decision = strategy.decide(PackOutcome {
            succeeded: vec![msg()],
            ..Default::default()
        });
        assert!(matches!(decision, ProcessingDecision::Commit));
    }

    #[test]
    fn commit_all_ignores_failures() {
        let mut strategy = strategy(ProcessingStrategyKind::CommitAll);
        let decision = strategy.decide(PackOutcome {
            failed: vec![msg()],
            ..Default::default()
        });
        assert!(matches!(decision, ProcessingDecision::Commit));
    }

    #[test]
    fn retry_failed_increments_attempt() {
        let mut strategy = strategy(ProcessingStrategyKind::RetryFailed);
        let failed = msg();
        let decision = strategy.decide(PackOutcome {
            succeeded: vec![msg()],
            failed: vec![failed],
            timed_out: false,
        });
        match decision {
            ProcessingDecision::Retry { msgs, .. } => {
                assert_eq!(msgs.len(), 1);
                assert_eq!(msgs[0].attempt(), 2);
            }
            other => panic!("expected retry, got {:?}", other),
        }
    }

    #[test]
    fn retry_all_replays_whole_pack() {
        let mut strategy = strategy(ProcessingStrategyKind::RetryAll);
        let decision = strategy.decide(PackOutcome {
            succeeded: vec![msg(), msg()],
            failed: vec![msg()],
            timed_out: false,
        });
        match decision {
            ProcessingDecision::Retry { msgs, .. } => {
                assert_eq!(msgs.len(), 3)
            }
            other => panic!("expected retry, got {:?}", other),
        }
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut strategy = strategy(ProcessingStrategyKind::RetryFailed);
        for _ in 0..3 {
            assert!(matches!(
                strategy.decide(PackOutcome {
                    failed: vec![msg()],
                    ..Default::default()
                }),
                ProcessingDecision::Retry { .. }
            ));
        }
        assert!(matches!(
            strategy.decide(PackOutcome {
                failed: vec![msg()],
                ..Default::default()
            }),
            ProcessingDecision::Commit
        ));
    }

    #[test]
    fn commit_resets_the_retry_budget() {
        let mut strategy = strategy(ProcessingStrategyKind::RetryFailed);
        for _ in 0..3 {
            strategy.decide(PackOutcome {
                failed: vec![msg()],
                ..Default::default()
            });
        }
        strategy.decide(PackOutcome::default());
        assert!(matches!(
            strategy.decide(PackOutcome {
                failed: vec![msg()],
                ..Default::default()
            }),
            ProcessingDecision::Retry { .. }
        ));
    }
}
