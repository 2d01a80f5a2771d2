// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Partitioned queue layer
//!
//! Message transport between producers and the rule engine: topic and
//! consumer-group naming ([`TopicService`]), deterministic partition
//! ownership ([`PartitionService`]), an in-memory substrate
//! ([`InMemoryBroker`]) behind the [`MsgProducer`]/[`MsgConsumer`] traits,
//! and the [`QueueConsumer`] loop combining a submit strategy (dispatch
//! shape) with a processing strategy (commit/retry discipline).
//!
//! Acknowledgement flows back through [`MsgCallback`] handles;
//! [`BranchingCallback`] keeps fan-out accounting correct when the engine
//! routes one message down several branches.

mod callback;
mod config;
mod consumer;
mod error;
mod memory;
mod msg;
mod partition;
mod processing;
mod submit;
mod topic;

pub use callback::{BranchingCallback, MsgCallback};
pub use config::ConsumerConfig;
pub use consumer::{ConsumerState, QueueConsumer};
pub use error::Error;
pub use memory::{
    InMemoryBroker, InMemoryConsumer, MsgConsumer, MsgProducer, RawMsg,
};
pub use msg::{
    EntityId, EntityKind, Metadata, Msg, TenantId, ATTEMPT_KEY,
};
pub use partition::{
    PartitionChangeEvent, PartitionService, QueueTopology,
};
pub use processing::{
    PackOutcome, ProcessingDecision, ProcessingStrategy,
    ProcessingStrategyKind,
};
pub use submit::{submit_pack, MsgDispatcher, SubmitStrategyKind};
pub use topic::{ServiceKind, TopicPartitionInfo, TopicService};
