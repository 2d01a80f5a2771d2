// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Rule node behaviors
//!
//! A node's logic is a [`RuleNodeBehavior`]: a message in, a
//! [`NodeOutcome`] out. Behaviors never block the chain on external
//! acknowledgement and never mutate the incoming envelope; transformation
//! goes through derived copies. A handful of built-in behaviors cover the
//! common routing, filtering and transformation cases.
//!

use crate::chain::RuleChainId;

use async_trait::async_trait;
use queue::Msg;
use tracing::info;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

/// What a node decided about one message.
#[derive(Debug)]
pub enum NodeOutcome {
    /// Forward `msg` along every listed relation label.
    Route { relations: Vec<String>, msg: Msg },
    /// Terminal success for this branch; the callback is acknowledged.
    Done,
    /// Node-level failure. Routed along a `Failure` link when the chain
    /// has one, otherwise terminal.
    Failed(String),
    /// Hand the message to another chain of the same tenant.
    Jump { chain: RuleChainId, msg: Msg },
}

impl NodeOutcome {
    /// Convenience for the common single-relation case.
    pub fn route(label: impl Into<String>, msg: Msg) -> Self {
        NodeOutcome::Route {
            relations: vec![label.into()],
            msg,
        }
    }
}

/// The logic of one rule node.
///
/// `process` borrows the behavior immutably: one behavior instance may be
/// shared by several chain instances, and node actors must not serialize on
/// each other. State, where genuinely needed, lives in atomics or locks
/// inside the behavior.
#[async_trait]
pub trait RuleNodeBehavior: Send + Sync + 'static {
    /// Behavior kind label used in logs and debug output.
    fn kind(&self) -> &str;

    async fn process(&self, msg: Msg) -> NodeOutcome;
}

/// Routes every message along its own type tag, fanning a mixed stream out
/// to per-type sub-graphs.
pub struct MsgTypeSwitchNode;

#[async_trait]
impl RuleNodeBehavior for MsgTypeSwitchNode {
    fn kind(&self) -> &str {
        "msg-type-switch"
    }

    async fn process(&self, msg: Msg) -> NodeOutcome {
        let relation = msg.msg_type.clone();
        NodeOutcome::route(relation, msg)
    }
}

/// Routes `True` when the message type is in the allow list, `False`
/// otherwise.
pub struct MsgTypeFilterNode {
    allowed: HashSet<String>,
}

impl MsgTypeFilterNode {
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        MsgTypeFilterNode {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl RuleNodeBehavior for MsgTypeFilterNode {
    fn kind(&self) -> &str {
        "msg-type-filter"
    }

    async fn process(&self, msg: Msg) -> NodeOutcome {
        let relation = if self.allowed.contains(&msg.msg_type) {
            "True"
        } else {
            "False"
        };
        NodeOutcome::route(relation, msg)
    }
}

/// Routes `True` when the metadata entry under `key` equals `value`,
/// `False` otherwise, including when the key is absent.
pub struct MetadataFilterNode {
    key: String,
    value: String,
}

impl MetadataFilterNode {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        MetadataFilterNode {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
impl RuleNodeBehavior for MetadataFilterNode {
    fn kind(&self) -> &str {
        "metadata-filter"
    }

    async fn process(&self, msg: Msg) -> NodeOutcome {
        let relation = if msg.metadata.get(&self.key)
            == Some(self.value.as_str())
        {
            "True"
        } else {
            "False"
        };
        NodeOutcome::route(relation, msg)
    }
}

/// Adds one metadata entry and routes `Success`.
pub struct SetMetadataNode {
    key: String,
    value: String,
}

impl SetMetadataNode {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        SetMetadataNode {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
impl RuleNodeBehavior for SetMetadataNode {
    fn kind(&self) -> &str {
        "set-metadata"
    }

    async fn process(&self, msg: Msg) -> NodeOutcome {
        let derived = msg.with_metadata_value(&self.key, &self.value);
        NodeOutcome::route("Success", derived)
    }
}

/// Logs the envelope and routes `Success`.
pub struct LogNode;

#[async_trait]
impl RuleNodeBehavior for LogNode {
    fn kind(&self) -> &str {
        "log"
    }

    async fn process(&self, msg: Msg) -> NodeOutcome {
        info!(
            id = %msg.id,
            originator = %msg.originator,
            msg_type = %msg.msg_type,
            payload_bytes = msg.payload.len(),
            "Rule engine message."
        );
        NodeOutcome::route("Success", msg)
    }
}

/// Terminal acknowledgement: ends the branch successfully.
pub struct AckNode;

#[async_trait]
impl RuleNodeBehavior for AckNode {
    fn kind(&self) -> &str {
        "ack"
    }

    async fn process(&self, _msg: Msg) -> NodeOutcome {
        NodeOutcome::Done
    }
}

/// Hands the message over to another chain of the same tenant.
pub struct ChainInputNode {
    target: RuleChainId,
}

impl ChainInputNode {
    pub fn new(target: RuleChainId) -> Self {
        ChainInputNode { target }
    }
}

#[async_trait]
impl RuleNodeBehavior for ChainInputNode {
    fn kind(&self) -> &str {
        "chain-input"
    }

    async fn process(&self, msg: Msg) -> NodeOutcome {
        NodeOutcome::Jump {
            chain: self.target,
            msg,
        }
    }
}

/// Fails every delivery whose attempt counter is at or below the
/// threshold, then succeeds. Exercises redelivery and retry handling.
pub struct FailFirstAttemptsNode {
    fail_through: u32,
    seen: AtomicU32,
}

impl FailFirstAttemptsNode {
    pub fn new(fail_through: u32) -> Self {
        FailFirstAttemptsNode {
            fail_through,
            seen: AtomicU32::new(0),
        }
    }

    /// Number of deliveries observed so far.
    pub fn deliveries(&self) -> u32 {
        self.seen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleNodeBehavior for FailFirstAttemptsNode {
    fn kind(&self) -> &str {
        "fail-first-attempts"
    }

    async fn process(&self, msg: Msg) -> NodeOutcome {
        self.seen.fetch_add(1, Ordering::SeqCst);
        if msg.attempt() <= self.fail_through {
            NodeOutcome::Failed(format!(
                "induced failure on attempt {}",
                msg.attempt()
            ))
        } else {
            NodeOutcome::route("Success", msg)
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use queue::{EntityId, Metadata, TenantId};

    use uuid::Uuid;

    fn msg(msg_type: &str) -> Msg {
        Msg::new(
            EntityId::device(TenantId::random(), Uuid::new_v4()),
            msg_type,
            Vec::new(),
            Metadata::new(),
        )
    }

    #[tokio::test]
    async fn switch_routes_by_type() {
        let outcome = MsgTypeSwitchNode
            .process(msg("POST_ATTRIBUTES_REQUEST"))
            .await;
        match outcome {
            NodeOutcome::Route { relations, .. } => {
                assert_eq!(relations, vec!["POST_ATTRIBUTES_REQUEST"])
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn filter_routes_true_and_false() {
        let filter = MsgTypeFilterNode::new(["POST_TELEMETRY_REQUEST"]);
        match filter.process(msg("POST_TELEMETRY_REQUEST")).await {
            NodeOutcome::Route { relations, .. } => {
                assert_eq!(relations, vec!["True"])
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        match filter.process(msg("POST_ATTRIBUTES_REQUEST")).await {
            NodeOutcome::Route { relations, .. } => {
                assert_eq!(relations, vec!["False"])
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn metadata_filter_matches_exact_value() {
        let filter = MetadataFilterNode::new("source", "gateway");
        let tagged = msg("T").with_metadata_value("source", "gateway");
        match filter.process(tagged).await {
            NodeOutcome::Route { relations, .. } => {
                assert_eq!(relations, vec!["True"])
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        // Absent key falls through to False.
        match filter.process(msg("T")).await {
            NodeOutcome::Route { relations, .. } => {
                assert_eq!(relations, vec!["False"])
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn set_metadata_derives_a_copy() {
        let original = msg("POST_TELEMETRY_REQUEST");
        let node = SetMetadataNode::new("source", "gateway");
        match node.process(original.clone()).await {
            NodeOutcome::Route { msg: derived, .. } => {
                assert_eq!(derived.metadata.get("source"), Some("gateway"));
                assert!(original.metadata.is_empty());
                assert_eq!(derived.id, original.id);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn flaky_node_gates_on_attempt() {
        let node = FailFirstAttemptsNode::new(2);
        assert!(matches!(
            node.process(msg("T").with_attempt(1)).await,
            NodeOutcome::Failed(_)
        ));
        assert!(matches!(
            node.process(msg("T").with_attempt(2)).await,
            NodeOutcome::Failed(_)
        ));
        assert!(matches!(
            node.process(msg("T").with_attempt(3)).await,
            NodeOutcome::Route { .. }
        ));
        assert_eq!(node.deliveries(), 3);
    }
}
