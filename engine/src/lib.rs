// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Rule chain execution engine
//!
//! Messages consumed from the queue layer are routed through per-tenant
//! rule chains: directed graphs of nodes whose behaviors filter, transform
//! and fan out messages along labeled relations. Each tenant, chain and
//! node is an actor; acknowledgement flows back through the message's
//! callback so the queue consumer can account for the whole pack.
//!
//! [`RuleEngineService`] is the bootstrap entry point;
//! [`RuleEngineDispatcher`] is the seam the queue consumers deliver into.

mod actors;
mod chain;
mod config;
mod dispatch;
mod error;
mod node;
mod service;

pub use actors::{
    ChainMsg, EngineActor, EngineMsg, ErrorSinkActor, ErrorSinkMsg,
    NodeMsg, RuleChainActor, RuleEngineMsg, RuleNodeActor, TenantActor,
    TenantMsg,
};
pub use chain::{
    ChainRepository, RelationKind, RuleChainId, RuleChainSpec, RuleLink,
    RuleNodeId, RuleNodeSpec,
};
pub use config::EngineConfig;
pub use dispatch::RuleEngineDispatcher;
pub use error::Error;
pub use node::{
    AckNode, ChainInputNode, FailFirstAttemptsNode, LogNode,
    MetadataFilterNode, MsgTypeFilterNode, MsgTypeSwitchNode, NodeOutcome,
    RuleNodeBehavior, SetMetadataNode,
};
pub use service::RuleEngineService;
