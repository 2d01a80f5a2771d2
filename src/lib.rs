// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! Facade for the ruleflow routing core.
//!
//! Re-exports the actor runtime, the partitioned queue layer and the rule
//! chain execution engine. Applications wire the three together through
//! [`engine::RuleEngineService`] (or by hand for custom topologies).

pub use actor::{
    Actor, ActorContext, ActorPath, ActorRef, ActorSystem, ChildAction,
    Error as ActorError, Event, ExponentialBackoffStrategy,
    FixedIntervalStrategy, Handler, Message, NoIntervalStrategy, Response,
    RetryStrategy, Sink, Subscriber, SupervisionStrategy, SystemEvent,
    SystemRef, SystemRunner,
};

pub use queue::{
    BranchingCallback, ConsumerConfig, ConsumerState, EntityId, EntityKind,
    Error as QueueError, InMemoryBroker, Metadata, Msg, MsgCallback,
    MsgConsumer, MsgDispatcher, MsgProducer, PartitionChangeEvent,
    PartitionService, ProcessingDecision, ProcessingStrategy,
    ProcessingStrategyKind, QueueConsumer, QueueTopology, RawMsg,
    ServiceKind, SubmitStrategyKind, TenantId, TopicPartitionInfo,
    TopicService,
};

pub use engine::{
    AckNode, ChainInputNode, ChainRepository, EngineConfig,
    Error as EngineError, LogNode, MetadataFilterNode, MsgTypeFilterNode,
    MsgTypeSwitchNode, NodeOutcome, RelationKind, RuleChainSpec,
    RuleEngineDispatcher, RuleEngineService, RuleNodeBehavior, RuleNodeSpec,
    SetMetadataNode,
};
