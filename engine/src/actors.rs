// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Routing actors
//!
//! The engine's actor hierarchy: one [`EngineActor`] root, one
//! [`TenantActor`] per tenant, one [`RuleChainActor`] per chain with its
//! [`RuleNodeActor`] children, plus a per-tenant [`ErrorSinkActor`] that
//! terminates messages nothing else can handle. Tenant and chain actors are
//! created on demand by the first message addressed to them.
//!
//! Every hop between node actors is a routed copy: the traversal counter is
//! incremented and checked against the configured ceiling, and fan-out
//! forks the message callback so the pack accounting upstream stays exact.
//!

use crate::chain::{
    ChainRepository, RuleChainId, RuleChainSpec, RuleNodeId, RuleNodeSpec,
};
use crate::node::NodeOutcome;

use actor::{
    Actor, ActorContext, ActorPath, Error as ActorError, Handler, Message,
};
use async_trait::async_trait;
use queue::{
    BranchingCallback, Error as QueueError, Msg, MsgCallback,
    PartitionChangeEvent, TenantId,
};
use tracing::{debug, warn};

use std::collections::HashMap;

/// A message with its acknowledgement handle, as it travels the hierarchy.
#[derive(Clone, Debug)]
pub struct RuleEngineMsg {
    pub msg: Msg,
    pub callback: MsgCallback,
}

impl RuleEngineMsg {
    pub fn new(msg: Msg, callback: MsgCallback) -> Self {
        RuleEngineMsg { msg, callback }
    }
}

/// Root of the routing hierarchy; fans messages out to tenant actors.
pub struct EngineActor {
    repository: ChainRepository,
    max_hops: u32,
}

impl EngineActor {
    pub fn new(repository: ChainRepository, max_hops: u32) -> Self {
        EngineActor {
            repository,
            max_hops,
        }
    }
}

#[derive(Clone, Debug)]
pub enum EngineMsg {
    /// Route to the originator's tenant.
    Route(RuleEngineMsg),
    /// Ownership changed; propagated to every tenant actor.
    PartitionChange(PartitionChangeEvent),
    /// Tenant removed: drop its definitions and stop its actor subtree.
    TenantDeleted(TenantId),
}

impl Message for EngineMsg {}

#[async_trait]
impl Actor for EngineActor {
    type Message = EngineMsg;
    type Event = ();
    type Response = ();
}

#[async_trait]
impl Handler<EngineActor> for EngineActor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: EngineMsg,
        ctx: &mut ActorContext<EngineActor>,
    ) -> Result<(), ActorError> {
        match msg {
            EngineMsg::Route(envelope) => {
                let tenant = envelope.msg.originator.tenant;
                let callback = envelope.callback.clone();
                let repository = self.repository.clone();
                let max_hops = self.max_hops;
                let tenant_ref = ctx
                    .get_or_create_child(&tenant.to_string(), || {
                        TenantActor::new(tenant, repository, max_hops)
                    })
                    .await;
                match tenant_ref {
                    Ok(tenant_ref) => {
                        if let Err(error) =
                            tenant_ref.tell(TenantMsg::Route(envelope)).await
                        {
                            callback.on_failure(QueueError::Dispatch(
                                error.to_string(),
                            ));
                        }
                    }
                    Err(error) => {
                        callback.on_failure(QueueError::Dispatch(
                            error.to_string(),
                        ));
                    }
                }
            }
            EngineMsg::PartitionChange(event) => {
                debug!(
                    generation = event.generation,
                    "Propagating partition change."
                );
                for path in ctx.system().children(ctx.path()).await {
                    if let Some(tenant_ref) =
                        ctx.system().get_actor::<TenantActor>(&path).await
                    {
                        let _ = tenant_ref
                            .tell(TenantMsg::PartitionChange(event.clone()))
                            .await;
                    }
                }
            }
            EngineMsg::TenantDeleted(tenant) => {
                self.repository.remove_tenant(tenant);
                if let Some(tenant_ref) = ctx
                    .get_child::<TenantActor>(&tenant.to_string())
                    .await
                {
                    let _ = tenant_ref.ask_stop().await;
                }
            }
        }
        Ok(())
    }
}

/// Per-tenant router: resolves chain ids against the repository and keeps
/// one child actor per live chain.
pub struct TenantActor {
    tenant: TenantId,
    repository: ChainRepository,
    max_hops: u32,
}

impl TenantActor {
    pub fn new(
        tenant: TenantId,
        repository: ChainRepository,
        max_hops: u32,
    ) -> Self {
        TenantActor {
            tenant,
            repository,
            max_hops,
        }
    }

    async fn route_to_chain(
        &self,
        spec: RuleChainSpec,
        envelope: RuleEngineMsg,
        ctx: &mut ActorContext<TenantActor>,
    ) {
        let callback = envelope.callback.clone();
        let max_hops = self.max_hops;
        let name = spec.id.to_string();
        let chain_ref = ctx
            .get_or_create_child(&name, || {
                RuleChainActor::new(spec, max_hops)
            })
            .await;
        match chain_ref {
            Ok(chain_ref) => {
                if let Err(error) =
                    chain_ref.tell(ChainMsg::Input(envelope)).await
                {
                    callback
                        .on_failure(QueueError::Dispatch(error.to_string()));
                }
            }
            Err(error) => {
                callback.on_failure(QueueError::Dispatch(error.to_string()));
            }
        }
    }

    async fn route_to_sink(
        &self,
        reason: String,
        envelope: RuleEngineMsg,
        ctx: &mut ActorContext<TenantActor>,
    ) {
        let callback = envelope.callback.clone();
        match ctx
            .get_or_create_child("errors", || ErrorSinkActor)
            .await
        {
            Ok(sink) => {
                if sink
                    .tell(ErrorSinkMsg { envelope, reason })
                    .await
                    .is_err()
                {
                    callback.on_failure(QueueError::Processing(
                        "error sink unreachable".to_owned(),
                    ));
                }
            }
            Err(_) => {
                callback.on_failure(QueueError::Processing(reason));
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum TenantMsg {
    /// Route to the tenant's root chain.
    Route(RuleEngineMsg),
    /// Route to a specific chain (chain-to-chain hand-off).
    RouteTo {
        chain: RuleChainId,
        envelope: RuleEngineMsg,
    },
    /// Definition changed: stop the chain actor so the next message
    /// rebuilds it from the repository.
    ChainUpdated(RuleChainId),
    /// Definition removed.
    ChainDeleted(RuleChainId),
    PartitionChange(PartitionChangeEvent),
}

impl Message for TenantMsg {}

#[async_trait]
impl Actor for TenantActor {
    type Message = TenantMsg;
    type Event = ();
    type Response = ();
}

#[async_trait]
impl Handler<TenantActor> for TenantActor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: TenantMsg,
        ctx: &mut ActorContext<TenantActor>,
    ) -> Result<(), ActorError> {
        match msg {
            TenantMsg::Route(envelope) => {
                match self.repository.root(self.tenant) {
                    Some(spec) => {
                        self.route_to_chain(spec, envelope, ctx).await
                    }
                    None => {
                        self.route_to_sink(
                            format!(
                                "no root rule chain for tenant {}",
                                self.tenant
                            ),
                            envelope,
                            ctx,
                        )
                        .await
                    }
                }
            }
            TenantMsg::RouteTo { chain, envelope } => {
                match self.repository.get(self.tenant, chain) {
                    Some(spec) => {
                        self.route_to_chain(spec, envelope, ctx).await
                    }
                    None => {
                        self.route_to_sink(
                            format!("unknown rule chain {}", chain),
                            envelope,
                            ctx,
                        )
                        .await
                    }
                }
            }
            TenantMsg::ChainUpdated(chain) => {
                if let Some(chain_ref) = ctx
                    .get_child::<RuleChainActor>(&chain.to_string())
                    .await
                {
                    let _ = chain_ref.ask_stop().await;
                }
            }
            TenantMsg::ChainDeleted(chain) => {
                self.repository.remove(self.tenant, chain);
                if let Some(chain_ref) = ctx
                    .get_child::<RuleChainActor>(&chain.to_string())
                    .await
                {
                    let _ = chain_ref.ask_stop().await;
                }
            }
            TenantMsg::PartitionChange(event) => {
                debug!(
                    tenant = %self.tenant,
                    generation = event.generation,
                    "Partition ownership changed."
                );
            }
        }
        Ok(())
    }
}

/// Executes one chain: owns the compiled routing table and the node actors.
pub struct RuleChainActor {
    spec: RuleChainSpec,
    routes: HashMap<(RuleNodeId, String), Vec<RuleNodeId>>,
    max_hops: u32,
}

impl RuleChainActor {
    pub fn new(spec: RuleChainSpec, max_hops: u32) -> Self {
        let routes = spec.routes();
        RuleChainActor {
            spec,
            routes,
            max_hops,
        }
    }

    fn targets(&self, from: RuleNodeId, relations: &[String]) -> Vec<RuleNodeId> {
        let mut targets = Vec::new();
        for relation in relations {
            if let Some(found) =
                self.routes.get(&(from, relation.clone()))
            {
                for target in found {
                    if !targets.contains(target) {
                        targets.push(*target);
                    }
                }
            }
        }
        targets
    }

    /// Delivers one routed copy to each target, forking the callback.
    /// No targets means the branch dead-ends, which is a successful ack.
    async fn route(
        &self,
        targets: Vec<RuleNodeId>,
        envelope: RuleEngineMsg,
        ctx: &mut ActorContext<RuleChainActor>,
    ) {
        if targets.is_empty() {
            envelope.callback.on_success();
            return;
        }
        let routed = envelope.msg.next_hop();
        if routed.hops > self.max_hops {
            warn!(
                chain = %self.spec.id,
                id = %routed.id,
                hops = routed.hops,
                "Message exceeded the hop ceiling."
            );
            envelope.callback.on_failure(QueueError::Processing(format!(
                "hop ceiling of {} exceeded",
                self.max_hops
            )));
            return;
        }
        let callbacks =
            BranchingCallback::fork(envelope.callback, targets.len());
        for (target, callback) in targets.into_iter().zip(callbacks) {
            let delivery = RuleEngineMsg::new(routed.clone(), callback.clone());
            match ctx
                .get_child::<RuleNodeActor>(&target.to_string())
                .await
            {
                Some(node_ref) => {
                    if let Err(error) =
                        node_ref.tell(NodeMsg(delivery)).await
                    {
                        callback.on_failure(QueueError::Dispatch(
                            error.to_string(),
                        ));
                    }
                }
                None => callback.on_failure(QueueError::Dispatch(format!(
                    "rule node {} is not running",
                    target
                ))),
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum ChainMsg {
    /// Message entering the chain at its root node.
    Input(RuleEngineMsg),
    /// A node finished and asks for its successors.
    Next {
        from: RuleNodeId,
        relations: Vec<String>,
        envelope: RuleEngineMsg,
    },
    /// A node failed; routed along a `Failure` link when one exists,
    /// terminal otherwise.
    NodeFailed {
        from: RuleNodeId,
        reason: String,
        envelope: RuleEngineMsg,
    },
    /// Hand-off to another chain of the tenant.
    Jump {
        chain: RuleChainId,
        envelope: RuleEngineMsg,
    },
}

impl Message for ChainMsg {}

#[async_trait]
impl Actor for RuleChainActor {
    type Message = ChainMsg;
    type Event = ();
    type Response = ();

    async fn pre_start(
        &mut self,
        ctx: &mut ActorContext<Self>,
    ) -> Result<(), ActorError> {
        debug!(
            chain = %self.spec.id,
            name = %self.spec.name,
            nodes = self.spec.nodes.len(),
            "Starting rule chain."
        );
        for node in self.spec.nodes.clone() {
            let name = node.id.to_string();
            ctx.create_child(&name, RuleNodeActor::new(node)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<RuleChainActor> for RuleChainActor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: ChainMsg,
        ctx: &mut ActorContext<RuleChainActor>,
    ) -> Result<(), ActorError> {
        match msg {
            ChainMsg::Input(envelope) => {
                self.route(vec![self.spec.root], envelope, ctx).await;
            }
            ChainMsg::Next {
                from,
                relations,
                envelope,
            } => {
                let targets = self.targets(from, &relations);
                self.route(targets, envelope, ctx).await;
            }
            ChainMsg::NodeFailed {
                from,
                reason,
                envelope,
            } => {
                let targets =
                    self.targets(from, &["Failure".to_owned()]);
                if targets.is_empty() {
                    envelope
                        .callback
                        .on_failure(QueueError::Processing(reason));
                } else {
                    self.route(targets, envelope, ctx).await;
                }
            }
            ChainMsg::Jump { chain, envelope } => {
                // The hand-off itself is free; the target chain charges
                // the hop when it routes to its root node.
                match ctx.parent::<TenantActor>().await {
                    Some(tenant_ref) => {
                        let callback = envelope.callback.clone();
                        if let Err(error) = tenant_ref
                            .tell(TenantMsg::RouteTo { chain, envelope })
                            .await
                        {
                            callback.on_failure(QueueError::Dispatch(
                                error.to_string(),
                            ));
                        }
                    }
                    None => envelope.callback.on_failure(
                        QueueError::Dispatch(
                            "tenant actor unavailable".to_owned(),
                        ),
                    ),
                }
            }
        }
        Ok(())
    }
}

/// Runs one node's behavior and reports the outcome back to its chain.
pub struct RuleNodeActor {
    node: RuleNodeSpec,
}

impl RuleNodeActor {
    pub fn new(node: RuleNodeSpec) -> Self {
        RuleNodeActor { node }
    }
}

#[derive(Clone, Debug)]
pub struct NodeMsg(pub RuleEngineMsg);

impl Message for NodeMsg {}

#[async_trait]
impl Actor for RuleNodeActor {
    type Message = NodeMsg;
    type Event = ();
    type Response = ();
}

#[async_trait]
impl Handler<RuleNodeActor> for RuleNodeActor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        NodeMsg(envelope): NodeMsg,
        ctx: &mut ActorContext<RuleNodeActor>,
    ) -> Result<(), ActorError> {
        let callback = envelope.callback;
        // Kept for the Failure route; behaviors consume the original.
        let incoming = envelope.msg.clone();
        let outcome = self.node.behavior.process(envelope.msg).await;
        let Some(chain_ref) = ctx.parent::<RuleChainActor>().await else {
            callback.on_failure(QueueError::Dispatch(
                "rule chain actor unavailable".to_owned(),
            ));
            return Ok(());
        };
        let report = match outcome {
            NodeOutcome::Done => {
                callback.on_success();
                return Ok(());
            }
            NodeOutcome::Route { relations, msg } => ChainMsg::Next {
                from: self.node.id,
                relations,
                envelope: RuleEngineMsg::new(msg, callback.clone()),
            },
            NodeOutcome::Failed(reason) => ChainMsg::NodeFailed {
                from: self.node.id,
                reason,
                envelope: RuleEngineMsg::new(incoming, callback.clone()),
            },
            NodeOutcome::Jump { chain, msg } => ChainMsg::Jump {
                chain,
                envelope: RuleEngineMsg::new(msg, callback.clone()),
            },
        };
        if let Err(error) = chain_ref.tell(report).await {
            callback.on_failure(QueueError::Dispatch(error.to_string()));
        }
        Ok(())
    }
}

/// Terminal sink for messages no chain can handle. Always resolves the
/// callback as failed so the queue layer can apply its processing strategy.
pub struct ErrorSinkActor;

#[derive(Clone, Debug)]
pub struct ErrorSinkMsg {
    pub envelope: RuleEngineMsg,
    pub reason: String,
}

impl Message for ErrorSinkMsg {}

#[async_trait]
impl Actor for ErrorSinkActor {
    type Message = ErrorSinkMsg;
    type Event = ();
    type Response = ();
}

#[async_trait]
impl Handler<ErrorSinkActor> for ErrorSinkActor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: ErrorSinkMsg,
        _ctx: &mut ActorContext<ErrorSinkActor>,
    ) -> Result<(), ActorError> {
        warn!(
            id = %msg.envelope.msg.id,
            originator = %msg.envelope.msg.originator,
            reason = %msg.reason,
            "Message ended in the error sink."
        );
        msg.envelope
            .callback
            .on_failure(QueueError::Processing(msg.reason));
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::chain::RuleChainSpec;
    use crate::node::{
        AckNode, ChainInputNode, FailFirstAttemptsNode, LogNode,
        MsgTypeSwitchNode, RuleNodeBehavior,
    };

    use actor::{ActorRef, ActorSystem, SystemRef};
    use queue::{EntityId, Metadata};
    use tokio::sync::mpsc;
    use tokio::time::{timeout, Duration};
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingNode(Arc<AtomicU32>);

    #[async_trait]
    impl RuleNodeBehavior for CountingNode {
        fn kind(&self) -> &str {
            "counting"
        }

        async fn process(&self, msg: Msg) -> NodeOutcome {
            self.0.fetch_add(1, Ordering::SeqCst);
            NodeOutcome::route("Success", msg)
        }
    }

    fn capture() -> (
        MsgCallback,
        mpsc::UnboundedReceiver<Result<(), QueueError>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tx_err = tx.clone();
        let callback = MsgCallback::new(
            move || {
                let _ = tx.send(Ok(()));
            },
            move |error| {
                let _ = tx_err.send(Err(error));
            },
        );
        (callback, rx)
    }

    async fn engine(
        repository: ChainRepository,
        max_hops: u32,
    ) -> (SystemRef, ActorRef<EngineActor>) {
        let (system, mut runner) =
            ActorSystem::create(CancellationToken::new());
        tokio::spawn(async move { runner.run().await });
        let engine = system
            .create_root_actor(
                "rule-engine",
                EngineActor::new(repository, max_hops),
            )
            .await
            .unwrap();
        (system, engine)
    }

    fn telemetry(tenant: TenantId) -> Msg {
        Msg::new(
            EntityId::device(tenant, Uuid::new_v4()),
            "POST_TELEMETRY_REQUEST",
            b"{}".to_vec(),
            Metadata::new(),
        )
    }

    async fn outcome_of(
        rx: &mut mpsc::UnboundedReceiver<Result<(), QueueError>>,
    ) -> Result<(), QueueError> {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("callback not resolved in time")
            .expect("callback channel closed")
    }

    #[tokio::test]
    async fn routes_through_chain_to_ack() {
        let repository = ChainRepository::new();
        let tenant = TenantId::random();
        let mut spec = RuleChainSpec::new("main");
        let switch = spec.add_node("switch", Arc::new(MsgTypeSwitchNode));
        let ack = spec.add_node("ack", Arc::new(AckNode));
        spec.link(switch, ack, "POST_TELEMETRY_REQUEST");
        repository.add(tenant, spec, true).unwrap();

        let (_system, engine) = engine(repository, 30).await;
        let (callback, mut rx) = capture();
        engine
            .tell(EngineMsg::Route(RuleEngineMsg::new(
                telemetry(tenant),
                callback,
            )))
            .await
            .unwrap();
        assert_eq!(outcome_of(&mut rx).await, Ok(()));
    }

    #[tokio::test]
    async fn fan_out_acks_the_pack_callback_once() {
        for branches in [1usize, 2, 5] {
            let repository = ChainRepository::new();
            let tenant = TenantId::random();
            let mut spec = RuleChainSpec::new("fan-out");
            let entry = spec.add_node("entry", Arc::new(LogNode));
            for i in 0..branches {
                let leaf =
                    spec.add_node(format!("leaf-{}", i), Arc::new(AckNode));
                spec.link(entry, leaf, "Success");
            }
            repository.add(tenant, spec, true).unwrap();

            let (_system, engine) = engine(repository, 30).await;
            let (callback, mut rx) = capture();
            engine
                .tell(EngineMsg::Route(RuleEngineMsg::new(
                    telemetry(tenant),
                    callback,
                )))
                .await
                .unwrap();
            assert_eq!(outcome_of(&mut rx).await, Ok(()));
            // Exactly one resolution regardless of branch count.
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(rx.try_recv().is_err(), "branches = {}", branches);
        }
    }

    #[tokio::test]
    async fn dead_end_relation_is_an_implicit_ack() {
        let repository = ChainRepository::new();
        let tenant = TenantId::random();
        let mut spec = RuleChainSpec::new("dead-end");
        spec.add_node("switch", Arc::new(MsgTypeSwitchNode));
        repository.add(tenant, spec, true).unwrap();

        let (_system, engine) = engine(repository, 30).await;
        let (callback, mut rx) = capture();
        engine
            .tell(EngineMsg::Route(RuleEngineMsg::new(
                telemetry(tenant),
                callback,
            )))
            .await
            .unwrap();
        assert_eq!(outcome_of(&mut rx).await, Ok(()));
    }

    #[tokio::test]
    async fn node_failure_without_failure_link_is_terminal() {
        let repository = ChainRepository::new();
        let tenant = TenantId::random();
        let mut spec = RuleChainSpec::new("failing");
        spec.add_node(
            "fail",
            Arc::new(FailFirstAttemptsNode::new(u32::MAX)),
        );
        repository.add(tenant, spec, true).unwrap();

        let (_system, engine) = engine(repository, 30).await;
        let (callback, mut rx) = capture();
        engine
            .tell(EngineMsg::Route(RuleEngineMsg::new(
                telemetry(tenant),
                callback,
            )))
            .await
            .unwrap();
        assert!(matches!(
            outcome_of(&mut rx).await,
            Err(QueueError::Processing(_))
        ));
    }

    #[tokio::test]
    async fn node_failure_with_failure_link_recovers() {
        let repository = ChainRepository::new();
        let tenant = TenantId::random();
        let mut spec = RuleChainSpec::new("recovering");
        let fail = spec.add_node(
            "fail",
            Arc::new(FailFirstAttemptsNode::new(u32::MAX)),
        );
        let ack = spec.add_node("ack", Arc::new(AckNode));
        spec.link(fail, ack, "Failure");
        repository.add(tenant, spec, true).unwrap();

        let (_system, engine) = engine(repository, 30).await;
        let (callback, mut rx) = capture();
        engine
            .tell(EngineMsg::Route(RuleEngineMsg::new(
                telemetry(tenant),
                callback,
            )))
            .await
            .unwrap();
        assert_eq!(outcome_of(&mut rx).await, Ok(()));
    }

    #[tokio::test]
    async fn cyclic_chain_fails_at_the_hop_ceiling() {
        let repository = ChainRepository::new();
        let tenant = TenantId::random();
        let executions = Arc::new(AtomicU32::new(0));
        let mut spec = RuleChainSpec::new("cycle");
        let a = spec
            .add_node("a", Arc::new(CountingNode(executions.clone())));
        let b = spec
            .add_node("b", Arc::new(CountingNode(executions.clone())));
        spec.link(a, b, "Success");
        spec.link(b, a, "Success");
        repository.add(tenant, spec, true).unwrap();

        let (_system, engine) = engine(repository, 30).await;
        let (callback, mut rx) = capture();
        engine
            .tell(EngineMsg::Route(RuleEngineMsg::new(
                telemetry(tenant),
                callback,
            )))
            .await
            .unwrap();
        match outcome_of(&mut rx).await {
            Err(QueueError::Processing(reason)) => {
                assert!(reason.contains("hop ceiling"), "{}", reason)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        // Entry plus routed copies: exactly the ceiling, not one more.
        assert_eq!(executions.load(Ordering::SeqCst), 30);
    }

    #[tokio::test]
    async fn jump_hands_off_to_another_chain() {
        let repository = ChainRepository::new();
        let tenant = TenantId::random();

        let mut second = RuleChainSpec::new("second");
        second.add_node("ack", Arc::new(AckNode));
        let second_id = second.id;
        repository.add(tenant, second, false).unwrap();

        let mut first = RuleChainSpec::new("first");
        first.add_node("jump", Arc::new(ChainInputNode::new(second_id)));
        repository.add(tenant, first, true).unwrap();

        let (_system, engine) = engine(repository, 30).await;
        let (callback, mut rx) = capture();
        engine
            .tell(EngineMsg::Route(RuleEngineMsg::new(
                telemetry(tenant),
                callback,
            )))
            .await
            .unwrap();
        assert_eq!(outcome_of(&mut rx).await, Ok(()));
    }

    #[tokio::test]
    async fn jump_hand_off_does_not_consume_a_hop() {
        let repository = ChainRepository::new();
        let tenant = TenantId::random();

        let mut second = RuleChainSpec::new("second");
        second.add_node("ack", Arc::new(AckNode));
        let second_id = second.id;
        repository.add(tenant, second, false).unwrap();

        let mut first = RuleChainSpec::new("first");
        first.add_node("jump", Arc::new(ChainInputNode::new(second_id)));
        repository.add(tenant, first, true).unwrap();

        // Two node executions in total, so a ceiling of exactly two must
        // suffice: charging the hand-off as well would push past it.
        let (_system, engine) = engine(repository, 2).await;
        let (callback, mut rx) = capture();
        engine
            .tell(EngineMsg::Route(RuleEngineMsg::new(
                telemetry(tenant),
                callback,
            )))
            .await
            .unwrap();
        assert_eq!(outcome_of(&mut rx).await, Ok(()));
    }

    #[tokio::test]
    async fn missing_root_chain_fails_via_error_sink() {
        let repository = ChainRepository::new();
        let (_system, engine) = engine(repository, 30).await;
        let (callback, mut rx) = capture();
        engine
            .tell(EngineMsg::Route(RuleEngineMsg::new(
                telemetry(TenantId::random()),
                callback,
            )))
            .await
            .unwrap();
        assert!(matches!(
            outcome_of(&mut rx).await,
            Err(QueueError::Processing(_))
        ));
    }
}
