// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Engine bootstrap
//!
//! [`RuleEngineService`] wires the pieces into a running instance: the
//! actor system with the [`EngineActor`] root, the partition service, the
//! queue substrate, and one [`QueueConsumer`] per configured queue. It also
//! exposes the producer side used by transport adapters to feed messages
//! into the queues.
//!

use crate::actors::{EngineActor, EngineMsg};
use crate::chain::ChainRepository;
use crate::dispatch::RuleEngineDispatcher;
use crate::{EngineConfig, Error};

use actor::{ActorRef, ActorSystem, SystemRef};
use queue::{
    InMemoryBroker, Msg, MsgDispatcher, MsgProducer, PartitionService,
    QueueConsumer, ServiceKind, TenantId, TopicService,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use std::sync::{Arc, Mutex};

/// A running rule engine instance.
pub struct RuleEngineService {
    system: SystemRef,
    engine: ActorRef<EngineActor>,
    partitions: Arc<Mutex<PartitionService>>,
    topics: TopicService,
    broker: InMemoryBroker,
    token: CancellationToken,
    consumers: Vec<JoinHandle<()>>,
}

impl RuleEngineService {
    /// Boots the actor system, subscribes one consumer per configured
    /// queue and starts processing.
    pub async fn start(
        config: EngineConfig,
        repository: ChainRepository,
        broker: InMemoryBroker,
    ) -> Result<Self, Error> {
        let token = CancellationToken::new();
        let (system, mut runner) = ActorSystem::create(token.clone());
        tokio::spawn(async move { runner.run().await });

        let engine = system
            .create_root_actor(
                "rule-engine",
                EngineActor::new(repository, config.max_hops),
            )
            .await?;

        let topics = TopicService::new(config.topic_prefix.clone());
        let partitions = PartitionService::new(
            config.instance_id.clone(),
            config.queues.iter().map(|q| q.topology()),
        );
        let dispatcher: Arc<dyn MsgDispatcher> =
            Arc::new(RuleEngineDispatcher::new(engine.clone()));

        let mut consumers = Vec::with_capacity(config.queues.len());
        for queue_config in &config.queues {
            let topic = topics
                .topic_name(&queue_config.queue, TenantId::system());
            let group = topics.consumer_group(
                ServiceKind::RuleEngine,
                &queue_config.queue,
                TenantId::system(),
                None,
            );
            info!(
                queue = %queue_config.queue,
                %topic,
                %group,
                "Starting queue consumer."
            );
            let consumer =
                broker.consumer(topic, group, queue_config.pack_size);
            consumers.push(
                QueueConsumer::new(
                    queue_config.clone(),
                    Box::new(consumer),
                    dispatcher.clone(),
                    partitions.subscribe(),
                    token.clone(),
                )
                .spawn(),
            );
        }

        Ok(RuleEngineService {
            system,
            engine,
            partitions: Arc::new(Mutex::new(partitions)),
            topics,
            broker,
            token,
            consumers,
        })
    }

    pub fn system(&self) -> &SystemRef {
        &self.system
    }

    pub fn engine(&self) -> ActorRef<EngineActor> {
        self.engine.clone()
    }

    /// Producer side: resolves the originator's partition and appends the
    /// encoded envelope to the queue topic.
    pub async fn publish(&self, queue: &str, msg: Msg) -> Result<(), Error> {
        let partition = self
            .partitions
            .lock()
            .map_err(|e| Error::Queue(e.to_string()))?
            .resolve(queue, &msg.originator)?;
        let tpi = self.topics.partition(
            queue,
            TenantId::system(),
            partition,
            false,
        );
        let bytes = msg.to_bytes()?;
        self.broker.send(&tpi, bytes).await?;
        Ok(())
    }

    /// Applies a new service roster. Ownership is recomputed, consumers
    /// resubscribe between packs and the actor hierarchy is notified.
    pub async fn on_roster_update(
        &self,
        instances: Vec<String>,
    ) -> Result<(), Error> {
        let event = {
            let mut partitions = self
                .partitions
                .lock()
                .map_err(|e| Error::Queue(e.to_string()))?;
            partitions.on_roster_update(instances);
            partitions.subscribe().borrow().clone()
        };
        self.engine
            .tell(EngineMsg::PartitionChange(event))
            .await?;
        Ok(())
    }

    /// Stops consumers and the actor system; waits for the consumers to
    /// drain their current pack.
    pub async fn shutdown(self) {
        info!("Shutting down rule engine service.");
        self.token.cancel();
        for consumer in self.consumers {
            let _ = consumer.await;
        }
    }
}
