// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Actor system
//!
//! The `ActorSystem` creates the [`SystemRef`] (registry plus system-wide
//! operations) and the [`SystemRunner`] that waits for the shutdown event.
//! Shutdown is cooperative: cancelling the token stops the root actors,
//! which stop their children in turn.
//!

use crate::{
    Actor, ActorPath, ActorRef, Error, Event, Handler,
    actor::ChildErrorSender,
    runner::{ActorRunner, StopSender},
    sink::Sink,
};

use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use tracing::{debug, error};

use std::{any::Any, collections::HashMap, sync::Arc};

/// Factory for an actor system.
pub struct ActorSystem {}

impl ActorSystem {
    /// Creates a new actor system bound to `token`.
    ///
    /// Returns the system reference and the runner; the runner must be
    /// driven on its own task.
    pub fn create(token: CancellationToken) -> (SystemRef, SystemRunner) {
        let (event_sender, event_receiver) = mpsc::channel(100);
        let system = SystemRef::new(event_sender, token);
        let runner = SystemRunner::new(event_receiver);
        (system, runner)
    }
}

/// System-wide coordination events.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Stop the actor system.
    StopSystem,
}

/// Handle to a running actor system: the actor registry, typed helper
/// registry and shutdown coordination.
#[derive(Clone)]
pub struct SystemRef {
    /// Actors registered in this system, keyed by path.
    actors:
        Arc<RwLock<HashMap<ActorPath, Box<dyn Any + Send + Sync + 'static>>>>,

    /// Named helpers (shared capabilities injected at bootstrap).
    helpers: Arc<RwLock<HashMap<String, Box<dyn Any + Send + Sync + 'static>>>>,

    /// Stop channels of the root actors, drained on shutdown.
    root_senders: Arc<RwLock<Vec<StopSender>>>,

    token: CancellationToken,
}

impl SystemRef {
    pub fn new(
        event_sender: mpsc::Sender<SystemEvent>,
        token: CancellationToken,
    ) -> Self {
        let root_senders = Arc::new(RwLock::new(Vec::<StopSender>::new()));
        let root_senders_clone = root_senders.clone();
        let token_clone = token.clone();

        tokio::spawn(async move {
            token_clone.cancelled().await;
            debug!("Stopping actor system...");
            let mut root_senders = root_senders_clone.write().await;
            while let Some(sender) = root_senders.pop() {
                let (stop_sender, stop_receiver) = oneshot::channel();
                if sender.send(Some(stop_sender)).await.is_err() {
                    continue;
                } else {
                    let _ = stop_receiver.await;
                };
            }

            let _ = event_sender.send(SystemEvent::StopSystem).await;
        });

        SystemRef {
            actors: Arc::new(RwLock::new(HashMap::new())),
            helpers: Arc::new(RwLock::new(HashMap::new())),
            root_senders,
            token,
        }
    }

    /// Looks up a running actor by path. `None` if absent or of another
    /// type.
    pub async fn get_actor<A>(&self, path: &ActorPath) -> Option<ActorRef<A>>
    where
        A: Actor + Handler<A>,
    {
        let actors = self.actors.read().await;
        actors
            .get(path)
            .and_then(|any| any.downcast_ref::<ActorRef<A>>().cloned())
    }

    /// Registers and starts an actor at `path`. Fails if the path is taken
    /// or the actor's `pre_start` ultimately fails.
    pub(crate) async fn create_actor_path<A>(
        &self,
        path: ActorPath,
        actor: A,
        parent_error_sender: Option<ChildErrorSender>,
    ) -> Result<(ActorRef<A>, StopSender), Error>
    where
        A: Actor + Handler<A>,
    {
        {
            let actors = self.actors.read().await;
            if actors.contains_key(&path) {
                error!("Actor {} already exists!", &path);
                return Err(Error::Exists(path));
            }
        }
        let system = self.clone();
        let (mut runner, actor_ref, stop_sender) =
            ActorRunner::create(path.clone(), actor, parent_error_sender);

        {
            let mut actors = self.actors.write().await;
            actors.insert(path.clone(), Box::new(actor_ref.clone()));
        }

        let (sender, receiver) = oneshot::channel::<bool>();
        let stop_sender_clone = stop_sender.clone();
        tokio::spawn(async move {
            runner.init(system, stop_sender_clone, Some(sender)).await;
        });

        if receiver.await.map_err(|e| Error::Start(e.to_string()))? {
            Ok((actor_ref, stop_sender))
        } else {
            Err(Error::Start(format!("Runner can not init {}", path)))
        }
    }

    /// Launches a top-level actor under the `/user` root.
    pub async fn create_root_actor<A>(
        &self,
        name: &str,
        actor: A,
    ) -> Result<ActorRef<A>, Error>
    where
        A: Actor + Handler<A>,
    {
        let path = ActorPath::from("/user") / name;
        let (actor_ref, stop_sender) =
            self.create_actor_path::<A>(path, actor, None).await?;
        let mut senders = self.root_senders.write().await;
        senders.push(stop_sender);
        Ok(actor_ref)
    }

    pub(crate) async fn remove_actor(&self, path: &ActorPath) {
        let mut actors = self.actors.write().await;
        actors.remove(path);
    }

    /// Initiates system shutdown.
    pub fn stop_system(&self) {
        self.token.cancel();
    }

    /// Paths of the direct children of `path`.
    pub async fn children(&self, path: &ActorPath) -> Vec<ActorPath> {
        let actors = self.actors.read().await;
        actors
            .keys()
            .filter(|p| p.is_child_of(path))
            .cloned()
            .collect()
    }

    /// Registers a named helper available to every actor.
    pub async fn add_helper<H>(&self, name: &str, helper: H)
    where
        H: Any + Send + Sync + Clone + 'static,
    {
        let mut helpers = self.helpers.write().await;
        helpers.insert(name.to_owned(), Box::new(helper));
    }

    /// Fetches a previously registered helper.
    pub async fn get_helper<H>(&self, name: &str) -> Option<H>
    where
        H: Any + Send + Sync + Clone + 'static,
    {
        let helpers = self.helpers.read().await;
        helpers
            .get(name)
            .and_then(|any| any.downcast_ref::<H>())
            .cloned()
    }

    /// Spawns a sink on its own task.
    pub async fn run_sink<E>(&self, mut sink: Sink<E>)
    where
        E: Event,
    {
        tokio::spawn(async move {
            sink.run().await;
        });
    }
}

/// Drives system-level events until shutdown.
pub struct SystemRunner {
    event_receiver: mpsc::Receiver<SystemEvent>,
}

impl SystemRunner {
    pub(crate) fn new(event_receiver: mpsc::Receiver<SystemEvent>) -> Self {
        Self { event_receiver }
    }

    /// Runs until the stop event arrives.
    pub async fn run(&mut self) {
        debug!("Running actor system...");
        loop {
            match self.event_receiver.recv().await {
                Some(SystemEvent::StopSystem) | None => {
                    debug!("Actor system stopped.");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_stop_actor_system() {
        let token = CancellationToken::new();
        let (_system, mut runner) = ActorSystem::create(token.clone());

        tokio::spawn(async move {
            runner.run().await;
        });
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        assert!(logs_contain("Running actor system..."));
        token.cancel();
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        assert!(logs_contain("Stopping actor system..."));
        assert!(logs_contain("Actor system stopped."));
    }

    #[tokio::test]
    async fn test_helpers() {
        let (system, _) = ActorSystem::create(CancellationToken::new());
        let helper = TestHelper { value: 42 };
        system.add_helper("test", helper).await;
        let helper: Option<TestHelper> = system.get_helper("test").await;
        assert_eq!(helper, Some(TestHelper { value: 42 }));
    }

    #[derive(Debug, Clone, PartialEq)]
    struct TestHelper {
        value: i32,
    }
}
