// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the actor tree: supervised children, fault
//! escalation and cooperative shutdown.

use actor::{
    Actor, ActorContext, ActorPath, ActorSystem, ChildAction,
    Error, Handler, Message, Response,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
struct Worker {
    starts: Arc<AtomicU32>,
}

#[derive(Clone, Debug)]
enum WorkerMsg {
    Ping,
    Boom,
}

impl Message for WorkerMsg {}

#[derive(Debug)]
struct Starts(u32);

impl Response for Starts {}

#[async_trait]
impl Actor for Worker {
    type Message = WorkerMsg;
    type Event = ();
    type Response = Starts;

    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Handler<Worker> for Worker {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: WorkerMsg,
        ctx: &mut ActorContext<Worker>,
    ) -> Result<Starts, Error> {
        match msg {
            WorkerMsg::Ping => {
                Ok(Starts(self.starts.load(Ordering::SeqCst)))
            }
            WorkerMsg::Boom => {
                ctx.emit_fail(Error::Functional("boom".to_owned()))
                    .await?;
                Ok(Starts(0))
            }
        }
    }
}

#[derive(Clone)]
struct Boss {
    starts: Arc<AtomicU32>,
}

#[async_trait]
impl Actor for Boss {
    type Message = ();
    type Event = ();
    type Response = ();

    async fn pre_start(
        &mut self,
        ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        ctx.create_child(
            "worker",
            Worker {
                starts: self.starts.clone(),
            },
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Handler<Boss> for Boss {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        _msg: (),
        _ctx: &mut ActorContext<Boss>,
    ) -> Result<(), Error> {
        Ok(())
    }

    async fn on_child_fault(
        &mut self,
        _error: Error,
        _ctx: &mut ActorContext<Boss>,
    ) -> ChildAction {
        ChildAction::Restart
    }
}

#[tokio::test]
async fn faulted_child_is_restarted_by_its_parent() {
    let (system, mut runner) = ActorSystem::create(CancellationToken::new());
    tokio::spawn(async move { runner.run().await });

    let starts = Arc::new(AtomicU32::new(0));
    system
        .create_root_actor(
            "boss",
            Boss {
                starts: starts.clone(),
            },
        )
        .await
        .unwrap();

    let worker = system
        .get_actor::<Worker>(&ActorPath::from("/user/boss/worker"))
        .await
        .unwrap();
    assert_eq!(worker.ask(WorkerMsg::Ping).await.unwrap().0, 1);

    worker.tell(WorkerMsg::Boom).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // pre_start ran again on restart and the worker still answers.
    let worker = system
        .get_actor::<Worker>(&ActorPath::from("/user/boss/worker"))
        .await
        .unwrap();
    assert_eq!(worker.ask(WorkerMsg::Ping).await.unwrap().0, 2);
}

#[tokio::test]
async fn cancelling_the_token_stops_the_whole_tree() {
    let token = CancellationToken::new();
    let (system, mut runner) = ActorSystem::create(token.clone());
    tokio::spawn(async move { runner.run().await });

    let starts = Arc::new(AtomicU32::new(0));
    system
        .create_root_actor("boss", Boss { starts })
        .await
        .unwrap();
    assert!(system
        .get_actor::<Worker>(&ActorPath::from("/user/boss/worker"))
        .await
        .is_some());

    token.cancel();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(system
        .get_actor::<Boss>(&ActorPath::from("/user/boss"))
        .await
        .is_none());
    assert!(system
        .get_actor::<Worker>(&ActorPath::from("/user/boss/worker"))
        .await
        .is_none());
}

#[tokio::test]
async fn stopping_a_parent_stops_its_children() {
    let (system, mut runner) = ActorSystem::create(CancellationToken::new());
    tokio::spawn(async move { runner.run().await });

    let starts = Arc::new(AtomicU32::new(0));
    let boss = system
        .create_root_actor("boss", Boss { starts })
        .await
        .unwrap();

    boss.ask_stop().await.unwrap();
    assert!(system
        .get_actor::<Worker>(&ActorPath::from("/user/boss/worker"))
        .await
        .is_none());
}
