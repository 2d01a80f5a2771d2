// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Actor runner
//!
//! One runner per actor. The runner owns the actor value and its mailbox
//! receiver, drives the lifecycle state machine (Created → Started →
//! Running → Stopped/Failed → Terminated) and executes the message loop.
//!
//! The loop drains the mailbox in bounded chunks: after
//! [`MAILBOX_DRAIN_CHUNK`] consecutive messages the runner yields back to
//! the scheduler, so one busy actor cannot monopolize a worker while its
//! peers have pending mail.
//!

use crate::{
    ActorPath, Error,
    actor::{
        Actor, ActorContext, ActorLifecycle, ActorRef, ChildAction, ChildError,
        ChildErrorReceiver, ChildErrorSender, Handler,
    },
    mailbox::{MailboxHandle, MailboxReceiver, mailbox},
    supervision::SupervisionStrategy,
    system::SystemRef,
};

use tokio::{
    select,
    sync::{
        broadcast::{self, Sender as EventSender},
        mpsc, oneshot,
    },
};
use tracing::{debug, error};

/// Messages processed before the runner yields the worker back to the pool.
const MAILBOX_DRAIN_CHUNK: usize = 64;

/// Sender for actions the actor raises through its context (events, errors,
/// failures).
pub type InternalSender<A> = mpsc::UnboundedSender<InternalAction<A>>;

/// Receiver side of the internal action channel.
pub type InternalReceiver<A> = mpsc::UnboundedReceiver<InternalAction<A>>;

/// Receiver for stop signals. The optional sender inside lets the requester
/// await stop confirmation.
pub type StopReceiver = mpsc::Receiver<Option<oneshot::Sender<()>>>;

/// Sender for stop signals.
pub type StopSender = mpsc::Sender<Option<oneshot::Sender<()>>>;

/// Actions an actor can raise through its [`ActorContext`], handled with
/// priority by the runner.
#[derive(Debug, Clone)]
pub enum InternalAction<A: Actor> {
    /// Publish an event to subscribers.
    Event(A::Event),
    /// Report a non-fatal error to the parent.
    Error(Error),
    /// Report a fatal failure; the parent answers with a supervision
    /// decision.
    Fail(Error),
}

pub(crate) struct ActorRunner<A: Actor> {
    path: ActorPath,
    actor: A,
    lifecycle: ActorLifecycle,
    receiver: MailboxReceiver<A>,
    event_sender: EventSender<A::Event>,
    stop_receiver: StopReceiver,
    error_sender: ChildErrorSender,
    parent_sender: Option<ChildErrorSender>,
    error_receiver: ChildErrorReceiver,
    internal_sender: InternalSender<A>,
    internal_receiver: InternalReceiver<A>,
    stop_signal: bool,
}

impl<A> ActorRunner<A>
where
    A: Actor + Handler<A>,
{
    /// Creates the runner plus the reference and stop channel for a new
    /// actor.
    pub(crate) fn create(
        path: ActorPath,
        actor: A,
        parent_sender: Option<ChildErrorSender>,
    ) -> (Self, ActorRef<A>, StopSender) {
        debug!("Creating new actor runner for {}.", &path);
        let (sender, receiver) = mailbox();
        let (stop_sender, stop_receiver) = mpsc::channel(100);
        let (error_sender, error_receiver) = mpsc::unbounded_channel();
        let (event_sender, event_receiver) = broadcast::channel(10000);
        let (internal_sender, internal_receiver) = mpsc::unbounded_channel();
        let handle = MailboxHandle::new(sender);

        let actor_ref = ActorRef::new(
            path.clone(),
            handle,
            stop_sender.clone(),
            event_receiver,
        );
        let runner = ActorRunner {
            path,
            actor,
            lifecycle: ActorLifecycle::Created,
            receiver,
            stop_receiver,
            event_sender,
            error_sender,
            parent_sender,
            error_receiver,
            internal_sender,
            internal_receiver,
            stop_signal: false,
        };
        (runner, actor_ref, stop_sender)
    }

    /// Drives the actor through its whole lifecycle. `started` (when given)
    /// receives `true` once the actor enters the message loop and `false`
    /// if it terminates without ever starting.
    pub(crate) async fn init(
        &mut self,
        system: SystemRef,
        stop_sender: StopSender,
        mut started: Option<oneshot::Sender<bool>>,
    ) {
        debug!("Initializing actor {} runner.", &self.path);

        let mut ctx: ActorContext<A> = ActorContext::new(
            stop_sender,
            self.path.clone(),
            system.clone(),
            self.error_sender.clone(),
            self.internal_sender.clone(),
        );

        let mut retries = 0;
        loop {
            match self.lifecycle {
                ActorLifecycle::Created => {
                    debug!("Actor {} is created.", &self.path);
                    match self.actor.pre_start(&mut ctx).await {
                        Ok(_) => {
                            self.lifecycle = ActorLifecycle::Started;
                        }
                        Err(err) => {
                            error!(
                                "Actor {} failed to start: {:?}",
                                &self.path, err
                            );
                            ctx.set_error(err);
                            self.lifecycle = ActorLifecycle::Failed;
                        }
                    }
                }
                ActorLifecycle::Started => {
                    debug!("Actor {} is started.", &self.path);
                    if let Some(sender) = started.take() {
                        sender.send(true).unwrap_or_else(|err| {
                            error!("Failed to send start signal: {:?}", err);
                        });
                    }
                    self.run(&mut ctx).await;
                    if ctx.error().is_some() {
                        self.lifecycle = ActorLifecycle::Failed;
                    }
                }
                ActorLifecycle::Restarted => {
                    self.apply_supervision_strategy(
                        A::supervision_strategy(),
                        &mut ctx,
                        &mut retries,
                    )
                    .await;
                }
                ActorLifecycle::Stopped => {
                    debug!("Actor {} is stopped.", &self.path);
                    if self.actor.post_stop(&mut ctx).await.is_err() {
                        error!("Actor {} failed to stop!", &self.path);
                    }
                    self.lifecycle = ActorLifecycle::Terminated;
                }
                ActorLifecycle::Failed => {
                    debug!("Actor {} is faulty.", &self.path);
                    if self.parent_sender.is_none() {
                        self.lifecycle = ActorLifecycle::Restarted;
                    } else {
                        self.lifecycle = ActorLifecycle::Terminated;
                    }
                }
                ActorLifecycle::Terminated => {
                    debug!("Actor {} is terminated.", &self.path);
                    ctx.system().remove_actor(&self.path).await;
                    if let Some(sender) = started.take() {
                        sender.send(false).unwrap_or_else(|err| {
                            error!("Failed to send start signal: {:?}", err);
                        });
                    }
                    break;
                }
            }
        }
        self.receiver.close();
    }

    /// The message loop. Waits on stop signals, child errors, internal
    /// actions and the mailbox; mailbox entries are drained in bounded
    /// chunks.
    pub(crate) async fn run(&mut self, ctx: &mut ActorContext<A>) {
        debug!("Running actor {}.", &self.path);

        loop {
            select! {
                stop = self.stop_receiver.recv() => {
                    debug!("Stopping actor {}.", &self.path);
                    if self.actor.pre_stop(ctx).await.is_err() {
                        error!("Failed to stop actor!");
                        let _ = ctx.emit_fail(Error::Stop).await;
                    }

                    ctx.stop_children().await;
                    ctx.remove_actor().await;

                    if let Some(Some(stop)) = stop {
                        let _ = stop.send(());
                    }

                    if let ActorLifecycle::Started = self.lifecycle {
                        self.lifecycle = ActorLifecycle::Stopped;
                    }
                    break;
                }
                error = self.error_receiver.recv(), if !self.stop_signal => {
                    if let Some(error) = error {
                        self.handle_child_error(error, ctx).await;
                    } else {
                        ctx.stop(None).await;
                        self.stop_signal = true;
                    }
                }
                action = self.internal_receiver.recv(), if !self.stop_signal => {
                    if let Some(action) = action {
                        self.handle_internal(action, ctx).await;
                    } else {
                        ctx.stop(None).await;
                        self.stop_signal = true;
                    }
                }
                msg = self.receiver.recv(), if !self.stop_signal => {
                    if let Some(mut msg) = msg {
                        msg.dispatch(&mut self.actor, ctx).await;
                        self.drain_chunk(ctx).await;
                    } else {
                        ctx.stop(None).await;
                        self.stop_signal = true;
                    }
                }
            }
        }
    }

    /// Processes up to `MAILBOX_DRAIN_CHUNK - 1` already-queued messages,
    /// then yields. Stop signals and child errors are looked at again on
    /// the next loop turn.
    async fn drain_chunk(&mut self, ctx: &mut ActorContext<A>) {
        let mut drained = 1;
        while drained < MAILBOX_DRAIN_CHUNK && !self.stop_signal {
            match self.receiver.try_recv() {
                Ok(mut msg) => {
                    msg.dispatch(&mut self.actor, ctx).await;
                    drained += 1;
                }
                Err(_) => break,
            }
        }
        tokio::task::yield_now().await;
    }

    async fn handle_child_error(
        &mut self,
        error: ChildError,
        ctx: &mut ActorContext<A>,
    ) {
        match error {
            ChildError::Error { error } => {
                self.actor.on_child_error(error, ctx).await;
            }
            ChildError::Fault { error, sender } => {
                let action = self.actor.on_child_fault(error, ctx).await;
                if sender.send(action).is_err() {
                    error!("Can not send action to child!");
                }
            }
        }
    }

    async fn handle_internal(
        &mut self,
        action: InternalAction<A>,
        ctx: &mut ActorContext<A>,
    ) {
        match action {
            InternalAction::Event(event) => {
                match self.event_sender.send(event) {
                    Ok(subscribers) => {
                        debug!("Event sent to {} subscribers.", subscribers);
                    }
                    Err(_err) => {
                        // No live subscribers; the event is dropped.
                        debug!("No subscribers for event.");
                    }
                }
            }
            InternalAction::Error(error) => {
                if let Some(parent) = self.parent_sender.as_mut() {
                    parent.send(ChildError::Error { error }).unwrap_or_else(
                        |err| {
                            error!(
                                "Failed to send error to parent actor: {:?}",
                                err
                            );
                        },
                    );
                }
            }
            InternalAction::Fail(error) => {
                if let Some(parent) = self.parent_sender.as_mut() {
                    let (action_sender, action_receiver) = oneshot::channel();
                    parent
                        .send(ChildError::Fault {
                            error,
                            sender: action_sender,
                        })
                        .unwrap_or_else(|err| {
                            error!(
                                "Failed to send fault to parent actor: {:?}",
                                err
                            );
                        });
                    if let Ok(action) = action_receiver.await {
                        ctx.clean_error();
                        match action {
                            ChildAction::Stop => {}
                            ChildAction::Restart | ChildAction::Delegate => {
                                self.lifecycle = ActorLifecycle::Restarted;
                            }
                        }
                    }
                }
                ctx.stop(None).await;
                self.stop_signal = true;
            }
        }
    }

    async fn apply_supervision_strategy(
        &mut self,
        strategy: SupervisionStrategy,
        ctx: &mut ActorContext<A>,
        retries: &mut usize,
    ) {
        match strategy {
            SupervisionStrategy::Stop => {
                error!("Actor {} failed to start!", &self.path);
                self.lifecycle = ActorLifecycle::Stopped;
            }
            SupervisionStrategy::Retry(mut retry_strategy) => {
                debug!(
                    "Restarting actor with retry strategy: {:?}",
                    &retry_strategy
                );
                if *retries < retry_strategy.max_retries() {
                    if let Some(duration) = retry_strategy.next_backoff() {
                        debug!("Backoff for {:?}", &duration);
                        tokio::time::sleep(duration).await;
                    }
                    *retries += 1;
                    let error = ctx.error();
                    match ctx.restart(&mut self.actor, error.as_ref()).await {
                        Ok(_) => {
                            ctx.clean_error();
                            self.lifecycle = ActorLifecycle::Started;
                            *retries = 0;
                        }
                        Err(err) => {
                            ctx.set_error(err);
                        }
                    }
                } else {
                    self.lifecycle = ActorLifecycle::Stopped;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::{
        actor::{Actor, ActorContext, Handler, Message},
        supervision::{FixedIntervalStrategy, SupervisionStrategy},
        system::SystemRef,
    };

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct StopMsg;

    impl Message for StopMsg {}

    #[derive(Debug, Clone)]
    struct FlakyStart {
        failing: bool,
    }

    #[async_trait]
    impl Actor for FlakyStart {
        type Message = StopMsg;
        type Response = ();
        type Event = ();

        fn supervision_strategy() -> SupervisionStrategy {
            SupervisionStrategy::Retry(Box::new(FixedIntervalStrategy::new(
                3,
                Duration::from_millis(50),
            )))
        }

        async fn pre_start(
            &mut self,
            _ctx: &mut ActorContext<Self>,
        ) -> Result<(), Error> {
            if self.failing {
                Err(Error::Start("pre_start failed".to_owned()))
            } else {
                Ok(())
            }
        }

        async fn pre_restart(
            &mut self,
            _ctx: &mut ActorContext<Self>,
            _error: Option<&Error>,
        ) -> Result<(), Error> {
            // Recover on the first restart attempt.
            self.failing = false;
            Ok(())
        }
    }

    #[async_trait]
    impl Handler<FlakyStart> for FlakyStart {
        async fn handle_message(
            &mut self,
            _sender: ActorPath,
            _msg: StopMsg,
            ctx: &mut ActorContext<Self>,
        ) -> Result<(), Error> {
            ctx.stop(None).await;
            Ok(())
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_root_actor_restarts_after_start_failure() {
        let (event_sender, _) = tokio::sync::mpsc::channel(100);
        let system = SystemRef::new(event_sender, CancellationToken::new());

        let actor = FlakyStart { failing: true };
        let (mut runner, actor_ref, stop_sender) =
            ActorRunner::create(ActorPath::from("/user/flaky"), actor, None);
        let inner_system = system.clone();
        tokio::spawn(async move {
            runner.init(inner_system, stop_sender, None).await;
        });

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(logs_contain("Actor /user/flaky failed to start"));
        assert!(logs_contain("Restarting actor with retry strategy"));
        assert!(logs_contain("Actor /user/flaky is started"));

        actor_ref.tell(StopMsg).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(logs_contain("Actor /user/flaky is terminated"));
        assert!(
            system
                .get_actor::<FlakyStart>(&ActorPath::from("/user/flaky"))
                .await
                .is_none()
        );
    }
}
