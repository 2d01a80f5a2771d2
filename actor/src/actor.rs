// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Actor primitives
//!
//! Defines the [`Actor`] and [`Handler`] traits, the [`ActorContext`] handed
//! to every handler invocation, and the [`ActorRef`] used to address a
//! running actor.
//!
//! An actor processes its mailbox strictly one message at a time. A handler
//! returning an error does not stop the actor: the error travels back to the
//! asking caller (or is dropped for tell) and the next mailbox entry is
//! processed. Only an explicit [`ActorContext::emit_fail`] escalates to the
//! supervision machinery.
//!

use crate::{
    ActorPath, Error,
    mailbox::MailboxHandle,
    runner::{InternalAction, InternalSender, StopSender},
    supervision::SupervisionStrategy,
    system::SystemRef,
};

use tokio::sync::{broadcast::Receiver as EventReceiver, mpsc, oneshot};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use std::fmt::Debug;

/// Execution context passed to every handler and lifecycle hook. Gives the
/// actor access to the system, its own path, its children and the event and
/// supervision channels.
pub struct ActorContext<A: Actor + Handler<A>> {
    stop: StopSender,
    path: ActorPath,
    system: SystemRef,
    error: Option<Error>,
    error_sender: ChildErrorSender,
    internal_sender: InternalSender<A>,
    child_senders: Vec<StopSender>,
}

impl<A> ActorContext<A>
where
    A: Actor + Handler<A>,
{
    pub(crate) fn new(
        stop: StopSender,
        path: ActorPath,
        system: SystemRef,
        error_sender: ChildErrorSender,
        internal_sender: InternalSender<A>,
    ) -> Self {
        Self {
            stop,
            path,
            system,
            error: None,
            error_sender,
            internal_sender,
            child_senders: Vec::new(),
        }
    }

    pub(crate) async fn restart(
        &mut self,
        actor: &mut A,
        error: Option<&Error>,
    ) -> Result<(), Error>
    where
        A: Actor,
    {
        actor.pre_restart(self, error).await
    }

    /// Reference to this actor itself.
    pub async fn reference(&self) -> Option<ActorRef<A>> {
        self.system.get_actor(&self.path).await
    }

    /// This actor's path.
    pub fn path(&self) -> &ActorPath {
        &self.path
    }

    /// The actor system this actor runs in.
    pub fn system(&self) -> &SystemRef {
        &self.system
    }

    /// Reference to the parent actor, if it is of type `P`.
    pub async fn parent<P: Actor + Handler<P>>(&self) -> Option<ActorRef<P>> {
        self.system.get_actor(&self.path.parent()).await
    }

    pub(crate) async fn stop_children(&mut self) {
        while let Some(sender) = self.child_senders.pop() {
            let (stop_sender, stop_receiver) = oneshot::channel();
            if sender.send(Some(stop_sender)).await.is_err() {
                continue;
            } else {
                let _ = stop_receiver.await;
            };
        }
    }

    pub(crate) async fn remove_actor(&self) {
        self.system.remove_actor(&self.path).await;
    }

    /// Asks this actor to stop. Processing of the current message finishes
    /// first; no further mailbox entries are drained.
    pub async fn stop(&self, sender: Option<oneshot::Sender<()>>) {
        debug!("Stopping actor {}.", &self.path);
        let _ = self.stop.send(sender).await;
    }

    /// Publishes an event to this actor's broadcast channel.
    pub async fn publish_event(&self, event: A::Event) -> Result<(), Error> {
        self.internal_sender
            .send(InternalAction::Event(event))
            .map_err(|e| Error::SendEvent(e.to_string()))
    }

    /// Reports a non-fatal error to the parent actor.
    pub async fn emit_error(&mut self, error: Error) -> Result<(), Error> {
        self.internal_sender
            .send(InternalAction::Error(error))
            .map_err(|e| Error::Send(e.to_string()))
    }

    /// Reports a fatal failure. The parent decides whether this actor is
    /// stopped or restarted.
    pub async fn emit_fail(&mut self, error: Error) -> Result<(), Error> {
        // Remember the error so the runner leaves the Started state.
        self.set_error(error.clone());
        self.internal_sender
            .send(InternalAction::Fail(error))
            .map_err(|e| Error::Send(e.to_string()))
    }

    /// Creates a supervised child of this actor under `name`. Fails if the
    /// child already exists.
    pub async fn create_child<C>(
        &mut self,
        name: &str,
        actor: C,
    ) -> Result<ActorRef<C>, Error>
    where
        C: Actor + Handler<C>,
    {
        let path = self.path.clone() / name;
        let (actor_ref, stop_sender) = self
            .system
            .create_actor_path(path, actor, Some(self.error_sender.clone()))
            .await?;
        self.child_senders.push(stop_sender);
        Ok(actor_ref)
    }

    /// Looks up a child of this actor by name.
    pub async fn get_child<C>(&self, name: &str) -> Option<ActorRef<C>>
    where
        C: Actor + Handler<C>,
    {
        let path = self.path.clone() / name;
        self.system.get_actor(&path).await
    }

    /// Returns the child under `name`, creating it from `factory` on first
    /// reference. This is the creation-on-demand primitive used by routing
    /// actors: an entity's actor comes into existence with its first
    /// message.
    pub async fn get_or_create_child<C, F>(
        &mut self,
        name: &str,
        factory: F,
    ) -> Result<ActorRef<C>, Error>
    where
        C: Actor + Handler<C>,
        F: FnOnce() -> C + Send,
    {
        if let Some(child) = self.get_child(name).await {
            Ok(child)
        } else {
            self.create_child(name, factory()).await
        }
    }

    pub(crate) fn error(&self) -> Option<Error> {
        self.error.clone()
    }

    pub(crate) fn set_error(&mut self, error: Error) {
        self.error = Some(error);
    }

    pub(crate) fn clean_error(&mut self) {
        self.error = None;
    }
}

/// Lifecycle states an actor moves through, driven by its runner.
#[derive(Debug, Clone, PartialEq)]
pub enum ActorLifecycle {
    Created,
    Started,
    Restarted,
    Failed,
    Stopped,
    Terminated,
}

/// Supervision decision a parent takes for a faulted child.
#[derive(Debug, Clone)]
pub enum ChildAction {
    /// Stop the child.
    Stop,
    /// Restart the child via `pre_restart`.
    Restart,
    /// Delegate: restart the child and escalate the error upwards.
    Delegate,
}

pub(crate) type ChildErrorReceiver = mpsc::UnboundedReceiver<ChildError>;
pub(crate) type ChildErrorSender = mpsc::UnboundedSender<ChildError>;

/// Error notification from a child actor to its parent.
pub enum ChildError {
    /// Non-fatal, informational.
    Error { error: Error },
    /// Fatal; the parent must answer with a [`ChildAction`].
    Fault {
        error: Error,
        sender: oneshot::Sender<ChildAction>,
    },
}

/// The actor trait. Implementors define their message, response and event
/// types plus optional lifecycle hooks.
#[async_trait]
pub trait Actor: Send + Sync + Sized + 'static + Handler<Self> {
    /// Message type this actor accepts.
    type Message: Message;

    /// Event type this actor publishes.
    type Event: Event;

    /// Response type returned to askers.
    type Response: Response;

    /// Strategy applied when `pre_start` fails. Defaults to stopping the
    /// actor.
    fn supervision_strategy() -> SupervisionStrategy {
        SupervisionStrategy::Stop
    }

    /// Called before the first message. Creating child actors belongs here.
    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Called when the supervision strategy restarts this actor.
    async fn pre_restart(
        &mut self,
        ctx: &mut ActorContext<Self>,
        _error: Option<&Error>,
    ) -> Result<(), Error> {
        self.pre_start(ctx).await
    }

    /// Called before the actor stops, while children are still alive.
    async fn pre_stop(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Called after the actor and its children have stopped.
    async fn post_stop(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Marker trait for events published by actors.
pub trait Event:
    Serialize + DeserializeOwned + Debug + Clone + Send + Sync + 'static
{
}

impl Event for () {}

/// Marker trait for messages.
pub trait Message: Clone + Send + Sync + 'static {}

impl Message for () {}

/// Marker trait for ask responses.
pub trait Response: Send + Sync + 'static {}

impl Response for () {}

/// Message handling for an actor. Separate from [`Actor`] so the handler
/// signature can name the actor type.
#[async_trait]
pub trait Handler<A: Actor + Handler<A>>: Send + Sync {
    /// Handles one message. Runs exclusively: the next mailbox entry is not
    /// touched until this returns.
    async fn handle_message(
        &mut self,
        sender: ActorPath,
        msg: A::Message,
        ctx: &mut ActorContext<A>,
    ) -> Result<A::Response, Error>;

    /// Notification of a non-fatal error in a child.
    async fn on_child_error(
        &mut self,
        error: Error,
        _ctx: &mut ActorContext<A>,
    ) {
        debug!("Child error: {:?}", error);
    }

    /// Supervision decision for a faulted child. Defaults to stopping it.
    async fn on_child_fault(
        &mut self,
        error: Error,
        _ctx: &mut ActorContext<A>,
    ) -> ChildAction {
        debug!("Child fault: {:?}", error);
        ChildAction::Stop
    }
}

/// Addressable reference to a running actor.
pub struct ActorRef<A>
where
    A: Actor + Handler<A>,
{
    path: ActorPath,
    sender: MailboxHandle<A>,
    event_receiver: EventReceiver<<A as Actor>::Event>,
    stop_sender: StopSender,
}

impl<A> ActorRef<A>
where
    A: Actor + Handler<A>,
{
    pub(crate) fn new(
        path: ActorPath,
        sender: MailboxHandle<A>,
        stop_sender: StopSender,
        event_receiver: EventReceiver<<A as Actor>::Event>,
    ) -> Self {
        Self {
            path,
            sender,
            stop_sender,
            event_receiver,
        }
    }

    /// Enqueues a message without waiting for a response.
    pub async fn tell(&self, message: A::Message) -> Result<(), Error> {
        self.sender.tell(self.path(), message).await
    }

    /// Enqueues a message and waits for the actor's response.
    pub async fn ask(&self, message: A::Message) -> Result<A::Response, Error> {
        self.sender.ask(self.path(), message).await
    }

    /// Stops the actor and waits until it has fully stopped.
    pub async fn ask_stop(&self) -> Result<(), Error> {
        debug!("Stopping actor {} from reference.", &self.path);
        let (response_sender, response_receiver) = oneshot::channel();
        if self.stop_sender.send(Some(response_sender)).await.is_err() {
            Ok(())
        } else {
            response_receiver
                .await
                .map_err(|error| Error::Send(error.to_string()))
        }
    }

    /// Stops the actor without waiting.
    pub async fn tell_stop(&self) {
        debug!("Stopping actor {} from reference.", &self.path);
        let _ = self.stop_sender.send(None).await;
    }

    pub fn path(&self) -> ActorPath {
        self.path.clone()
    }

    /// True once the actor's mailbox no longer accepts messages.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Subscribes to the actor's event channel.
    pub fn subscribe(&self) -> EventReceiver<<A as Actor>::Event> {
        self.event_receiver.resubscribe()
    }
}

impl<A> Clone for ActorRef<A>
where
    A: Actor + Handler<A>,
{
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            sender: self.sender.clone(),
            stop_sender: self.stop_sender.clone(),
            event_receiver: self.event_receiver.resubscribe(),
        }
    }
}
