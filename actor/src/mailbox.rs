// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Mailbox
//!
//! Per-actor ordered message queue. Every actor owns exactly one mailbox,
//! drained single-threaded by its runner, so no two messages for the same
//! actor are ever processed concurrently. Messages are type-erased behind
//! [`MessageDispatch`] so that tell and ask envelopes share one channel.
//!

use crate::{
    ActorPath, Error,
    actor::{Actor, ActorContext, Handler},
};

use async_trait::async_trait;

use tokio::sync::{mpsc, oneshot};

use tracing::{debug, error};

use std::marker::PhantomData;

/// Type-erased dispatch of one mailbox entry to the owning actor.
#[async_trait]
pub trait MessageDispatch<A: Actor>: Send + Sync {
    /// Runs the entry against the actor. Any error is delivered to the
    /// waiting caller (ask) or dropped (tell); it never tears the actor
    /// down.
    async fn dispatch(&mut self, actor: &mut A, ctx: &mut ActorContext<A>);
}

/// Mailbox entry: the message itself, the sender's path and, for the ask
/// pattern, the channel the response must be delivered on.
struct MailboxEntry<A>
where
    A: Actor + Handler<A>,
{
    message: A::Message,
    sender: ActorPath,
    /// `Some` for ask, `None` for tell.
    rsvp: Option<oneshot::Sender<Result<A::Response, Error>>>,
    _actor: PhantomData<A>,
}

impl<A> MailboxEntry<A>
where
    A: Actor + Handler<A>,
{
    fn new(
        message: A::Message,
        sender: ActorPath,
        rsvp: Option<oneshot::Sender<Result<A::Response, Error>>>,
    ) -> Self {
        Self {
            message,
            sender,
            rsvp,
            _actor: PhantomData,
        }
    }
}

#[async_trait]
impl<A> MessageDispatch<A> for MailboxEntry<A>
where
    A: Actor + Handler<A>,
{
    async fn dispatch(&mut self, actor: &mut A, ctx: &mut ActorContext<A>) {
        let result = actor
            .handle_message(self.sender.clone(), self.message.clone(), ctx)
            .await;

        if let Some(rsvp) = self.rsvp.take() {
            debug!("Sending back response (if any).");
            rsvp.send(result).unwrap_or_else(|_failed| {
                error!("Failed to send back response!");
            })
        }
    }
}

/// Boxed dispatch so entries of different shapes share the mailbox channel.
pub type BoxedMessageDispatch<A> = Box<dyn MessageDispatch<A>>;

/// Receiving half of a mailbox, owned by the actor's runner.
pub type MailboxReceiver<A> = mpsc::UnboundedReceiver<BoxedMessageDispatch<A>>;

/// Sending half of a mailbox, shared by every reference to the actor.
pub type MailboxSender<A> = mpsc::UnboundedSender<BoxedMessageDispatch<A>>;

/// Both halves of a freshly created mailbox.
pub type Mailbox<A> = (MailboxSender<A>, MailboxReceiver<A>);

/// Creates an unbounded mailbox. Sends never block; backpressure is the
/// caller's concern (the queue layer bounds in-flight packs above this).
pub fn mailbox<A>() -> Mailbox<A> {
    mpsc::unbounded_channel()
}

/// Typed handle over a mailbox sender, backing [`crate::ActorRef`].
pub struct MailboxHandle<A> {
    sender: MailboxSender<A>,
}

impl<A> MailboxHandle<A>
where
    A: Actor + Handler<A>,
{
    pub(crate) fn new(sender: MailboxSender<A>) -> Self {
        Self { sender }
    }

    /// Fire-and-forget enqueue.
    pub(crate) async fn tell(
        &self,
        sender: ActorPath,
        message: A::Message,
    ) -> Result<(), Error> {
        let entry = MailboxEntry::new(message, sender, None);
        if let Err(error) = self.sender.send(Box::new(entry)) {
            debug!("Failed to tell message! {}", error.to_string());
            Err(Error::Send(error.to_string()))
        } else {
            Ok(())
        }
    }

    /// Request-response enqueue; resolves when the actor has handled the
    /// message.
    pub(crate) async fn ask(
        &self,
        sender: ActorPath,
        message: A::Message,
    ) -> Result<A::Response, Error> {
        let (response_sender, response_receiver) = oneshot::channel();
        let entry = MailboxEntry::new(message, sender, Some(response_sender));
        if let Err(error) = self.sender.send(Box::new(entry)) {
            error!("Failed to ask message! {}", error.to_string());
            Err(Error::Send(error.to_string()))
        } else {
            response_receiver
                .await
                .map_err(|error| Error::Send(error.to_string()))?
        }
    }

    /// True once the mailbox can no longer accept messages.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<A> Clone for MailboxHandle<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
