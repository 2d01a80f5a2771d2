// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! Event sink and subscriber pattern.
//!
//! A [`Sink`] runs on its own task, receives events from an actor's
//! broadcast channel and notifies a [`Subscriber`]. Used for observability
//! taps (statistics, logging) outside the actor hierarchy.

use crate::Event;

use async_trait::async_trait;
use tokio::sync::broadcast::{Receiver as EventReceiver, error::RecvError};

use tracing::debug;

/// Connects an actor's event stream to one subscriber.
pub struct Sink<E: Event> {
    subscriber: Box<dyn Subscriber<E>>,
    event_receiver: EventReceiver<E>,
}

impl<E: Event> Sink<E> {
    pub fn new(
        event_receiver: EventReceiver<E>,
        subscriber: impl Subscriber<E>,
    ) -> Self {
        Sink {
            subscriber: Box::new(subscriber),
            event_receiver,
        }
    }

    /// Processes events until the channel closes. Lagged receivers skip
    /// missed events and catch up.
    pub async fn run(&mut self) {
        loop {
            match self.event_receiver.recv().await {
                Ok(event) => {
                    debug!("Received event: {:?}. Notifying subscriber.", event);
                    self.subscriber.notify(event).await;
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(_)) => continue,
            }
        }
    }
}

/// Receives the events a [`Sink`] pulls from an actor.
#[async_trait]
pub trait Subscriber<E: Event>: Send + Sync + 'static {
    async fn notify(&self, event: E);
}
