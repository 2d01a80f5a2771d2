// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use crate::ActorPath;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the actor runtime.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// A message could not be delivered to an actor's mailbox.
    #[error("An error occurred while sending a message to actor: {0}.")]
    Send(String),
    /// An actor with the same path is already registered.
    #[error("Actor {0} already exists.")]
    Exists(ActorPath),
    /// The actor failed to start.
    #[error("An error occurred while starting an actor: {0}.")]
    Start(String),
    /// The actor failed to stop cleanly.
    #[error("An error occurred while stopping an actor.")]
    Stop,
    /// An event could not be published to the actor's event channel.
    #[error("An error occurred while publishing an event: {0}.")]
    SendEvent(String),
    /// Error raised by actor business logic. Does not compromise the runtime.
    #[error("Error: {0}")]
    Functional(String),
}
