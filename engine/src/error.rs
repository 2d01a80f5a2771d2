// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for the rule engine.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// A rule chain definition failed validation.
    #[error("Invalid rule chain: {0}.")]
    InvalidChain(String),
    /// No chain registered under the given id for the tenant.
    #[error("Unknown rule chain: {0}.")]
    UnknownChain(Uuid),
    /// The tenant has no root rule chain.
    #[error("No root rule chain for tenant: {0}.")]
    NoRootChain(String),
    /// Actor runtime failure.
    #[error("Actor error: {0}.")]
    Actor(String),
    /// Queue layer failure.
    #[error("Queue error: {0}.")]
    Queue(String),
}

impl From<actor::Error> for Error {
    fn from(error: actor::Error) -> Self {
        Error::Actor(error.to_string())
    }
}

impl From<queue::Error> for Error {
    fn from(error: queue::Error) -> Self {
        Error::Queue(error.to_string())
    }
}
