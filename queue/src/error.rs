// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the queue layer.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// A message could not be decoded from its wire bytes.
    #[error("Failed to decode message: {0}.")]
    Decode(String),
    /// A message could not be encoded to wire bytes.
    #[error("Failed to encode message: {0}.")]
    Encode(String),
    /// The queue substrate rejected or lost an operation.
    #[error("Queue substrate unavailable: {0}.")]
    Unavailable(String),
    /// The topic or partition addressed does not exist.
    #[error("Unknown topic partition: {0}.")]
    UnknownTopic(String),
    /// A message could not be handed to the rule engine.
    #[error("Failed to dispatch message: {0}.")]
    Dispatch(String),
    /// Processing of a message failed downstream.
    #[error("Message processing failed: {0}.")]
    Processing(String),
    /// The pack did not finish within the pack-processing timeout.
    #[error("Message processing timed out.")]
    Timeout,
}
