// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Message envelope
//!
//! The immutable envelope every inbound message travels in: originator
//! entity reference, type tag, opaque payload, string metadata, creation
//! timestamp and a correlation id. Envelopes are never mutated in place —
//! transformation produces a derived copy, because concurrent downstream
//! branches may still hold the original.
//!

use crate::Error;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata key carrying the delivery attempt number. Starts at 1;
/// incremented by the processing strategy on every retry so rule nodes can
/// special-case the final attempt.
pub const ATTEMPT_KEY: &str = "deliveryAttempt";

/// Tenant identifier. The system tenant (nil UUID) owns shared topics;
/// every other tenant may be isolated.
#[derive(
    Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize,
    Deserialize,
)]
pub struct TenantId(Uuid);

impl TenantId {
    pub fn new(id: Uuid) -> Self {
        TenantId(id)
    }

    pub fn random() -> Self {
        TenantId(Uuid::new_v4())
    }

    /// The system tenant.
    pub fn system() -> Self {
        TenantId(Uuid::nil())
    }

    pub fn is_system(&self) -> bool {
        self.0.is_nil()
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of the entity a message originates from.
#[derive(
    Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize,
)]
pub enum EntityKind {
    Device,
    Asset,
    Tenant,
    RuleChain,
    RuleNode,
    Edge,
}

/// Reference to the entity a message is about: the ordering key for
/// sequential-by-originator processing.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct EntityId {
    pub tenant: TenantId,
    pub id: Uuid,
    pub kind: EntityKind,
}

impl EntityId {
    pub fn new(tenant: TenantId, id: Uuid, kind: EntityKind) -> Self {
        EntityId { tenant, id, kind }
    }

    pub fn device(tenant: TenantId, id: Uuid) -> Self {
        EntityId::new(tenant, id, EntityKind::Device)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[{}]", self.kind, self.id)
    }
}

/// String-keyed annotations accumulated as a message traverses rule nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata(HashMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Metadata::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Metadata(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The message envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Msg {
    /// Correlation id, stable across derived copies.
    pub id: Uuid,
    /// Creation timestamp, milliseconds since the epoch.
    pub ts_millis: u64,
    /// The entity this message is about.
    pub originator: EntityId,
    /// Type tag, e.g. `POST_TELEMETRY_REQUEST`.
    pub msg_type: String,
    /// Opaque payload bytes; interpretation belongs to rule nodes.
    pub payload: Vec<u8>,
    pub metadata: Metadata,
    /// Traversal counter, incremented per routed copy. Guards against
    /// unbounded recursion through cyclic chains.
    pub hops: u32,
}

impl Msg {
    pub fn new(
        originator: EntityId,
        msg_type: impl Into<String>,
        payload: Vec<u8>,
        metadata: Metadata,
    ) -> Self {
        let ts_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Msg {
            id: Uuid::new_v4(),
            ts_millis,
            originator,
            msg_type: msg_type.into(),
            payload,
            metadata,
            hops: 0,
        }
    }

    /// Derived copy with new payload and metadata. Correlation id,
    /// originator, timestamp and hop count carry over.
    pub fn transformed(&self, payload: Vec<u8>, metadata: Metadata) -> Self {
        Msg {
            payload,
            metadata,
            ..self.clone()
        }
    }

    /// Derived copy with one extra metadata entry.
    pub fn with_metadata_value(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut copy = self.clone();
        copy.metadata.put(key, value);
        copy
    }

    /// Derived copy with the traversal counter incremented.
    pub fn next_hop(&self) -> Self {
        let mut copy = self.clone();
        copy.hops += 1;
        copy
    }

    /// Delivery attempt carried in metadata; 1 for a fresh message.
    pub fn attempt(&self) -> u32 {
        self.metadata
            .get(ATTEMPT_KEY)
            .and_then(|v| v.parse().ok())
            .unwrap_or(1)
    }

    /// Derived copy carrying the given delivery attempt.
    pub fn with_attempt(&self, attempt: u32) -> Self {
        self.with_metadata_value(ATTEMPT_KEY, attempt.to_string())
    }

    /// Encodes the envelope for the queue substrate.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        bincode::serialize(self).map_err(|e| Error::Encode(e.to_string()))
    }

    /// Decodes an envelope from wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        bincode::deserialize(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}
