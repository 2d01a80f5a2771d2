// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Rule chain model
//!
//! Rule chains are directed graphs: nodes carry a [`RuleNodeBehavior`],
//! links carry a relation label. Definitions are validated when registered
//! in the [`ChainRepository`]; the actors compile them into routing tables
//! at start.
//!

use crate::node::RuleNodeBehavior;
use crate::Error;

use queue::TenantId;
use uuid::Uuid;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock};

pub type RuleChainId = Uuid;
pub type RuleNodeId = Uuid;

/// Well-known relation labels. Matching is case-sensitive on the label
/// string; custom labels are free-form.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum RelationKind {
    Success,
    Failure,
    True,
    False,
    Other(String),
}

impl RelationKind {
    pub fn label(&self) -> &str {
        match self {
            RelationKind::Success => "Success",
            RelationKind::Failure => "Failure",
            RelationKind::True => "True",
            RelationKind::False => "False",
            RelationKind::Other(label) => label,
        }
    }
}

impl From<&str> for RelationKind {
    fn from(label: &str) -> Self {
        match label {
            "Success" => RelationKind::Success,
            "Failure" => RelationKind::Failure,
            "True" => RelationKind::True,
            "False" => RelationKind::False,
            other => RelationKind::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One node of a chain. The behavior is shared because several chain
/// instances (and restarts) may reference the same definition.
#[derive(Clone)]
pub struct RuleNodeSpec {
    pub id: RuleNodeId,
    pub name: String,
    pub behavior: Arc<dyn RuleNodeBehavior>,
}

// Behaviors carry no Debug; print the identifying parts.
impl fmt::Debug for RuleNodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleNodeSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.behavior.kind())
            .finish()
    }
}

/// Directed, labeled link between two nodes of a chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuleLink {
    pub from: RuleNodeId,
    pub to: RuleNodeId,
    pub label: String,
}

/// Definition of one rule chain.
#[derive(Clone, Debug)]
pub struct RuleChainSpec {
    pub id: RuleChainId,
    pub name: String,
    /// Entry node; every message enters the chain here.
    pub root: RuleNodeId,
    pub nodes: Vec<RuleNodeSpec>,
    pub links: Vec<RuleLink>,
}

impl RuleChainSpec {
    pub fn new(name: impl Into<String>) -> Self {
        RuleChainSpec {
            id: Uuid::new_v4(),
            name: name.into(),
            root: Uuid::nil(),
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Adds a node and returns its id. The first node added becomes the
    /// root until [`set_root`](Self::set_root) overrides it.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        behavior: Arc<dyn RuleNodeBehavior>,
    ) -> RuleNodeId {
        let id = Uuid::new_v4();
        self.nodes.push(RuleNodeSpec {
            id,
            name: name.into(),
            behavior,
        });
        if self.root.is_nil() {
            self.root = id;
        }
        id
    }

    pub fn set_root(&mut self, root: RuleNodeId) {
        self.root = root;
    }

    pub fn link(
        &mut self,
        from: RuleNodeId,
        to: RuleNodeId,
        relation: impl Into<RelationKind>,
    ) {
        self.links.push(RuleLink {
            from,
            to,
            label: relation.into().label().to_owned(),
        });
    }

    pub fn node(&self, id: RuleNodeId) -> Option<&RuleNodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Routing table: `(node, label) -> targets`, in link order.
    pub fn routes(
        &self,
    ) -> HashMap<(RuleNodeId, String), Vec<RuleNodeId>> {
        let mut routes: HashMap<(RuleNodeId, String), Vec<RuleNodeId>> =
            HashMap::new();
        for link in &self.links {
            routes
                .entry((link.from, link.label.clone()))
                .or_default()
                .push(link.to);
        }
        routes
    }

    /// Structural validation: at least one node, a known root, unique node
    /// ids, links between known nodes with non-empty labels.
    pub fn validate(&self) -> Result<(), Error> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidChain(format!(
                "chain '{}' has no nodes",
                self.name
            )));
        }
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id) {
                return Err(Error::InvalidChain(format!(
                    "duplicate node id {} in chain '{}'",
                    node.id, self.name
                )));
            }
        }
        if !ids.contains(&self.root) {
            return Err(Error::InvalidChain(format!(
                "root node {} not part of chain '{}'",
                self.root, self.name
            )));
        }
        for link in &self.links {
            if link.label.is_empty() {
                return Err(Error::InvalidChain(format!(
                    "empty relation label in chain '{}'",
                    self.name
                )));
            }
            if !ids.contains(&link.from) || !ids.contains(&link.to) {
                return Err(Error::InvalidChain(format!(
                    "link {} -> {} references unknown nodes in chain '{}'",
                    link.from, link.to, self.name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct TenantChains {
    root: Option<RuleChainId>,
    chains: HashMap<RuleChainId, RuleChainSpec>,
}

/// In-memory registry of chain definitions per tenant. Shared between the
/// bootstrap code and the routing actors; chains are validated on insert so
/// the actors only ever see well-formed graphs.
#[derive(Clone, Default)]
pub struct ChainRepository {
    inner: Arc<RwLock<HashMap<TenantId, TenantChains>>>,
}

impl ChainRepository {
    pub fn new() -> Self {
        ChainRepository::default()
    }

    /// Validates and registers a chain. The first chain of a tenant, or
    /// any chain added with `root = true`, becomes the tenant's root.
    pub fn add(
        &self,
        tenant: TenantId,
        spec: RuleChainSpec,
        root: bool,
    ) -> Result<RuleChainId, Error> {
        spec.validate()?;
        let id = spec.id;
        let mut inner = self
            .inner
            .write()
            .map_err(|e| Error::InvalidChain(e.to_string()))?;
        let chains = inner.entry(tenant).or_default();
        if root || chains.root.is_none() {
            chains.root = Some(id);
        }
        chains.chains.insert(id, spec);
        Ok(id)
    }

    pub fn remove(&self, tenant: TenantId, chain: RuleChainId) {
        if let Ok(mut inner) = self.inner.write() {
            if let Some(chains) = inner.get_mut(&tenant) {
                chains.chains.remove(&chain);
                if chains.root == Some(chain) {
                    chains.root = None;
                }
            }
        }
    }

    pub fn remove_tenant(&self, tenant: TenantId) {
        if let Ok(mut inner) = self.inner.write() {
            inner.remove(&tenant);
        }
    }

    /// The tenant's root chain definition.
    pub fn root(&self, tenant: TenantId) -> Option<RuleChainSpec> {
        self.inner.read().ok().and_then(|inner| {
            let chains = inner.get(&tenant)?;
            chains.chains.get(&chains.root?).cloned()
        })
    }

    pub fn get(
        &self,
        tenant: TenantId,
        chain: RuleChainId,
    ) -> Option<RuleChainSpec> {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.get(&tenant)?.chains.get(&chain).cloned())
    }
}
