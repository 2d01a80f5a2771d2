// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Actor paths
//!
//! Hierarchical addressing for actors. A path is an ordered list of name
//! segments mirroring the supervision tree, rendered as `/seg1/seg2/...`.
//!

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::fmt::{Error, Formatter};

/// Hierarchical actor address.
#[derive(
    Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActorPath(Vec<String>);

impl ActorPath {
    /// The top-level ancestor of this path.
    pub fn root(&self) -> Self {
        ActorPath(self.0.iter().take(1).cloned().collect())
    }

    /// The immediate parent. The parent of a top-level path is the empty
    /// path.
    pub fn parent(&self) -> Self {
        if self.0.len() > 1 {
            let mut segments = self.0.clone();
            segments.truncate(segments.len() - 1);
            ActorPath(segments)
        } else {
            ActorPath(Vec::new())
        }
    }

    /// The last segment, used as the registry key of the actor within its
    /// parent.
    pub fn key(&self) -> String {
        self.0.last().cloned().unwrap_or_default()
    }

    /// Depth of the path.
    pub fn level(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_parent_of(&self, other: &ActorPath) -> bool {
        *self == other.parent()
    }

    pub fn is_child_of(&self, other: &ActorPath) -> bool {
        self.parent() == *other
    }

    /// True if `other` lives somewhere below this path.
    pub fn is_ancestor_of(&self, other: &ActorPath) -> bool {
        let prefix = format!("{}/", self);
        other.to_string().starts_with(prefix.as_str())
    }

    pub fn is_top_level(&self) -> bool {
        self.0.len() == 1
    }
}

impl From<&str> for ActorPath {
    fn from(str: &str) -> Self {
        let segments: Vec<String> = str
            .split('/')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
            .collect();
        ActorPath(segments)
    }
}

impl From<String> for ActorPath {
    fn from(string: String) -> Self {
        ActorPath::from(string.as_str())
    }
}

impl std::ops::Div<&str> for ActorPath {
    type Output = ActorPath;

    fn div(self, rhs: &str) -> Self::Output {
        let mut segments = self.0;
        let mut extra: Vec<String> = rhs
            .split('/')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
            .collect();
        segments.append(&mut extra);
        ActorPath(segments)
    }
}

impl std::fmt::Display for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self.level().cmp(&1) {
            Ordering::Less => write!(f, "/"),
            _ => write!(f, "/{}", self.0.join("/")),
        }
    }
}

impl std::fmt::Debug for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn parse_empty_string() {
        let path = ActorPath::from("");
        assert!(path.is_empty());
        assert_eq!(path.to_string(), "/");
    }

    #[test]
    fn parse_nested() {
        let path = ActorPath::from("/tenants/t1/chains/c1");
        assert_eq!(path.level(), 4);
        assert_eq!(path.key(), "c1");
        assert_eq!(path.root(), ActorPath::from("/tenants"));
    }

    #[test]
    fn parent_child() {
        let parent = ActorPath::from("/tenants/t1");
        let child = parent.clone() / "chains" / "c1";
        assert_eq!(child.to_string(), "/tenants/t1/chains/c1");
        assert!(child.is_child_of(&(parent.clone() / "chains")));
        assert!(parent.is_ancestor_of(&child));
        assert!(!child.is_ancestor_of(&parent));
    }

    #[test]
    fn parent_of_top_level_is_empty() {
        let path = ActorPath::from("/root");
        assert!(path.is_top_level());
        assert!(path.parent().is_empty());
    }

    #[test]
    fn display_skips_blank_segments() {
        let path = ActorPath::from("//a///b/");
        assert_eq!(path.to_string(), "/a/b");
    }
}
