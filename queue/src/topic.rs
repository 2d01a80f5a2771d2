// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Topic addressing
//!
//! Naming rules for topics, partitions and consumer groups. All naming goes
//! through [`TopicService`] so a deployment-wide prefix and per-tenant
//! isolation are applied in exactly one place.
//!

use crate::TenantId;

use serde::{Deserialize, Serialize};

use std::fmt;
use std::hash::{Hash, Hasher};

/// Which service family a consumer group belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    Core,
    RuleEngine,
}

impl ServiceKind {
    /// Short prefix embedded in consumer-group ids.
    pub fn group_prefix(&self) -> &'static str {
        match self {
            ServiceKind::Core => "core-",
            ServiceKind::RuleEngine => "re-",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::Core => "core",
            ServiceKind::RuleEngine => "rule-engine",
        }
    }
}

/// Address of one partition of one topic.
///
/// Identity (equality, hashing) is `(topic, partition)` only: two infos for
/// the same partition are interchangeable keys regardless of tenant
/// annotation or local ownership.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct TopicPartitionInfo {
    pub topic: String,
    /// Tenant annotation for isolated topics; `None` for shared ones.
    pub tenant: Option<TenantId>,
    /// `None` addresses the whole topic (notification topics).
    pub partition: Option<u32>,
    /// Whether the local instance currently owns this partition.
    pub my_partition: bool,
}

impl TopicPartitionInfo {
    pub fn new(
        topic: impl Into<String>,
        tenant: Option<TenantId>,
        partition: Option<u32>,
        my_partition: bool,
    ) -> Self {
        TopicPartitionInfo {
            topic: topic.into(),
            tenant,
            partition,
            my_partition,
        }
    }

    /// Fully qualified name used by the substrate, `topic.partition`.
    pub fn full_topic_name(&self) -> String {
        match self.partition {
            Some(partition) => format!("{}.{}", self.topic, partition),
            None => self.topic.clone(),
        }
    }
}

impl PartialEq for TopicPartitionInfo {
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic && self.partition == other.partition
    }
}

impl Hash for TopicPartitionInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.topic.hash(state);
        self.partition.hash(state);
    }
}

impl fmt::Display for TopicPartitionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_topic_name())
    }
}

/// Applies the deployment prefix and tenant isolation to every name.
#[derive(Clone, Debug, Default)]
pub struct TopicService {
    prefix: String,
}

impl TopicService {
    /// `prefix` is prepended (dot-separated) to every topic and consumer
    /// group; empty means no prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        TopicService {
            prefix: prefix.into(),
        }
    }

    fn prefixed(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }

    /// Topic name for a queue, embedding the tenant id only for isolated
    /// (non-system) tenants.
    pub fn topic_name(&self, queue: &str, tenant: TenantId) -> String {
        if tenant.is_system() {
            self.prefixed(queue)
        } else {
            self.prefixed(&format!("{}.isolated.{}", queue, tenant))
        }
    }

    /// Consumer group id:
    /// `{prefix}.{service}{queue}[-isolated-{tenant}]-consumer[-{partition}]`.
    ///
    /// Omitting the partition yields the group-managed form used when the
    /// substrate assigns partitions itself; including it yields one group
    /// per explicitly-owned partition.
    pub fn consumer_group(
        &self,
        service: ServiceKind,
        queue: &str,
        tenant: TenantId,
        partition: Option<u32>,
    ) -> String {
        let mut group =
            format!("{}{}", service.group_prefix(), queue);
        if !tenant.is_system() {
            group.push_str(&format!("-isolated-{}", tenant));
        }
        group.push_str("-consumer");
        if let Some(partition) = partition {
            group.push_str(&format!("-{}", partition));
        }
        self.prefixed(&group)
    }

    /// Partition address for a queue topic.
    pub fn partition(
        &self,
        queue: &str,
        tenant: TenantId,
        partition: u32,
        my_partition: bool,
    ) -> TopicPartitionInfo {
        let tenant_info = (!tenant.is_system()).then_some(tenant);
        TopicPartitionInfo::new(
            self.topic_name(queue, tenant),
            tenant_info,
            Some(partition),
            my_partition,
        )
    }

    /// Per-instance notification topic; unpartitioned and always local.
    pub fn notifications_topic(
        &self,
        service: ServiceKind,
        instance_id: &str,
    ) -> TopicPartitionInfo {
        TopicPartitionInfo::new(
            self.prefixed(&format!(
                "{}.notifications.{}",
                service.label(),
                instance_id
            )),
            None,
            None,
            true,
        )
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn shared_topic_has_no_tenant_marker() {
        let topics = TopicService::new("tb");
        assert_eq!(
            topics.topic_name("main", TenantId::system()),
            "tb.main"
        );
    }

    #[test]
    fn isolated_topic_embeds_tenant() {
        let topics = TopicService::new("tb");
        let tenant = TenantId::random();
        assert_eq!(
            topics.topic_name("main", tenant),
            format!("tb.main.isolated.{}", tenant)
        );
    }

    #[test]
    fn empty_prefix_adds_no_separator() {
        let topics = TopicService::new("");
        assert_eq!(topics.topic_name("main", TenantId::system()), "main");
    }

    #[test]
    fn consumer_group_formats() {
        let topics = TopicService::new("tb");
        assert_eq!(
            topics.consumer_group(
                ServiceKind::RuleEngine,
                "main",
                TenantId::system(),
                None
            ),
            "tb.re-main-consumer"
        );
        assert_eq!(
            topics.consumer_group(
                ServiceKind::RuleEngine,
                "main",
                TenantId::system(),
                Some(3)
            ),
            "tb.re-main-consumer-3"
        );
        let tenant = TenantId::random();
        assert_eq!(
            topics.consumer_group(
                ServiceKind::Core,
                "hp",
                tenant,
                Some(0)
            ),
            format!("tb.core-hp-isolated-{}-consumer-0", tenant)
        );
    }

    #[test]
    fn identity_ignores_ownership_and_tenant() {
        let a = TopicPartitionInfo::new("main", None, Some(1), true);
        let b = TopicPartitionInfo::new(
            "main",
            Some(TenantId::random()),
            Some(1),
            false,
        );
        let c = TopicPartitionInfo::new("main", None, Some(2), true);
        assert_eq!(a, b);
        assert_ne!(a, c);
        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn full_name_appends_partition() {
        let tpi = TopicPartitionInfo::new("tb.main", None, Some(7), true);
        assert_eq!(tpi.full_topic_name(), "tb.main.7");
        assert_eq!(tpi.to_string(), "tb.main.7");
    }
}
