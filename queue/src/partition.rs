// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Partition service
//!
//! Maps originator entities to partitions and partitions to owning service
//! instances. Every instance runs the same deterministic computation over
//! the same sorted roster, so ownership is agreed without coordination.
//! Each recompute publishes an immutable snapshot through a watch channel;
//! consumers resubscribe from the snapshot between packs.
//!

use crate::{EntityId, Error};

use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info};

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Static partition topology: queue name to partition count.
#[derive(Clone, Debug, Deserialize)]
pub struct QueueTopology {
    pub queue: String,
    pub partitions: u32,
}

/// Immutable ownership snapshot published on every roster recompute.
///
/// `generation` increases monotonically, also when the owned sets did not
/// change; consumers treat an unchanged set as a cheap resubscribe.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartitionChangeEvent {
    pub generation: u64,
    /// Partitions owned by the local instance, per queue.
    pub partitions: HashMap<String, BTreeSet<u32>>,
}

impl PartitionChangeEvent {
    pub fn my_partitions(&self, queue: &str) -> BTreeSet<u32> {
        self.partitions.get(queue).cloned().unwrap_or_default()
    }
}

/// Deterministic partition ownership over a fixed topology.
pub struct PartitionService {
    instance_id: String,
    queues: BTreeMap<String, u32>,
    roster: Vec<String>,
    generation: u64,
    sender: watch::Sender<PartitionChangeEvent>,
}

impl PartitionService {
    /// Starts with a roster containing only the local instance; the first
    /// snapshot is published immediately.
    pub fn new(
        instance_id: impl Into<String>,
        topology: impl IntoIterator<Item = QueueTopology>,
    ) -> Self {
        let instance_id = instance_id.into();
        let queues: BTreeMap<String, u32> = topology
            .into_iter()
            .map(|t| (t.queue, t.partitions))
            .collect();
        let (sender, _) = watch::channel(PartitionChangeEvent::default());
        let mut service = PartitionService {
            roster: vec![instance_id.clone()],
            instance_id,
            queues,
            generation: 0,
            sender,
        };
        service.recompute();
        service
    }

    /// Snapshot stream. The receiver always starts on the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PartitionChangeEvent> {
        self.sender.subscribe()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn partition_count(&self, queue: &str) -> Option<u32> {
        self.queues.get(queue).copied()
    }

    /// Replaces the live-instance roster and publishes a fresh snapshot.
    /// The local instance is always part of its own roster.
    pub fn on_roster_update(
        &mut self,
        instances: impl IntoIterator<Item = String>,
    ) {
        let mut roster: Vec<String> = instances.into_iter().collect();
        if !roster.iter().any(|i| *i == self.instance_id) {
            roster.push(self.instance_id.clone());
        }
        roster.sort();
        roster.dedup();
        info!(
            instances = roster.len(),
            "Partition roster updated, recomputing ownership."
        );
        self.roster = roster;
        self.recompute();
    }

    /// Partition an originator's messages belong to. Stable for the life
    /// of the topology, independent of the roster.
    pub fn resolve(
        &self,
        queue: &str,
        originator: &EntityId,
    ) -> Result<u32, Error> {
        let count = self
            .queues
            .get(queue)
            .ok_or_else(|| Error::UnknownTopic(queue.to_owned()))?;
        Ok((originator.id.as_u128() % u128::from(*count)) as u32)
    }

    /// Partitions of `queue` currently owned by the local instance.
    pub fn my_partitions(&self, queue: &str) -> BTreeSet<u32> {
        self.sender.borrow().my_partitions(queue)
    }

    fn owner(&self, partition: u32) -> &str {
        &self.roster[partition as usize % self.roster.len()]
    }

    // Publishes unconditionally: a snapshot identical to the previous one
    // still advances the generation. `send_replace` stores the snapshot
    // even while no receiver exists, so the bootstrap snapshot computed in
    // `new()` reaches receivers subscribed later.
    fn recompute(&mut self) {
        self.generation += 1;
        let mut partitions: HashMap<String, BTreeSet<u32>> = HashMap::new();
        for (queue, count) in &self.queues {
            let mine: BTreeSet<u32> = (0..*count)
                .filter(|p| self.owner(*p) == self.instance_id)
                .collect();
            debug!(
                queue = %queue,
                owned = mine.len(),
                total = count,
                "Computed partition ownership."
            );
            partitions.insert(queue.clone(), mine);
        }
        self.sender.send_replace(PartitionChangeEvent {
            generation: self.generation,
            partitions,
        });
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{EntityKind, TenantId};

    use uuid::Uuid;

    fn topology() -> Vec<QueueTopology> {
        vec![
            QueueTopology {
                queue: "main".into(),
                partitions: 6,
            },
            QueueTopology {
                queue: "hp".into(),
                partitions: 2,
            },
        ]
    }

    #[test]
    fn single_instance_owns_everything() {
        let service = PartitionService::new("node-a", topology());
        assert_eq!(
            service.my_partitions("main"),
            (0..6).collect::<BTreeSet<u32>>()
        );
        assert_eq!(
            service.my_partitions("hp"),
            (0..2).collect::<BTreeSet<u32>>()
        );
    }

    #[test]
    fn bootstrap_snapshot_reaches_late_subscribers() {
        // No receiver existed while new() published its first snapshot.
        let service = PartitionService::new("node-a", topology());
        let receiver = service.subscribe();
        let snapshot = receiver.borrow();
        assert!(snapshot.generation > 0);
        assert_eq!(
            snapshot.my_partitions("main"),
            (0..6).collect::<BTreeSet<u32>>()
        );
    }

    #[test]
    fn roster_covers_all_partitions_without_overlap() {
        let mut a = PartitionService::new("node-a", topology());
        let mut b = PartitionService::new("node-b", topology());
        let roster = vec!["node-a".to_owned(), "node-b".to_owned()];
        a.on_roster_update(roster.clone());
        b.on_roster_update(roster);

        let mine_a = a.my_partitions("main");
        let mine_b = b.my_partitions("main");
        assert!(mine_a.is_disjoint(&mine_b));
        let union: BTreeSet<u32> =
            mine_a.union(&mine_b).copied().collect();
        assert_eq!(union, (0..6).collect::<BTreeSet<u32>>());
    }

    #[test]
    fn recompute_notifies_even_without_change() {
        let mut service = PartitionService::new("node-a", topology());
        let mut receiver = service.subscribe();
        let before = receiver.borrow_and_update().generation;
        // Same roster again: ownership identical, generation advances.
        service.on_roster_update(vec!["node-a".to_owned()]);
        assert!(receiver.has_changed().unwrap());
        let after = receiver.borrow_and_update().generation;
        assert!(after > before);
        assert_eq!(
            receiver.borrow().my_partitions("main"),
            (0..6).collect::<BTreeSet<u32>>()
        );
    }

    #[test]
    fn resolve_is_stable_and_in_range() {
        let service = PartitionService::new("node-a", topology());
        let tenant = TenantId::random();
        for _ in 0..32 {
            let entity =
                EntityId::new(tenant, Uuid::new_v4(), EntityKind::Device);
            let first = service.resolve("main", &entity).unwrap();
            let second = service.resolve("main", &entity).unwrap();
            assert_eq!(first, second);
            assert!(first < 6);
        }
        assert!(matches!(
            service.resolve("nope", &EntityId::device(tenant, Uuid::new_v4())),
            Err(Error::UnknownTopic(_))
        ));
    }
}
