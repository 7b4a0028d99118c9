//! Priority ranking over the pending set.
//!
//! Ordering contract: higher priority score first, earlier request time
//! breaking ties. The queue is a binary heap, so insertion is O(log n) and
//! never re-sorts the whole set; removal on cancellation is lazy via a
//! tombstone set consulted at pop time.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use bevy_ecs::prelude::{Entity, Resource};

use crate::ride::PriorityClass;

/// Integer weight for a declared urgency class.
pub fn priority_score(class: PriorityClass) -> i64 {
    match class {
        PriorityClass::Emergency => 100,
        PriorityClass::Exam => 60,
        PriorityClass::Normal => 20,
    }
}

/// One pending ride in rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedRide {
    pub entity: Entity,
    pub score: i64,
    pub requested_at: u64,
}

impl Ord for RankedRide {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher score ranks first; equal scores rank the earlier
        // request first; entity id makes the order total and deterministic.
        self.score
            .cmp(&other.score)
            .then_with(|| other.requested_at.cmp(&self.requested_at))
            .then_with(|| other.entity.cmp(&self.entity))
    }
}

impl PartialOrd for RankedRide {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The ranked pending set. Exclusive resource access makes "pop the current
/// head" atomic relative to other poppers; everything else may interleave.
#[derive(Debug, Default, Resource)]
pub struct PendingQueue {
    heap: BinaryHeap<RankedRide>,
    members: HashSet<Entity>,
    tombstones: HashSet<Entity>,
}

impl PendingQueue {
    pub fn push(&mut self, entity: Entity, score: i64, requested_at: u64) {
        // Re-submission after a tombstoned entry revives the entity.
        self.tombstones.remove(&entity);
        self.members.insert(entity);
        self.heap.push(RankedRide {
            entity,
            score,
            requested_at,
        });
    }

    /// Pop the highest-priority live entry, discarding tombstoned ones.
    pub fn pop_head(&mut self) -> Option<RankedRide> {
        while let Some(head) = self.heap.pop() {
            if self.tombstones.remove(&head.entity) {
                continue;
            }
            self.members.remove(&head.entity);
            return Some(head);
        }
        None
    }

    /// Lazily remove an entry (cancellation, or assignment by another path).
    pub fn remove(&mut self, entity: Entity) {
        if self.members.remove(&entity) {
            self.tombstones.insert(entity);
        }
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current rank order, head first. For dashboards and tests; the heap
    /// itself is not disturbed.
    pub fn ranked(&self) -> Vec<RankedRide> {
        let mut entries: Vec<RankedRide> = self
            .heap
            .iter()
            .filter(|r| !self.tombstones.contains(&r.entity))
            .copied()
            .collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::World;

    fn entities(world: &mut World, n: usize) -> Vec<Entity> {
        (0..n).map(|_| world.spawn(()).id()).collect()
    }

    #[test]
    fn emergency_outranks_exam_regardless_of_arrival_order() {
        let mut world = World::new();
        let e = entities(&mut world, 3);
        let mut queue = PendingQueue::default();

        // Submitted out of order: exam first, then the later emergency, then
        // the earlier emergency.
        queue.push(e[2], priority_score(PriorityClass::Exam), 100);
        queue.push(e[1], priority_score(PriorityClass::Emergency), 300);
        queue.push(e[0], priority_score(PriorityClass::Emergency), 200);

        let ranked = queue.ranked();
        assert_eq!(
            ranked.iter().map(|r| r.entity).collect::<Vec<_>>(),
            vec![e[0], e[1], e[2]]
        );

        assert_eq!(queue.pop_head().unwrap().entity, e[0]);
        assert_eq!(queue.pop_head().unwrap().entity, e[1]);
        assert_eq!(queue.pop_head().unwrap().entity, e[2]);
        assert!(queue.pop_head().is_none());
    }

    #[test]
    fn pairwise_order_holds_after_interleaved_insertions() {
        let mut world = World::new();
        let e = entities(&mut world, 6);
        let mut queue = PendingQueue::default();

        queue.push(e[0], 20, 50);
        queue.push(e[1], 100, 400);
        assert_eq!(queue.ranked()[0].entity, e[1]);

        queue.push(e[2], 60, 10);
        queue.push(e[3], 100, 100);
        queue.push(e[4], 20, 5);
        queue.push(e[5], 60, 900);

        let ranked = queue.ranked();
        // Every pairwise comparison respects (score desc, requested_at asc).
        for pair in ranked.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(
                a.score > b.score || (a.score == b.score && a.requested_at <= b.requested_at),
                "{a:?} must rank before {b:?}"
            );
        }
        assert_eq!(ranked[0].entity, e[3], "earlier emergency first");
    }

    #[test]
    fn removal_is_lazy_but_observable() {
        let mut world = World::new();
        let e = entities(&mut world, 3);
        let mut queue = PendingQueue::default();
        queue.push(e[0], 100, 1);
        queue.push(e[1], 60, 2);
        queue.push(e[2], 20, 3);

        queue.remove(e[0]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_head().unwrap().entity, e[1]);
        assert_eq!(queue.pop_head().unwrap().entity, e[2]);
        assert!(queue.pop_head().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn removing_unknown_entity_is_a_no_op() {
        let mut world = World::new();
        let e = entities(&mut world, 2);
        let mut queue = PendingQueue::default();
        queue.push(e[0], 20, 1);
        queue.remove(e[1]);
        assert_eq!(queue.len(), 1);
    }
}
