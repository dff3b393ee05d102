use crate::math::Vec2;

use super::entity::{EntityId, EntityRegistry};

/// Insertion-ordered set of entity ids.
///
/// Members are never reordered. Removal while a pass over the group is in
/// progress is not possible: the universe only mutates groups while draining
/// the command queue, before any entity updates run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    members: Vec<EntityId>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` unless it is already a member.
    pub fn add(&mut self, id: EntityId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.members.push(id);
        true
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(index) = self.members.iter().position(|member| *member == id) else {
            return false;
        };
        self.members.remove(index);
        true
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn first(&self) -> Option<EntityId> {
        self.members.first().copied()
    }

    pub fn get(&self, index: usize) -> Option<EntityId> {
        self.members.get(index).copied()
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().copied()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// First member, in insertion order, whose bounds strictly contain
    /// `point`. Members missing from `registry` are skipped.
    pub fn find_one_by_coordinates(
        &self,
        point: Vec2,
        registry: &EntityRegistry,
    ) -> Option<EntityId> {
        self.iter().find(|id| {
            registry
                .get(*id)
                .is_some_and(|entity| entity.bounds().contains_point(point))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Entity, MovementProfile, PlayerId};
    use crate::sim::tuning::SimTuning;

    fn registry_with(positions: &[(u64, Vec2)]) -> EntityRegistry {
        let movement = MovementProfile::from_tuning(&SimTuning::default());
        let mut registry = EntityRegistry::default();
        for (id, position) in positions {
            registry.insert(Entity::vessel(EntityId(*id), PlayerId(0), *position, movement));
        }
        registry
    }

    #[test]
    fn add_rejects_duplicates_and_keeps_order() {
        let mut group = Group::new();
        assert!(group.add(EntityId(3)));
        assert!(group.add(EntityId(1)));
        assert!(!group.add(EntityId(3)));
        assert_eq!(group.ids(), &[EntityId(3), EntityId(1)]);
    }

    #[test]
    fn remove_by_identity_preserves_remaining_order() {
        let mut group = Group::new();
        for id in 0..4 {
            group.add(EntityId(id));
        }
        assert!(group.remove(EntityId(1)));
        assert!(!group.remove(EntityId(1)));
        assert_eq!(group.ids(), &[EntityId(0), EntityId(2), EntityId(3)]);
    }

    #[test]
    fn find_prefers_earliest_inserted_overlap() {
        let registry = registry_with(&[(1, Vec2::new(0.0, 0.0)), (2, Vec2::new(4.0, 0.0))]);
        let mut group = Group::new();
        group.add(EntityId(2));
        group.add(EntityId(1));

        assert_eq!(
            group.find_one_by_coordinates(Vec2::new(2.0, 0.0), &registry),
            Some(EntityId(2))
        );
    }

    #[test]
    fn find_misses_on_edge_and_outside() {
        let registry = registry_with(&[(1, Vec2::new(0.0, 0.0))]);
        let mut group = Group::new();
        group.add(EntityId(1));

        assert_eq!(group.find_one_by_coordinates(Vec2::new(9.0, 0.0), &registry), None);
        assert_eq!(group.find_one_by_coordinates(Vec2::new(50.0, 50.0), &registry), None);
        assert_eq!(
            group.find_one_by_coordinates(Vec2::new(8.9, -8.9), &registry),
            Some(EntityId(1))
        );
    }

    #[test]
    fn find_skips_members_without_a_record() {
        let registry = registry_with(&[(2, Vec2::ZERO)]);
        let mut group = Group::new();
        group.add(EntityId(1));
        group.add(EntityId(2));

        assert_eq!(group.find_one_by_coordinates(Vec2::ZERO, &registry), Some(EntityId(2)));
    }
}
