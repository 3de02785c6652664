//! Final pass: schedules every dead entity for destruction.

use std::collections::HashSet;

use shooter_shared::{
    components::Health,
    ecs::{EntityId, Registry},
};

use super::System;

/// Runs last so every other system saw the dying entity this tick and the
/// room can still broadcast its final state before the flush.
pub struct CleanupSystem;

impl System for CleanupSystem {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn update(
        &mut self,
        _dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        for id in registry.ids_with::<Health>() {
            let Some(health) = registry.get::<Health>(id).copied() else {
                continue;
            };
            if !health.alive || health.hp == 0 {
                destroy.insert(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_and_zero_hp_entities_are_scheduled() {
        let mut reg = Registry::new();
        let alive = reg.create();
        reg.insert(alive, Health::new(2));
        let dead = reg.create();
        let mut h = Health::new(1);
        h.take_damage(1);
        reg.insert(dead, h);
        let hollow = reg.create();
        reg.insert(hollow, Health { hp: 0, alive: true });

        let mut destroy = HashSet::new();
        let mut level = 1;
        CleanupSystem.update(0.016, &mut level, &mut reg, &mut destroy);

        assert!(!destroy.contains(&alive));
        assert!(destroy.contains(&dead));
        assert!(destroy.contains(&hollow));
    }
}
