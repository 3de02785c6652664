//! Scripted behaviors: the second boss's oscillate/vanish loop and shield
//! entities tracking their parent monster.

use std::{collections::HashSet, sync::Arc};

use rand::{rngs::StdRng, Rng, SeedableRng};
use shooter_shared::{
    components::{Boss2Behavior, Health, Monster, Shield, Transform, Velocity},
    config::GameConfig,
    ecs::{EntityId, Registry},
};

use super::System;

/// Fallback monster size for the shield offset when the type is unknown.
const DEFAULT_MONSTER_SIZE: f32 = 24.0;

/// Drives the second boss: sine-wave bobbing while visible, then a vanish
/// phase that ends with a teleport to a new height.
pub struct Boss2System {
    config: Arc<GameConfig>,
    rng: StdRng,
}

impl Boss2System {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    fn with_seed(config: Arc<GameConfig>, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl System for Boss2System {
    fn name(&self) -> &'static str {
        "boss2_behavior"
    }

    fn update(
        &mut self,
        dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        _destroy: &mut HashSet<EntityId>,
    ) {
        let world_height = self.config.gameplay.world_height;
        for id in registry.join_ids::<Boss2Behavior, Transform>() {
            let Some(mut behavior) = registry.get::<Boss2Behavior>(id).copied() else {
                continue;
            };

            if behavior.visible {
                behavior.oscillation_timer += dt * behavior.oscillation_speed;
                let y = behavior.base_y
                    + behavior.oscillation_timer.sin() * behavior.oscillation_amplitude;
                if let Some(transform) = registry.get_mut::<Transform>(id) {
                    transform.y = y;
                }
            }

            behavior.visibility_timer += dt;
            let phase = if behavior.visible {
                behavior.visible_duration
            } else {
                behavior.invisible_duration
            };
            if behavior.visibility_timer >= phase {
                behavior.visibility_timer = 0.0;
                behavior.visible = !behavior.visible;
                if behavior.visible {
                    // Reappear somewhere new, away from the screen edges.
                    behavior.base_y = self.rng.gen_range(0.15..0.85) * world_height;
                    behavior.oscillation_timer = 0.0;
                    if let Some(transform) = registry.get_mut::<Transform>(id) {
                        transform.y = behavior.base_y;
                    }
                }
            }

            registry.insert(id, behavior);
        }
    }
}

/// Keeps shield entities glued to their parent and kills them when the
/// parent dies or the shield's own health runs out.
pub struct ShieldFollowSystem {
    config: Arc<GameConfig>,
}

impl ShieldFollowSystem {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self { config }
    }
}

impl System for ShieldFollowSystem {
    fn name(&self) -> &'static str {
        "shield_follow"
    }

    fn update(
        &mut self,
        _dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        for id in registry.ids_with::<Shield>() {
            let Some(shield) = registry.get::<Shield>(id).copied() else {
                continue;
            };
            let parent = shield.parent;
            let parent_alive = !destroy.contains(&parent)
                && registry.get::<Health>(parent).is_some_and(|h| h.alive);
            let parent_pos = registry.get::<Transform>(parent).copied();
            let (Some(parent_pos), true) = (parent_pos, parent_alive) else {
                destroy.insert(id);
                continue;
            };

            let size = registry
                .get::<Monster>(parent)
                .and_then(|m| self.config.gameplay.monster_types.get(&m.kind))
                .map_or(DEFAULT_MONSTER_SIZE, |t| t.size);
            let parent_vel = registry.get::<Velocity>(parent).copied().unwrap_or_default();

            // Lead on the dominant movement axis.
            let lead = size * 0.6;
            let (lead_x, lead_y) = if parent_vel.dx.abs() >= parent_vel.dy.abs() {
                (if parent_vel.dx < 0.0 { -lead } else { lead }, 0.0)
            } else {
                (0.0, if parent_vel.dy < 0.0 { -lead } else { lead })
            };

            if let Some(transform) = registry.get_mut::<Transform>(id) {
                transform.x = parent_pos.x + lead_x + shield.offset_x;
                transform.y = parent_pos.y + lead_y + shield.offset_y;
            }
            if let Some(velocity) = registry.get_mut::<Velocity>(id) {
                *velocity = parent_vel;
            }

            if registry.get::<Health>(id).is_some_and(|h| !h.alive) {
                destroy.insert(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::factory;

    use super::*;

    fn run(system: &mut dyn System, dt: f32, reg: &mut Registry) -> HashSet<EntityId> {
        let mut destroy = HashSet::new();
        let mut level = 1;
        system.update(dt, &mut level, reg, &mut destroy);
        destroy
    }

    fn boss2(reg: &mut Registry, config: &GameConfig) -> EntityId {
        let boss = factory::spawn_monster(
            reg,
            config,
            config.gameplay.boss2_monster_type,
            true,
            1000.0,
            540.0,
            0.0,
            0.0,
        );
        reg.insert(boss, Boss2Behavior {
            base_y: 540.0,
            oscillation_speed: 1.5,
            oscillation_amplitude: 120.0,
            ..Boss2Behavior::default()
        });
        boss
    }

    #[test]
    fn visible_boss_bobs_around_its_base_height() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let boss = boss2(&mut reg, &config);

        let mut system = Boss2System::with_seed(Arc::clone(&config), 11);
        run(&mut system, 0.5, &mut reg);
        let behavior = reg.get::<Boss2Behavior>(boss).copied().unwrap();
        let y = reg.get::<Transform>(boss).unwrap().y;
        let expected = behavior.base_y
            + (0.5 * behavior.oscillation_speed).sin() * behavior.oscillation_amplitude;
        assert!((y - expected).abs() < 1e-4);
        assert!(behavior.visible);
    }

    #[test]
    fn boss_vanishes_and_reappears_at_a_new_height() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let boss = boss2(&mut reg, &config);
        let mut system = Boss2System::with_seed(Arc::clone(&config), 11);

        // Burn through the visible phase.
        run(&mut system, 4.0, &mut reg);
        let behavior = reg.get::<Boss2Behavior>(boss).copied().unwrap();
        assert!(!behavior.visible);
        let frozen_y = reg.get::<Transform>(boss).unwrap().y;

        // While invisible the boss does not move.
        run(&mut system, 1.0, &mut reg);
        assert_eq!(reg.get::<Transform>(boss).unwrap().y, frozen_y);

        // End of the vanish phase: teleported and oscillating afresh.
        run(&mut system, 1.0, &mut reg);
        let behavior = reg.get::<Boss2Behavior>(boss).copied().unwrap();
        assert!(behavior.visible);
        assert_eq!(behavior.oscillation_timer, 0.0);
        let h = config.gameplay.world_height;
        assert!(behavior.base_y >= 0.15 * h && behavior.base_y <= 0.85 * h);
        assert_eq!(reg.get::<Transform>(boss).unwrap().y, behavior.base_y);
    }

    #[test]
    fn shield_leads_its_parent_and_copies_velocity() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let monster = factory::spawn_monster(&mut reg, &config, 3, false, 600.0, 300.0, -50.0, 0.0);
        let shield = reg.ids_with::<Shield>()[0];
        let size = config.gameplay.monster_types[&3].size;

        // Parent drifted since spawn.
        reg.insert(monster, Transform::new(580.0, 310.0));
        let mut system = ShieldFollowSystem::new(Arc::clone(&config));
        let destroyed = run(&mut system, 0.016, &mut reg);
        assert!(destroyed.is_empty());

        let pos = reg.get::<Transform>(shield).copied().unwrap();
        assert_eq!(pos.x, 580.0 - size * 0.6);
        assert_eq!(pos.y, 310.0);
        let vel = reg.get::<Velocity>(shield).copied().unwrap();
        assert_eq!((vel.dx, vel.dy), (-50.0, 0.0));
    }

    #[test]
    fn shield_dies_with_its_parent_or_its_own_health() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let monster = factory::spawn_monster(&mut reg, &config, 3, false, 600.0, 300.0, -50.0, 0.0);
        let shield = reg.ids_with::<Shield>()[0];
        let mut system = ShieldFollowSystem::new(Arc::clone(&config));

        reg.get_mut::<Health>(monster).unwrap().take_damage(255);
        let destroyed = run(&mut system, 0.016, &mut reg);
        assert!(destroyed.contains(&shield));

        // Fresh pair, this time the shield itself is broken.
        let mut reg = Registry::new();
        let _monster = factory::spawn_monster(&mut reg, &config, 3, false, 600.0, 300.0, -50.0, 0.0);
        let shield = reg.ids_with::<Shield>()[0];
        reg.get_mut::<Health>(shield).unwrap().take_damage(255);
        let destroyed = run(&mut system, 0.016, &mut reg);
        assert!(destroyed.contains(&shield));
    }
}
