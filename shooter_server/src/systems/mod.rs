//! Simulation systems.
//!
//! Each system is one focused pass over the registry, run in a fixed order
//! every tick. Systems never hold component references across a pass; they
//! walk id snapshots and resolve components by id, so a system can spawn and
//! schedule destruction mid-walk without invalidating anything.

use std::{collections::HashSet, sync::Arc};

use shooter_shared::{
    config::GameConfig,
    ecs::{EntityId, Registry},
};

mod boss;
mod cleanup;
mod combat;
mod input;
mod level;
mod motion;
mod powerup;

pub use boss::{Boss2System, ShieldFollowSystem};
pub use cleanup::CleanupSystem;
pub use combat::{
    basic_damage, laser_damage, rocket_damage, CollisionSystem, LaserBeamSystem, ShootingSystem,
    WeaponDamageSystem,
};
pub use input::PlayerInputSystem;
pub use level::{LevelSystem, MonsterSpawnerSystem};
pub use motion::{BoundarySystem, FireCooldownSystem, MovementSystem, ProjectileLifetimeSystem};
pub use powerup::PowerUpSystem;

/// One simulation pass. `level` is the room's current wave number; systems
/// that schedule deaths add ids to `destroy` and the room flushes the set
/// after broadcasting, so clients see the final state of dying entities.
pub trait System: Send {
    fn name(&self) -> &'static str;

    fn update(
        &mut self,
        dt: f32,
        level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    );
}

/// Ordered list of systems built from the config's feature switches.
pub struct Pipeline {
    systems: Vec<Box<dyn System>>,
}

impl Pipeline {
    /// Assembles the tick order. Collision resolution runs before damage is
    /// applied, and cleanup always runs last so every other system observes
    /// dead entities for one final tick.
    pub fn from_config(config: &Arc<GameConfig>) -> Self {
        let mut systems: Vec<Box<dyn System>> = Vec::new();
        let switches = &config.systems;

        if switches.movement {
            systems.push(Box::new(MovementSystem));
        }
        systems.push(Box::new(LaserBeamSystem::new(Arc::clone(config))));
        if switches.fire_cooldown {
            systems.push(Box::new(FireCooldownSystem));
        }
        if switches.projectile_lifetime {
            systems.push(Box::new(ProjectileLifetimeSystem::new(Arc::clone(config))));
        }
        systems.push(Box::new(PlayerInputSystem::new(Arc::clone(config))));
        systems.push(Box::new(ShootingSystem::new(Arc::clone(config))));
        if switches.collision {
            systems.push(Box::new(CollisionSystem));
        }
        systems.push(Box::new(WeaponDamageSystem));
        systems.push(Box::new(PowerUpSystem::new(Arc::clone(config))));
        if switches.level {
            systems.push(Box::new(LevelSystem::new(Arc::clone(config))));
        } else if switches.monster_spawner {
            systems.push(Box::new(MonsterSpawnerSystem::new(Arc::clone(config))));
        }
        systems.push(Box::new(Boss2System::new(Arc::clone(config))));
        systems.push(Box::new(ShieldFollowSystem::new(Arc::clone(config))));
        if switches.boundary {
            systems.push(Box::new(BoundarySystem::new(Arc::clone(config))));
        }
        if switches.cleanup {
            systems.push(Box::new(CleanupSystem));
        }

        Self { systems }
    }

    pub fn run(
        &mut self,
        dt: f32,
        level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        for system in &mut self.systems {
            system.update(dt, level, registry, destroy);
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }
}
