//! Kinematics and expiry passes: movement integration, cooldown ticking,
//! projectile lifetimes and the world boundary.

use std::{collections::HashSet, sync::Arc};

use shooter_shared::{
    components::{FireCooldown, PlayerSlot, Projectile, Transform, Velocity},
    config::GameConfig,
    ecs::{EntityId, Registry},
};

use super::System;

/// Integrates velocity into position.
pub struct MovementSystem;

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn update(
        &mut self,
        dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        _destroy: &mut HashSet<EntityId>,
    ) {
        for id in registry.join_ids::<Transform, Velocity>() {
            let Some(velocity) = registry.get::<Velocity>(id).copied() else {
                continue;
            };
            if let Some(transform) = registry.get_mut::<Transform>(id) {
                transform.x += velocity.dx * dt;
                transform.y += velocity.dy * dt;
            }
        }
    }
}

/// Counts fire cooldowns down toward ready.
pub struct FireCooldownSystem;

impl System for FireCooldownSystem {
    fn name(&self) -> &'static str {
        "fire_cooldown"
    }

    fn update(
        &mut self,
        dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        _destroy: &mut HashSet<EntityId>,
    ) {
        for id in registry.ids_with::<FireCooldown>() {
            if let Some(cooldown) = registry.get_mut::<FireCooldown>(id) {
                cooldown.timer = (cooldown.timer - dt).max(0.0);
            }
        }
    }
}

/// Expires projectiles past their configured lifetime. Persistent beams are
/// exempt until released, at which point they age like any other bullet.
pub struct ProjectileLifetimeSystem {
    config: Arc<GameConfig>,
}

impl ProjectileLifetimeSystem {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self { config }
    }
}

impl System for ProjectileLifetimeSystem {
    fn name(&self) -> &'static str {
        "projectile_lifetime"
    }

    fn update(
        &mut self,
        dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        let max_lifetime = self.config.gameplay.bullet_lifetime;
        for id in registry.ids_with::<Projectile>() {
            let Some(projectile) = registry.get_mut::<Projectile>(id) else {
                continue;
            };
            if projectile.persistent {
                continue;
            }
            projectile.lifetime += dt;
            if projectile.lifetime > max_lifetime {
                destroy.insert(id);
            }
        }
    }
}

/// Keeps players inside the world and removes anything else that strays too
/// far past it.
pub struct BoundarySystem {
    config: Arc<GameConfig>,
}

impl BoundarySystem {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self { config }
    }
}

impl System for BoundarySystem {
    fn name(&self) -> &'static str {
        "boundary"
    }

    fn update(
        &mut self,
        _dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        let width = self.config.gameplay.world_width;
        let height = self.config.gameplay.world_height;
        let margin = self.config.systems.boundary_margin;

        for id in registry.ids_with::<Transform>() {
            let Some(pos) = registry.get::<Transform>(id).copied() else {
                continue;
            };
            if registry.has::<PlayerSlot>(id) {
                if let Some(transform) = registry.get_mut::<Transform>(id) {
                    transform.x = pos.x.clamp(0.0, width);
                    transform.y = pos.y.clamp(0.0, height);
                }
            } else if pos.x < -margin
                || pos.x > width + margin
                || pos.y < -margin
                || pos.y > height + margin
            {
                destroy.insert(id);
            }
        }
    }
}
