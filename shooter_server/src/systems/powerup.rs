//! Power-up spawning, drift and pickup.

use std::{collections::HashSet, sync::Arc, time::Instant};

use rand::{rngs::StdRng, Rng, SeedableRng};
use shooter_shared::{
    components::{
        Collider, PlayerSlot, PlayerStatus, PowerUp, PowerUpKind, StatusKind, Transform, Weapon,
        WeaponKind,
    },
    config::{GameConfig, GameplayConfig},
    ecs::{EntityId, Registry},
};
use tracing::debug;

use crate::factory;

use super::System;

/// Pickup radius fallbacks when an entity carries no collider.
const PLAYER_PICKUP_RADIUS: f32 = 10.0;
const POWER_UP_PICKUP_RADIUS: f32 = 8.0;

/// Beyond laser tier the pickup keeps leveling the beam, up to this cap.
const MAX_LASER_LEVEL: u8 = 3;

pub struct PowerUpSystem {
    config: Arc<GameConfig>,
    spawn_timer: f32,
    rng: StdRng,
}

impl PowerUpSystem {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            config,
            spawn_timer: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    fn with_seed(config: Arc<GameConfig>, seed: u64) -> Self {
        Self {
            config,
            spawn_timer: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn spawn_one(&mut self, registry: &mut Registry) {
        let gameplay = &self.config.gameplay;
        // One roll drives both axes so drops scatter along a diagonal band.
        let roll: f32 = self.rng.gen();
        let jitter = (roll - 0.5) * gameplay.power_up_spawn_random_range;
        let margin = gameplay.power_up_spawn_margin;
        let x = (gameplay.world_width * gameplay.power_up_spawn_center_x + jitter)
            .clamp(margin, gameplay.world_width - margin);
        let y = (gameplay.world_height * gameplay.power_up_spawn_center_y + jitter)
            .clamp(margin, gameplay.world_height - margin);

        let kind = PowerUpKind::from_wire(self.rng.gen_range(0..=1));
        let (vx, vy) =
            GameplayConfig::direction_velocity(gameplay.power_up_spawn_side, gameplay.scroll_speed);
        let entity = factory::spawn_power_up(
            registry,
            &self.config,
            kind,
            x,
            y,
            vx * gameplay.power_up_speed_multiplier,
            vy * gameplay.power_up_speed_multiplier,
        );
        debug!(entity = entity.0, ?kind, x, y, "Spawned power-up");
    }

    fn apply_weapon_upgrade(&self, registry: &mut Registry, player: EntityId) {
        let gameplay = &self.config.gameplay;
        let mut weapon = registry.get::<Weapon>(player).cloned().unwrap_or_default();
        let had_laser = weapon.laser_unlocked;

        weapon.power_ups_collected = weapon.power_ups_collected.saturating_add(1);
        let laser_at = u16::from(gameplay.power_ups_for_laser.max(1));
        let rocket_at = u16::from(gameplay.power_ups_for_rocket.max(1));
        if !weapon.laser_unlocked && weapon.power_ups_collected >= laser_at {
            weapon.laser_unlocked = true;
            if weapon.kind == WeaponKind::Basic {
                weapon.kind = WeaponKind::Laser;
            }
        }
        if !weapon.rocket_unlocked && weapon.power_ups_collected >= rocket_at {
            weapon.rocket_unlocked = true;
            if weapon.kind == WeaponKind::Basic {
                weapon.kind = WeaponKind::Rocket;
            }
        }
        // Once the laser is held, further pickups level the beam.
        if had_laser && weapon.kind == WeaponKind::Laser && weapon.level < MAX_LASER_LEVEL {
            weapon.level += 1;
        }
        registry.insert(player, weapon);
    }
}

impl System for PowerUpSystem {
    fn name(&self) -> &'static str {
        "power_up"
    }

    fn update(
        &mut self,
        dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        self.spawn_timer += dt;
        if self.config.gameplay.power_ups_enabled
            && self.spawn_timer >= self.config.gameplay.power_up_spawn_delay
        {
            self.spawn_timer = 0.0;
            self.spawn_one(registry);
        }

        let gameplay = &self.config.gameplay;
        let players = registry.join_ids::<PlayerSlot, Transform>();
        for pickup in registry.join_ids::<PowerUp, Transform>() {
            let Some(pos) = registry.get::<Transform>(pickup).copied() else {
                continue;
            };
            let margin = gameplay.power_up_boundary_margin;
            if pos.x < -margin
                || pos.x > gameplay.world_width + margin
                || pos.y < -margin
                || pos.y > gameplay.world_height + margin
            {
                destroy.insert(pickup);
                continue;
            }

            let pickup_radius = registry
                .get::<Collider>(pickup)
                .map_or(POWER_UP_PICKUP_RADIUS, |c| c.radius);
            let Some(kind) = registry.get::<PowerUp>(pickup).map(|p| p.kind) else {
                continue;
            };

            for &player in &players {
                if destroy.contains(&pickup) {
                    break;
                }
                let Some(player_pos) = registry.get::<Transform>(player).copied() else {
                    continue;
                };
                let player_radius = registry
                    .get::<Collider>(player)
                    .map_or(PLAYER_PICKUP_RADIUS, |c| c.radius);
                let dx = player_pos.x - pos.x;
                let dy = player_pos.y - pos.y;
                let reach = player_radius + pickup_radius;
                if dx * dx + dy * dy >= reach * reach {
                    continue;
                }

                match kind {
                    PowerUpKind::WeaponUpgrade => self.apply_weapon_upgrade(registry, player),
                    PowerUpKind::Shield => {
                        registry.insert(player, PlayerStatus {
                            kind: StatusKind::Shielded,
                            since: Instant::now(),
                        });
                    }
                }
                destroy.insert(pickup);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(system: &mut PowerUpSystem, dt: f32, reg: &mut Registry) -> HashSet<EntityId> {
        let mut destroy = HashSet::new();
        let mut level = 1;
        system.update(dt, &mut level, reg, &mut destroy);
        destroy
    }

    fn pickup_at(
        reg: &mut Registry,
        config: &GameConfig,
        kind: PowerUpKind,
        x: f32,
        y: f32,
    ) -> EntityId {
        factory::spawn_power_up(reg, config, kind, x, y, 0.0, 0.0)
    }

    #[test]
    fn spawns_inside_the_margins_after_the_delay() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let mut system = PowerUpSystem::with_seed(Arc::clone(&config), 7);

        run(&mut system, config.gameplay.power_up_spawn_delay - 0.1, &mut reg);
        assert_eq!(reg.count::<PowerUp>(), 0);

        run(&mut system, 0.2, &mut reg);
        assert_eq!(reg.count::<PowerUp>(), 1);
        let id = reg.ids_with::<PowerUp>()[0];
        let pos = reg.get::<Transform>(id).unwrap();
        let gameplay = &config.gameplay;
        assert!(pos.x >= gameplay.power_up_spawn_margin);
        assert!(pos.x <= gameplay.world_width - gameplay.power_up_spawn_margin);
        assert!(pos.y >= gameplay.power_up_spawn_margin);
        assert!(pos.y <= gameplay.world_height - gameplay.power_up_spawn_margin);
    }

    #[test]
    fn disabled_power_ups_never_spawn() {
        let mut config = GameConfig::default();
        config.gameplay.power_ups_enabled = false;
        let mut reg = Registry::new();
        let mut system = PowerUpSystem::with_seed(Arc::new(config), 7);
        run(&mut system, 1000.0, &mut reg);
        assert_eq!(reg.count::<PowerUp>(), 0);
    }

    #[test]
    fn pickups_past_the_boundary_are_removed() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let margin = config.gameplay.power_up_boundary_margin;
        let gone = pickup_at(&mut reg, &config, PowerUpKind::Shield, -margin - 1.0, 100.0);
        let kept = pickup_at(&mut reg, &config, PowerUpKind::Shield, -margin + 1.0, 100.0);

        let mut system = PowerUpSystem::with_seed(Arc::clone(&config), 7);
        let destroyed = run(&mut system, 0.016, &mut reg);
        assert!(destroyed.contains(&gone));
        assert!(!destroyed.contains(&kept));
    }

    #[test]
    fn weapon_upgrades_unlock_the_ladder() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let player = factory::spawn_player(&mut reg, &config, 0);
        let pos = reg.get::<Transform>(player).copied().unwrap();
        let mut system = PowerUpSystem::with_seed(Arc::clone(&config), 7);

        for collected in 1..=config.gameplay.power_ups_for_rocket {
            let pu = pickup_at(&mut reg, &config, PowerUpKind::WeaponUpgrade, pos.x, pos.y);
            let destroyed = run(&mut system, 0.0, &mut reg);
            assert!(destroyed.contains(&pu));
            reg.destroy(pu);

            let weapon = reg.get::<Weapon>(player).unwrap();
            assert_eq!(weapon.power_ups_collected, u16::from(collected));
            if collected == config.gameplay.power_ups_for_laser {
                assert!(weapon.laser_unlocked);
                assert_eq!(weapon.kind, WeaponKind::Laser);
            }
            if collected == config.gameplay.power_ups_for_rocket {
                assert!(weapon.rocket_unlocked);
                // Already holding the laser, so no auto-equip this time.
                assert_eq!(weapon.kind, WeaponKind::Laser);
            }
        }

        // Pickups past the laser unlock leveled the beam up to the cap.
        let weapon = reg.get::<Weapon>(player).unwrap();
        assert_eq!(weapon.level, MAX_LASER_LEVEL);
    }

    #[test]
    fn shield_pickup_grants_the_status() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let player = factory::spawn_player(&mut reg, &config, 0);
        let pos = reg.get::<Transform>(player).copied().unwrap();
        pickup_at(&mut reg, &config, PowerUpKind::Shield, pos.x, pos.y);

        let mut system = PowerUpSystem::with_seed(Arc::clone(&config), 7);
        run(&mut system, 0.0, &mut reg);
        assert_eq!(
            reg.get::<PlayerStatus>(player).unwrap().kind,
            StatusKind::Shielded
        );
    }

    #[test]
    fn out_of_reach_pickups_stay_put() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let player = factory::spawn_player(&mut reg, &config, 0);
        let pos = reg.get::<Transform>(player).copied().unwrap();
        let far = pickup_at(
            &mut reg,
            &config,
            PowerUpKind::WeaponUpgrade,
            pos.x + 200.0,
            pos.y,
        );

        let mut system = PowerUpSystem::with_seed(Arc::clone(&config), 7);
        let destroyed = run(&mut system, 0.0, &mut reg);
        assert!(!destroyed.contains(&far));
        assert_eq!(reg.get::<Weapon>(player).unwrap().power_ups_collected, 0);
    }
}
