//! Wave progression and monster spawning.
//!
//! With level progression enabled the spawner works off per-wave quotas and
//! the level system advances waves once a quota is spawned and cleared.
//! Without it the spawner just keeps trickling monsters in.

use std::{collections::HashSet, sync::Arc};

use rand::{rngs::StdRng, Rng, SeedableRng};
use shooter_shared::{
    components::{Boss2Behavior, FireCooldown, Health, Monster},
    config::{GameConfig, GameplayConfig},
    ecs::{EntityId, Registry},
};
use tracing::info;

use crate::factory;

use super::System;

/// Timed spawner with an optional quota.
struct MonsterSpawner {
    timer: f32,
    quota: Option<i32>,
    spawned: i32,
    rng: StdRng,
}

impl MonsterSpawner {
    fn new() -> Self {
        Self {
            timer: 0.0,
            quota: None,
            spawned: 0,
            rng: StdRng::from_entropy(),
        }
    }

    fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new()
        }
    }

    fn start(&mut self, quota: i32) {
        self.quota = Some(quota);
        self.spawned = 0;
        self.timer = 0.0;
    }

    fn complete(&self) -> bool {
        self.quota.is_some_and(|q| self.spawned >= q)
    }

    fn update(&mut self, dt: f32, config: &GameConfig, registry: &mut Registry) {
        if self.complete() {
            return;
        }
        self.timer += dt;
        if self.timer < config.gameplay.monster_spawn_delay {
            return;
        }
        self.timer = 0.0;
        if self.spawn_random(config, registry).is_some() {
            self.spawned += 1;
        }
    }

    /// Spawns one monster from the weighted rotation on the spawn edge.
    fn spawn_random(&mut self, config: &GameConfig, registry: &mut Registry) -> Option<EntityId> {
        let gameplay = &config.gameplay;
        let total: u32 = gameplay
            .monster_types
            .values()
            .map(|t| u32::from(t.spawn_weight))
            .sum();
        if total == 0 {
            return None;
        }

        // Walk types in key order so the same roll always lands on the same
        // archetype regardless of map iteration order.
        let mut keys: Vec<u8> = gameplay.monster_types.keys().copied().collect();
        keys.sort_unstable();
        let mut pick = self.rng.gen_range(0..total);
        let mut chosen = None;
        for key in keys {
            let ty = &gameplay.monster_types[&key];
            let weight = u32::from(ty.spawn_weight);
            if weight == 0 {
                continue;
            }
            if pick < weight {
                chosen = Some((key, ty));
                break;
            }
            pick -= weight;
        }
        let (kind, ty) = chosen?;

        let (x, y) = gameplay.spawn_position(self.rng.gen());
        let (vx, vy) = GameplayConfig::direction_velocity(
            gameplay.monster_movement,
            gameplay.scroll_speed * ty.speed,
        );
        Some(factory::spawn_monster(
            registry,
            config,
            kind,
            ty.can_shoot,
            x,
            y,
            vx,
            vy,
        ))
    }
}

/// Continuous spawning without wave structure.
pub struct MonsterSpawnerSystem {
    config: Arc<GameConfig>,
    spawner: MonsterSpawner,
}

impl MonsterSpawnerSystem {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            config,
            spawner: MonsterSpawner::new(),
        }
    }
}

impl System for MonsterSpawnerSystem {
    fn name(&self) -> &'static str {
        "monster_spawner"
    }

    fn update(
        &mut self,
        dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        _destroy: &mut HashSet<EntityId>,
    ) {
        self.spawner.update(dt, &self.config, registry);
    }
}

/// Wave-based progression: each wave has a spawn quota, boss waves swap the
/// quota for a boss, and clearing a wave advances to the next one.
pub struct LevelSystem {
    config: Arc<GameConfig>,
    spawner: MonsterSpawner,
}

impl LevelSystem {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            config,
            spawner: MonsterSpawner::new(),
        }
    }

    #[cfg(test)]
    fn with_seed(config: Arc<GameConfig>, seed: u64) -> Self {
        Self {
            config,
            spawner: MonsterSpawner::seeded(seed),
        }
    }

    fn any_monster_alive(registry: &Registry) -> bool {
        registry
            .join_ids::<Monster, Health>()
            .into_iter()
            .any(|id| registry.get::<Health>(id).is_some_and(|h| h.alive))
    }

    fn start_wave(&mut self, wave: i32, level: &mut i32, registry: &mut Registry) {
        let gameplay = &self.config.gameplay;
        *level = wave;
        let mut quota = gameplay.monster_per_level * wave;
        if wave == gameplay.boss_level {
            self.spawn_boss(gameplay.boss_monster_type, registry);
            quota = gameplay.monster_per_level;
        } else if wave == gameplay.boss2_level {
            self.spawn_boss(gameplay.boss2_monster_type, registry);
            quota = gameplay.monster_per_level * 2;
        }
        self.spawner.start(quota);
        info!(wave, quota, "Wave started");
    }

    fn spawn_boss(&self, kind: u8, registry: &mut Registry) {
        let gameplay = &self.config.gameplay;
        let x = gameplay.world_width - 200.0;
        let y = gameplay.world_height * 0.75;
        let boss = factory::spawn_monster(registry, &self.config, kind, true, x, y, 0.0, 0.0);
        if kind == gameplay.boss2_monster_type {
            registry.insert(boss, Boss2Behavior {
                base_y: y,
                oscillation_speed: 1.5,
                oscillation_amplitude: 120.0,
                ..Boss2Behavior::default()
            });
            if let Some(cooldown) = registry.get_mut::<FireCooldown>(boss) {
                cooldown.cooldown = 2.0;
            }
        }
        info!(kind, x, y, "Boss spawned");
    }
}

impl System for LevelSystem {
    fn name(&self) -> &'static str {
        "level"
    }

    fn update(
        &mut self,
        dt: f32,
        level: &mut i32,
        registry: &mut Registry,
        _destroy: &mut HashSet<EntityId>,
    ) {
        let wave_cleared = (self.spawner.quota.is_none() || self.spawner.complete())
            && !Self::any_monster_alive(registry);
        if wave_cleared {
            let next = *level + 1;
            if next <= self.config.gameplay.number_of_levels {
                self.start_wave(next, level, registry);
            }
        }
        self.spawner.update(dt, &self.config, registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(system: &mut dyn System, dt: f32, level: &mut i32, reg: &mut Registry) {
        let mut destroy = HashSet::new();
        system.update(dt, level, reg, &mut destroy);
    }

    fn kill_all_monsters(reg: &mut Registry) {
        for id in reg.ids_with::<Monster>() {
            reg.destroy(id);
        }
        for id in reg.ids_with::<shooter_shared::components::Shield>() {
            reg.destroy(id);
        }
    }

    #[test]
    fn weighted_rotation_only_picks_positive_weights() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let mut spawner = MonsterSpawner::seeded(3);
        for _ in 0..40 {
            spawner.spawn_random(&config, &mut reg);
        }
        for id in reg.ids_with::<Monster>() {
            let kind = reg.get::<Monster>(id).unwrap().kind;
            let weight = config.gameplay.monster_types[&kind].spawn_weight;
            assert!(weight > 0, "boss type {kind} spawned from the rotation");
        }
    }

    #[test]
    fn spawner_honors_delay_and_quota() {
        let config = Arc::new(GameConfig::default());
        let delay = config.gameplay.monster_spawn_delay;
        let mut reg = Registry::new();
        let mut spawner = MonsterSpawner::seeded(3);
        spawner.start(2);

        spawner.update(delay * 0.5, &config, &mut reg);
        assert_eq!(reg.count::<Monster>(), 0);
        spawner.update(delay, &config, &mut reg);
        assert_eq!(reg.count::<Monster>(), 1);
        spawner.update(delay, &config, &mut reg);
        assert_eq!(reg.count::<Monster>(), 2);
        assert!(spawner.complete());

        // Quota reached: nothing more spawns.
        spawner.update(delay * 4.0, &config, &mut reg);
        assert_eq!(reg.count::<Monster>(), 2);
    }

    #[test]
    fn no_spawnable_types_is_a_clean_no_op() {
        let mut config = GameConfig::default();
        for ty in config.gameplay.monster_types.values_mut() {
            ty.spawn_weight = 0;
        }
        let config = Arc::new(config);
        let mut reg = Registry::new();
        let mut spawner = MonsterSpawner::seeded(3);
        assert!(spawner.spawn_random(&config, &mut reg).is_none());
        assert_eq!(reg.entity_count(), 0);
    }

    #[test]
    fn first_update_starts_wave_one() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let mut level = 0;
        let mut system = LevelSystem::with_seed(Arc::clone(&config), 3);
        run(&mut system, 0.016, &mut level, &mut reg);
        assert_eq!(level, 1);
        assert_eq!(
            system.spawner.quota,
            Some(config.gameplay.monster_per_level)
        );
    }

    #[test]
    fn clearing_a_wave_advances_until_the_last_level() {
        let config = Arc::new(GameConfig::default());
        let delay = config.gameplay.monster_spawn_delay;
        let mut reg = Registry::new();
        let mut level = 0;
        let mut system = LevelSystem::with_seed(Arc::clone(&config), 3);

        run(&mut system, 0.016, &mut level, &mut reg);
        assert_eq!(level, 1);
        // Spawn out the whole quota, then clear the field.
        for _ in 0..config.gameplay.monster_per_level {
            run(&mut system, delay, &mut level, &mut reg);
        }
        assert!(system.spawner.complete());
        assert_eq!(level, 1);
        kill_all_monsters(&mut reg);

        run(&mut system, 0.016, &mut level, &mut reg);
        assert_eq!(level, 2);
        assert_eq!(
            system.spawner.quota,
            Some(config.gameplay.monster_per_level * 2)
        );

        // Default config has two levels; clearing the last one stops there.
        for _ in 0..config.gameplay.monster_per_level * 2 {
            run(&mut system, delay, &mut level, &mut reg);
        }
        kill_all_monsters(&mut reg);
        run(&mut system, 0.016, &mut level, &mut reg);
        assert_eq!(level, 2);
    }

    #[test]
    fn boss_wave_spawns_the_boss_with_a_reduced_quota() {
        let mut config = GameConfig::default();
        config.gameplay.boss_level = 1;
        config.gameplay.number_of_levels = 5;
        let config = Arc::new(config);
        let mut reg = Registry::new();
        let mut level = 0;
        let mut system = LevelSystem::with_seed(Arc::clone(&config), 3);

        run(&mut system, 0.016, &mut level, &mut reg);
        assert_eq!(level, 1);
        let bosses: Vec<_> = reg
            .ids_with::<Monster>()
            .into_iter()
            .filter(|id| {
                reg.get::<Monster>(*id).unwrap().kind == config.gameplay.boss_monster_type
            })
            .collect();
        assert_eq!(bosses.len(), 1);
        assert_eq!(
            system.spawner.quota,
            Some(config.gameplay.monster_per_level)
        );
    }

    #[test]
    fn second_boss_gets_its_behavior_and_slow_trigger() {
        let mut config = GameConfig::default();
        config.gameplay.boss2_level = 1;
        config.gameplay.number_of_levels = 5;
        let config = Arc::new(config);
        let mut reg = Registry::new();
        let mut level = 0;
        let mut system = LevelSystem::with_seed(Arc::clone(&config), 3);

        run(&mut system, 0.016, &mut level, &mut reg);
        let boss = reg
            .ids_with::<Boss2Behavior>()
            .first()
            .copied()
            .expect("boss2 spawned");
        let behavior = reg.get::<Boss2Behavior>(boss).unwrap();
        assert_eq!(behavior.base_y, config.gameplay.world_height * 0.75);
        assert!(behavior.visible);
        assert_eq!(reg.get::<FireCooldown>(boss).unwrap().cooldown, 2.0);
        assert_eq!(
            system.spawner.quota,
            Some(config.gameplay.monster_per_level * 2)
        );
    }

    #[test]
    fn continuous_spawner_ignores_quotas() {
        let config = Arc::new(GameConfig::default());
        let delay = config.gameplay.monster_spawn_delay;
        let mut reg = Registry::new();
        let mut level = 0;
        let mut system = MonsterSpawnerSystem::new(Arc::clone(&config));
        system.spawner = MonsterSpawner::seeded(3);

        let waves = config.gameplay.monster_per_level * 3;
        for _ in 0..waves {
            run(&mut system, delay, &mut level, &mut reg);
        }
        assert_eq!(reg.count::<Monster>() as i32, waves);
        // Wave number untouched without level progression.
        assert_eq!(level, 0);
    }
}
