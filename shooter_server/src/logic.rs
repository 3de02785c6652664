//! Per-room simulation state: one registry plus the system pipeline and the
//! shared destruction set, advanced by fixed-dt ticks.

use std::{collections::HashSet, sync::Arc};

use shooter_shared::{
    components::{PlayerId, PlayerInput},
    config::{GameConfig, GameplayConfig},
    ecs::{EntityId, Registry},
};

use crate::{factory, systems::Pipeline};

pub struct GameLogic {
    config: Arc<GameConfig>,
    pub registry: Registry,
    pipeline: Pipeline,
    destroy: HashSet<EntityId>,
    level: i32,
    level_changed: bool,
}

impl GameLogic {
    pub fn new(config: Arc<GameConfig>) -> Self {
        let mut logic = Self {
            pipeline: Pipeline::from_config(&config),
            config,
            registry: Registry::new(),
            destroy: HashSet::new(),
            level: 0,
            level_changed: false,
        };
        logic.spawn_preplaced_monsters();
        logic
    }

    /// Monster types can carry fixed spawn points; those monsters are part of
    /// the world from the first tick.
    fn spawn_preplaced_monsters(&mut self) {
        let config = Arc::clone(&self.config);
        let gameplay = &config.gameplay;
        let mut kinds: Vec<u8> = gameplay.monster_types.keys().copied().collect();
        kinds.sort_unstable();
        for kind in kinds {
            let ty = &gameplay.monster_types[&kind];
            let (vx, vy) = GameplayConfig::direction_velocity(
                gameplay.monster_movement,
                gameplay.scroll_speed * ty.speed,
            );
            for &(x, y) in &ty.default_positions {
                factory::spawn_monster(
                    &mut self.registry,
                    &config,
                    kind,
                    ty.can_shoot,
                    x,
                    y,
                    vx,
                    vy,
                );
            }
        }
    }

    pub fn spawn_player(&mut self, player: PlayerId) -> EntityId {
        factory::spawn_player(&mut self.registry, &self.config, player)
    }

    pub fn destroy_entity(&mut self, entity: EntityId) {
        self.destroy.remove(&entity);
        self.registry.destroy(entity);
    }

    /// Buffers the latest input flags for a player entity. Held keys arrive
    /// every client frame, so the newest packet simply wins.
    pub fn apply_input(
        &mut self,
        entity: EntityId,
        up: bool,
        down: bool,
        left: bool,
        right: bool,
        fire: bool,
        swap_weapon: bool,
    ) {
        if !self.registry.exists(entity) {
            return;
        }
        self.registry.insert(entity, PlayerInput {
            up,
            down,
            left,
            right,
            shooting: fire,
            switching_weapon: swap_weapon,
        });
    }

    /// Runs one simulation tick. Entities scheduled for destruction stay in
    /// the registry until [`flush_destroyed`](Self::flush_destroyed) so their
    /// final state can still be broadcast.
    pub fn update(&mut self, dt: f32) {
        let before = self.level;
        self.pipeline
            .run(dt, &mut self.level, &mut self.registry, &mut self.destroy);
        if self.level != before {
            self.level_changed = true;
        }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// True once per level change, then rearms.
    pub fn take_level_changed(&mut self) -> bool {
        std::mem::take(&mut self.level_changed)
    }

    pub fn marked_for_destruction(&self, entity: EntityId) -> bool {
        self.destroy.contains(&entity)
    }

    /// Removes every scheduled entity from the registry.
    pub fn flush_destroyed(&mut self) {
        for id in self.destroy.drain() {
            self.registry.destroy(id);
        }
    }
}
