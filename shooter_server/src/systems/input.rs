//! Translates buffered client input into player velocity and expires timed
//! status effects.

use std::{collections::HashSet, sync::Arc};

use shooter_shared::{
    components::{PlayerInput, PlayerStatus, StatusKind, Velocity},
    config::{GameConfig, PlayerDirection},
    ecs::{EntityId, Registry},
};

use super::System;

pub struct PlayerInputSystem {
    config: Arc<GameConfig>,
}

impl PlayerInputSystem {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self { config }
    }
}

impl System for PlayerInputSystem {
    fn name(&self) -> &'static str {
        "player_input"
    }

    fn update(
        &mut self,
        _dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        _destroy: &mut HashSet<EntityId>,
    ) {
        let speed = self.config.gameplay.player_speed;
        let axis = self.config.gameplay.player_movement_direction;
        let shield_duration = self.config.gameplay.shield_duration_secs as f32;

        for id in registry.join3_ids::<PlayerInput, Velocity, PlayerStatus>() {
            let Some(input) = registry.get::<PlayerInput>(id).copied() else {
                continue;
            };

            let mut velocity = Velocity::default();
            if input.left {
                velocity.dx -= speed;
            }
            if input.right {
                velocity.dx += speed;
            }
            if input.up {
                velocity.dy -= speed;
            }
            if input.down {
                velocity.dy += speed;
            }
            match axis {
                PlayerDirection::LeftToRight => velocity.dy = 0.0,
                PlayerDirection::TopToBottom => velocity.dx = 0.0,
                PlayerDirection::All => {}
            }
            if let Some(v) = registry.get_mut::<Velocity>(id) {
                *v = velocity;
            }

            if let Some(status) = registry.get_mut::<PlayerStatus>(id) {
                if status.kind == StatusKind::Shielded
                    && status.since.elapsed().as_secs_f32() > shield_duration
                {
                    status.kind = StatusKind::None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn player(reg: &mut Registry, input: PlayerInput) -> EntityId {
        let e = reg.create();
        reg.insert(e, input);
        reg.insert(e, Velocity::default());
        reg.insert(e, PlayerStatus::default());
        e
    }

    fn run(system: &mut PlayerInputSystem, reg: &mut Registry) {
        let mut destroy = HashSet::new();
        let mut level = 1;
        system.update(0.016, &mut level, reg, &mut destroy);
    }

    #[test]
    fn held_keys_map_to_velocity_each_tick() {
        let config = Arc::new(GameConfig::default());
        let speed = config.gameplay.player_speed;
        let mut reg = Registry::new();
        let e = player(&mut reg, PlayerInput {
            right: true,
            up: true,
            ..PlayerInput::default()
        });

        let mut system = PlayerInputSystem::new(config);
        run(&mut system, &mut reg);
        let v = reg.get::<Velocity>(e).unwrap();
        assert_eq!((v.dx, v.dy), (speed, -speed));

        // Releasing everything zeroes the velocity again.
        reg.insert(e, PlayerInput::default());
        run(&mut system, &mut reg);
        let v = reg.get::<Velocity>(e).unwrap();
        assert_eq!((v.dx, v.dy), (0.0, 0.0));
    }

    #[test]
    fn opposite_keys_cancel_out() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let e = player(&mut reg, PlayerInput {
            left: true,
            right: true,
            down: true,
            ..PlayerInput::default()
        });
        let mut system = PlayerInputSystem::new(config.clone());
        run(&mut system, &mut reg);
        let v = reg.get::<Velocity>(e).unwrap();
        assert_eq!(v.dx, 0.0);
        assert_eq!(v.dy, config.gameplay.player_speed);
    }

    #[test]
    fn movement_axis_restriction_drops_the_other_component() {
        let mut config = GameConfig::default();
        config.gameplay.player_movement_direction = PlayerDirection::LeftToRight;
        let mut reg = Registry::new();
        let e = player(&mut reg, PlayerInput {
            right: true,
            down: true,
            ..PlayerInput::default()
        });
        let mut system = PlayerInputSystem::new(Arc::new(config));
        run(&mut system, &mut reg);
        let v = reg.get::<Velocity>(e).unwrap();
        assert!(v.dx > 0.0);
        assert_eq!(v.dy, 0.0);
    }

    #[test]
    fn shield_status_expires_after_its_duration() {
        let config = Arc::new(GameConfig::default());
        let mut reg = Registry::new();
        let e = player(&mut reg, PlayerInput::default());
        let expired = Instant::now()
            - Duration::from_secs(u64::from(config.gameplay.shield_duration_secs) + 1);
        reg.insert(e, PlayerStatus {
            kind: StatusKind::Shielded,
            since: expired,
        });

        let mut system = PlayerInputSystem::new(config);
        run(&mut system, &mut reg);
        assert_eq!(reg.get::<PlayerStatus>(e).unwrap().kind, StatusKind::None);

        // A fresh shield stays up.
        reg.insert(e, PlayerStatus {
            kind: StatusKind::Shielded,
            since: Instant::now(),
        });
        run(&mut system, &mut reg);
        assert_eq!(reg.get::<PlayerStatus>(e).unwrap().kind, StatusKind::Shielded);
    }
}
