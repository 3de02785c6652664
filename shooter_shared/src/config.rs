//! Configuration system.
//!
//! Loads game configuration from JSON strings/files (file IO left to app).
//! Every field has a default so a partial config file tweaks only what it
//! names; `GameConfig::default()` is a fully playable setup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Direction things scroll, spawn from, or travel toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScrollDirection {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl ScrollDirection {
    pub fn opposite(self) -> Self {
        match self {
            ScrollDirection::LeftToRight => ScrollDirection::RightToLeft,
            ScrollDirection::RightToLeft => ScrollDirection::LeftToRight,
            ScrollDirection::TopToBottom => ScrollDirection::BottomToTop,
            ScrollDirection::BottomToTop => ScrollDirection::TopToBottom,
        }
    }
}

/// Axes a player ship is allowed to move along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlayerDirection {
    LeftToRight,
    TopToBottom,
    #[default]
    All,
}

/// One monster archetype; spawn rotation picks among these by weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterType {
    pub size: f32,
    pub collision_size: f32,
    pub hp: u8,
    /// Multiplier applied to the scroll speed when this type moves.
    pub speed: f32,
    pub spawn_weight: u8,
    pub has_shield: bool,
    pub shield_hp: u8,
    pub can_shoot: bool,
    /// Fixed spawn points; when non-empty these override the random side spawn.
    pub default_positions: Vec<(f32, f32)>,
}

impl Default for MonsterType {
    fn default() -> Self {
        Self {
            size: 20.0,
            collision_size: 1.0,
            hp: 1,
            speed: 1.0,
            spawn_weight: 1,
            has_shield: false,
            shield_hp: 0,
            can_shoot: true,
            default_positions: Vec::new(),
        }
    }
}

/// Tunables for the simulation itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    pub scroll_direction: ScrollDirection,
    pub scroll_speed: f32,

    pub player_speed: f32,
    pub player_start_hp: u8,
    pub player_fire_cooldown: f32,
    pub player_spawn_x: f32,
    pub player_spawn_y_base: f32,
    pub player_spawn_y_spacing: f32,
    pub player_movement_direction: PlayerDirection,
    pub friendly_fire: bool,

    pub bullet_speed: f32,
    pub bullet_lifetime: f32,
    pub bullet_spawn_offset_x: f32,
    pub bullet_spawn_offset_y: f32,
    pub bullet_direction: ScrollDirection,

    pub weapon_damage_basic: u8,
    pub weapon_damage_laser: u8,
    pub weapon_damage_missile: u8,
    pub power_ups_for_laser: u8,
    pub power_ups_for_rocket: u8,
    pub rocket_fire_cooldown: f32,
    pub rocket_damage_multiplier: f32,

    pub monster_spawn_delay: f32,
    pub monster_hp: u8,
    pub monster_spawn_side: ScrollDirection,
    pub monster_movement: ScrollDirection,
    pub monster_types: HashMap<u8, MonsterType>,

    pub power_up_spawn_delay: f32,
    pub power_ups_enabled: bool,
    pub power_up_spawn_side: ScrollDirection,
    pub power_up_speed_multiplier: f32,
    pub power_up_size: f32,
    pub power_up_spawn_center_x: f32,
    pub power_up_spawn_center_y: f32,
    pub power_up_spawn_random_range: f32,
    pub power_up_spawn_margin: f32,
    pub power_up_boundary_margin: f32,
    pub shield_duration_secs: u32,

    pub collision_radius: f32,

    pub world_width: f32,
    pub world_height: f32,

    pub number_of_levels: i32,
    pub monster_per_level: i32,
    pub boss_monster_type: u8,
    pub boss_level: i32,
    pub boss2_monster_type: u8,
    pub boss2_level: i32,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            scroll_direction: ScrollDirection::LeftToRight,
            scroll_speed: 90.0,

            player_speed: 220.0,
            player_start_hp: 3,
            player_fire_cooldown: 0.25,
            player_spawn_x: 80.0,
            player_spawn_y_base: 120.0,
            player_spawn_y_spacing: 80.0,
            player_movement_direction: PlayerDirection::All,
            friendly_fire: false,

            bullet_speed: 380.0,
            bullet_lifetime: 3.0,
            bullet_spawn_offset_x: 30.0,
            bullet_spawn_offset_y: 0.0,
            bullet_direction: ScrollDirection::LeftToRight,

            weapon_damage_basic: 1,
            weapon_damage_laser: 2,
            weapon_damage_missile: 3,
            power_ups_for_laser: 5,
            power_ups_for_rocket: 10,
            rocket_fire_cooldown: 0.6,
            rocket_damage_multiplier: 3.0,

            monster_spawn_delay: 2.0,
            monster_hp: 1,
            monster_spawn_side: ScrollDirection::RightToLeft,
            monster_movement: ScrollDirection::RightToLeft,
            monster_types: default_monster_types(),

            power_up_spawn_delay: 10.0,
            power_ups_enabled: true,
            power_up_spawn_side: ScrollDirection::LeftToRight,
            power_up_speed_multiplier: 0.25,
            power_up_size: 8.0,
            power_up_spawn_center_x: 0.6,
            power_up_spawn_center_y: 0.5,
            power_up_spawn_random_range: 120.0,
            power_up_spawn_margin: 80.0,
            power_up_boundary_margin: 200.0,
            shield_duration_secs: 5,

            collision_radius: 20.0,

            world_width: 1280.0,
            world_height: 720.0,

            number_of_levels: 2,
            monster_per_level: 10,
            boss_monster_type: 6,
            boss_level: 5,
            boss2_monster_type: 7,
            boss2_level: 15,
        }
    }
}

fn default_monster_types() -> HashMap<u8, MonsterType> {
    let mut types = HashMap::new();
    types.insert(
        1,
        MonsterType {
            size: 18.0,
            hp: 1,
            speed: 1.0,
            spawn_weight: 5,
            ..MonsterType::default()
        },
    );
    types.insert(
        2,
        MonsterType {
            size: 24.0,
            hp: 3,
            speed: 0.8,
            spawn_weight: 3,
            ..MonsterType::default()
        },
    );
    types.insert(
        3,
        MonsterType {
            size: 30.0,
            hp: 5,
            speed: 0.5,
            spawn_weight: 1,
            has_shield: true,
            shield_hp: 2,
            ..MonsterType::default()
        },
    );
    // Bosses spawn through level progression, never the random rotation.
    types.insert(
        6,
        MonsterType {
            size: 80.0,
            collision_size: 3.0,
            hp: 60,
            speed: 0.4,
            spawn_weight: 0,
            ..MonsterType::default()
        },
    );
    types.insert(
        7,
        MonsterType {
            size: 100.0,
            collision_size: 3.5,
            hp: 120,
            speed: 0.6,
            spawn_weight: 0,
            ..MonsterType::default()
        },
    );
    types
}

/// Tunables for the UDP endpoint and session handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub default_port: u16,
    pub default_host: String,
    pub max_players: usize,
    pub rx_buffer_size: usize,
    /// Seconds of client silence before the server drops the session.
    pub client_timeout: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_port: 5000,
            default_host: "127.0.0.1".to_string(),
            max_players: 4,
            rx_buffer_size: 1024,
            client_timeout: 10.0,
        }
    }
}

/// Feature switches for individual simulation systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemsConfig {
    pub movement: bool,
    pub fire_cooldown: bool,
    pub projectile_lifetime: bool,
    pub collision: bool,
    pub boundary: bool,
    pub cleanup: bool,
    pub monster_spawner: bool,
    pub level: bool,
    pub boundary_margin: f32,
}

impl Default for SystemsConfig {
    fn default() -> Self {
        Self {
            movement: true,
            fire_cooldown: true,
            projectile_lifetime: true,
            collision: true,
            boundary: true,
            cleanup: true,
            monster_spawner: true,
            level: true,
            boundary_margin: 100.0,
        }
    }
}

/// Root configuration for the server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameConfig {
    pub gameplay: GameplayConfig,
    pub network: NetworkConfig,
    pub systems: SystemsConfig,
}

impl GameConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        let mut config: Self = serde_json::from_str(s)?;
        config.gameplay.prune_invalid_monster_types();
        Ok(config)
    }
}

impl GameplayConfig {
    /// Drops archetypes the simulation cannot use (zero size, hp or speed).
    pub fn prune_invalid_monster_types(&mut self) {
        self.monster_types
            .retain(|_, t| t.size > 0.0 && t.hp > 0 && t.speed > 0.0);
    }

    /// Velocity vector for `speed` traveling along `dir`.
    pub fn direction_velocity(dir: ScrollDirection, speed: f32) -> (f32, f32) {
        match dir {
            ScrollDirection::LeftToRight => (speed, 0.0),
            ScrollDirection::RightToLeft => (-speed, 0.0),
            ScrollDirection::TopToBottom => (0.0, speed),
            ScrollDirection::BottomToTop => (0.0, -speed),
        }
    }

    /// Monster spawn point just outside the spawn side, `random` in [0, 1)
    /// picking a point along the entry edge.
    pub fn spawn_position(&self, random: f32) -> (f32, f32) {
        match self.monster_spawn_side {
            ScrollDirection::RightToLeft => (
                self.world_width + 40.0,
                40.0 + random * (self.world_height - 80.0),
            ),
            ScrollDirection::LeftToRight => {
                (-40.0, 40.0 + random * (self.world_height - 80.0))
            }
            ScrollDirection::BottomToTop => (
                40.0 + random * (self.world_width - 80.0),
                self.world_height + 40.0,
            ),
            ScrollDirection::TopToBottom => {
                (40.0 + random * (self.world_width - 80.0), -40.0)
            }
        }
    }

    /// True once a scrolled entity has left the world along the exit edge.
    pub fn is_off_screen(&self, x: f32, y: f32) -> bool {
        const MARGIN: f32 = 50.0;
        match self.scroll_direction {
            ScrollDirection::LeftToRight => x < -MARGIN,
            ScrollDirection::RightToLeft => x > self.world_width + MARGIN,
            ScrollDirection::TopToBottom => y < -MARGIN,
            ScrollDirection::BottomToTop => y > self.world_height + MARGIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_playable() {
        let config = GameConfig::default();
        assert_eq!(config.network.default_port, 5000);
        assert!(config.gameplay.monster_types.values().any(|t| t.spawn_weight > 0));
        assert!(config.systems.cleanup);
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config = GameConfig::from_json_str(
            r#"{ "gameplay": { "player_speed": 300.0 }, "network": { "default_port": 6000 } }"#,
        )
        .unwrap();
        assert_eq!(config.gameplay.player_speed, 300.0);
        assert_eq!(config.network.default_port, 6000);
        // Untouched fields keep defaults.
        assert_eq!(config.gameplay.player_start_hp, 3);
        assert_eq!(config.network.max_players, 4);
    }

    #[test]
    fn invalid_monster_types_are_pruned() {
        let config = GameConfig::from_json_str(
            r#"{ "gameplay": { "monster_types": {
                "1": { "size": 10.0, "hp": 2, "speed": 50.0, "spawn_weight": 1 },
                "2": { "size": 0.0, "hp": 2, "speed": 50.0, "spawn_weight": 1 }
            } } }"#,
        )
        .unwrap();
        assert!(config.gameplay.monster_types.contains_key(&1));
        assert!(!config.gameplay.monster_types.contains_key(&2));
    }

    #[test]
    fn direction_velocity_maps_axes() {
        assert_eq!(
            GameplayConfig::direction_velocity(ScrollDirection::RightToLeft, 90.0),
            (-90.0, 0.0)
        );
        assert_eq!(
            GameplayConfig::direction_velocity(ScrollDirection::TopToBottom, 10.0),
            (0.0, 10.0)
        );
    }

    #[test]
    fn off_screen_checks_exit_edge_only() {
        let gameplay = GameplayConfig::default();
        // Default scroll is left-to-right, so only the left edge counts.
        assert!(gameplay.is_off_screen(-60.0, 100.0));
        assert!(!gameplay.is_off_screen(gameplay.world_width + 60.0, 100.0));
    }
}
