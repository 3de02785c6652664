//! Shared foundation for the shooter server.
//!
//! Goals:
//! - A minimal entity/component registry the simulation runs on.
//! - Plain-data gameplay components.
//! - JSON-loadable configuration with playable defaults.
//! - The binary wire protocol spoken over UDP.

pub mod components;
pub mod config;
pub mod ecs;
pub mod protocol;

pub mod prelude {
    pub use crate::components::{
        AutomaticShooting, BeamCollider, Boss2Behavior, Collider, FireCooldown, Health, Hitbox,
        Hurtbox, Monster, PlayerId, PlayerInput, PlayerSlot, PlayerStatus, PowerUp, PowerUpKind,
        Projectile, Shield, ShotDirection, StatusKind, Team, Transform, Velocity, Weapon,
        WeaponKind, MAX_PLAYERS,
    };
    pub use crate::config::{GameConfig, GameplayConfig, NetworkConfig, SystemsConfig};
    pub use crate::ecs::{EntityId, Registry};
    pub use crate::protocol::{Header, Message, MessageKind};
}
