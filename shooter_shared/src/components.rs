//! Gameplay component types attached to registry entities.
//!
//! Components are plain data. All behavior lives in the server systems; the
//! types here only carry state between ticks and onto the wire.

use crate::ecs::EntityId;

/// Maximum simultaneous players in one room.
pub const MAX_PLAYERS: usize = 4;

/// Player slot index, also used on the wire.
pub type PlayerId = u8;

/// World position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
}

impl Transform {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Velocity in pixels per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

impl Velocity {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }
}

/// Hit points. `alive` flips false when hp reaches zero; the entity sticks
/// around until the cleanup pass so death can be broadcast first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub hp: u8,
    pub alive: bool,
}

impl Health {
    pub fn new(hp: u8) -> Self {
        Self { hp, alive: true }
    }

    /// Applies damage, saturating at zero and flipping `alive`.
    pub fn take_damage(&mut self, damage: u8) {
        self.hp = self.hp.saturating_sub(damage);
        if self.hp == 0 {
            self.alive = false;
        }
    }
}

/// Weapon tiers in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponKind {
    Basic,
    Laser,
    Rocket,
}

impl WeaponKind {
    pub fn to_wire(self) -> u8 {
        match self {
            WeaponKind::Basic => 0,
            WeaponKind::Laser => 1,
            WeaponKind::Rocket => 2,
        }
    }

    pub fn from_wire(v: u8) -> Self {
        match v {
            1 => WeaponKind::Laser,
            2 => WeaponKind::Rocket,
            _ => WeaponKind::Basic,
        }
    }
}

/// Per-player weapon loadout and progression.
#[derive(Debug, Clone)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub level: u8,
    pub laser_active: bool,
    pub active_laser: Option<EntityId>,
    pub laser_unlocked: bool,
    pub rocket_unlocked: bool,
    pub power_ups_collected: u16,
}

impl Default for Weapon {
    fn default() -> Self {
        Self {
            kind: WeaponKind::Basic,
            level: 1,
            laser_active: false,
            active_laser: None,
            laser_unlocked: false,
            rocket_unlocked: false,
            power_ups_collected: 0,
        }
    }
}

/// Projectile bookkeeping: who fired it and how it expires.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub owner: EntityId,
    pub from_player: bool,
    pub lifetime: f32,
    pub damage: u8,
    pub weapon: WeaponKind,
    /// Persistent projectiles (laser beams) ignore lifetime until released.
    pub persistent: bool,
    /// Accumulates time toward the next periodic laser damage tick.
    pub damage_tick_timer: f32,
}

/// Time until an entity may fire again.
#[derive(Debug, Clone, Copy)]
pub struct FireCooldown {
    pub timer: f32,
    pub cooldown: f32,
}

impl FireCooldown {
    pub fn new(cooldown: f32) -> Self {
        Self {
            timer: 0.0,
            cooldown,
        }
    }

    pub fn ready(&self) -> bool {
        self.timer <= 0.0
    }

    pub fn reset(&mut self) {
        self.timer = self.cooldown;
    }
}

/// One firing direction, expressed as a ready-to-use bullet velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotDirection {
    pub dx: f32,
    pub dy: f32,
}

/// Monsters with this component fire along every direction each time their
/// cooldown elapses.
#[derive(Debug, Clone, Default)]
pub struct AutomaticShooting {
    pub directions: Vec<ShotDirection>,
}

/// Collision faction. Entities on the same team never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    Player,
    Monster,
    Neutral,
}

/// Receives hits. One collision slot per tick, last write wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hurtbox {
    pub collided_with: Option<EntityId>,
}

/// Deals hits. Destroy-on-hit projectiles are consumed by their first impact.
#[derive(Debug, Clone, Copy)]
pub struct Hitbox {
    pub destroy_on_hit: bool,
}

/// Circular collision shape.
#[derive(Debug, Clone, Copy)]
pub struct Collider {
    pub radius: f32,
}

/// Axis-aligned beam collision shape, extending from the anchor to +x.
#[derive(Debug, Clone, Copy)]
pub struct BeamCollider {
    pub length: f32,
    pub half_height: f32,
}

/// Latest input flags received from a player's client.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub shooting: bool,
    pub switching_weapon: bool,
}

/// Marks an entity as owned by a connected player slot.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSlot {
    pub player: PlayerId,
}

/// Monster archetype tag carrying its configured type id.
#[derive(Debug, Clone, Copy)]
pub struct Monster {
    pub kind: u8,
}

/// Timers driving the second boss's oscillate/vanish loop.
#[derive(Debug, Clone, Copy)]
pub struct Boss2Behavior {
    pub oscillation_timer: f32,
    pub oscillation_speed: f32,
    pub oscillation_amplitude: f32,
    pub base_y: f32,
    pub visibility_timer: f32,
    pub visible_duration: f32,
    pub invisible_duration: f32,
    pub visible: bool,
}

impl Default for Boss2Behavior {
    fn default() -> Self {
        Self {
            oscillation_timer: 0.0,
            oscillation_speed: 2.0,
            oscillation_amplitude: 100.0,
            base_y: 0.0,
            visibility_timer: 0.0,
            visible_duration: 4.0,
            invisible_duration: 2.0,
            visible: true,
        }
    }
}

/// Shield entity orbiting a monster; dies with its parent.
#[derive(Debug, Clone, Copy)]
pub struct Shield {
    pub parent: EntityId,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// Collectible power-up kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpKind {
    WeaponUpgrade,
    Shield,
}

impl PowerUpKind {
    pub fn to_wire(self) -> u8 {
        match self {
            PowerUpKind::WeaponUpgrade => 0,
            PowerUpKind::Shield => 1,
        }
    }

    pub fn from_wire(v: u8) -> Self {
        if v == 1 {
            PowerUpKind::Shield
        } else {
            PowerUpKind::WeaponUpgrade
        }
    }
}

/// Power-up pickup floating in the world. `value` is the pickup strength
/// reported on the wire; every drop currently counts for one.
#[derive(Debug, Clone, Copy)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub value: u8,
}

/// Timed status effects a player can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    None,
    Shielded,
}

/// Active status effect and when it started.
#[derive(Debug, Clone, Copy)]
pub struct PlayerStatus {
    pub kind: StatusKind,
    pub since: std::time::Instant,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            kind: StatusKind::None,
            since: std::time::Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_saturates_and_kills() {
        let mut h = Health::new(5);
        h.take_damage(3);
        assert_eq!(h.hp, 2);
        assert!(h.alive);
        h.take_damage(200);
        assert_eq!(h.hp, 0);
        assert!(!h.alive);
    }

    #[test]
    fn weapon_wire_codes_round_trip() {
        for kind in [WeaponKind::Basic, WeaponKind::Laser, WeaponKind::Rocket] {
            assert_eq!(WeaponKind::from_wire(kind.to_wire()), kind);
        }
        // Unknown codes fall back to basic.
        assert_eq!(WeaponKind::from_wire(99), WeaponKind::Basic);
    }
}
