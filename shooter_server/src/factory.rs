//! Entity factory: assembles the component sets for every archetype the
//! simulation spawns (players, monsters, shields, bullets, power-ups).

use shooter_shared::{
    components::{
        AutomaticShooting, BeamCollider, Collider, FireCooldown, Health, Hitbox, Hurtbox, Monster,
        PlayerId, PlayerInput, PlayerSlot, PlayerStatus, PowerUp, PowerUpKind, Projectile, Shield,
        ShotDirection, Team, Transform, Velocity, Weapon, WeaponKind,
    },
    config::{GameConfig, GameplayConfig},
    ecs::{EntityId, Registry},
};

/// Collision radius of a player ship.
pub const PLAYER_RADIUS: f32 = 10.0;

/// Collision radius of a basic bullet; rockets double it.
pub const BULLET_RADIUS: f32 = 4.0;

/// Half-height of the laser beam's collision slab.
pub const BEAM_HALF_HEIGHT: f32 = 6.0;

/// Monster type that rams players instead of only shooting them.
const KAMIKAZE_TYPE: u8 = 5;

/// Fallback visual size when a monster type is not configured.
const DEFAULT_MONSTER_SIZE: f32 = 24.0;

pub fn spawn_player(registry: &mut Registry, config: &GameConfig, player: PlayerId) -> EntityId {
    let gameplay = &config.gameplay;
    let x = gameplay.player_spawn_x;
    let y = gameplay.player_spawn_y_base + gameplay.player_spawn_y_spacing * f32::from(player);

    let entity = registry.create();
    registry.insert(entity, Transform::new(x, y));
    registry.insert(entity, Velocity::default());
    registry.insert(entity, PlayerSlot { player });
    registry.insert(entity, Health::new(gameplay.player_start_hp));
    registry.insert(entity, FireCooldown::new(0.0));
    registry.insert(entity, Weapon::default());
    registry.insert(entity, PlayerStatus::default());
    registry.insert(entity, PlayerInput::default());
    registry.insert(entity, Collider {
        radius: PLAYER_RADIUS,
    });
    registry.insert(entity, Hurtbox::default());
    if !gameplay.friendly_fire {
        registry.insert(entity, Team::Player);
    }
    entity
}

pub fn spawn_monster(
    registry: &mut Registry,
    config: &GameConfig,
    kind: u8,
    can_shoot: bool,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
) -> EntityId {
    let gameplay = &config.gameplay;
    let mut hp = gameplay.monster_hp;
    let mut size = DEFAULT_MONSTER_SIZE;
    let mut collision_size = 1.0;
    let mut has_shield = false;
    if let Some(ty) = gameplay.monster_types.get(&kind) {
        hp = ty.hp;
        size = ty.size;
        collision_size = ty.collision_size;
        has_shield = ty.has_shield;
    }

    let entity = registry.create();
    registry.insert(entity, Transform::new(x, y));
    registry.insert(entity, Velocity::new(vx, vy));
    registry.insert(entity, Monster { kind });
    registry.insert(entity, Health::new(hp));
    registry.insert(entity, Collider {
        radius: size * 0.5 * collision_size,
    });
    registry.insert(entity, Weapon::default());
    if kind == KAMIKAZE_TYPE {
        registry.insert(entity, Hitbox {
            destroy_on_hit: true,
        });
    }
    if can_shoot {
        registry.insert(entity, FireCooldown {
            timer: 0.0,
            cooldown: 2.0,
        });
    }
    registry.insert(entity, Hurtbox::default());
    registry.insert(entity, AutomaticShooting {
        directions: shot_directions(gameplay, kind),
    });
    registry.insert(entity, Team::Monster);

    if has_shield {
        // Shield sits in front of the monster along its travel direction.
        let mut shield_offset_x = size * 0.6;
        if vx < 0.0 {
            shield_offset_x = -shield_offset_x;
        }
        spawn_shield(registry, config, entity, kind, x + shield_offset_x, y, vx, vy);
    }
    entity
}

/// Firing pattern for a monster type: the first boss sprays backward, up and
/// diagonally; everything else fires straight against the bullet direction.
fn shot_directions(gameplay: &GameplayConfig, kind: u8) -> Vec<ShotDirection> {
    let (fx, fy) =
        GameplayConfig::direction_velocity(gameplay.bullet_direction, gameplay.bullet_speed);
    if kind == gameplay.boss_monster_type {
        let speed = gameplay.bullet_speed;
        let (lx, ly) = (-fy, -fx);
        let normalize = |dx: f32, dy: f32| {
            let len = (dx * dx + dy * dy).sqrt();
            if len > 0.0 {
                ShotDirection {
                    dx: dx / len * speed,
                    dy: dy / len * speed,
                }
            } else {
                ShotDirection { dx, dy }
            }
        };
        vec![
            normalize(-fx, -fy),
            normalize(-fx + lx, -fy + ly),
            normalize(lx, ly),
        ]
    } else {
        vec![ShotDirection { dx: -fx, dy: -fy }]
    }
}

pub fn spawn_shield(
    registry: &mut Registry,
    config: &GameConfig,
    parent: EntityId,
    kind: u8,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
) -> EntityId {
    let mut shield_hp = 1;
    let mut size = DEFAULT_MONSTER_SIZE;
    if let Some(ty) = config.gameplay.monster_types.get(&kind) {
        shield_hp = ty.shield_hp.max(1);
        size = ty.size;
    }

    let entity = registry.create();
    registry.insert(entity, Transform::new(x, y));
    registry.insert(entity, Velocity::new(vx, vy));
    registry.insert(entity, Health::new(shield_hp));
    registry.insert(entity, Shield {
        parent,
        offset_x: 0.0,
        offset_y: 0.0,
    });
    registry.insert(entity, Collider { radius: size * 0.4 });
    registry.insert(entity, Hurtbox::default());
    if let Some(team) = registry.get::<Team>(parent).copied() {
        registry.insert(entity, team);
    }
    entity
}

#[allow(clippy::too_many_arguments)]
pub fn spawn_bullet(
    registry: &mut Registry,
    config: &GameConfig,
    owner: EntityId,
    from_player: bool,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    weapon: WeaponKind,
    damage: u8,
) -> EntityId {
    let entity = registry.create();
    registry.insert(entity, Transform::new(x, y));
    registry.insert(entity, Velocity::new(vx, vy));
    registry.insert(entity, Projectile {
        owner,
        from_player,
        lifetime: 0.0,
        damage,
        weapon,
        persistent: weapon == WeaponKind::Laser,
        damage_tick_timer: 0.0,
    });
    if let Some(team) = registry.get::<Team>(owner).copied() {
        registry.insert(entity, team);
    }
    if weapon == WeaponKind::Laser {
        registry.insert(entity, BeamCollider {
            length: config.gameplay.world_width + config.systems.boundary_margin,
            half_height: BEAM_HALF_HEIGHT,
        });
        registry.insert(entity, Hitbox {
            destroy_on_hit: false,
        });
    } else {
        let radius = if weapon == WeaponKind::Rocket {
            BULLET_RADIUS * 2.0
        } else {
            BULLET_RADIUS
        };
        registry.insert(entity, Collider { radius });
        registry.insert(entity, Hitbox {
            destroy_on_hit: true,
        });
    }
    entity
}

pub fn spawn_power_up(
    registry: &mut Registry,
    config: &GameConfig,
    kind: PowerUpKind,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
) -> EntityId {
    let entity = registry.create();
    registry.insert(entity, Transform::new(x, y));
    registry.insert(entity, Velocity::new(vx, vy));
    registry.insert(entity, PowerUp { kind, value: 1 });
    registry.insert(entity, Collider {
        radius: config.gameplay.power_up_size,
    });
    entity
}
