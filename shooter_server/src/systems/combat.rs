//! Combat passes: player and monster shooting, laser beam anchoring,
//! collision detection and damage resolution.
//!
//! Collision only records contacts (one slot per hurtbox, last write wins);
//! the damage pass resolves them afterwards so hits always apply against the
//! state every projectile saw in the same tick.

use std::{collections::HashSet, sync::Arc};

use shooter_shared::{
    components::{
        AutomaticShooting, BeamCollider, Collider, FireCooldown, Health, Hitbox, Hurtbox,
        PlayerInput, PlayerSlot, PlayerStatus, Projectile, StatusKind, Team, Transform, Velocity,
        Weapon, WeaponKind,
    },
    config::{GameConfig, GameplayConfig},
    ecs::{EntityId, Registry},
};

use crate::factory;

use super::System;

/// Released laser beams linger briefly instead of vanishing mid-frame.
const LASER_RELEASE_FADE_SECS: f32 = 0.18;

/// Minimum time between two damage applications of a sustained beam.
const LASER_TICK_SECS: f32 = 0.08;

/// Scaled basic-shot damage for a weapon level.
pub fn basic_damage(gameplay: &GameplayConfig, level: u8) -> u8 {
    let level = u32::from(level.max(1));
    let scaled = u32::from(gameplay.weapon_damage_basic) * level;
    scaled.clamp(1, 255) as u8
}

/// Per-tick laser damage: a third of the scaled laser damage, since the beam
/// re-applies it many times per second.
pub fn laser_damage(gameplay: &GameplayConfig, level: u8) -> u8 {
    let level = u32::from(level.max(1));
    let reduced = u32::from(gameplay.weapon_damage_laser) * level / 3;
    reduced.clamp(1, 255) as u8
}

/// Rocket damage: the configured missile damage when set, never less than the
/// multiplied basic damage, scaled by level.
pub fn rocket_damage(gameplay: &GameplayConfig, level: u8) -> u8 {
    let multiplier = gameplay.rocket_damage_multiplier.max(1.0);
    let level = level.max(1);
    let reference = f32::from(gameplay.weapon_damage_basic) * multiplier;
    let configured = if gameplay.weapon_damage_missile > 0 {
        f32::from(gameplay.weapon_damage_missile)
    } else {
        reference
    };
    let raw = reference.max(configured) * f32::from(level);
    (raw.round() as u32).clamp(1, 255) as u8
}

/// Bullet spawn offset relative to the shooter, flipped to lead whichever way
/// the bullet travels.
fn spawn_offset(gameplay: &GameplayConfig, vx: f32, vy: f32) -> (f32, f32) {
    let mut ox = gameplay.bullet_spawn_offset_x;
    let mut oy = gameplay.bullet_spawn_offset_y;
    if vx < 0.0 {
        ox = -ox;
    }
    if vy < 0.0 {
        oy = -oy;
    }
    (ox, oy)
}

/// Releases a player's sustained beam. The beam fades out through the
/// lifetime system when available, otherwise it is destroyed outright.
fn release_laser(
    weapon: &mut Weapon,
    config: &GameConfig,
    registry: &mut Registry,
    destroy: &mut HashSet<EntityId>,
) {
    if let Some(beam) = weapon.active_laser {
        let mut fading = false;
        if let Some(projectile) = registry.get_mut::<Projectile>(beam) {
            projectile.persistent = false;
            projectile.damage_tick_timer = 0.0;
            projectile.lifetime = (config.gameplay.bullet_lifetime - LASER_RELEASE_FADE_SECS).max(0.0);
            fading = true;
        }
        if !fading || !config.systems.projectile_lifetime {
            destroy.insert(beam);
        }
    }
    weapon.active_laser = None;
    weapon.laser_active = false;
}

/// Advances to the next unlocked weapon in cycle order. Leaving the laser
/// resets the level earned through laser upgrades.
fn cycle_weapon(weapon: &mut Weapon) {
    const ORDER: [WeaponKind; 3] = [WeaponKind::Basic, WeaponKind::Laser, WeaponKind::Rocket];
    let start = ORDER.iter().position(|k| *k == weapon.kind).unwrap_or(0);
    for offset in 1..=ORDER.len() {
        let candidate = ORDER[(start + offset) % ORDER.len()];
        if candidate == WeaponKind::Laser && !weapon.laser_unlocked {
            continue;
        }
        if candidate == WeaponKind::Rocket && !weapon.rocket_unlocked {
            continue;
        }
        weapon.kind = candidate;
        if candidate != WeaponKind::Laser {
            weapon.level = 1;
        }
        return;
    }
}

/// Fires player weapons on input and monster weapons on their cooldowns.
pub struct ShootingSystem {
    config: Arc<GameConfig>,
}

impl ShootingSystem {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self { config }
    }

    fn start_beam(&self, shooter: EntityId, weapon: &mut Weapon, registry: &mut Registry) {
        let gameplay = &self.config.gameplay;
        let Some(pos) = registry.get::<Transform>(shooter).copied() else {
            return;
        };
        let (vx, vy) = GameplayConfig::direction_velocity(gameplay.bullet_direction, gameplay.bullet_speed);
        let (ox, oy) = spawn_offset(gameplay, vx, vy);
        let damage = laser_damage(gameplay, weapon.level);
        let beam = factory::spawn_bullet(
            registry,
            &self.config,
            shooter,
            true,
            pos.x + ox,
            pos.y + oy,
            0.0,
            0.0,
            WeaponKind::Laser,
            damage,
        );
        weapon.laser_active = true;
        weapon.active_laser = Some(beam);
    }

    fn fire_projectile(&self, shooter: EntityId, weapon: &Weapon, registry: &mut Registry) {
        let gameplay = &self.config.gameplay;
        let damage = match weapon.kind {
            WeaponKind::Basic => basic_damage(gameplay, weapon.level),
            WeaponKind::Laser => laser_damage(gameplay, weapon.level),
            WeaponKind::Rocket => rocket_damage(gameplay, weapon.level),
        };
        let (vx, vy) = GameplayConfig::direction_velocity(gameplay.bullet_direction, gameplay.bullet_speed);
        let (ox, oy) = spawn_offset(gameplay, vx, vy);
        let pos = registry.get::<Transform>(shooter).copied().unwrap_or_default();
        factory::spawn_bullet(
            registry,
            &self.config,
            shooter,
            true,
            pos.x + ox,
            pos.y + oy,
            vx,
            vy,
            weapon.kind,
            damage,
        );
    }

    fn update_players(&self, registry: &mut Registry, destroy: &mut HashSet<EntityId>) {
        for id in registry.join3_ids::<PlayerInput, Weapon, FireCooldown>() {
            let Some(input) = registry.get::<PlayerInput>(id).copied() else {
                continue;
            };
            let Some(mut weapon) = registry.get::<Weapon>(id).cloned() else {
                continue;
            };
            let Some(mut cooldown) = registry.get::<FireCooldown>(id).copied() else {
                continue;
            };

            if input.switching_weapon {
                release_laser(&mut weapon, &self.config, registry, destroy);
                cycle_weapon(&mut weapon);
            }
            if !input.shooting {
                if weapon.laser_active {
                    release_laser(&mut weapon, &self.config, registry, destroy);
                }
                registry.insert(id, weapon);
                registry.insert(id, cooldown);
                continue;
            }

            cooldown.cooldown = if weapon.kind == WeaponKind::Rocket {
                self.config.gameplay.rocket_fire_cooldown
            } else {
                self.config.gameplay.player_fire_cooldown
            };

            if weapon.kind == WeaponKind::Laser {
                if !weapon.laser_active {
                    self.start_beam(id, &mut weapon, registry);
                    cooldown.timer = 0.0;
                }
            } else {
                if weapon.laser_active {
                    release_laser(&mut weapon, &self.config, registry, destroy);
                }
                if cooldown.timer <= 0.0 {
                    self.fire_projectile(id, &weapon, registry);
                    cooldown.timer = cooldown.cooldown;
                }
            }

            registry.insert(id, weapon);
            registry.insert(id, cooldown);
        }
    }

    fn update_monsters(&self, registry: &mut Registry) {
        let gameplay = &self.config.gameplay;
        for id in registry.join_ids::<AutomaticShooting, FireCooldown>() {
            let Some(cooldown) = registry.get::<FireCooldown>(id).copied() else {
                continue;
            };
            if cooldown.timer > 0.0 {
                continue;
            }
            let pos = registry.get::<Transform>(id).copied().unwrap_or_default();
            let directions = registry
                .get::<AutomaticShooting>(id)
                .map(|s| s.directions.clone())
                .unwrap_or_default();
            for dir in directions {
                let (ox, oy) = spawn_offset(gameplay, dir.dx, dir.dy);
                factory::spawn_bullet(
                    registry,
                    &self.config,
                    id,
                    false,
                    pos.x + ox,
                    pos.y + oy,
                    dir.dx,
                    dir.dy,
                    WeaponKind::Basic,
                    1,
                );
            }
            if let Some(cooldown) = registry.get_mut::<FireCooldown>(id) {
                cooldown.reset();
            }
        }
    }
}

impl System for ShootingSystem {
    fn name(&self) -> &'static str {
        "shooting"
    }

    fn update(
        &mut self,
        _dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        self.update_players(registry, destroy);
        self.update_monsters(registry);
    }
}

/// Anchors every active laser beam to its owner and tears beams down when
/// their owner can no longer sustain them.
pub struct LaserBeamSystem {
    config: Arc<GameConfig>,
}

impl LaserBeamSystem {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self { config }
    }

    fn drop_beam(weapon: &mut Weapon, registry: &Registry, destroy: &mut HashSet<EntityId>) {
        if let Some(beam) = weapon.active_laser {
            if registry.exists(beam) {
                destroy.insert(beam);
            }
        }
        weapon.active_laser = None;
        weapon.laser_active = false;
    }
}

impl System for LaserBeamSystem {
    fn name(&self) -> &'static str {
        "laser_beam"
    }

    fn update(
        &mut self,
        _dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        let gameplay = &self.config.gameplay;
        for id in registry.join_ids::<PlayerSlot, Weapon>() {
            let Some(mut weapon) = registry.get::<Weapon>(id).cloned() else {
                continue;
            };
            if !weapon.laser_active {
                continue;
            }

            let owner_pos = registry.get::<Transform>(id).copied();
            let owner_dead = registry.get::<Health>(id).is_some_and(|h| !h.alive);
            let Some(owner_pos) = owner_pos.filter(|_| !owner_dead) else {
                Self::drop_beam(&mut weapon, registry, destroy);
                registry.insert(id, weapon);
                continue;
            };

            let Some(beam) = weapon.active_laser else {
                weapon.laser_active = false;
                registry.insert(id, weapon);
                continue;
            };
            if !registry.has::<Transform>(beam) || !registry.has::<Projectile>(beam) {
                Self::drop_beam(&mut weapon, registry, destroy);
                registry.insert(id, weapon);
                continue;
            }

            if let Some(beam_pos) = registry.get_mut::<Transform>(beam) {
                beam_pos.x = owner_pos.x + gameplay.bullet_spawn_offset_x;
                beam_pos.y = owner_pos.y + gameplay.bullet_spawn_offset_y;
            }
            if let Some(beam_vel) = registry.get_mut::<Velocity>(beam) {
                *beam_vel = Velocity::default();
            }
        }
    }
}

fn circles_overlap(a: Transform, ra: f32, b: Transform, rb: f32) -> bool {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let reach = ra + rb;
    dx * dx + dy * dy < reach * reach
}

fn beam_overlaps(beam: Transform, shape: BeamCollider, target: Transform, radius: f32) -> bool {
    target.x - radius <= beam.x + shape.length
        && target.x + radius >= beam.x
        && (target.y - beam.y).abs() <= shape.half_height + radius
}

/// Records hitbox/hurtbox contacts. Same-team pairs never collide; contact
/// resolution is left to the damage pass.
pub struct CollisionSystem;

impl System for CollisionSystem {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn update(
        &mut self,
        _dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        let hitters = registry.join_ids::<Hitbox, Transform>();
        let hurters = registry.join_ids::<Hurtbox, Transform>();

        for &hitter in &hitters {
            let Some(hit_pos) = registry.get::<Transform>(hitter).copied() else {
                continue;
            };
            let Some(hitbox) = registry.get::<Hitbox>(hitter).copied() else {
                continue;
            };
            let hit_team = registry.get::<Team>(hitter).copied();
            let hit_circle = registry.get::<Collider>(hitter).copied();
            let hit_beam = registry.get::<BeamCollider>(hitter).copied();

            for &target in &hurters {
                if target == hitter {
                    continue;
                }
                if let (Some(a), Some(b)) = (hit_team, registry.get::<Team>(target).copied()) {
                    if a == b {
                        continue;
                    }
                }
                let Some(target_pos) = registry.get::<Transform>(target).copied() else {
                    continue;
                };
                let Some(target_collider) = registry.get::<Collider>(target).copied() else {
                    continue;
                };

                let overlap = if let Some(circle) = hit_circle {
                    circles_overlap(hit_pos, circle.radius, target_pos, target_collider.radius)
                } else if let Some(beam) = hit_beam {
                    beam_overlaps(hit_pos, beam, target_pos, target_collider.radius)
                } else {
                    false
                };
                if !overlap {
                    continue;
                }

                if let Some(hurtbox) = registry.get_mut::<Hurtbox>(target) {
                    hurtbox.collided_with = Some(hitter);
                }
                if hitbox.destroy_on_hit {
                    destroy.insert(hitter);
                }
            }
        }
    }
}

/// Applies recorded contacts to health. Sustained beams re-damage on a short
/// tick; everything else hits once and clears its contact slot.
pub struct WeaponDamageSystem;

impl System for WeaponDamageSystem {
    fn name(&self) -> &'static str {
        "weapon_damage"
    }

    fn update(
        &mut self,
        dt: f32,
        _level: &mut i32,
        registry: &mut Registry,
        destroy: &mut HashSet<EntityId>,
    ) {
        for victim in registry.ids_with::<Hurtbox>() {
            let Some(source) = registry
                .get::<Hurtbox>(victim)
                .and_then(|h| h.collided_with)
            else {
                continue;
            };
            if source == victim || destroy.contains(&source) {
                continue;
            }
            let Some(projectile) = registry.get::<Projectile>(source).cloned() else {
                continue;
            };

            if projectile.weapon == WeaponKind::Laser {
                let mut due = false;
                if let Some(beam) = registry.get_mut::<Projectile>(source) {
                    beam.damage_tick_timer += dt;
                    due = beam.persistent && beam.damage_tick_timer >= LASER_TICK_SECS;
                }
                if !due {
                    // Contact stays recorded until the beam's next tick.
                    continue;
                }
                let Some(mut health) = registry.get::<Health>(victim).copied() else {
                    continue;
                };
                if !health.alive {
                    continue;
                }
                health.take_damage(projectile.damage);
                registry.insert(victim, health);
                if let Some(beam) = registry.get_mut::<Projectile>(source) {
                    beam.damage_tick_timer = 0.0;
                }
                if !health.alive {
                    destroy.insert(victim);
                }
            } else {
                if destroy.contains(&victim) {
                    continue;
                }
                let Some(mut health) = registry.get::<Health>(victim).copied() else {
                    continue;
                };
                if !health.alive {
                    continue;
                }
                let shielded = registry
                    .get::<PlayerStatus>(victim)
                    .is_some_and(|s| s.kind == StatusKind::Shielded);
                if shielded {
                    if let Some(hurtbox) = registry.get_mut::<Hurtbox>(victim) {
                        hurtbox.collided_with = None;
                    }
                    continue;
                }
                health.take_damage(projectile.damage.max(1));
                registry.insert(victim, health);
                if !health.alive {
                    destroy.insert(victim);
                }
            }

            if let Some(hurtbox) = registry.get_mut::<Hurtbox>(victim) {
                hurtbox.collided_with = None;
            }
        }
    }
}
