//! Rooms and the room directory.
//!
//! A room owns one simulation and the sessions of the players inside it. The
//! directory maps players to rooms behind one lock and turns lobby requests
//! into outgoing packets; the server only moves bytes.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use shooter_shared::{
    components::{
        Health, Monster, PlayerId, PlayerStatus, PowerUp, Projectile, Shield,
        StatusKind, Transform, Velocity,
    },
    config::GameConfig,
    ecs::EntityId,
    protocol::{
        Message, RoomListEntry, MAX_LISTED_ROOMS, ROOM_ERROR_FULL, ROOM_ERROR_NOT_FOUND,
        ROOM_ERROR_NOT_HOST,
    },
};
use tracing::{info, warn};

use crate::logic::GameLogic;

/// A packet ready to leave the server.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub to: SocketAddr,
    pub msg: Message,
}

fn send(out: &mut Vec<Outgoing>, to: SocketAddr, msg: Message) {
    out.push(Outgoing { to, msg });
}

/// One connected player inside a room.
#[derive(Debug, Clone, Copy)]
struct Session {
    player: PlayerId,
    addr: SocketAddr,
    entity: EntityId,
    spectator: bool,
    death_announced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Waiting,
    Playing,
    Finished,
}

impl RoomState {
    fn to_wire(self) -> u8 {
        match self {
            RoomState::Waiting => 0,
            RoomState::Playing => 1,
            RoomState::Finished => 2,
        }
    }
}

pub struct Room {
    id: u32,
    name: String,
    host: PlayerId,
    state: RoomState,
    sessions: Vec<Session>,
    logic: GameLogic,
    max_players: usize,
    all_dead_announced: bool,
}

impl Room {
    fn new(id: u32, name: String, host: PlayerId, config: Arc<GameConfig>) -> Self {
        Self {
            id,
            name,
            host,
            state: RoomState::Waiting,
            sessions: Vec::new(),
            logic: GameLogic::new(Arc::clone(&config)),
            max_players: config.network.max_players,
            all_dead_announced: false,
        }
    }

    fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_players
    }

    fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn player_count(&self) -> u8 {
        self.sessions.len() as u8
    }

    fn session(&self, player: PlayerId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.player == player)
    }

    /// Spawns the player's ship and registers the session. Joining is only
    /// possible while the room is still waiting.
    fn add_player(&mut self, player: PlayerId, addr: SocketAddr) -> Result<(), u8> {
        if self.state != RoomState::Waiting {
            return Err(ROOM_ERROR_NOT_FOUND);
        }
        if self.is_full() {
            return Err(ROOM_ERROR_FULL);
        }
        let entity = self.logic.spawn_player(player);
        self.sessions.push(Session {
            player,
            addr,
            entity,
            spectator: false,
            death_announced: false,
        });
        Ok(())
    }

    /// Drops the session and its entity. Returns the new host when hosting
    /// moved to another member.
    fn remove_player(&mut self, player: PlayerId) -> Option<PlayerId> {
        let Some(index) = self.sessions.iter().position(|s| s.player == player) else {
            return None;
        };
        let session = self.sessions.remove(index);
        self.logic.destroy_entity(session.entity);
        if self.host == player {
            if let Some(next) = self.sessions.first() {
                self.host = next.player;
                return Some(next.player);
            }
        }
        None
    }

    fn start(&mut self, by: PlayerId) -> Result<(), u8> {
        if by != self.host {
            return Err(ROOM_ERROR_NOT_HOST);
        }
        if self.state != RoomState::Waiting || self.is_empty() {
            return Err(ROOM_ERROR_NOT_FOUND);
        }
        self.state = RoomState::Playing;
        Ok(())
    }

    /// Spectating is an opt-in for dead players to keep watching; opting out
    /// again is always allowed.
    fn set_spectator(&mut self, player: PlayerId, enabled: bool) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.player == player) else {
            return false;
        };
        let dead = self
            .logic
            .registry
            .get::<Health>(self.sessions[index].entity)
            .map_or(true, |h| !h.alive);
        if enabled && !dead {
            return false;
        }
        self.sessions[index].spectator = enabled;
        true
    }

    fn all_players_dead(&self) -> bool {
        !self.sessions.is_empty()
            && self.sessions.iter().all(|s| {
                self.logic
                    .registry
                    .get::<Health>(s.entity)
                    .map_or(true, |h| !h.alive)
            })
    }

    fn update(&mut self, dt: f32) {
        if self.state != RoomState::Playing {
            return;
        }
        if self.all_players_dead() {
            return;
        }
        self.logic.update(dt);
    }

    /// Emits the per-tick world snapshot to every member, then flushes the
    /// destruction set so clients saw each entity's final state exactly once.
    fn broadcast_state(&mut self, out: &mut Vec<Outgoing>) {
        if self.state != RoomState::Playing {
            return;
        }

        let mut batch: Vec<Message> = Vec::new();
        if self.logic.take_level_changed() {
            batch.push(Message::LevelBegin {
                level: self.logic.level().clamp(0, 255) as u8,
            });
        }

        for session in &mut self.sessions {
            let registry = &self.logic.registry;
            let pos = registry
                .get::<Transform>(session.entity)
                .copied()
                .unwrap_or_default();
            let health = registry
                .get::<Health>(session.entity)
                .copied()
                .unwrap_or(Health { hp: 0, alive: false });
            let status = registry
                .get::<PlayerStatus>(session.entity)
                .map_or(0, |s| match s.kind {
                    StatusKind::None => 0,
                    StatusKind::Shielded => 1,
                });
            batch.push(Message::PlayerState {
                player: session.player,
                x: pos.x,
                y: pos.y,
                hp: health.hp,
                score: 0,
                alive: health.alive,
                status,
            });
            // Death is announced once, on the alive-to-dead transition.
            if health.alive {
                session.death_announced = false;
            } else if !session.death_announced {
                session.death_announced = true;
                batch.push(Message::PlayerDeath {
                    player: session.player,
                });
            }
        }

        if self.all_players_dead() {
            if !self.all_dead_announced {
                self.all_dead_announced = true;
                batch.push(Message::AllPlayersDead { room_id: self.id });
                // This snapshot is the last one; the room is done playing.
                self.state = RoomState::Finished;
                info!(room = self.id, "Game over");
            }
        } else {
            self.all_dead_announced = false;
        }

        let registry = &self.logic.registry;
        for id in registry.ids_with::<Monster>() {
            let Some(monster) = registry.get::<Monster>(id).copied() else {
                continue;
            };
            let pos = registry.get::<Transform>(id).copied().unwrap_or_default();
            let vel = registry.get::<Velocity>(id).copied().unwrap_or_default();
            let alive = registry.get::<Health>(id).is_some_and(|h| h.alive)
                && !self.logic.marked_for_destruction(id);
            batch.push(Message::MonsterState {
                id: id.0,
                monster_type: monster.kind,
                x: pos.x,
                y: pos.y,
                vx: vel.dx,
                vy: vel.dy,
                alive,
            });
        }

        for id in registry.ids_with::<Shield>() {
            let Some(shield) = registry.get::<Shield>(id).copied() else {
                continue;
            };
            // Shields report their parent's archetype so clients can size them.
            let shield_type = registry
                .get::<Monster>(shield.parent)
                .map_or(0, |m| m.kind);
            let pos = registry.get::<Transform>(id).copied().unwrap_or_default();
            let vel = registry.get::<Velocity>(id).copied().unwrap_or_default();
            let alive = registry.get::<Health>(id).is_some_and(|h| h.alive)
                && !self.logic.marked_for_destruction(id);
            batch.push(Message::ShieldState {
                id: id.0,
                shield_type,
                x: pos.x,
                y: pos.y,
                vx: vel.dx,
                vy: vel.dy,
                alive,
            });
        }

        for id in registry.ids_with::<PowerUp>() {
            let Some(power_up) = registry.get::<PowerUp>(id).copied() else {
                continue;
            };
            let pos = registry.get::<Transform>(id).copied().unwrap_or_default();
            batch.push(Message::PowerUpState {
                id: id.0,
                kind: power_up.kind.to_wire(),
                value: power_up.value,
                x: pos.x,
                y: pos.y,
                active: !self.logic.marked_for_destruction(id),
            });
        }

        for id in registry.ids_with::<Projectile>() {
            let Some(projectile) = registry.get::<Projectile>(id).cloned() else {
                continue;
            };
            let pos = registry.get::<Transform>(id).copied().unwrap_or_default();
            batch.push(Message::BulletState {
                id: id.0,
                x: pos.x,
                y: pos.y,
                weapon_type: projectile.weapon.to_wire(),
                from_player: projectile.from_player,
                active: !self.logic.marked_for_destruction(id),
            });
        }

        for session in &self.sessions {
            for msg in &batch {
                send(out, session.addr, msg.clone());
            }
        }

        self.logic.flush_destroyed();
    }

    fn list_entry(&self) -> RoomListEntry {
        RoomListEntry {
            room_id: self.id,
            name: self.name.clone(),
            host: self.host,
            player_count: self.player_count(),
            max_players: self.max_players as u8,
            state: self.state.to_wire(),
        }
    }
}

fn error_message(code: u8) -> &'static str {
    match code {
        ROOM_ERROR_NOT_FOUND => "Room not found",
        ROOM_ERROR_FULL => "Room is full",
        ROOM_ERROR_NOT_HOST => "Only host can start game",
        _ => "Room error",
    }
}

fn room_error(out: &mut Vec<Outgoing>, to: SocketAddr, code: u8) {
    send(out, to, Message::RoomError {
        code,
        message: error_message(code).to_string(),
    });
}

struct Directory {
    rooms: HashMap<u32, Room>,
    player_room: HashMap<PlayerId, u32>,
    next_room_id: u32,
}

/// All rooms on the server, behind one internal lock.
pub struct RoomDirectory {
    config: Arc<GameConfig>,
    inner: Mutex<Directory>,
}

impl RoomDirectory {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            config,
            inner: Mutex::new(Directory {
                rooms: HashMap::new(),
                player_room: HashMap::new(),
                next_room_id: 1,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Directory> {
        // Lock poisoning only happens after a panic; propagate the state.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Creates a room with `host` as its first member.
    pub fn create_room(&self, name: &str, host: PlayerId, addr: SocketAddr) -> Vec<Outgoing> {
        let mut out = Vec::new();
        // A player can only be in one room at a time; their old room hears
        // about any resulting host change.
        self.leave_locked(&mut self.lock(), host, &mut out);

        let mut dir = self.lock();
        let id = dir.next_room_id;
        dir.next_room_id += 1;
        let mut room = Room::new(id, name.to_string(), host, Arc::clone(&self.config));
        // The room was just created, so the host always fits.
        if room.add_player(host, addr).is_err() {
            warn!(room = id, player = host, "Host could not join its own room");
            return out;
        }
        dir.rooms.insert(id, room);
        dir.player_room.insert(host, id);
        info!(room = id, player = host, name, "Room created");
        send(&mut out, addr, Message::RoomCreated {
            room_id: id,
            name: name.to_string(),
            host,
            player: host,
        });
        out
    }

    pub fn join_room(&self, room_id: u32, player: PlayerId, addr: SocketAddr) -> Vec<Outgoing> {
        let mut out = Vec::new();
        let mut dir = self.lock();
        if dir.player_room.contains_key(&player) {
            room_error(&mut out, addr, ROOM_ERROR_NOT_FOUND);
            return out;
        }
        let Some(room) = dir.rooms.get_mut(&room_id) else {
            room_error(&mut out, addr, ROOM_ERROR_NOT_FOUND);
            return out;
        };
        if let Err(code) = room.add_player(player, addr) {
            room_error(&mut out, addr, code);
            return out;
        }

        let name = room.name.clone();
        let host = room.host;
        let player_count = room.player_count();
        // Every member gets the refreshed roster, addressed as themselves.
        for session in &room.sessions {
            send(&mut out, session.addr, Message::RoomJoined {
                room_id,
                name: name.clone(),
                host,
                player_count,
                player: session.player,
            });
        }
        dir.player_room.insert(player, room_id);
        info!(room = room_id, player, "Player joined room");
        out
    }

    pub fn leave_room(&self, player: PlayerId, addr: SocketAddr) -> Vec<Outgoing> {
        let mut out = Vec::new();
        let mut dir = self.lock();
        let room_id = self.leave_locked(&mut dir, player, &mut out);
        send(&mut out, addr, Message::RoomLeft {
            room_id: room_id.unwrap_or(0),
        });
        out
    }

    /// Removes the player from their room, announcing a host change to the
    /// remaining members. Returns the room left, if any.
    fn leave_locked(
        &self,
        dir: &mut Directory,
        player: PlayerId,
        out: &mut Vec<Outgoing>,
    ) -> Option<u32> {
        let room_id = dir.player_room.remove(&player)?;
        let room = dir.rooms.get_mut(&room_id)?;
        if let Some(new_host) = room.remove_player(player) {
            for session in &room.sessions {
                send(out, session.addr, Message::HostChanged {
                    room_id,
                    new_host,
                });
            }
        }
        info!(room = room_id, player, "Player left room");
        Some(room_id)
    }

    pub fn start_game(&self, room_id: u32, player: PlayerId) -> Vec<Outgoing> {
        let mut out = Vec::new();
        let mut dir = self.lock();
        let Some(room) = dir.rooms.get_mut(&room_id) else {
            return out;
        };
        let Some(requester) = room.session(player).copied() else {
            return out;
        };
        match room.start(player) {
            Ok(()) => {
                info!(room = room_id, "Game started");
                for session in &room.sessions {
                    send(&mut out, session.addr, Message::GameStarted { room_id });
                }
            }
            Err(code) => room_error(&mut out, requester.addr, code),
        }
        out
    }

    /// Records a spectator opt-in. Only dead players may enable it; the whole
    /// room hears the change so clients can relabel the member.
    pub fn set_spectator(&self, player: PlayerId, enabled: bool) -> Vec<Outgoing> {
        let mut out = Vec::new();
        let mut dir = self.lock();
        let Some(&room_id) = dir.player_room.get(&player) else {
            return out;
        };
        let Some(room) = dir.rooms.get_mut(&room_id) else {
            return out;
        };
        if room.set_spectator(player, enabled) {
            info!(room = room_id, player, enabled, "Spectator mode changed");
            for session in &room.sessions {
                send(&mut out, session.addr, Message::SpectatorMode { player, enabled });
            }
        }
        out
    }

    pub fn list_rooms(&self, addr: SocketAddr) -> Vec<Outgoing> {
        let dir = self.lock();
        let mut rooms: Vec<RoomListEntry> =
            dir.rooms.values().map(Room::list_entry).collect();
        rooms.sort_by_key(|r| r.room_id);
        rooms.truncate(MAX_LISTED_ROOMS);
        vec![Outgoing {
            to: addr,
            msg: Message::RoomListResponse { rooms },
        }]
    }

    /// Applies an input packet to the player's ship, wherever they are.
    pub fn apply_input(
        &self,
        player: PlayerId,
        up: bool,
        down: bool,
        left: bool,
        right: bool,
        fire: bool,
        swap_weapon: bool,
    ) {
        let mut dir = self.lock();
        let Some(&room_id) = dir.player_room.get(&player) else {
            return;
        };
        if let Some(room) = dir.rooms.get_mut(&room_id) {
            if let Some(entity) = room.session(player).map(|s| s.entity) {
                room.logic
                    .apply_input(entity, up, down, left, right, fire, swap_weapon);
            }
        }
    }

    /// Drops a player entirely: tells their roommates, then leaves the room.
    pub fn disconnect(&self, player: PlayerId) -> Vec<Outgoing> {
        let mut out = Vec::new();
        let mut dir = self.lock();
        if let Some(&room_id) = dir.player_room.get(&player) {
            if let Some(room) = dir.rooms.get(&room_id) {
                for session in room.sessions.iter().filter(|s| s.player != player) {
                    send(&mut out, session.addr, Message::Disconnect { player });
                }
            }
        }
        self.leave_locked(&mut dir, player, &mut out);
        out
    }

    /// Advances every playing room by `dt`.
    pub fn update_all(&self, dt: f32) {
        let mut dir = self.lock();
        for room in dir.rooms.values_mut() {
            room.update(dt);
        }
    }

    /// Collects world snapshots for every playing room.
    pub fn broadcast_states(&self) -> Vec<Outgoing> {
        let mut out = Vec::new();
        let mut dir = self.lock();
        for room in dir.rooms.values_mut() {
            room.broadcast_state(&mut out);
        }
        out
    }

    /// Drops rooms with no members left.
    pub fn cleanup_empty(&self) {
        let mut dir = self.lock();
        dir.rooms.retain(|id, room| {
            if room.is_empty() {
                info!(room = id, "Removed empty room");
                false
            } else {
                true
            }
        });
    }

    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }
}
