//! Authoritative UDP game server.
//!
//! One socket carries everything: lobby requests, input packets and state
//! broadcasts. The server runs a fixed timestep loop; each step drains the
//! socket, dispatches packets, advances every playing room and broadcasts
//! the resulting snapshots.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use shooter_shared::{
    components::PlayerId,
    config::GameConfig,
    protocol::{self, Message},
};
use tokio::{net::UdpSocket, time::Instant};
use tracing::{debug, info, warn};

use crate::room::{Outgoing, RoomDirectory};

/// Fixed simulation rate.
pub const TICK_HZ: u32 = 60;

/// Known endpoint state for one player id.
struct Endpoint {
    addr: SocketAddr,
    last_seen: Instant,
}

pub struct GameServer {
    config: Arc<GameConfig>,
    socket: UdpSocket,
    rooms: RoomDirectory,

    endpoints: HashMap<SocketAddr, PlayerId>,
    players: HashMap<PlayerId, Endpoint>,
    next_player: PlayerId,

    sequence: u32,
    started: Instant,
}

impl GameServer {
    /// Binds the configured address.
    pub async fn bind(config: Arc<GameConfig>) -> anyhow::Result<Self> {
        let addr = format!(
            "{}:{}",
            config.network.default_host, config.network.default_port
        );
        Self::bind_addr(config, &addr).await
    }

    pub async fn bind_addr(config: Arc<GameConfig>, addr: &str) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("bind udp {addr}"))?;
        Ok(Self {
            rooms: RoomDirectory::new(Arc::clone(&config)),
            config,
            socket,
            endpoints: HashMap::new(),
            players: HashMap::new(),
            next_player: 0,
            sequence: 0,
            started: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.socket.local_addr().context("local addr")
    }

    /// Runs the fixed timestep loop forever.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let dt = Duration::from_secs_f32(1.0 / TICK_HZ as f32);
        let mut next = Instant::now();
        loop {
            next += dt;
            self.step(dt.as_secs_f32()).await?;
            tokio::time::sleep_until(next).await;
        }
    }

    /// Runs a bounded number of ticks (used by tests).
    pub async fn run_for_ticks(&mut self, ticks: u32) -> anyhow::Result<()> {
        let dt = Duration::from_secs_f32(1.0 / TICK_HZ as f32);
        let mut next = Instant::now();
        for _ in 0..ticks {
            next += dt;
            self.step(dt.as_secs_f32()).await?;
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    /// One fixed simulation step.
    pub async fn step(&mut self, dt: f32) -> anyhow::Result<()> {
        self.recv_packets().await?;
        self.rooms.update_all(dt);
        self.rooms.cleanup_empty();
        self.check_timeouts().await;
        let snapshots = self.rooms.broadcast_states();
        self.send_all(snapshots).await;
        Ok(())
    }

    /// Drains every datagram currently queued on the socket.
    async fn recv_packets(&mut self) -> anyhow::Result<()> {
        let mut buf = vec![0u8; self.config.network.rx_buffer_size.max(protocol::HEADER_LEN)];
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((n, from)) => self.handle_packet(from, &buf[..n]).await,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e).context("udp recv"),
            }
        }
        Ok(())
    }

    async fn handle_packet(&mut self, from: SocketAddr, packet: &[u8]) {
        let (header, msg) = match protocol::decode(packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(%from, error = %e, "Dropped malformed packet");
                return;
            }
        };
        let player = self.endpoint_player(from).await;
        debug!(%from, player, kind = ?header.kind, "Packet");

        match msg {
            Message::Handshake => {}
            Message::CreateRoom { name } => {
                let out = self.rooms.create_room(&name, player, from);
                self.send_all(out).await;
            }
            Message::JoinRoom { room_id } => {
                let out = self.rooms.join_room(room_id, player, from);
                self.send_all(out).await;
            }
            Message::LeaveRoom { .. } => {
                let out = self.rooms.leave_room(player, from);
                self.send_all(out).await;
            }
            Message::StartGame { room_id } => {
                let out = self.rooms.start_game(room_id, player);
                self.send_all(out).await;
            }
            Message::RoomList => {
                let out = self.rooms.list_rooms(from);
                self.send_all(out).await;
            }
            Message::PlayerInput {
                up,
                down,
                left,
                right,
                fire,
                swap_weapon,
                ..
            } => {
                if let Some(endpoint) = self.players.get_mut(&player) {
                    endpoint.last_seen = Instant::now();
                }
                self.rooms
                    .apply_input(player, up, down, left, right, fire, swap_weapon);
            }
            Message::Disconnect { .. } => {
                info!(player, %from, "Player disconnected");
                let out = self.rooms.disconnect(player);
                self.send_all(out).await;
                self.drop_endpoint(player);
            }
            Message::SpectatorMode { enabled, .. } => {
                info!(player, enabled, "Spectator mode requested");
                let out = self.rooms.set_spectator(player, enabled);
                self.send_all(out).await;
            }
            other => {
                debug!(player, kind = ?other.kind(), "Ignoring server-bound message");
            }
        }
    }

    /// Resolves the player id for an endpoint, assigning the next free id to
    /// first-time senders and telling them who they are.
    async fn endpoint_player(&mut self, addr: SocketAddr) -> PlayerId {
        if let Some(&player) = self.endpoints.get(&addr) {
            if let Some(endpoint) = self.players.get_mut(&player) {
                endpoint.last_seen = Instant::now();
            }
            return player;
        }
        let player = self.next_player;
        self.next_player = self.next_player.wrapping_add(1);
        self.endpoints.insert(addr, player);
        self.players.insert(player, Endpoint {
            addr,
            last_seen: Instant::now(),
        });
        info!(player, %addr, "New endpoint");
        self.send_one(addr, &Message::PlayerAssignment { player }).await;
        player
    }

    fn drop_endpoint(&mut self, player: PlayerId) {
        if let Some(endpoint) = self.players.remove(&player) {
            self.endpoints.remove(&endpoint.addr);
        }
    }

    /// Drops players that have gone silent past the configured timeout.
    async fn check_timeouts(&mut self) {
        let timeout = Duration::from_secs_f32(self.config.network.client_timeout);
        let now = Instant::now();
        let stale: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|(_, e)| now.duration_since(e.last_seen) > timeout)
            .map(|(&p, _)| p)
            .collect();
        for player in stale {
            warn!(player, "Client timed out");
            if let Some(endpoint) = self.players.get(&player) {
                // Best-effort notice; the client may already be gone.
                self.send_one(endpoint.addr, &Message::Disconnect { player })
                    .await;
            }
            let out = self.rooms.disconnect(player);
            self.send_all(out).await;
            self.drop_endpoint(player);
        }
    }

    async fn send_all(&mut self, out: Vec<Outgoing>) {
        for packet in out {
            self.send_one(packet.to, &packet.msg).await;
        }
    }

    async fn send_one(&mut self, to: SocketAddr, msg: &Message) {
        self.sequence = self.sequence.wrapping_add(1);
        let timestamp = self.started.elapsed().as_millis() as u32;
        let bytes = protocol::encode(msg, self.sequence, timestamp);
        if let Err(e) = self.socket.send_to(&bytes, to).await {
            debug!(%to, error = %e, "Send failed");
        }
    }
}

/// Helper for tests: bind to an ephemeral localhost port.
pub async fn bind_ephemeral(config: GameConfig) -> anyhow::Result<GameServer> {
    GameServer::bind_addr(Arc::new(config), "127.0.0.1:0").await
}
