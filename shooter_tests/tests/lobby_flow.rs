//! Full socket-based integration tests: a raw UDP client walks through the
//! lobby flow and watches gameplay broadcasts.

use std::time::Duration;

use anyhow::{bail, Context};
use shooter_server::bind_ephemeral;
use shooter_shared::{
    config::GameConfig,
    protocol::{self, Message, MessageKind},
};
use tokio::net::UdpSocket;

/// Test client: one UDP socket plus framing helpers.
struct TestClient {
    socket: UdpSocket,
    sequence: u32,
}

impl TestClient {
    async fn connect(server: std::net::SocketAddr) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        socket.connect(server).await?;
        Ok(Self {
            socket,
            sequence: 0,
        })
    }

    async fn send(&mut self, msg: &Message) -> anyhow::Result<()> {
        self.sequence += 1;
        let packet = protocol::encode(msg, self.sequence, 0);
        self.socket.send(&packet).await?;
        Ok(())
    }

    async fn recv(&self) -> anyhow::Result<Message> {
        let mut buf = vec![0u8; 2048];
        let n = tokio::time::timeout(Duration::from_secs(5), self.socket.recv(&mut buf))
            .await
            .context("timed out waiting for server")??;
        let (_, msg) = protocol::decode(&buf[..n])?;
        Ok(msg)
    }

    /// Receives until a message of `kind` arrives, skipping broadcasts of
    /// other kinds.
    async fn recv_kind(&self, kind: MessageKind) -> anyhow::Result<Message> {
        for _ in 0..300 {
            let msg = self.recv().await?;
            if msg.kind() == kind {
                return Ok(msg);
            }
        }
        bail!("no {kind:?} within 300 messages");
    }
}

async fn spawn_server(ticks: u32) -> anyhow::Result<(std::net::SocketAddr, tokio::task::JoinHandle<anyhow::Result<()>>)> {
    let mut server = bind_ephemeral(GameConfig::default()).await?;
    let addr = server.local_addr()?;
    let handle = tokio::spawn(async move { server.run_for_ticks(ticks).await });
    Ok((addr, handle))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn first_contact_assigns_a_player_id() -> anyhow::Result<()> {
    let (addr, server) = spawn_server(30).await?;
    let mut client = TestClient::connect(addr).await?;

    client.send(&Message::RoomList).await?;
    let assignment = client.recv_kind(MessageKind::PlayerAssignment).await?;
    assert_eq!(assignment, Message::PlayerAssignment { player: 0 });

    let listing = client.recv_kind(MessageKind::RoomListResponse).await?;
    match listing {
        Message::RoomListResponse { rooms } => assert!(rooms.is_empty()),
        other => bail!("unexpected {other:?}"),
    }

    server.await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_start_and_watch_the_simulation() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let (addr, server) = spawn_server(120).await?;
    let mut client = TestClient::connect(addr).await?;

    client
        .send(&Message::CreateRoom {
            name: "alpha".to_string(),
        })
        .await?;
    let created = client.recv_kind(MessageKind::RoomCreated).await?;
    let room_id = match created {
        Message::RoomCreated {
            room_id,
            name,
            host,
            player,
        } => {
            assert_eq!(name, "alpha");
            assert_eq!(host, 0);
            assert_eq!(player, 0);
            room_id
        }
        other => bail!("unexpected {other:?}"),
    };

    // The lobby now lists the room as waiting.
    client.send(&Message::RoomList).await?;
    let listing = client.recv_kind(MessageKind::RoomListResponse).await?;
    match listing {
        Message::RoomListResponse { rooms } => {
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].room_id, room_id);
            assert_eq!(rooms[0].player_count, 1);
            assert_eq!(rooms[0].state, 0);
        }
        other => bail!("unexpected {other:?}"),
    }

    client.send(&Message::StartGame { room_id }).await?;
    let started = client.recv_kind(MessageKind::GameStarted).await?;
    assert_eq!(started, Message::GameStarted { room_id });

    // Gameplay broadcasts follow: the first wave begins and our ship state
    // streams every tick.
    let begin = client.recv_kind(MessageKind::LevelBegin).await?;
    assert_eq!(begin, Message::LevelBegin { level: 1 });
    let state = client.recv_kind(MessageKind::PlayerState).await?;
    match state {
        Message::PlayerState {
            player, hp, alive, ..
        } => {
            assert_eq!(player, 0);
            assert_eq!(hp, GameConfig::default().gameplay.player_start_hp);
            assert!(alive);
        }
        other => bail!("unexpected {other:?}"),
    }

    // Held fire produces bullet state in the stream.
    client
        .send(&Message::PlayerInput {
            player: 0,
            up: false,
            down: false,
            left: false,
            right: false,
            fire: true,
            swap_weapon: false,
        })
        .await?;
    let bullet = client.recv_kind(MessageKind::BulletState).await?;
    match bullet {
        Message::BulletState { from_player, .. } => assert!(from_player),
        other => bail!("unexpected {other:?}"),
    }

    client.send(&Message::Disconnect { player: 0 }).await?;
    server.await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_client_joins_and_both_see_the_roster() -> anyhow::Result<()> {
    let (addr, server) = spawn_server(60).await?;
    let mut host = TestClient::connect(addr).await?;
    let mut guest = TestClient::connect(addr).await?;

    host.send(&Message::CreateRoom {
        name: "co-op".to_string(),
    })
    .await?;
    let created = host.recv_kind(MessageKind::RoomCreated).await?;
    let Message::RoomCreated { room_id, .. } = created else {
        bail!("unexpected {created:?}");
    };

    guest.send(&Message::JoinRoom { room_id }).await?;
    let assignment = guest.recv_kind(MessageKind::PlayerAssignment).await?;
    assert_eq!(assignment, Message::PlayerAssignment { player: 1 });

    let joined = guest.recv_kind(MessageKind::RoomJoined).await?;
    match joined {
        Message::RoomJoined {
            player_count,
            player,
            host: host_id,
            ..
        } => {
            assert_eq!(player_count, 2);
            assert_eq!(player, 1);
            assert_eq!(host_id, 0);
        }
        other => bail!("unexpected {other:?}"),
    }
    // The host hears about the join too, addressed as themselves.
    let update = host.recv_kind(MessageKind::RoomJoined).await?;
    match update {
        Message::RoomJoined { player, .. } => assert_eq!(player, 0),
        other => bail!("unexpected {other:?}"),
    }

    // Only the host may start.
    guest.send(&Message::StartGame { room_id }).await?;
    let error = guest.recv_kind(MessageKind::RoomError).await?;
    match error {
        Message::RoomError { code, message } => {
            assert_eq!(code, protocol::ROOM_ERROR_NOT_HOST);
            assert_eq!(message, "Only host can start game");
        }
        other => bail!("unexpected {other:?}"),
    }

    host.send(&Message::StartGame { room_id }).await?;
    let started = guest.recv_kind(MessageKind::GameStarted).await?;
    assert_eq!(started, Message::GameStarted { room_id });

    server.await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn joining_a_missing_room_is_an_error() -> anyhow::Result<()> {
    let (addr, server) = spawn_server(30).await?;
    let mut client = TestClient::connect(addr).await?;

    client.send(&Message::JoinRoom { room_id: 999 }).await?;
    let error = client.recv_kind(MessageKind::RoomError).await?;
    match error {
        Message::RoomError { code, message } => {
            assert_eq!(code, protocol::ROOM_ERROR_NOT_FOUND);
            assert_eq!(message, "Room not found");
        }
        other => bail!("unexpected {other:?}"),
    }

    server.await??;
    Ok(())
}
