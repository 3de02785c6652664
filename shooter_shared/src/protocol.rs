//! Binary wire protocol.
//!
//! Every datagram is a fixed 12-byte big-endian header followed by a
//! message-specific payload. The header carries the message kind, the exact
//! payload length, a sequence number and a millisecond timestamp. Decoding is
//! strict: a payload length that disagrees with the datagram, or a truncated
//! payload, rejects the whole packet.

use anyhow::{bail, Context};
use bytes::{BufMut, Bytes, BytesMut};

use crate::components::PlayerId;

/// Wire size of the packet header: kind u16, payload length u16,
/// sequence u32, timestamp u32.
pub const HEADER_LEN: usize = 12;

/// Fixed room-name field width, NUL-padded.
pub const ROOM_NAME_LEN: usize = 32;

/// Fixed error-message field width, NUL-padded.
pub const ERROR_MESSAGE_LEN: usize = 64;

/// Hard cap on rooms in one list response.
pub const MAX_LISTED_ROOMS: usize = 16;

/// Room error codes.
pub const ROOM_ERROR_NOT_FOUND: u8 = 1;
pub const ROOM_ERROR_FULL: u8 = 2;
pub const ROOM_ERROR_NOT_HOST: u8 = 3;

/// Message kind codes as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum MessageKind {
    Handshake = 1,
    PlayerInput = 2,
    PlayerState = 3,
    MonsterSpawn = 4,
    MonsterState = 5,
    MonsterDeath = 6,
    PlayerDeath = 7,
    BulletFired = 8,
    BulletState = 9,
    Disconnect = 10,
    PlayerAssignment = 11,
    PowerUpState = 12,
    LevelBegin = 13,
    CreateRoom = 14,
    JoinRoom = 15,
    LeaveRoom = 16,
    StartGame = 17,
    RoomList = 18,
    RoomCreated = 19,
    RoomJoined = 20,
    RoomLeft = 21,
    GameStarted = 22,
    RoomListResponse = 23,
    RoomError = 24,
    AllPlayersDead = 25,
    SpectatorMode = 26,
    HostChanged = 27,
    ShieldSpawn = 28,
    ShieldState = 29,
    ShieldDeath = 30,
}

impl MessageKind {
    pub fn from_wire(v: u16) -> Option<Self> {
        use MessageKind::*;
        Some(match v {
            1 => Handshake,
            2 => PlayerInput,
            3 => PlayerState,
            4 => MonsterSpawn,
            5 => MonsterState,
            6 => MonsterDeath,
            7 => PlayerDeath,
            8 => BulletFired,
            9 => BulletState,
            10 => Disconnect,
            11 => PlayerAssignment,
            12 => PowerUpState,
            13 => LevelBegin,
            14 => CreateRoom,
            15 => JoinRoom,
            16 => LeaveRoom,
            17 => StartGame,
            18 => RoomList,
            19 => RoomCreated,
            20 => RoomJoined,
            21 => RoomLeft,
            22 => GameStarted,
            23 => RoomListResponse,
            24 => RoomError,
            25 => AllPlayersDead,
            26 => SpectatorMode,
            27 => HostChanged,
            28 => ShieldSpawn,
            29 => ShieldState,
            30 => ShieldDeath,
            _ => return None,
        })
    }
}

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: MessageKind,
    pub payload_len: u16,
    pub sequence: u32,
    pub timestamp: u32,
}

/// One entry of a room list response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListEntry {
    pub room_id: u32,
    pub name: String,
    pub host: PlayerId,
    pub player_count: u8,
    pub max_players: u8,
    pub state: u8,
}

/// Every message that can cross the wire, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Handshake,
    PlayerInput {
        player: PlayerId,
        up: bool,
        down: bool,
        left: bool,
        right: bool,
        fire: bool,
        swap_weapon: bool,
    },
    PlayerState {
        player: PlayerId,
        x: f32,
        y: f32,
        hp: u8,
        score: u16,
        alive: bool,
        status: u8,
    },
    MonsterSpawn {
        id: u32,
        x: f32,
        y: f32,
        monster_type: u8,
    },
    MonsterState {
        id: u32,
        monster_type: u8,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        alive: bool,
    },
    MonsterDeath {
        id: u32,
        killer: PlayerId,
    },
    PlayerDeath {
        player: PlayerId,
    },
    BulletFired {
        id: u32,
        owner: PlayerId,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        from_player: bool,
    },
    BulletState {
        id: u32,
        x: f32,
        y: f32,
        weapon_type: u8,
        from_player: bool,
        active: bool,
    },
    Disconnect {
        player: PlayerId,
    },
    PlayerAssignment {
        player: PlayerId,
    },
    PowerUpState {
        id: u32,
        kind: u8,
        value: u8,
        x: f32,
        y: f32,
        active: bool,
    },
    LevelBegin {
        level: u8,
    },
    CreateRoom {
        name: String,
    },
    JoinRoom {
        room_id: u32,
    },
    LeaveRoom {
        room_id: u32,
    },
    StartGame {
        room_id: u32,
    },
    RoomList,
    RoomCreated {
        room_id: u32,
        name: String,
        host: PlayerId,
        player: PlayerId,
    },
    RoomJoined {
        room_id: u32,
        name: String,
        host: PlayerId,
        player_count: u8,
        player: PlayerId,
    },
    RoomLeft {
        room_id: u32,
    },
    GameStarted {
        room_id: u32,
    },
    RoomListResponse {
        rooms: Vec<RoomListEntry>,
    },
    RoomError {
        code: u8,
        message: String,
    },
    AllPlayersDead {
        room_id: u32,
    },
    SpectatorMode {
        player: PlayerId,
        enabled: bool,
    },
    HostChanged {
        room_id: u32,
        new_host: PlayerId,
    },
    ShieldSpawn {
        id: u32,
        x: f32,
        y: f32,
        shield_type: u8,
    },
    ShieldState {
        id: u32,
        shield_type: u8,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        alive: bool,
    },
    ShieldDeath {
        id: u32,
    },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        use Message::*;
        match self {
            Handshake => MessageKind::Handshake,
            PlayerInput { .. } => MessageKind::PlayerInput,
            PlayerState { .. } => MessageKind::PlayerState,
            MonsterSpawn { .. } => MessageKind::MonsterSpawn,
            MonsterState { .. } => MessageKind::MonsterState,
            MonsterDeath { .. } => MessageKind::MonsterDeath,
            PlayerDeath { .. } => MessageKind::PlayerDeath,
            BulletFired { .. } => MessageKind::BulletFired,
            BulletState { .. } => MessageKind::BulletState,
            Disconnect { .. } => MessageKind::Disconnect,
            PlayerAssignment { .. } => MessageKind::PlayerAssignment,
            PowerUpState { .. } => MessageKind::PowerUpState,
            LevelBegin { .. } => MessageKind::LevelBegin,
            CreateRoom { .. } => MessageKind::CreateRoom,
            JoinRoom { .. } => MessageKind::JoinRoom,
            LeaveRoom { .. } => MessageKind::LeaveRoom,
            StartGame { .. } => MessageKind::StartGame,
            RoomList => MessageKind::RoomList,
            RoomCreated { .. } => MessageKind::RoomCreated,
            RoomJoined { .. } => MessageKind::RoomJoined,
            RoomLeft { .. } => MessageKind::RoomLeft,
            GameStarted { .. } => MessageKind::GameStarted,
            RoomListResponse { .. } => MessageKind::RoomListResponse,
            RoomError { .. } => MessageKind::RoomError,
            AllPlayersDead { .. } => MessageKind::AllPlayersDead,
            SpectatorMode { .. } => MessageKind::SpectatorMode,
            HostChanged { .. } => MessageKind::HostChanged,
            ShieldSpawn { .. } => MessageKind::ShieldSpawn,
            ShieldState { .. } => MessageKind::ShieldState,
            ShieldDeath { .. } => MessageKind::ShieldDeath,
        }
    }
}

/// Encodes a message into a complete datagram (header + payload).
pub fn encode(msg: &Message, sequence: u32, timestamp: u32) -> Bytes {
    let payload = encode_payload(msg);
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u16(msg.kind() as u16);
    buf.put_u16(payload.len() as u16);
    buf.put_u32(sequence);
    buf.put_u32(timestamp);
    buf.extend_from_slice(&payload);
    buf.freeze()
}

/// Decodes a complete datagram into header and message.
pub fn decode(packet: &[u8]) -> anyhow::Result<(Header, Message)> {
    let header = decode_header(packet)?;
    let payload = &packet[HEADER_LEN..HEADER_LEN + header.payload_len as usize];
    let msg = decode_payload(header.kind, payload)
        .with_context(|| format!("decode {:?} payload", header.kind))?;
    Ok((header, msg))
}

/// Decodes and validates just the header of a datagram.
pub fn decode_header(packet: &[u8]) -> anyhow::Result<Header> {
    if packet.len() < HEADER_LEN {
        bail!("packet shorter than header: {} bytes", packet.len());
    }
    let mut r = Reader::new(&packet[..HEADER_LEN]);
    let raw_kind = r.u16()?;
    let payload_len = r.u16()?;
    let sequence = r.u32()?;
    let timestamp = r.u32()?;
    let kind = MessageKind::from_wire(raw_kind)
        .with_context(|| format!("unknown message kind {raw_kind}"))?;
    if packet.len() < HEADER_LEN + payload_len as usize {
        bail!(
            "payload truncated: header says {} bytes, {} present",
            payload_len,
            packet.len() - HEADER_LEN
        );
    }
    Ok(Header {
        kind,
        payload_len,
        sequence,
        timestamp,
    })
}

fn encode_payload(msg: &Message) -> BytesMut {
    use Message::*;
    let mut b = BytesMut::new();
    match msg {
        Handshake | RoomList => {}
        PlayerInput {
            player,
            up,
            down,
            left,
            right,
            fire,
            swap_weapon,
        } => {
            b.put_u8(*player);
            b.put_u8(*up as u8);
            b.put_u8(*down as u8);
            b.put_u8(*left as u8);
            b.put_u8(*right as u8);
            b.put_u8(*fire as u8);
            b.put_u8(*swap_weapon as u8);
        }
        PlayerState {
            player,
            x,
            y,
            hp,
            score,
            alive,
            status,
        } => {
            b.put_u8(*player);
            b.put_f32(*x);
            b.put_f32(*y);
            b.put_u8(*hp);
            b.put_u16(*score);
            b.put_u8(*alive as u8);
            b.put_u8(*status);
        }
        MonsterSpawn {
            id,
            x,
            y,
            monster_type,
        } => {
            b.put_u32(*id);
            b.put_f32(*x);
            b.put_f32(*y);
            b.put_u8(*monster_type);
        }
        MonsterState {
            id,
            monster_type,
            x,
            y,
            vx,
            vy,
            alive,
        }
        | ShieldState {
            id,
            shield_type: monster_type,
            x,
            y,
            vx,
            vy,
            alive,
        } => {
            b.put_u32(*id);
            b.put_u8(*monster_type);
            b.put_f32(*x);
            b.put_f32(*y);
            b.put_f32(*vx);
            b.put_f32(*vy);
            b.put_u8(*alive as u8);
        }
        MonsterDeath { id, killer } => {
            b.put_u32(*id);
            b.put_u8(*killer);
        }
        PlayerDeath { player } | Disconnect { player } | PlayerAssignment { player } => {
            b.put_u8(*player);
        }
        BulletFired {
            id,
            owner,
            x,
            y,
            vx,
            vy,
            from_player,
        } => {
            b.put_u32(*id);
            b.put_u8(*owner);
            b.put_f32(*x);
            b.put_f32(*y);
            b.put_f32(*vx);
            b.put_f32(*vy);
            b.put_u8(*from_player as u8);
        }
        BulletState {
            id,
            x,
            y,
            weapon_type,
            from_player,
            active,
        } => {
            b.put_u32(*id);
            b.put_f32(*x);
            b.put_f32(*y);
            b.put_u8(*weapon_type);
            b.put_u8(*from_player as u8);
            b.put_u8(*active as u8);
            // Historical layout carries the origin flag twice.
            b.put_u8(*from_player as u8);
        }
        PowerUpState {
            id,
            kind,
            value,
            x,
            y,
            active,
        } => {
            b.put_u32(*id);
            b.put_u8(*kind);
            b.put_u8(*value);
            b.put_f32(*x);
            b.put_f32(*y);
            b.put_u8(*active as u8);
        }
        LevelBegin { level } => b.put_u8(*level),
        CreateRoom { name } => put_fixed_str(&mut b, name, ROOM_NAME_LEN),
        JoinRoom { room_id }
        | LeaveRoom { room_id }
        | StartGame { room_id }
        | RoomLeft { room_id }
        | GameStarted { room_id }
        | AllPlayersDead { room_id } => b.put_u32(*room_id),
        RoomCreated {
            room_id,
            name,
            host,
            player,
        } => {
            b.put_u32(*room_id);
            put_fixed_str(&mut b, name, ROOM_NAME_LEN);
            b.put_u8(*host);
            b.put_u8(*player);
        }
        RoomJoined {
            room_id,
            name,
            host,
            player_count,
            player,
        } => {
            b.put_u32(*room_id);
            put_fixed_str(&mut b, name, ROOM_NAME_LEN);
            b.put_u8(*host);
            b.put_u8(*player_count);
            b.put_u8(*player);
        }
        RoomListResponse { rooms } => {
            let count = rooms.len().min(MAX_LISTED_ROOMS);
            b.put_u8(count as u8);
            for entry in rooms.iter().take(count) {
                b.put_u32(entry.room_id);
                put_fixed_str(&mut b, &entry.name, ROOM_NAME_LEN);
                b.put_u8(entry.host);
                b.put_u8(entry.player_count);
                b.put_u8(entry.max_players);
                b.put_u8(entry.state);
            }
        }
        RoomError { code, message } => {
            b.put_u8(*code);
            put_fixed_str(&mut b, message, ERROR_MESSAGE_LEN);
        }
        SpectatorMode { player, enabled } => {
            b.put_u8(*player);
            b.put_u8(*enabled as u8);
        }
        HostChanged { room_id, new_host } => {
            b.put_u32(*room_id);
            b.put_u8(*new_host);
        }
        ShieldSpawn {
            id,
            x,
            y,
            shield_type,
        } => {
            b.put_u32(*id);
            b.put_f32(*x);
            b.put_f32(*y);
            b.put_u8(*shield_type);
        }
        ShieldDeath { id } => b.put_u32(*id),
    }
    b
}

fn decode_payload(kind: MessageKind, payload: &[u8]) -> anyhow::Result<Message> {
    let mut r = Reader::new(payload);
    let msg = match kind {
        MessageKind::Handshake => Message::Handshake,
        MessageKind::RoomList => Message::RoomList,
        MessageKind::PlayerInput => Message::PlayerInput {
            player: r.u8()?,
            up: r.flag()?,
            down: r.flag()?,
            left: r.flag()?,
            right: r.flag()?,
            fire: r.flag()?,
            swap_weapon: r.flag()?,
        },
        MessageKind::PlayerState => Message::PlayerState {
            player: r.u8()?,
            x: r.f32()?,
            y: r.f32()?,
            hp: r.u8()?,
            score: r.u16()?,
            alive: r.flag()?,
            status: r.u8()?,
        },
        MessageKind::MonsterSpawn => Message::MonsterSpawn {
            id: r.u32()?,
            x: r.f32()?,
            y: r.f32()?,
            monster_type: r.u8()?,
        },
        MessageKind::MonsterState => Message::MonsterState {
            id: r.u32()?,
            monster_type: r.u8()?,
            x: r.f32()?,
            y: r.f32()?,
            vx: r.f32()?,
            vy: r.f32()?,
            alive: r.flag()?,
        },
        MessageKind::MonsterDeath => Message::MonsterDeath {
            id: r.u32()?,
            killer: r.u8()?,
        },
        MessageKind::PlayerDeath => Message::PlayerDeath { player: r.u8()? },
        MessageKind::BulletFired => Message::BulletFired {
            id: r.u32()?,
            owner: r.u8()?,
            x: r.f32()?,
            y: r.f32()?,
            vx: r.f32()?,
            vy: r.f32()?,
            from_player: r.flag()?,
        },
        MessageKind::BulletState => {
            let id = r.u32()?;
            let x = r.f32()?;
            let y = r.f32()?;
            let weapon_type = r.u8()?;
            let from_player = r.flag()?;
            let active = r.flag()?;
            let _dup = r.flag()?;
            Message::BulletState {
                id,
                x,
                y,
                weapon_type,
                from_player,
                active,
            }
        }
        MessageKind::Disconnect => Message::Disconnect { player: r.u8()? },
        MessageKind::PlayerAssignment => Message::PlayerAssignment { player: r.u8()? },
        MessageKind::PowerUpState => Message::PowerUpState {
            id: r.u32()?,
            kind: r.u8()?,
            value: r.u8()?,
            x: r.f32()?,
            y: r.f32()?,
            active: r.flag()?,
        },
        MessageKind::LevelBegin => Message::LevelBegin { level: r.u8()? },
        MessageKind::CreateRoom => Message::CreateRoom {
            name: r.fixed_str(ROOM_NAME_LEN)?,
        },
        MessageKind::JoinRoom => Message::JoinRoom { room_id: r.u32()? },
        MessageKind::LeaveRoom => Message::LeaveRoom { room_id: r.u32()? },
        MessageKind::StartGame => Message::StartGame { room_id: r.u32()? },
        MessageKind::RoomCreated => Message::RoomCreated {
            room_id: r.u32()?,
            name: r.fixed_str(ROOM_NAME_LEN)?,
            host: r.u8()?,
            player: r.u8()?,
        },
        MessageKind::RoomJoined => Message::RoomJoined {
            room_id: r.u32()?,
            name: r.fixed_str(ROOM_NAME_LEN)?,
            host: r.u8()?,
            player_count: r.u8()?,
            player: r.u8()?,
        },
        MessageKind::RoomLeft => Message::RoomLeft { room_id: r.u32()? },
        MessageKind::GameStarted => Message::GameStarted { room_id: r.u32()? },
        MessageKind::RoomListResponse => {
            let count = r.u8()? as usize;
            let mut rooms = Vec::with_capacity(count.min(MAX_LISTED_ROOMS));
            for _ in 0..count.min(MAX_LISTED_ROOMS) {
                rooms.push(RoomListEntry {
                    room_id: r.u32()?,
                    name: r.fixed_str(ROOM_NAME_LEN)?,
                    host: r.u8()?,
                    player_count: r.u8()?,
                    max_players: r.u8()?,
                    state: r.u8()?,
                });
            }
            Message::RoomListResponse { rooms }
        }
        MessageKind::RoomError => Message::RoomError {
            code: r.u8()?,
            message: r.fixed_str(ERROR_MESSAGE_LEN)?,
        },
        MessageKind::AllPlayersDead => Message::AllPlayersDead { room_id: r.u32()? },
        MessageKind::SpectatorMode => Message::SpectatorMode {
            player: r.u8()?,
            enabled: r.flag()?,
        },
        MessageKind::HostChanged => Message::HostChanged {
            room_id: r.u32()?,
            new_host: r.u8()?,
        },
        MessageKind::ShieldSpawn => Message::ShieldSpawn {
            id: r.u32()?,
            x: r.f32()?,
            y: r.f32()?,
            shield_type: r.u8()?,
        },
        MessageKind::ShieldState => Message::ShieldState {
            id: r.u32()?,
            shield_type: r.u8()?,
            x: r.f32()?,
            y: r.f32()?,
            vx: r.f32()?,
            vy: r.f32()?,
            alive: r.flag()?,
        },
        MessageKind::ShieldDeath => Message::ShieldDeath { id: r.u32()? },
    };
    Ok(msg)
}

/// Writes `s` into a fixed-width field, truncated to leave a trailing NUL.
fn put_fixed_str(b: &mut BytesMut, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let take = bytes.len().min(width - 1);
    b.extend_from_slice(&bytes[..take]);
    b.extend_from_slice(&vec![0u8; width - take]);
}

/// Bounds-checked big-endian reader over a payload slice.
struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn take(&mut self, n: usize) -> anyhow::Result<&'a [u8]> {
        if self.offset + n > self.buf.len() {
            bail!(
                "underflow: need {} bytes at offset {}, have {}",
                n,
                self.offset,
                self.buf.len()
            );
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn u8(&mut self) -> anyhow::Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn flag(&mut self) -> anyhow::Result<bool> {
        Ok(self.u8()? != 0)
    }

    fn u16(&mut self) -> anyhow::Result<u16> {
        let s = self.take(2)?;
        Ok(u16::from_be_bytes([s[0], s[1]]))
    }

    fn u32(&mut self) -> anyhow::Result<u32> {
        let s = self.take(4)?;
        Ok(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
    }

    fn f32(&mut self) -> anyhow::Result<f32> {
        Ok(f32::from_bits(self.u32()?))
    }

    /// Reads a fixed-width text field, truncating at the first NUL.
    fn fixed_str(&mut self, width: usize) -> anyhow::Result<String> {
        let raw = self.take(width)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}
