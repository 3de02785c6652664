//! `shooter_server`
//!
//! Authoritative server for the side-scrolling shooter:
//! - Fixed timestep simulation over a minimal entity registry
//! - Gameplay systems (movement, combat, waves, power-ups) in a fixed order
//! - Rooms with lobby flow (create/join/start) over one UDP socket
//! - Per-tick state broadcasts to every room member

pub mod factory;
pub mod logic;
pub mod room;
pub mod server;
pub mod systems;

pub use server::{bind_ephemeral, GameServer};
