//! Skyball Wire Protocol Types
//!
//! Shared Protobuf message types for the session relay and both game
//! roles. Every binary speaking the protocol depends on this crate, so
//! host, guest, and relay always agree on the schema.
//!
//! Two envelopes cover the whole protocol: [`ClientEnvelope`] for
//! everything a connection sends to the relay, [`ServerEnvelope`] for
//! everything the relay sends back. Each wraps a `oneof` payload; an
//! envelope whose payload is empty is malformed and gets dropped by the
//! receiver.

#![deny(unsafe_code)]

use prost::Message;
use skyball_sim::{GameSettings, InputState, Tick, World};

/// Transport-level connection identifier. Doubles as the player id: the
/// protocol trusts "which connection sent this" as the only identity.
pub type ConnectionId = u64;

// ============================================================================
// Client → Server Messages
// ============================================================================

/// Enter the room under a display name. First joiner becomes host.
#[derive(Clone, PartialEq, Message)]
pub struct Join {
    #[prost(string, tag = "1")]
    pub name: String,
}

/// Advisory readiness signal. Tracked and shown; gates nothing.
#[derive(Clone, PartialEq, Message)]
pub struct Ready {}

/// Host requests the match start, optionally pinning the settings the
/// guest must simulate with.
#[derive(Clone, PartialEq, Message)]
pub struct GameStart {
    #[prost(message, optional, tag = "1")]
    pub settings: Option<GameSettingsProto>,
}

/// Host pushes a settings change to the lobby (pre-start only).
#[derive(Clone, PartialEq, Message)]
pub struct Settings {
    #[prost(message, optional, tag = "1")]
    pub settings: Option<GameSettingsProto>,
}

/// Host broadcasts an authoritative snapshot.
#[derive(Clone, PartialEq, Message)]
pub struct State {
    #[prost(message, optional, tag = "1")]
    pub state: Option<SnapshotProto>,
}

/// Guest forwards its intent for one tick to the host.
#[derive(Clone, PartialEq, Message)]
pub struct Input {
    /// The guest's local tick for this input; echoed back by the host
    /// as `ack_client_tick` once incorporated.
    #[prost(uint64, tag = "1")]
    pub tick: Tick,

    #[prost(message, optional, tag = "2")]
    pub input: Option<InputStateProto>,
}

/// Leave the room; the relay closes the connection and cleans up
/// through its disconnect path.
#[derive(Clone, PartialEq, Message)]
pub struct Leave {}

/// Envelope for every client → server message.
#[derive(Clone, PartialEq, Message)]
pub struct ClientEnvelope {
    #[prost(oneof = "client_envelope::Msg", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub msg: Option<client_envelope::Msg>,
}

pub mod client_envelope {
    /// Payload of a [`super::ClientEnvelope`].
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Msg {
        #[prost(message, tag = "1")]
        Join(super::Join),
        #[prost(message, tag = "2")]
        Ready(super::Ready),
        #[prost(message, tag = "3")]
        GameStart(super::GameStart),
        #[prost(message, tag = "4")]
        Settings(super::Settings),
        #[prost(message, tag = "5")]
        State(super::State),
        #[prost(message, tag = "6")]
        Input(super::Input),
        #[prost(message, tag = "7")]
        Leave(super::Leave),
    }
}

impl ClientEnvelope {
    pub fn new(msg: client_envelope::Msg) -> Self {
        Self { msg: Some(msg) }
    }
}

// ============================================================================
// Server → Client Messages
// ============================================================================

/// Join confirmation carrying the assigned identity and current roster.
#[derive(Clone, PartialEq, Message)]
pub struct Joined {
    #[prost(uint64, tag = "1")]
    pub player_id: ConnectionId,

    #[prost(bool, tag = "2")]
    pub is_host: bool,

    #[prost(string, tag = "3")]
    pub room_code: String,

    #[prost(message, repeated, tag = "4")]
    pub players: Vec<PlayerInfoProto>,
}

/// Another player entered the room.
#[derive(Clone, PartialEq, Message)]
pub struct PlayerJoined {
    #[prost(message, optional, tag = "1")]
    pub player: Option<PlayerInfoProto>,
}

/// A player left or disconnected.
#[derive(Clone, PartialEq, Message)]
pub struct PlayerLeft {
    #[prost(uint64, tag = "1")]
    pub player_id: ConnectionId,
}

/// The match is starting; carries the host identity and settings.
#[derive(Clone, PartialEq, Message)]
pub struct GameStarted {
    #[prost(uint64, tag = "1")]
    pub host_id: ConnectionId,

    #[prost(message, optional, tag = "2")]
    pub settings: Option<GameSettingsProto>,
}

/// Input relayed to the host, tagged with the sending guest's identity.
#[derive(Clone, PartialEq, Message)]
pub struct RelayedInput {
    #[prost(uint64, tag = "1")]
    pub player_id: ConnectionId,

    #[prost(uint64, tag = "2")]
    pub tick: Tick,

    #[prost(message, optional, tag = "3")]
    pub input: Option<InputStateProto>,
}

/// User-facing rejection or session failure.
#[derive(Clone, PartialEq, Message)]
pub struct ErrorMsg {
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Envelope for every server → client message.
#[derive(Clone, PartialEq, Message)]
pub struct ServerEnvelope {
    #[prost(oneof = "server_envelope::Msg", tags = "1, 2, 3, 4, 5, 6, 7, 8")]
    pub msg: Option<server_envelope::Msg>,
}

pub mod server_envelope {
    /// Payload of a [`super::ServerEnvelope`].
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Msg {
        #[prost(message, tag = "1")]
        Joined(super::Joined),
        #[prost(message, tag = "2")]
        PlayerJoined(super::PlayerJoined),
        #[prost(message, tag = "3")]
        PlayerLeft(super::PlayerLeft),
        #[prost(message, tag = "4")]
        GameStart(super::GameStarted),
        #[prost(message, tag = "5")]
        Settings(super::Settings),
        #[prost(message, tag = "6")]
        State(super::State),
        #[prost(message, tag = "7")]
        Input(super::RelayedInput),
        #[prost(message, tag = "8")]
        Error(super::ErrorMsg),
    }
}

impl ServerEnvelope {
    pub fn new(msg: server_envelope::Msg) -> Self {
        Self { msg: Some(msg) }
    }
}

// ============================================================================
// Shared Records
// ============================================================================

/// Roster entry shown to every room member.
#[derive(Clone, PartialEq, Message)]
pub struct PlayerInfoProto {
    #[prost(uint64, tag = "1")]
    pub id: ConnectionId,

    #[prost(string, tag = "2")]
    pub name: String,

    #[prost(bool, tag = "3")]
    pub is_host: bool,

    #[prost(bool, tag = "4")]
    pub ready: bool,
}

/// Simulation-affecting settings, host-owned.
#[derive(Clone, PartialEq, Message)]
pub struct GameSettingsProto {
    #[prost(bool, tag = "1")]
    pub dive: bool,

    #[prost(double, tag = "2")]
    pub accel: f64,

    #[prost(double, tag = "3")]
    pub max_speed: f64,

    #[prost(uint32, tag = "4")]
    pub red_balls: u32,

    #[prost(uint32, tag = "5")]
    pub black_balls: u32,

    #[prost(uint32, tag = "6")]
    pub gold_balls: u32,

    #[prost(uint32, tag = "7")]
    pub gold_points: u32,

    #[prost(uint32, tag = "8")]
    pub duration: u32,

    #[prost(uint32, tag = "9")]
    pub win_score: u32,
}

/// One tick of directional intent.
#[derive(Clone, PartialEq, Message)]
pub struct InputStateProto {
    #[prost(bool, tag = "1")]
    pub left: bool,

    #[prost(bool, tag = "2")]
    pub right: bool,

    #[prost(bool, tag = "3")]
    pub up: bool,

    #[prost(bool, tag = "4")]
    pub down: bool,

    #[prost(bool, tag = "5")]
    pub action: bool,
}

/// One player's physical state inside a snapshot, by player index.
#[derive(Clone, PartialEq, Message)]
pub struct PlayerStateProto {
    #[prost(double, tag = "1")]
    pub x: f64,

    #[prost(double, tag = "2")]
    pub y: f64,

    #[prost(double, tag = "3")]
    pub vx: f64,

    #[prost(double, tag = "4")]
    pub vy: f64,

    #[prost(uint32, tag = "5")]
    pub score: u32,

    #[prost(uint32, tag = "6")]
    pub model: u32,
}

/// One ball's physical state inside a snapshot, by ball index.
#[derive(Clone, PartialEq, Message)]
pub struct BallStateProto {
    #[prost(double, tag = "1")]
    pub x: f64,

    #[prost(double, tag = "2")]
    pub y: f64,

    #[prost(double, tag = "3")]
    pub vx: f64,

    #[prost(double, tag = "4")]
    pub vy: f64,

    #[prost(bool, tag = "5")]
    pub alive: bool,
}

/// Authoritative host snapshot the guest reconciles against.
#[derive(Clone, PartialEq, Message)]
pub struct SnapshotProto {
    /// Host tick this snapshot describes. Optional on the wire: a
    /// snapshot without it is malformed and skipped whole by the guest.
    #[prost(uint64, optional, tag = "1")]
    pub tick: Option<Tick>,

    /// Highest guest input tick the host has incorporated. Guest inputs
    /// at or before it are safe to discard.
    #[prost(uint64, tag = "2")]
    pub ack_client_tick: Tick,

    #[prost(message, repeated, tag = "3")]
    pub players: Vec<PlayerStateProto>,

    #[prost(message, repeated, tag = "4")]
    pub balls: Vec<BallStateProto>,

    #[prost(uint32, tag = "5")]
    pub curr_basket: u32,

    #[prost(uint32, tag = "6")]
    pub timer: u32,

    #[prost(bool, tag = "7")]
    pub gold_spawned: bool,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<GameSettings> for GameSettingsProto {
    fn from(s: GameSettings) -> Self {
        Self {
            dive: s.dive,
            accel: s.accel,
            max_speed: s.max_speed,
            red_balls: s.red_balls,
            black_balls: s.black_balls,
            gold_balls: s.gold_balls,
            gold_points: s.gold_points,
            duration: s.duration,
            win_score: s.win_score,
        }
    }
}

impl From<GameSettingsProto> for GameSettings {
    fn from(s: GameSettingsProto) -> Self {
        Self {
            dive: s.dive,
            accel: s.accel,
            max_speed: s.max_speed,
            red_balls: s.red_balls,
            black_balls: s.black_balls,
            gold_balls: s.gold_balls,
            gold_points: s.gold_points,
            duration: s.duration,
            win_score: s.win_score,
        }
    }
}

impl From<InputState> for InputStateProto {
    fn from(i: InputState) -> Self {
        Self {
            left: i.left,
            right: i.right,
            up: i.up,
            down: i.down,
            action: i.action,
        }
    }
}

impl From<InputStateProto> for InputState {
    fn from(i: InputStateProto) -> Self {
        Self {
            left: i.left,
            right: i.right,
            up: i.up,
            down: i.down,
            action: i.action,
        }
    }
}

/// Capture a world into a snapshot, stamping the given ack tick.
pub fn snapshot_of(world: &World, ack_client_tick: Tick) -> SnapshotProto {
    SnapshotProto {
        tick: Some(world.tick()),
        ack_client_tick,
        players: world
            .players()
            .iter()
            .map(|p| PlayerStateProto {
                x: p.x,
                y: p.y,
                vx: p.vx,
                vy: p.vy,
                score: p.score,
                model: p.model,
            })
            .collect(),
        balls: world
            .balls()
            .iter()
            .map(|b| BallStateProto {
                x: b.x,
                y: b.y,
                vx: b.vx,
                vy: b.vy,
                alive: b.alive,
            })
            .collect(),
        curr_basket: world.curr_basket(),
        timer: world.timer(),
        gold_spawned: world.gold_spawned(),
    }
}

// ============================================================================
// Tests
// ============================================================================
