//! Skyball Session Relay
//!
//! Arbitrates exactly one two-party session: membership, host/guest
//! role assignment, and message authority. The relay performs no
//! simulation — it is a thin per-room state machine plus router.
//!
//! The relay is sans-I/O: it consumes `(ConnectionId, message)` pairs
//! and returns [`Effect`]s for the embedding transport to execute
//! fire-and-forget. The transport must deliver messages reliably and in
//! order per connection, and must process messages for one room to
//! completion one at a time; the room itself holds no locks.
//!
//! Authority table:
//! - `state`, `settings` — host only, relayed away from the host
//! - `input` — guest only, forwarded exclusively to the host
//! - `gameStart` — host only, with exactly two players present

#![deny(unsafe_code)]

pub mod player;

use log::{debug, info, warn};
use prost::Message as _;
use skyball_wire::{
    ClientEnvelope, ConnectionId, ErrorMsg, GameStarted, Joined, PlayerJoined, PlayerLeft,
    RelayedInput, ServerEnvelope, client_envelope, server_envelope,
};

pub use player::Player;

// Re-exported so embedders depend on the relay alone for the protocol.
pub use prost;

/// Hard cap on simultaneous players per room.
pub const ROOM_CAPACITY: usize = 2;

// ============================================================================
// Errors
// ============================================================================

/// User-facing rejections. The `Display` strings are the exact
/// `error.message` payloads on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,
    #[error("Game already in progress")]
    GameInProgress,
    #[error("Only host can start")]
    NotHost,
    #[error("Need 2 players")]
    NeedTwoPlayers,
    #[error("Host disconnected")]
    HostDisconnected,
}

// ============================================================================
// Effects
// ============================================================================

/// Outbound work for the transport. Sends are best-effort and
/// non-blocking; the relay never retries or acknowledges.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send {
        to: ConnectionId,
        msg: ServerEnvelope,
    },
    Close {
        conn: ConnectionId,
    },
}

fn send(to: ConnectionId, msg: server_envelope::Msg) -> Effect {
    Effect::Send {
        to,
        msg: ServerEnvelope::new(msg),
    }
}

fn send_error(to: ConnectionId, err: RoomError) -> Effect {
    send(
        to,
        server_envelope::Msg::Error(ErrorMsg {
            message: err.to_string(),
        }),
    )
}

// ============================================================================
// Room
// ============================================================================

/// Session lifecycle, for observability and embedder cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Lobby,
    Active,
    Terminated,
}

/// One two-party session. Owned exclusively by the relay layer from
/// first join to teardown.
#[derive(Debug)]
pub struct Room {
    code: String,
    players: Vec<Player>,
    host_id: Option<ConnectionId>,
    started: bool,
    terminated: bool,
}

impl Room {
    /// `code` is the opaque room label echoed in `joined` messages;
    /// generating pretty codes is the lobby's business, not ours.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            players: Vec::new(),
            host_id: None,
            started: false,
            terminated: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.terminated {
            Phase::Terminated
        } else if self.started {
            Phase::Active
        } else if self.players.is_empty() {
            Phase::Empty
        } else {
            Phase::Lobby
        }
    }

    pub fn host_id(&self) -> Option<ConnectionId> {
        self.host_id
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Terminated rooms route nothing; the embedder should drop them.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Decode and process one raw frame. Unparseable frames are logged
    /// and dropped; the offending connection is otherwise unaffected.
    pub fn handle_raw(&mut self, from: ConnectionId, bytes: &[u8]) -> Vec<Effect> {
        match ClientEnvelope::decode(bytes) {
            Ok(envelope) => self.handle(from, envelope),
            Err(err) => {
                warn!("[{}] undecodable frame from {from}: {err}", self.code);
                Vec::new()
            }
        }
    }

    /// Process one decoded message from a connection.
    pub fn handle(&mut self, from: ConnectionId, envelope: ClientEnvelope) -> Vec<Effect> {
        if self.terminated {
            debug!("[{}] message from {from} after teardown", self.code);
            return Vec::new();
        }

        let Some(msg) = envelope.msg else {
            warn!("[{}] empty envelope from {from}", self.code);
            return Vec::new();
        };

        match msg {
            client_envelope::Msg::Join(join) => self.handle_join(from, join.name),
            client_envelope::Msg::Ready(_) => self.handle_ready(from),
            client_envelope::Msg::GameStart(start) => self.handle_game_start(from, start.settings),
            client_envelope::Msg::Settings(settings) => self.handle_settings(from, settings),
            client_envelope::Msg::State(state) => self.handle_state(from, state),
            client_envelope::Msg::Input(input) => self.handle_input(from, input),
            client_envelope::Msg::Leave(_) => vec![Effect::Close { conn: from }],
        }
    }

    fn handle_join(&mut self, from: ConnectionId, name: String) -> Vec<Effect> {
        if self.players.len() >= ROOM_CAPACITY {
            return vec![send_error(from, RoomError::RoomFull)];
        }
        if self.started {
            return vec![send_error(from, RoomError::GameInProgress)];
        }

        let is_host = self.players.is_empty();
        if is_host {
            self.host_id = Some(from);
        }
        self.players.push(Player::new(from, name, is_host));
        info!(
            "[{}] player joined: {from} (host: {is_host})",
            self.code
        );

        let mut effects = vec![send(
            from,
            server_envelope::Msg::Joined(Joined {
                player_id: from,
                is_host,
                room_code: self.code.clone(),
                players: self.players.iter().map(Player::to_proto).collect(),
            }),
        )];

        let new_player = self.players.last().map(Player::to_proto);
        for other in self.others(from) {
            effects.push(send(
                other,
                server_envelope::Msg::PlayerJoined(PlayerJoined {
                    player: new_player.clone(),
                }),
            ));
        }
        effects
    }

    fn handle_ready(&mut self, from: ConnectionId) -> Vec<Effect> {
        // Advisory only: surfaced in the roster, never gates the start.
        if let Some(p) = self.players.iter_mut().find(|p| p.id == from) {
            p.ready = true;
        }
        Vec::new()
    }

    fn handle_game_start(
        &mut self,
        from: ConnectionId,
        settings: Option<skyball_wire::GameSettingsProto>,
    ) -> Vec<Effect> {
        if self.host_id != Some(from) {
            return vec![send_error(from, RoomError::NotHost)];
        }
        if self.players.len() < ROOM_CAPACITY {
            return vec![send_error(from, RoomError::NeedTwoPlayers)];
        }

        // Monotonic: once true, only teardown clears it.
        self.started = true;
        info!("[{}] game started by host {from}", self.code);

        let start = GameStarted {
            host_id: from,
            settings,
        };
        self.players
            .iter()
            .map(|p| send(p.id, server_envelope::Msg::GameStart(start.clone())))
            .collect()
    }

    fn handle_settings(
        &mut self,
        from: ConnectionId,
        settings: skyball_wire::Settings,
    ) -> Vec<Effect> {
        if self.host_id != Some(from) {
            debug!("[{}] settings from non-host {from} ignored", self.code);
            return Vec::new();
        }
        if self.started {
            debug!("[{}] settings after start ignored", self.code);
            return Vec::new();
        }

        // Relay to everyone but the author, so one settings object wins
        // without echoing back.
        self.others(from)
            .into_iter()
            .map(|other| send(other, server_envelope::Msg::Settings(settings.clone())))
            .collect()
    }

    fn handle_state(&mut self, from: ConnectionId, state: skyball_wire::State) -> Vec<Effect> {
        if self.host_id != Some(from) {
            debug!("[{}] state from non-host {from} ignored", self.code);
            return Vec::new();
        }

        self.others(from)
            .into_iter()
            .map(|other| send(other, server_envelope::Msg::State(state.clone())))
            .collect()
    }

    fn handle_input(&mut self, from: ConnectionId, input: skyball_wire::Input) -> Vec<Effect> {
        if self.host_id == Some(from) {
            debug!("[{}] input from host ignored", self.code);
            return Vec::new();
        }
        let Some(host) = self.host_id else {
            debug!("[{}] input with no host to route to", self.code);
            return Vec::new();
        };

        // Forwarded to the host alone, tagged with the sender identity.
        vec![send(
            host,
            server_envelope::Msg::Input(RelayedInput {
                player_id: from,
                tick: input.tick,
                input: input.input,
            }),
        )]
    }

    // ------------------------------------------------------------------
    // Disconnect
    // ------------------------------------------------------------------

    /// Remove a departed connection. Remaining members learn of the
    /// departure; if the host departed there is no migration — the
    /// session's authority collapses and the room is torn down.
    pub fn on_disconnect(&mut self, conn: ConnectionId) -> Vec<Effect> {
        let Some(pos) = self.players.iter().position(|p| p.id == conn) else {
            return Vec::new();
        };
        let player = self.players.remove(pos);
        info!("[{}] player left: {} ({conn})", self.code, player.name);

        let mut effects: Vec<Effect> = self
            .players
            .iter()
            .map(|p| send(p.id, server_envelope::Msg::PlayerLeft(PlayerLeft { player_id: conn })))
            .collect();

        if player.is_host {
            self.host_id = None;
            self.terminated = true;
            for p in &self.players {
                effects.push(send_error(p.id, RoomError::HostDisconnected));
            }
        }
        effects
    }

    fn others(&self, not: ConnectionId) -> Vec<ConnectionId> {
        self.players
            .iter()
            .filter(|p| p.id != not)
            .map(|p| p.id)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
