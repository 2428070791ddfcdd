//! Room membership records.

use skyball_wire::{ConnectionId, PlayerInfoProto};

/// One room member. Created on `join`, removed on disconnect or leave.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,
    pub is_host: bool,
    /// Advisory readiness; surfaced to the lobby, gates nothing.
    pub ready: bool,
}

impl Player {
    pub fn new(id: ConnectionId, name: String, is_host: bool) -> Self {
        Self {
            id,
            name,
            is_host,
            ready: false,
        }
    }

    pub fn to_proto(&self) -> PlayerInfoProto {
        PlayerInfoProto {
            id: self.id,
            name: self.name.clone(),
            is_host: self.is_host,
            ready: self.ready,
        }
    }
}
