//! Skyball Game-Side Engines
//!
//! Everything a game process runs on top of the shared simulation:
//! the guest's [`PredictionEngine`] with rollback reconciliation, and
//! the host's [`HostAuthority`] driving the authoritative match.
//!
//! Neither engine touches the network. Inbound snapshots are pushed
//! through a [`SnapshotSender`] by whatever owns the connection and
//! drained by the engine between ticks; outbound messages are returned
//! as values for the caller to send.

#![deny(unsafe_code)]

pub mod corrector;
pub mod host;
pub mod input_buffer;
pub mod prediction;
pub mod snapshots;

pub use host::{HostAuthority, SNAPSHOT_INTERVAL_TICKS};
pub use input_buffer::InputBuffer;
pub use prediction::PredictionEngine;
pub use snapshots::{SnapshotQueue, SnapshotSender, snapshot_channel};
