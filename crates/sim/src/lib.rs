//! Skyball Simulation Core
//!
//! This crate contains the deterministic, fixed-timestep game simulation
//! shared by the host (authoritative) and the guest (predicted copy).
//!
//! # Architecture Constraints
//!
//! The simulation core MUST NOT:
//! - Perform I/O operations (file, network, etc.)
//! - Read wall-clock time
//! - Use ambient/unseeded randomness
//! - Depend on frame rate or variable delta time
//!
//! Both parties derive "random" simulation events from the stateless
//! hash PRNG in [`rng`], keyed by (seed, tick, entity id, channel), so no
//! RNG state ever crosses the network.

#![deny(unsafe_code)]

pub mod input;
pub mod rng;
pub mod settings;
pub mod world;

pub use input::InputState;
pub use settings::GameSettings;
pub use world::{BallKind, BallState, PlayerState, World};

// ============================================================================
// Type Aliases
// ============================================================================

/// A single discrete simulation timestep; the atomic unit of game time.
pub type Tick = u64;

/// Unique identifier for a ball entity within a match.
///
/// Feeds the 32-bit hash PRNG, so it stays `u32`. Player entities do not
/// draw from the PRNG and are addressed by index instead.
pub type EntityId = u32;

// ============================================================================
// Fixed-Rate Constants
// ============================================================================

/// Simulation steps per second on both host and guest.
pub const TICK_RATE_HZ: u32 = 30;

/// Number of players in a match. The session layer enforces the same cap.
pub const PLAYER_COUNT: usize = 2;
