//! Per-tick player intent.

/// One player's intent at one tick: four directional booleans plus one
/// action. Ephemeral; the guest keeps recent ticks in its input buffer
/// for replay and nothing persists them beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    /// Model-switch action; does not affect physics.
    pub action: bool,
}

impl InputState {
    /// True when no direction is held.
    pub fn is_idle(&self) -> bool {
        !(self.left || self.right || self.up || self.down)
    }
}
