//! Simulation-affecting match settings.

/// Parameters that change simulation outcomes and therefore must be
/// identical on host and guest. Owned by the host; the session layer
/// copies them to the guest before the match starts and they are
/// immutable once it has.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    /// Whether players may steer downward (dive). Gold balls always can.
    pub dive: bool,
    /// Velocity change per steering impulse.
    pub accel: f64,
    /// Velocity clamp for steering, per axis.
    pub max_speed: f64,
    /// Catchable scoring balls.
    pub red_balls: u32,
    /// Hazard balls that knock players down.
    pub black_balls: u32,
    /// End-of-game balls, spawned on a timer.
    pub gold_balls: u32,
    /// Points for catching a gold ball into a basket.
    pub gold_points: u32,
    /// Seconds before gold balls spawn.
    pub duration: u32,
    /// Score that ends the game when no gold balls are configured.
    pub win_score: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            dive: false,
            accel: 2.0,
            max_speed: 5.0,
            red_balls: 1,
            black_balls: 2,
            gold_balls: 1,
            gold_points: 150,
            duration: 60,
            win_score: 50,
        }
    }
}
