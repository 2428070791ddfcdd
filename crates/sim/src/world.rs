//! The owned entity store and fixed-order tick stepper.
//!
//! One `World` instance is the authoritative simulation on the host and
//! the predicted copy on the guest. The per-tick phase order in
//! [`World::step`] is a hard contract: resolve collisions, resolve catch
//! events, resolve timed spawn events, integrate movement. The guest
//! replicates it exactly; any reordering compounds divergence between
//! the two simulations over time.
//!
//! Exactly one writer mutates a `World` at a time: the tick loop, or the
//! reconciliation pass between ticks. Entity state is index-addressed
//! through accessors rather than shared references.

use crate::rng::{self, CHANNEL_WIGGLE, channel_evasion};
use crate::{EntityId, GameSettings, InputState, PLAYER_COUNT, TICK_RATE_HZ, Tick};

// ============================================================================
// Arena Constants
// ============================================================================

pub const ARENA_LEFT: f64 = 11.0;
pub const ARENA_RIGHT: f64 = 639.0;
pub const ARENA_TOP: f64 = 31.0;
pub const ARENA_BOTTOM: f64 = 399.0;

/// Clearance above `ARENA_BOTTOM` where flyers settle.
const GROUND_MARGIN: f64 = 10.0;

pub const PLAYER_SIZE: f64 = 38.0;
pub const BALL_SIZE: f64 = 16.0;
pub const GOLD_BALL_SIZE: f64 = 8.0;

/// Axis-aligned catch/collision box half-width, in px.
pub const CATCH_BOX: f64 = 20.0;

pub const BASKET_Y: f64 = 200.0;
const LEFT_BASKET_X: f64 = 17.0;
const RIGHT_BASKET_X: f64 = 633.0;

const GRAVITY: f64 = 0.1;
const TERMINAL_FALL_SPEED: f64 = 2.0;

/// A knocked-down flyer is thrown below the arena; the bounds clamp in
/// the movement phase settles it on the ground.
const KNOCKDOWN_Y: f64 = 1000.0;

const RED_BALL_POINTS: u32 = 10;
const SCORE_FLASH_TICKS: u32 = 15;

/// Balls drifting below this height climb back up on their own.
const BALL_CLIMB_Y: f64 = 309.0;

/// Gold balls evade players inside this box.
const EVASION_RADIUS: f64 = 100.0;

/// Evasion acts when `rand_int(.., GOLD_SMART) == 0`; 1 means every tick.
const GOLD_SMART: u32 = 1;

const MODEL_COUNT: u32 = 5;

// ============================================================================
// Entity Records
// ============================================================================

/// One player's physical state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub score: u32,
    /// Sprite variant, cycled by the action input outside the tick loop.
    pub model: u32,
    /// 0 = left side, scores at the right basket; 1 the reverse.
    pub side: u8,
}

impl PlayerState {
    fn new(x: f64, y: f64, side: u8) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            score: 0,
            model: 0,
            side,
        }
    }
}

/// Ball flavor; decides catchability, hazard behavior, and physics scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallKind {
    /// Catchable, scores `RED_BALL_POINTS` at the basket.
    Red,
    /// Hazard; knocks players down on contact.
    Black,
    /// Spawns on a timer, evades players, ends the game when scored.
    Gold,
}

impl BallKind {
    pub fn catchable(self) -> bool {
        matches!(self, BallKind::Red | BallKind::Gold)
    }

    fn size(self) -> f64 {
        match self {
            BallKind::Gold => GOLD_BALL_SIZE,
            _ => BALL_SIZE,
        }
    }

    /// Gold balls fly with doubled steering authority.
    fn speed_scale(self) -> f64 {
        match self {
            BallKind::Gold => 2.0,
            _ => 1.0,
        }
    }
}

/// One ball's physical state.
#[derive(Debug, Clone, PartialEq)]
pub struct BallState {
    /// Key for the shared PRNG; stable for the whole match.
    pub entity_id: EntityId,
    pub kind: BallKind,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub alive: bool,
}

// ============================================================================
// World
// ============================================================================

/// The simulation state container: two players, the ball list, and the
/// shared scalar fields, advanced one fixed step at a time.
#[derive(Debug, Clone)]
pub struct World {
    seed: u32,
    settings: GameSettings,
    tick: Tick,
    players: [PlayerState; PLAYER_COUNT],
    balls: Vec<BallState>,
    /// 0 = nobody holding a ball, 1 = player 0, 2 = player 1.
    curr_basket: u32,
    /// Score-flash countdown; reset on every score.
    timer: u32,
    gold_spawned: bool,
    over: bool,
}

impl World {
    /// Build the initial world: players at their spawn points, red and
    /// black balls stacked mid-field, gold balls hidden until their
    /// spawn tick. Ball entity ids are assigned in creation order, so
    /// host and guest building from the same settings agree on them.
    pub fn new(seed: u32, settings: GameSettings) -> Self {
        let mid_x = 325.0;

        let mut balls = Vec::new();
        let mut next_id: EntityId = 1;
        let mut push = |balls: &mut Vec<BallState>, kind, x, y, alive| {
            balls.push(BallState {
                entity_id: next_id,
                kind,
                x,
                y,
                vx: 0.0,
                vy: 0.0,
                alive,
            });
            next_id += 1;
        };

        for i in 0..settings.red_balls {
            push(&mut balls, BallKind::Red, mid_x, 150.0 + f64::from(i) * 30.0, true);
        }
        for i in 0..settings.black_balls {
            push(&mut balls, BallKind::Black, mid_x, 250.0 + f64::from(i) * 30.0, true);
        }
        for i in 0..settings.gold_balls {
            push(&mut balls, BallKind::Gold, mid_x, 100.0 + f64::from(i) * 30.0, false);
        }

        Self {
            seed,
            settings,
            tick: 0,
            players: [
                PlayerState::new(100.0, 200.0, 0),
                PlayerState::new(520.0, 200.0, 1),
            ],
            balls,
            curr_basket: 0,
            timer: 0,
            gold_spawned: false,
            over: false,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn players(&self) -> &[PlayerState; PLAYER_COUNT] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [PlayerState; PLAYER_COUNT] {
        &mut self.players
    }

    pub fn balls(&self) -> &[BallState] {
        &self.balls
    }

    pub fn balls_mut(&mut self) -> &mut [BallState] {
        &mut self.balls
    }

    pub fn curr_basket(&self) -> u32 {
        self.curr_basket
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn gold_spawned(&self) -> bool {
        self.gold_spawned
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Overwrite the authoritative scalar fields from a snapshot. These
    /// are never predicted and never blended.
    pub fn sync_scalars(&mut self, curr_basket: u32, timer: u32, gold_spawned: bool) {
        self.curr_basket = curr_basket;
        self.timer = timer;
        self.gold_spawned = gold_spawned;
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Apply one player's steering intent to that player's velocity.
    /// Does not move anything; movement happens in the tick step (or in
    /// a replay integration on the guest).
    pub fn apply_input(&mut self, player_index: usize, input: &InputState) {
        let accel = self.settings.accel;
        let max = self.settings.max_speed;
        let dive = self.settings.dive;
        let Some(p) = self.players.get_mut(player_index) else {
            return;
        };

        if input.left {
            p.vx = (p.vx - accel).max(-max);
        }
        if input.right {
            p.vx = (p.vx + accel).min(max);
        }
        if input.up {
            p.vy = (p.vy - accel).max(-max);
        }
        if input.down && dive {
            p.vy = (p.vy + accel).min(max);
        }
    }

    /// Cycle a player's sprite model. Driven by the action input, but
    /// outside the physics step so input replay never re-triggers it.
    pub fn switch_model(&mut self, player_index: usize) {
        if let Some(p) = self.players.get_mut(player_index) {
            p.model = (p.model + 1) % MODEL_COUNT;
        }
    }

    // ------------------------------------------------------------------
    // Tick Step
    // ------------------------------------------------------------------

    /// Advance the whole simulation one tick in the fixed phase order:
    /// collisions, catch events, timed spawns, movement integration.
    pub fn step(&mut self) {
        self.resolve_collisions();
        self.resolve_catches();
        self.resolve_spawns();
        self.integrate_movement();

        self.tick += 1;
        if self.timer > 0 {
            self.timer -= 1;
        }
    }

    /// One movement integration for a single player. Used by the guest
    /// to re-advance the corrected local player while replaying
    /// unacknowledged inputs.
    pub fn integrate_player(&mut self, player_index: usize) {
        if let Some(p) = self.players.get_mut(player_index) {
            integrate(
                &mut p.x,
                &mut p.y,
                &mut p.vx,
                &mut p.vy,
                PLAYER_SIZE,
                PLAYER_SIZE,
            );
        }
    }

    // ------------------------------------------------------------------
    // Phase 1: collisions
    // ------------------------------------------------------------------

    fn resolve_collisions(&mut self) {
        // Player vs player bump: overlapping flyers knock the lower one
        // to the ground.
        let dx = self.players[0].x - self.players[1].x;
        let (y0, y1) = (self.players[0].y, self.players[1].y);
        if dx.abs() < PLAYER_SIZE && (y0 - y1).abs() < PLAYER_SIZE {
            if y0 < y1 {
                self.players[1].y = KNOCKDOWN_Y;
            } else if y1 < y0 {
                self.players[0].y = KNOCKDOWN_Y;
            }
        }

        // Black balls knock down any player they touch.
        for ball in &self.balls {
            if ball.kind != BallKind::Black || !ball.alive {
                continue;
            }
            for p in &mut self.players {
                let dx = p.x + 8.0 - ball.x;
                let dy = p.y + 8.0 - ball.y;
                if dx.abs() < CATCH_BOX && dy.abs() < CATCH_BOX {
                    p.y = KNOCKDOWN_Y;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 2: catch and score events
    // ------------------------------------------------------------------

    fn resolve_catches(&mut self) {
        self.curr_basket = 0;

        for idx in 0..PLAYER_COUNT {
            for ball_idx in 0..self.balls.len() {
                let ball = &self.balls[ball_idx];
                if !ball.kind.catchable() || !ball.alive {
                    continue;
                }

                let p = &self.players[idx];
                let dx = p.x + 8.0 - ball.x;
                let dy = p.y + 8.0 - ball.y;
                if dx.abs() >= CATCH_BOX || dy.abs() >= CATCH_BOX {
                    continue;
                }

                // Carried: the ball rides at the catcher's hands.
                let carry_x = if p.vx > 0.0 { p.x + 18.0 } else { p.x + 8.0 };
                let carry_y = p.y + 15.0;
                let kind = ball.kind;
                {
                    let ball = &mut self.balls[ball_idx];
                    ball.x = carry_x;
                    ball.y = carry_y;
                }
                self.curr_basket = idx as u32 + 1;

                if self.at_scoring_basket(idx, ball_idx) {
                    match kind {
                        BallKind::Gold => self.score_gold(idx, ball_idx),
                        _ => self.score_red(idx, ball_idx),
                    }
                }
            }
        }
    }

    /// A carried ball scores when its holder presses against the
    /// opposite wall with the ball level with the basket.
    fn at_scoring_basket(&self, player_index: usize, ball_index: usize) -> bool {
        let p = &self.players[player_index];
        let at_wall = match p.side {
            0 => p.x > RIGHT_BASKET_X - PLAYER_SIZE,
            _ => p.x < LEFT_BASKET_X,
        };
        at_wall && (self.balls[ball_index].y - BASKET_Y).abs() < CATCH_BOX
    }

    fn score_red(&mut self, player_index: usize, ball_index: usize) {
        self.players[player_index].score += RED_BALL_POINTS;
        self.timer = SCORE_FLASH_TICKS;

        // Ball returns to mid-field.
        let ball = &mut self.balls[ball_index];
        ball.x = 325.0;
        ball.y = BASKET_Y;

        // Score-based win only applies when no gold balls are in play.
        if self.settings.gold_balls == 0
            && self.players[player_index].score >= self.settings.win_score
        {
            self.over = true;
        }
    }

    fn score_gold(&mut self, player_index: usize, ball_index: usize) {
        self.players[player_index].score += self.settings.gold_points;
        self.balls[ball_index].alive = false;
        self.over = true;
    }

    // ------------------------------------------------------------------
    // Phase 3: timed spawns
    // ------------------------------------------------------------------

    fn resolve_spawns(&mut self) {
        if self.settings.gold_balls == 0 || self.gold_spawned {
            return;
        }
        if self.tick >= Tick::from(self.settings.duration) * Tick::from(TICK_RATE_HZ) {
            for ball in &mut self.balls {
                if ball.kind == BallKind::Gold {
                    ball.alive = true;
                }
            }
            self.gold_spawned = true;
        }
    }

    // ------------------------------------------------------------------
    // Phase 4: movement integration
    // ------------------------------------------------------------------

    fn integrate_movement(&mut self) {
        for p in &mut self.players {
            integrate(
                &mut p.x,
                &mut p.y,
                &mut p.vx,
                &mut p.vy,
                PLAYER_SIZE,
                PLAYER_SIZE,
            );
        }

        for ball_idx in 0..self.balls.len() {
            if !self.balls[ball_idx].alive {
                continue;
            }
            self.steer_ball(ball_idx);
            let ball = &mut self.balls[ball_idx];
            let size = ball.kind.size();
            integrate(&mut ball.x, &mut ball.y, &mut ball.vx, &mut ball.vy, size, size);
        }
    }

    /// Deterministic ball steering: shared-PRNG wiggle on channel 0,
    /// plus per-player evasion channels for gold balls. Both sides
    /// compute the identical draws from (seed, tick, entity, channel).
    fn steer_ball(&mut self, ball_index: usize) {
        let seed = self.seed;
        let tick = self.tick;
        let accel = self.settings.accel;
        let max = self.settings.max_speed;
        let players = self.players.clone();

        let ball = &mut self.balls[ball_index];
        let scale = ball.kind.speed_scale();
        let (accel, max) = (accel * scale, max * scale);

        if ball.kind == BallKind::Gold {
            for (i, p) in players.iter().enumerate() {
                let dx = ball.x - p.x;
                let dy = ball.y - p.y;
                if dx.abs() < EVASION_RADIUS
                    && dy.abs() < EVASION_RADIUS
                    && rng::rand_int(seed, tick, ball.entity_id, channel_evasion(i), GOLD_SMART)
                        == 0
                {
                    // Flee: steer directly away, vertically toward open air.
                    if p.x < ball.x {
                        ball.vx = (ball.vx + accel).min(max);
                    }
                    if p.x > ball.x {
                        ball.vx = (ball.vx - accel).max(-max);
                    }
                    if p.y > ball.y {
                        ball.vy = (ball.vy - accel).max(-max);
                    }
                    if p.y < ball.y {
                        // Gold balls may always dive.
                        ball.vy = (ball.vy + accel).min(max);
                    }
                }
            }
        }

        match rng::rand_range(seed, tick, ball.entity_id, CHANNEL_WIGGLE, -20, 19) {
            0 => ball.vy = (ball.vy - accel).max(-max),
            1 => ball.vx = (ball.vx + accel).min(max),
            2 => ball.vx = (ball.vx - accel).max(-max),
            _ => {}
        }

        if ball.y > BALL_CLIMB_Y {
            ball.vy = (ball.vy - accel).max(-max);
        }
    }
}

/// Shared velocity integration: position advance, gravity with terminal
/// fall speed, arena bounds with wall reflection and ground stop.
fn integrate(x: &mut f64, y: &mut f64, vx: &mut f64, vy: &mut f64, w: f64, h: f64) {
    *x += *vx;
    *y += *vy;

    *vy += GRAVITY;
    if *vy > TERMINAL_FALL_SPEED {
        *vy = TERMINAL_FALL_SPEED;
    }

    if *x < ARENA_LEFT {
        *x = ARENA_LEFT;
        *vx = -*vx;
    }
    if *x > ARENA_RIGHT - w {
        *x = ARENA_RIGHT - w;
        *vx = -*vx;
    }
    if *y < ARENA_TOP {
        *y = ARENA_TOP;
        *vy = -*vy;
        if *vy == 0.0 {
            *vy += GRAVITY;
        }
    }
    let ground = ARENA_BOTTOM - h - GROUND_MARGIN;
    if *y > ground {
        *y = ground;
        *vy = 0.0;
        *vx = 0.0;
    }
}
