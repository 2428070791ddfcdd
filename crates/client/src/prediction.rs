//! Guest-side prediction with rollback reconciliation.
//!
//! The engine owns the guest's full copy of the simulation. Local input
//! is applied immediately and recorded; authoritative snapshots from
//! the host arrive asynchronously and are reconciled between ticks:
//! correct the local player against the snapshot, overwrite what is
//! never predicted, then replay the still-unacknowledged inputs on top
//! of the corrected base so the local player keeps its responsiveness
//! instead of rubber-banding to a stale position.

use log::{debug, warn};
use skyball_sim::{InputState, Tick, World};
use skyball_wire::SnapshotProto;

use crate::corrector::correct;
use crate::input_buffer::InputBuffer;
use crate::snapshots::SnapshotQueue;

/// Local-player error at or below this is absorbed as jitter.
const TRUST_RADIUS: f64 = 15.0;

/// Local-player error above this means a discontinuous event happened
/// on the host (collision, knockdown, teleport); blending through it
/// would look worse than the cut, so position and velocity snap.
const SNAP_RADIUS: f64 = 50.0;

/// The guest's predicted simulation plus everything reconciliation
/// needs: the unacknowledged input record and the snapshot inbox.
#[derive(Debug)]
pub struct PredictionEngine {
    world: World,
    local_index: usize,
    buffer: InputBuffer,
    snapshots: SnapshotQueue,
    /// `snapshot.tick - local_tick` as of the last reconciliation;
    /// negative when the guest has simulated ahead of the host.
    tick_offset: i64,
    last_server_tick: Tick,
}

impl PredictionEngine {
    pub fn new(world: World, local_index: usize, snapshots: SnapshotQueue) -> Self {
        Self {
            world,
            local_index,
            buffer: InputBuffer::new(),
            snapshots,
            tick_offset: 0,
            last_server_tick: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn local_index(&self) -> usize {
        self.local_index
    }

    pub fn tick_offset(&self) -> i64 {
        self.tick_offset
    }

    pub fn last_server_tick(&self) -> Tick {
        self.last_server_tick
    }

    /// Best estimate of the host's current tick.
    pub fn authoritative_tick(&self) -> i64 {
        self.world.tick() as i64 + self.tick_offset
    }

    pub fn pending_inputs(&self) -> usize {
        self.buffer.len()
    }

    // ------------------------------------------------------------------
    // Predict
    // ------------------------------------------------------------------

    /// Advance one predicted tick: record the input for possible
    /// replay, steer the local player with it, and step the entire
    /// simulation in the shared phase order.
    pub fn predict(&mut self, input: InputState) {
        let tick = self.world.tick();
        self.buffer.record(tick, input);
        self.world.apply_input(self.local_index, &input);
        self.world.step();
    }

    /// Cycle the local player's sprite. Deliberately outside
    /// [`Self::predict`] so input replay cannot re-trigger it.
    pub fn switch_model(&mut self) {
        self.world.switch_model(self.local_index);
    }

    // ------------------------------------------------------------------
    // Reconcile
    // ------------------------------------------------------------------

    /// Drain queued snapshots and reconcile against each in arrival
    /// order. Called between ticks; never concurrently with
    /// [`Self::predict`].
    pub fn poll_snapshots(&mut self) {
        for snapshot in self.snapshots.drain() {
            self.reconcile(&snapshot);
        }
    }

    /// Apply one authoritative snapshot as a single atomic pass.
    pub fn reconcile(&mut self, snapshot: &SnapshotProto) {
        let Some(server_tick) = snapshot.tick else {
            warn!("snapshot without tick; skipping reconciliation");
            return;
        };
        let local_tick = self.world.tick();
        self.tick_offset = server_tick as i64 - local_tick as i64;
        self.last_server_tick = server_tick;
        let ack = snapshot.ack_client_tick;

        for (idx, target) in snapshot.players.iter().enumerate() {
            let local_index = self.local_index;
            let Some(p) = self.world.players_mut().get_mut(idx) else {
                debug!("snapshot player {idx} not present locally; skipped");
                continue;
            };
            // A non-finite coordinate would poison the blend for every
            // later snapshot; treat the entry as malformed.
            if !finite(target.x, target.y, target.vx, target.vy) {
                debug!("snapshot player {idx} has non-finite fields; skipped");
                continue;
            }

            let error = (p.x - target.x).hypot(p.y - target.y);
            if idx == local_index {
                if error > SNAP_RADIUS {
                    p.x = target.x;
                    p.y = target.y;
                    p.vx = target.vx;
                    p.vy = target.vy;
                } else if error > TRUST_RADIUS {
                    p.x = correct(p.x, target.x, error);
                    p.y = correct(p.y, target.y, error);
                    p.vx = target.vx;
                    p.vy = target.vy;
                }
                // Inside the trust radius the prediction stands.
            } else {
                // The remote player is pure extrapolation, never
                // trusted; the corrector's own snap threshold covers
                // discontinuities.
                p.x = correct(p.x, target.x, error);
                p.y = correct(p.y, target.y, error);
                p.vx = target.vx;
                p.vy = target.vy;
                p.model = target.model;
            }
            p.score = target.score;
        }

        for (idx, target) in snapshot.balls.iter().enumerate() {
            let Some(b) = self.world.balls_mut().get_mut(idx) else {
                debug!("snapshot ball {idx} not present locally; skipped");
                continue;
            };
            if !finite(target.x, target.y, target.vx, target.vy) {
                debug!("snapshot ball {idx} has non-finite fields; skipped");
                continue;
            }
            let error = (b.x - target.x).hypot(b.y - target.y);
            b.x = correct(b.x, target.x, error);
            b.y = correct(b.y, target.y, error);
            b.vx = target.vx;
            b.vy = target.vy;
            // Unconditional, so a ball the host removed never lingers.
            b.alive = target.alive;
        }

        self.world
            .sync_scalars(snapshot.curr_basket, snapshot.timer, snapshot.gold_spawned);

        // Rebuild the local player's lead from the corrected base:
        // every not-yet-acknowledged input steers again and moves one
        // step, in tick order.
        for (_, input) in self.buffer.replay_range(ack, local_tick) {
            self.world.apply_input(self.local_index, input);
            self.world.integrate_player(self.local_index);
        }

        self.buffer.acknowledge(ack);
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Leave the current match: replace the simulation and forget every
    /// trace of the old session before the caller proceeds.
    pub fn reset(&mut self, world: World) {
        self.world = world;
        self.buffer.clear();
        self.tick_offset = 0;
        self.last_server_tick = 0;
        // Stale snapshots from the old session must not leak into the
        // new one.
        self.snapshots.drain();
    }
}

fn finite(x: f64, y: f64, vx: f64, vy: f64) -> bool {
    x.is_finite() && y.is_finite() && vx.is_finite() && vy.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshots::snapshot_channel;
    use skyball_sim::GameSettings;
    use skyball_wire::snapshot_of;

    const LOCAL: usize = 1;

    fn engine() -> (crate::snapshots::SnapshotSender, PredictionEngine) {
        let (tx, rx) = snapshot_channel();
        let world = World::new(7, GameSettings::default());
        (tx, PredictionEngine::new(world, LOCAL, rx))
    }

    fn right() -> InputState {
        InputState {
            right: true,
            ..InputState::default()
        }
    }

    #[test]
    fn test_large_error_snaps_position_and_velocity() {
        let (_tx, mut engine) = engine();
        {
            let p = &mut engine.world_mut().players_mut()[LOCAL];
            p.x = 100.0;
            p.y = 100.0;
            p.vx = 3.0;
            p.vy = -1.0;
        }
        let mut snapshot = snapshot_of(engine.world(), 0);
        snapshot.players[LOCAL].x = 100.0;
        snapshot.players[LOCAL].y = 160.0;
        snapshot.players[LOCAL].vx = 0.5;
        snapshot.players[LOCAL].vy = 0.0;

        engine.reconcile(&snapshot);
        let p = &engine.world().players()[LOCAL];
        assert_eq!((p.x, p.y), (100.0, 160.0));
        assert_eq!((p.vx, p.vy), (0.5, 0.0));
    }

    #[test]
    fn test_mid_error_blends_and_overwrites_velocity() {
        let (_tx, mut engine) = engine();
        {
            let p = &mut engine.world_mut().players_mut()[LOCAL];
            p.x = 100.0;
            p.y = 100.0;
            p.vx = 3.0;
        }
        let mut snapshot = snapshot_of(engine.world(), 0);
        snapshot.players[LOCAL].x = 100.0;
        snapshot.players[LOCAL].y = 120.0;
        snapshot.players[LOCAL].vx = 1.0;
        snapshot.players[LOCAL].vy = 0.25;

        engine.reconcile(&snapshot);
        let p = &engine.world().players()[LOCAL];
        // error 20 -> blend 0.25
        assert_eq!(p.x, 100.0);
        assert_eq!(p.y, 105.0);
        assert_eq!((p.vx, p.vy), (1.0, 0.25));
    }

    #[test]
    fn test_small_error_is_trusted() {
        let (_tx, mut engine) = engine();
        {
            let p = &mut engine.world_mut().players_mut()[LOCAL];
            p.x = 100.0;
            p.y = 100.0;
            p.vx = 3.0;
        }
        let mut snapshot = snapshot_of(engine.world(), 0);
        snapshot.players[LOCAL].x = 100.0;
        snapshot.players[LOCAL].y = 110.0;
        snapshot.players[LOCAL].vx = -2.0;
        snapshot.players[LOCAL].score = 30;

        engine.reconcile(&snapshot);
        let p = &engine.world().players()[LOCAL];
        // error 10: prediction stands, velocity included.
        assert_eq!((p.x, p.y), (100.0, 100.0));
        assert_eq!(p.vx, 3.0);
        // Score is never predicted.
        assert_eq!(p.score, 30);
    }

    #[test]
    fn test_reconcile_idempotent_on_converged_state() {
        let (_tx, mut engine) = engine();
        let snapshot = snapshot_of(engine.world(), 0);
        let before = engine.world().clone();

        engine.reconcile(&snapshot);
        assert_eq!(engine.world().players(), before.players());
        assert_eq!(engine.world().balls(), before.balls());
    }

    #[test]
    fn test_snapshot_without_tick_skipped_whole() {
        let (_tx, mut engine) = engine();
        engine.predict(right());
        let before = engine.world().clone();
        let pending = engine.pending_inputs();

        let mut snapshot = snapshot_of(&before, 0);
        snapshot.tick = None;
        snapshot.players[LOCAL].x = 600.0;
        snapshot.curr_basket = 2;

        engine.reconcile(&snapshot);
        // No partial application: nothing moved, nothing acknowledged.
        assert_eq!(engine.world().players(), before.players());
        assert_eq!(engine.world().curr_basket(), before.curr_basket());
        assert_eq!(engine.pending_inputs(), pending);
        assert_eq!(engine.tick_offset(), 0);
    }

    #[test]
    fn test_unknown_ball_index_skipped() {
        let (_tx, mut engine) = engine();
        let mut snapshot = snapshot_of(engine.world(), 0);
        snapshot.balls.push(skyball_wire::BallStateProto {
            x: 1.0,
            y: 2.0,
            vx: 0.0,
            vy: 0.0,
            alive: true,
        });
        let balls_before = engine.world().balls().to_vec();

        engine.reconcile(&snapshot);
        assert_eq!(engine.world().balls(), balls_before.as_slice());
    }

    #[test]
    fn test_ball_aliveness_always_overwritten() {
        let (_tx, mut engine) = engine();
        let mut snapshot = snapshot_of(engine.world(), 0);
        snapshot.balls[0].alive = false;

        engine.reconcile(&snapshot);
        assert!(!engine.world().balls()[0].alive);
    }

    #[test]
    fn test_scalars_overwritten_unconditionally() {
        let (_tx, mut engine) = engine();
        let mut snapshot = snapshot_of(engine.world(), 0);
        snapshot.curr_basket = 2;
        snapshot.timer = 9;
        snapshot.gold_spawned = true;

        engine.reconcile(&snapshot);
        assert_eq!(engine.world().curr_basket(), 2);
        assert_eq!(engine.world().timer(), 9);
        assert!(engine.world().gold_spawned());
    }

    #[test]
    fn test_replay_rebuilds_lead_from_corrected_base() {
        let (_tx, mut engine) = engine();
        for _ in 0..5 {
            engine.predict(right());
        }
        assert_eq!(engine.world().tick(), 5);
        assert_eq!(engine.pending_inputs(), 5);

        // Authoritative position far from the prediction: snap, then
        // replay the two unacknowledged inputs (ticks 3 and 4).
        let mut snapshot = snapshot_of(engine.world(), 2);
        snapshot.tick = Some(3);
        snapshot.players[LOCAL].x = 300.0;
        snapshot.players[LOCAL].y = 200.0;
        snapshot.players[LOCAL].vx = 0.0;
        snapshot.players[LOCAL].vy = 0.0;

        engine.reconcile(&snapshot);
        let p = &engine.world().players()[LOCAL];
        // Two replayed right-steers from rest: vx 2 then 4, so the
        // corrected base advances 2 + 4 px.
        assert_eq!(p.x, 306.0);
        assert_eq!(p.vx, 4.0);
        // Acked inputs are gone, replayed ones retained.
        assert_eq!(engine.pending_inputs(), 2);
        assert_eq!(engine.tick_offset(), -2);
        assert_eq!(engine.last_server_tick(), 3);
    }

    #[test]
    fn test_ack_past_local_tick_drops_buffer_without_replay() {
        let (_tx, mut engine) = engine();
        for _ in 0..3 {
            engine.predict(right());
        }

        // A stale or hostile host claims to have incorporated inputs
        // the guest never sent.
        let mut snapshot = snapshot_of(engine.world(), 10);
        snapshot.tick = Some(2);
        engine.reconcile(&snapshot);

        // Nothing replays, everything at or below the ack retires.
        assert_eq!(engine.pending_inputs(), 0);
        assert_eq!(engine.last_server_tick(), 2);
    }

    #[test]
    fn test_non_finite_snapshot_entry_skipped_and_recoverable() {
        let (_tx, mut engine) = engine();
        let clean = snapshot_of(engine.world(), 0);

        let mut poisoned = clean.clone();
        poisoned.balls[0].x = f64::NAN;
        poisoned.players[0].y = f64::INFINITY;
        engine.reconcile(&poisoned);
        // Malformed entries are skipped whole, finite siblings intact.
        assert!(engine.world().balls()[0].x.is_finite());
        assert_eq!(engine.world().players()[0].y, clean.players[0].y);

        // The next valid snapshot still converges.
        engine.reconcile(&clean);
        assert_eq!(engine.world().balls()[0].x, clean.balls[0].x);
        assert_eq!(engine.world().players()[0].y, clean.players[0].y);
    }

    #[test]
    fn test_poll_applies_queued_snapshots_in_order() {
        let (tx, mut engine) = engine();
        let mut first = snapshot_of(engine.world(), 0);
        first.curr_basket = 1;
        let mut second = snapshot_of(engine.world(), 0);
        second.curr_basket = 2;
        tx.push(first);
        tx.push(second);

        engine.poll_snapshots();
        assert_eq!(engine.world().curr_basket(), 2);
    }

    #[test]
    fn test_reset_forgets_session() {
        let (tx, mut engine) = engine();
        for _ in 0..3 {
            engine.predict(right());
        }
        engine.reconcile(&{
            let mut s = snapshot_of(engine.world(), 1);
            s.tick = Some(10);
            s
        });
        tx.push(snapshot_of(engine.world(), 2));

        engine.reset(World::new(9, GameSettings::default()));
        assert_eq!(engine.world().tick(), 0);
        assert_eq!(engine.pending_inputs(), 0);
        assert_eq!(engine.tick_offset(), 0);
        assert_eq!(engine.last_server_tick(), 0);
        // The queued pre-reset snapshot was discarded too.
        engine.poll_snapshots();
        assert_eq!(engine.last_server_tick(), 0);
    }
}
