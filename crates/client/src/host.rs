//! Host-side authoritative simulation driver.
//!
//! The host runs the real match. Guest inputs arrive through the relay
//! tagged with the guest's local tick; the freshest one is latched and
//! applied every tick until superseded, so a short input gap
//! extrapolates instead of freezing the remote player. Snapshots go
//! back out on a fixed cadence carrying the acknowledgment the guest's
//! reconciliation keys off.

use log::debug;
use skyball_sim::{InputState, PLAYER_COUNT, Tick, World};
use skyball_wire::{SnapshotProto, snapshot_of};

/// One snapshot every this many ticks.
pub const SNAPSHOT_INTERVAL_TICKS: Tick = 2;

#[derive(Debug)]
pub struct HostAuthority {
    world: World,
    remote_index: usize,
    remote_input: InputState,
    /// Highest guest tick incorporated; echoed as `ack_client_tick`.
    last_remote_tick: Tick,
}

impl HostAuthority {
    /// # Panics
    ///
    /// Panics if `remote_index` is not a valid player index.
    pub fn new(world: World, remote_index: usize) -> Self {
        assert!(remote_index < PLAYER_COUNT, "remote_index out of range");
        Self {
            world,
            remote_index,
            remote_input: InputState::default(),
            last_remote_tick: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn last_remote_tick(&self) -> Tick {
        self.last_remote_tick
    }

    /// Latch a guest input. Out-of-order arrivals older than the latch
    /// are dropped; the ack must never move backwards.
    pub fn on_remote_input(&mut self, tick: Tick, input: InputState) {
        if tick < self.last_remote_tick {
            debug!("stale guest input for tick {tick} dropped");
            return;
        }
        self.remote_input = input;
        self.last_remote_tick = tick;
    }

    /// Advance the authoritative simulation one tick with the host's
    /// own input and the latched guest input.
    pub fn step(&mut self, local_input: InputState) {
        let local_index = 1 - self.remote_index;
        self.world.apply_input(local_index, &local_input);
        self.world.apply_input(self.remote_index, &self.remote_input);
        self.world.step();
    }

    /// Capture the current state, stamped with the guest ack.
    pub fn snapshot(&self) -> SnapshotProto {
        snapshot_of(&self.world, self.last_remote_tick)
    }

    /// The snapshot to broadcast this tick, if the cadence is due.
    pub fn due_snapshot(&self) -> Option<SnapshotProto> {
        (self.world.tick() % SNAPSHOT_INTERVAL_TICKS == 0).then(|| self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyball_sim::GameSettings;

    const REMOTE: usize = 1;

    fn authority() -> HostAuthority {
        HostAuthority::new(World::new(3, GameSettings::default()), REMOTE)
    }

    fn right() -> InputState {
        InputState {
            right: true,
            ..InputState::default()
        }
    }

    #[test]
    fn test_latched_remote_input_steers_until_superseded() {
        let mut host = authority();
        host.on_remote_input(1, right());

        let x_before = host.world().players()[REMOTE].x;
        host.step(InputState::default());
        host.step(InputState::default());
        // The latch keeps steering across ticks without new arrivals.
        assert!(host.world().players()[REMOTE].x > x_before);
        assert!(host.world().players()[REMOTE].vx > 0.0);
    }

    #[test]
    fn test_stale_input_never_regresses_ack() {
        let mut host = authority();
        host.on_remote_input(5, right());
        host.on_remote_input(3, InputState::default());

        assert_eq!(host.last_remote_tick(), 5);
        assert_eq!(host.snapshot().ack_client_tick, 5);

        // The stale payload was dropped along with its tick: the next
        // step still steers with the tick-5 input.
        host.step(InputState::default());
        assert_eq!(host.world().players()[REMOTE].vx, 2.0);
    }

    #[test]
    #[should_panic(expected = "remote_index out of range")]
    fn test_rejects_out_of_range_remote_index() {
        let _ = HostAuthority::new(World::new(0, GameSettings::default()), 2);
    }

    #[test]
    fn test_snapshot_carries_ack() {
        let mut host = authority();
        host.on_remote_input(17, InputState::default());
        let snapshot = host.snapshot();
        assert_eq!(snapshot.ack_client_tick, 17);
        assert_eq!(snapshot.tick, Some(0));
    }

    #[test]
    fn test_snapshot_cadence() {
        let mut host = authority();
        let mut sent = 0;
        for _ in 0..10 {
            host.step(InputState::default());
            if host.due_snapshot().is_some() {
                sent += 1;
            }
        }
        // Ticks 2, 4, 6, 8, 10.
        assert_eq!(sent, 5);
    }
}
