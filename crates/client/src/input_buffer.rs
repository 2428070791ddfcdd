//! Tick-indexed store of unacknowledged local inputs.

use std::collections::BTreeMap;
use std::ops::Bound;

use skyball_sim::{InputState, Tick};

/// Target retention: roughly four seconds of input at the fixed tick
/// rate, far beyond any survivable acknowledgment lag.
pub const BUFFER_CAPACITY: usize = 120;

/// Compaction runs only once the map overshoots capacity by half,
/// keeping eviction an amortized bulk operation instead of per-insert
/// trimming.
const EVICTION_TRIGGER: usize = BUFFER_CAPACITY + BUFFER_CAPACITY / 2;

/// Ordered buffer of `(tick, input)` pairs recorded at predict time and
/// consumed by reconciliation replay. Entries leave two ways: the
/// host's `ack_client_tick` retires everything at or below it, and the
/// overflow compaction drops the oldest entries when acknowledgments
/// stall.
#[derive(Debug, Default)]
pub struct InputBuffer {
    entries: BTreeMap<Tick, InputState>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the input applied at `tick`. Re-recording a tick replaces
    /// the previous entry.
    pub fn record(&mut self, tick: Tick, input: InputState) {
        self.entries.insert(tick, input);
        if self.entries.len() > EVICTION_TRIGGER {
            if let Some(&cutoff) = self.entries.keys().rev().nth(BUFFER_CAPACITY - 1) {
                self.entries = self.entries.split_off(&cutoff);
            }
        }
    }

    /// Drop every entry the host has already incorporated
    /// (`tick <= ack`).
    pub fn acknowledge(&mut self, ack: Tick) {
        match ack.checked_add(1) {
            Some(first_kept) => self.entries = self.entries.split_off(&first_kept),
            None => self.entries.clear(),
        }
    }

    /// Entries with `ack < tick <= local_tick`, in increasing tick
    /// order: exactly the inputs reconciliation replays on top of a
    /// corrected base. An inverted window (`ack >= local_tick`, as a
    /// stale or hostile snapshot can produce) is empty, never a panic.
    pub fn replay_range(
        &self,
        ack: Tick,
        local_tick: Tick,
    ) -> impl Iterator<Item = (Tick, &InputState)> {
        let start = ack.min(local_tick);
        self.entries
            .range((Bound::Excluded(start), Bound::Included(local_tick)))
            .map(|(t, i)| (*t, i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held_left() -> InputState {
        InputState {
            left: true,
            ..InputState::default()
        }
    }

    #[test]
    fn test_never_exceeds_overshoot_bound() {
        let mut buffer = InputBuffer::new();
        for tick in 0..1000u64 {
            buffer.record(tick, InputState::default());
            assert!(buffer.len() <= EVICTION_TRIGGER);
        }
    }

    #[test]
    fn test_compaction_keeps_most_recent_capacity() {
        let mut buffer = InputBuffer::new();
        for tick in 0..=(EVICTION_TRIGGER as u64) {
            buffer.record(tick, InputState::default());
        }
        // The insert that crossed the trigger compacted down.
        assert_eq!(buffer.len(), BUFFER_CAPACITY);
        let last = EVICTION_TRIGGER as u64;
        let oldest_kept = last - (BUFFER_CAPACITY as u64 - 1);
        let kept: Vec<Tick> = buffer.replay_range(0, last).map(|(t, _)| t).collect();
        assert_eq!(kept.first(), Some(&oldest_kept));
        assert_eq!(kept.last(), Some(&last));
    }

    #[test]
    fn test_acknowledge_retires_at_or_below() {
        let mut buffer = InputBuffer::new();
        for tick in 0..10u64 {
            buffer.record(tick, InputState::default());
        }
        buffer.acknowledge(6);
        let kept: Vec<Tick> = buffer.replay_range(0, 100).map(|(t, _)| t).collect();
        assert_eq!(kept, vec![7, 8, 9]);
    }

    #[test]
    fn test_replay_range_exclusive_inclusive() {
        let mut buffer = InputBuffer::new();
        for tick in 0..10u64 {
            buffer.record(tick, held_left());
        }
        let ticks: Vec<Tick> = buffer.replay_range(3, 7).map(|(t, _)| t).collect();
        assert_eq!(ticks, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_inverted_replay_window_is_empty() {
        let mut buffer = InputBuffer::new();
        for tick in 0..3u64 {
            buffer.record(tick, held_left());
        }
        // An ack past the local tick must yield nothing, not panic.
        assert_eq!(buffer.replay_range(10, 3).count(), 0);
        assert_eq!(buffer.replay_range(3, 3).count(), 0);
    }

    #[test]
    fn test_rerecord_replaces() {
        let mut buffer = InputBuffer::new();
        buffer.record(5, InputState::default());
        buffer.record(5, held_left());
        assert_eq!(buffer.len(), 1);
        let (_, input) = buffer.replay_range(4, 5).next().unwrap();
        assert!(input.left);
    }

    #[test]
    fn test_clear_empties() {
        let mut buffer = InputBuffer::new();
        buffer.record(1, InputState::default());
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
