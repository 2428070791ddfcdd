//! Snapshot handoff between the receive path and the tick loop.
//!
//! Snapshots arrive on whatever thread runs the network receive; the
//! tick loop drains them at one well-defined point between ticks, so
//! reconciliation is atomic relative to tick advance without sharing
//! any simulation state across threads.

use std::sync::mpsc::{self, Receiver, Sender};

use skyball_wire::SnapshotProto;

/// Producer half; clone one per receive path.
#[derive(Debug, Clone)]
pub struct SnapshotSender {
    tx: Sender<SnapshotProto>,
}

impl SnapshotSender {
    /// Queue a snapshot for the next drain. Returns `false` when the
    /// consuming engine is gone, which the receive path treats as
    /// session teardown.
    pub fn push(&self, snapshot: SnapshotProto) -> bool {
        self.tx.send(snapshot).is_ok()
    }
}

/// Consumer half, owned by the prediction engine.
#[derive(Debug)]
pub struct SnapshotQueue {
    rx: Receiver<SnapshotProto>,
}

impl SnapshotQueue {
    /// Take everything queued so far without blocking.
    pub fn drain(&mut self) -> Vec<SnapshotProto> {
        self.rx.try_iter().collect()
    }
}

pub fn snapshot_channel() -> (SnapshotSender, SnapshotQueue) {
    let (tx, rx) = mpsc::channel();
    (SnapshotSender { tx }, SnapshotQueue { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_in_arrival_order() {
        let (tx, mut rx) = snapshot_channel();
        for tick in 0..3u64 {
            assert!(tx.push(SnapshotProto {
                tick: Some(tick),
                ..SnapshotProto::default()
            }));
        }
        let drained = rx.drain();
        let ticks: Vec<_> = drained.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![Some(0), Some(1), Some(2)]);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_push_fails_after_queue_dropped() {
        let (tx, rx) = snapshot_channel();
        drop(rx);
        assert!(!tx.push(SnapshotProto::default()));
    }
}
