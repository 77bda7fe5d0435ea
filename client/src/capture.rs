//! Host-side snapshot capture and send cadence.

use log::debug;
use shared::{primitive_projection, Actor, ActorRecord, World, WorldSnapshot, SNAPSHOT_INTERVAL_MS};

/// Length of one cadence statistics window.
const STATS_WINDOW_MS: u64 = 2000;

/// Serializes every actor in `world`, tombstones included, in id order.
///
/// Capture never fails and does not touch the world.
pub fn capture(world: &World, capture_time_ms: u64, sequence: u64) -> WorldSnapshot {
    WorldSnapshot {
        capture_time_ms,
        simulation_runtime_ms: world.runtime_ms,
        background_index: world.background_index,
        sequence,
        actors: world.actors().map(record_for).collect(),
    }
}

/// Wire record for a single actor. Only JSON primitives from the data bag
/// are kept; pixels are included only when the actor has an image.
///
/// Non-finite positions and velocities are sent as 0: JSON has no NaN or
/// infinity, and one such value would make the whole snapshot undecodable.
pub fn record_for(actor: &Actor) -> ActorRecord {
    let (width, height) = actor.extent();
    ActorRecord {
        id: actor.id,
        kind: actor.kind,
        x: finite_or_zero(actor.x),
        y: finite_or_zero(actor.y),
        vx: finite_or_zero(actor.vx),
        vy: finite_or_zero(actor.vy),
        width,
        height,
        flags: actor.flags,
        data: primitive_projection(&actor.data),
        pixels: actor.image.as_ref().map(|image| image.to_indices()),
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Send rate and approximate bandwidth over one stats window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CadenceStats {
    pub snapshots_per_sec: f64,
    pub kbytes_per_sec: f64,
    pub latest_actors: usize,
}

/// Decides when the host sends the next snapshot and numbers them.
#[derive(Debug, Clone)]
pub struct SnapshotScheduler {
    interval_ms: u64,
    last_sent_ms: Option<u64>,
    next_sequence: u64,
    sent: u64,
    window_start_ms: Option<u64>,
    window_snapshots: u64,
    window_bytes: usize,
}

impl SnapshotScheduler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: None,
            next_sequence: 1,
            sent: 0,
            window_start_ms: None,
            window_snapshots: 0,
            window_bytes: 0,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// True when nothing has been sent yet or the interval has elapsed.
    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_sent_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }

    /// Captures the world if a send is due and books it as sent.
    pub fn poll(&mut self, world: &World, now_ms: u64) -> Option<WorldSnapshot> {
        if !self.is_due(now_ms) {
            return None;
        }
        let snapshot = capture(world, now_ms, self.next_sequence);
        self.record_sent(now_ms, &snapshot);
        Some(snapshot)
    }

    /// Books a snapshot as sent. Returns stats when a window closes.
    pub fn record_sent(&mut self, now_ms: u64, snapshot: &WorldSnapshot) -> Option<CadenceStats> {
        let since_last = self.last_sent_ms.map(|last| now_ms.saturating_sub(last));
        self.last_sent_ms = Some(now_ms);
        self.next_sequence = self.next_sequence.max(snapshot.sequence) + 1;
        self.sent += 1;

        if self.sent <= 10 || self.sent % 60 == 0 {
            debug!(
                "Snapshot #{} actors={} dtMs={}",
                self.sent,
                snapshot.actors.len(),
                since_last.unwrap_or(0)
            );
        }

        self.window_snapshots += 1;
        self.window_bytes += snapshot.approx_bytes();

        let start = *self.window_start_ms.get_or_insert(now_ms);
        let elapsed = now_ms.saturating_sub(start);
        if elapsed < STATS_WINDOW_MS {
            return None;
        }

        let seconds = elapsed.max(1) as f64 / 1000.0;
        let stats = CadenceStats {
            snapshots_per_sec: self.window_snapshots as f64 / seconds,
            kbytes_per_sec: self.window_bytes as f64 / seconds / 1024.0,
            latest_actors: snapshot.actors.len(),
        };
        debug!(
            "Snapshot cadence: {:.1}/s, {:.2} KB/s, {} actors",
            stats.snapshots_per_sec, stats.kbytes_per_sec, stats.latest_actors
        );

        self.window_start_ms = Some(now_ms);
        self.window_snapshots = 0;
        self.window_bytes = 0;
        Some(stats)
    }

    /// Snapshots sent so far.
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    /// Sequence number of the most recent snapshot, 0 before the first.
    pub fn last_sequence(&self) -> u64 {
        self.next_sequence - 1
    }
}

impl Default for SnapshotScheduler {
    fn default() -> Self {
        Self::new(SNAPSHOT_INTERVAL_MS)
    }
}
