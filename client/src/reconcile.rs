//! Follower-side reconciliation of the local world against host snapshots.
//!
//! A snapshot is a full statement of the host's world, so applying one is a
//! field-for-field overwrite: applying the same snapshot twice leaves the
//! world exactly as applying it once.

use log::debug;
use shared::world::is_usable_dimension;
use shared::{Actor, ActorRecord, PixelImage, World, WorldSnapshot};
use std::time::{Duration, Instant};

/// Length of one apply-cost statistics window.
const STATS_WINDOW: Duration = Duration::from_secs(2);

/// Whether out-of-order snapshots are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StalePolicy {
    /// Apply every snapshot in arrival order.
    #[default]
    AcceptAll,
    /// Skip snapshots whose sequence is not newer than the last applied one.
    /// Sequence 0 marks an unsequenced sender and is always applied.
    RejectOlder,
}

/// What one snapshot did to the local world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Overwrites `world` with the content of `snapshot`.
///
/// Actors missing locally are materialized under the snapshot's id; actors
/// missing from the snapshot are removed outright.
pub fn apply_snapshot(world: &mut World, snapshot: &WorldSnapshot) -> ApplyReport {
    let present = snapshot.actor_ids();
    let mut report = ApplyReport::default();

    for record in &snapshot.actors {
        let existed = world.contains(record.id);
        let actor = world.ensure_actor(record.id, record.kind, record.width, record.height);
        apply_record(actor, record);
        if existed {
            report.updated += 1;
        } else {
            report.created += 1;
        }
    }

    report.removed = world.retain_ids(|id| present.contains(&id)).len();
    world.runtime_ms = snapshot.simulation_runtime_ms;
    world.background_index = snapshot.background_index;
    report
}

fn apply_record(actor: &mut Actor, record: &ActorRecord) {
    actor.kind = record.kind;
    actor.x = record.x;
    actor.y = record.y;
    actor.vx = record.vx;
    actor.vy = record.vy;
    actor.flags = record.flags;
    actor.data = record.data.clone();

    let Some(pixels) = &record.pixels else {
        return;
    };
    if !is_usable_dimension(record.width) || !is_usable_dimension(record.height) {
        debug!(
            "Ignoring pixels for actor {}: unusable extent {}x{}",
            record.id, record.width, record.height
        );
        return;
    }
    match &mut actor.image {
        Some(image) if image.dimensions() == (record.width, record.height) => {
            image.overwrite_from_indices(pixels);
        }
        _ => {
            actor.image = Some(PixelImage::from_indices(record.width, record.height, pixels));
        }
    }
}

/// Applies snapshots under a [`StalePolicy`] and keeps apply statistics.
#[derive(Debug)]
pub struct Reconciler {
    policy: StalePolicy,
    last_sequence: Option<u64>,
    applied: u64,
    skipped: u64,
    last_runtime_ms: Option<u64>,
    window_start: Option<Instant>,
    window_applies: u32,
    window_cost: Duration,
}

impl Reconciler {
    /// Creates a reconciler that has applied nothing yet
    ///
    /// With [`StalePolicy::RejectOlder`] the first sequenced snapshot is
    /// always applied; later ones must carry a higher sequence number.
    pub fn new(policy: StalePolicy) -> Self {
        Self {
            policy,
            last_sequence: None,
            applied: 0,
            skipped: 0,
            last_runtime_ms: None,
            window_start: None,
            window_applies: 0,
            window_cost: Duration::ZERO,
        }
    }

    /// The stale-snapshot policy this reconciler was built with.
    pub fn policy(&self) -> StalePolicy {
        self.policy
    }

    /// Applies `snapshot` unless the policy rejects it.
    pub fn apply(&mut self, world: &mut World, snapshot: &WorldSnapshot) -> Option<ApplyReport> {
        if self.is_stale(snapshot.sequence) {
            self.skipped += 1;
            debug!(
                "Skipping stale snapshot {} (last applied {:?})",
                snapshot.sequence, self.last_sequence
            );
            return None;
        }

        let started = Instant::now();
        let report = apply_snapshot(world, snapshot);
        self.record_apply(snapshot, started.elapsed());

        if snapshot.sequence != 0 {
            self.last_sequence = Some(snapshot.sequence);
        }
        Some(report)
    }

    /// Forgets the last applied sequence, e.g. after a reconnect to a new host.
    ///
    /// The next snapshot is applied whatever its sequence number. Counters
    /// are kept.
    pub fn reset(&mut self) {
        self.last_sequence = None;
        self.last_runtime_ms = None;
    }

    /// Snapshots applied since this reconciler was created.
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    /// Snapshots rejected as stale. Always 0 under
    /// [`StalePolicy::AcceptAll`].
    pub fn skipped_count(&self) -> u64 {
        self.skipped
    }

    fn is_stale(&self, sequence: u64) -> bool {
        match (self.policy, self.last_sequence) {
            (StalePolicy::RejectOlder, Some(last)) => sequence != 0 && sequence <= last,
            _ => false,
        }
    }

    fn record_apply(&mut self, snapshot: &WorldSnapshot, cost: Duration) {
        self.applied += 1;
        let runtime_ms = snapshot.simulation_runtime_ms;
        let dt = self
            .last_runtime_ms
            .map_or(0, |last| runtime_ms.saturating_sub(last));
        self.last_runtime_ms = Some(runtime_ms);

        if self.applied <= 10 || self.applied % 60 == 0 {
            debug!(
                "Applied snapshot #{} actors={} dtMs={} background={}",
                self.applied,
                snapshot.actors.len(),
                dt,
                snapshot.background_index
            );
        }

        self.window_applies += 1;
        self.window_cost += cost;
        let start = *self.window_start.get_or_insert_with(Instant::now);
        if start.elapsed() >= STATS_WINDOW {
            let avg_ms = self.window_cost.as_secs_f64() * 1000.0 / self.window_applies as f64;
            debug!(
                "Apply cost: avg {:.3}ms over {} snapshots, {} actors",
                avg_ms,
                self.window_applies,
                snapshot.actors.len()
            );
            self.window_start = Some(Instant::now());
            self.window_applies = 0;
            self.window_cost = Duration::ZERO;
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(StalePolicy::default())
    }
}
