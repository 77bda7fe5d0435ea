//! Participant slot management for the relay
//!
//! This module tracks who is connected and how to reach them:
//! - Lowest-free participant id allocation within the configured capacity
//! - Per-participant bounded outbound queues feeding each writer task
//! - Best-effort fan-out that never waits on a slow participant
//!
//! The table holds no game state. Dropping a participant releases its id for
//! the next connection.

use log::{debug, info};
use shared::{default_name, MAX_PARTICIPANTS};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// A connected participant and the queue its writer task drains
#[derive(Debug)]
pub struct Participant {
    /// Slot id in `1..=capacity`
    pub id: u32,
    /// Display name handed out with the assignment
    pub name: String,
    /// Remote socket address, for logging
    pub addr: SocketAddr,
    /// When the participant was admitted
    pub connected_at: Instant,
    outbound: mpsc::Sender<String>,
}

impl Participant {
    /// Creates a participant that delivers frames through `outbound`
    pub fn new(id: u32, addr: SocketAddr, outbound: mpsc::Sender<String>) -> Self {
        Self {
            id,
            name: default_name(id),
            addr,
            connected_at: Instant::now(),
            outbound,
        }
    }

    /// Queues a frame without waiting
    ///
    /// Returns false when the queue is full or the writer is gone. The frame
    /// is dropped for this participant only.
    pub fn try_deliver(&self, frame: String) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue full for participant {}, dropping frame", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Participant {} writer closed, dropping frame", self.id);
                false
            }
        }
    }
}

/// Result of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Participants whose queue accepted the frame
    pub delivered: usize,
    /// Participants that missed the frame because their queue was full or
    /// their writer had already gone
    pub dropped: usize,
}

/// All connected participants, indexed by participant id
///
/// Capacity is fixed at construction. Ids are reused: a new connection
/// always receives the lowest id not currently held by anyone.
#[derive(Debug)]
pub struct ParticipantTable {
    participants: BTreeMap<u32, Participant>,
    capacity: usize,
}

impl ParticipantTable {
    /// Creates an empty table; `capacity` is clamped to `1..=MAX_PARTICIPANTS`
    pub fn new(capacity: usize) -> Self {
        Self {
            participants: BTreeMap::new(),
            capacity: capacity.clamp(1, MAX_PARTICIPANTS),
        }
    }

    /// Number of participant slots after clamping
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the next connection would be rejected with "Server full"
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.capacity
    }

    /// Lowest id in `1..=capacity` nobody holds, if any
    pub fn lowest_free_id(&self) -> Option<u32> {
        (1..=self.capacity as u32).find(|id| !self.participants.contains_key(id))
    }

    /// Admits a new participant
    ///
    /// Returns the allocated id, or None when every slot is taken. A rejected
    /// connection leaves no trace in the table.
    pub fn add(&mut self, addr: SocketAddr, outbound: mpsc::Sender<String>) -> Option<u32> {
        let id = self.lowest_free_id()?;
        let participant = Participant::new(id, addr, outbound);
        info!("Participant {} ({}) connected from {}", id, participant.name, addr);
        self.participants.insert(id, participant);
        Some(id)
    }

    /// Releases a participant's slot. Returns false if it was already gone.
    pub fn remove(&mut self, id: u32) -> bool {
        match self.participants.remove(&id) {
            Some(participant) => {
                info!(
                    "Participant {} disconnected after {:.1}s",
                    id,
                    participant.connected_at.elapsed().as_secs_f32()
                );
                true
            }
            None => false,
        }
    }

    /// Looks up a connected participant
    ///
    /// Returns None for ids outside `1..=capacity` as well as for free slots.
    pub fn get(&self, id: u32) -> Option<&Participant> {
        self.participants.get(&id)
    }

    /// Whether `id` is currently held by a connection
    pub fn contains(&self, id: u32) -> bool {
        self.participants.contains_key(&id)
    }

    /// Connected ids in ascending order
    pub fn ids(&self) -> Vec<u32> {
        self.participants.keys().copied().collect()
    }

    /// Queues `frame` for every participant except `sender`
    ///
    /// Never blocks: a participant whose queue is full or closed simply
    /// misses this frame.
    pub fn broadcast_except(&self, sender: u32, frame: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for participant in self.participants.values().filter(|p| p.id != sender) {
            if participant.try_deliver(frame.to_string()) {
                report.delivered += 1;
            } else {
                report.dropped += 1;
            }
        }
        report
    }

    /// Number of connected participants
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether nobody is connected
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
