//! # Relay Library
//!
//! This library provides the connection broker that sits between the
//! participants of a replicated world. It has no simulation of its own: it
//! hands out participant ids, forwards frames, and enforces the one piece of
//! authority the protocol has, which is that only participant 1 may publish
//! world state.
//!
//! ## Core Responsibilities
//!
//! ### Admission
//! Every WebSocket connection gets the lowest free participant id in
//! `1..=max_participants` and is told so with an `assign` message right after
//! the handshake. When every slot is taken the handshake still completes,
//! then the connection is closed with code 1013 and reason "Server full".
//! A rejected connection allocates nothing.
//!
//! ### Routing
//! Each text frame is decoded into a [`shared::Message`]. Input messages are
//! stamped with the sender's id and forwarded to every other participant.
//! State messages are forwarded only when they come from participant 1.
//! Everything else is logged and dropped; the connection stays open.
//!
//! ### Release
//! A closed or failed socket releases its id immediately, so the next
//! connection can reuse it. The relay keeps nothing once a participant is gone.
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! Each connection runs a reader task that routes frames and a writer task
//! that drains a bounded outbound queue. The shared connection table sits
//! behind an `RwLock` and only serialises admission, release and fan-out.
//!
//! ### Best-Effort Fan-Out
//! Forwarding never awaits a participant. A participant whose queue is full
//! misses that frame; the others are unaffected. Snapshots are full state, so
//! a missed one is superseded by the next.
//!
//! ## Module Organization
//!
//! ### Participants Module (`participants`)
//! - Lowest-free id allocation and capacity enforcement
//! - Per-participant outbound queues
//! - Non-blocking broadcast to everyone but the sender
//!
//! ### Router Module (`router`)
//! - Pure routing decision for one frame
//! - Sender stamping and the host-only rule for state
//!
//! ### Network Module (`network`)
//! - TCP accept loop and WebSocket handshake
//! - Per-connection reader and writer tasks
//! - Capacity rejection with close code 1013
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use relay::{Relay, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = Relay::bind(RelayConfig {
//!         host: "127.0.0.1".to_string(),
//!         port: 8080,
//!         max_participants: 4,
//!     })
//!     .await?;
//!
//!     relay.run().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod participants;
pub mod router;

pub use network::{Relay, RelayConfig};
pub use participants::{BroadcastReport, ParticipantTable};
pub use router::{route, RouteError};
