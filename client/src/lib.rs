//! # Participant Library
//!
//! This library provides everything a participant needs to take part in a
//! replicated world: deciding whether it is the host, routing button input,
//! capturing snapshots as host, and mirroring the host's snapshots as a
//! follower.
//!
//! ## Architecture Overview
//!
//! One participant is authoritative. Everyone else is a thin mirror of it:
//!
//! ### Host
//! The host runs the gameplay [`session::Simulation`] against its own
//! [`shared::World`]. Button input from other participants arrives as `input`
//! messages and lands in the per-participant controllers. At most every 16ms
//! the host captures the complete world into a snapshot and sends it.
//!
//! ### Follower
//! A follower never simulates. Its local buttons are sent to the host, and
//! every snapshot it receives overwrites its world: unknown actors are
//! created under the host's ids, missing ones are removed, the rest are
//! overwritten field by field.
//!
//! ### Standalone
//! Until the relay assigns an id, a participant behaves as its own host and
//! applies its buttons locally.
//!
//! ## Module Organization
//!
//! ### Role Module (`role`)
//! Host/follower decision from the assigned participant id and the local
//! force-host flag.
//!
//! ### Capture Module (`capture`)
//! - Full-world snapshot capture
//! - Send cadence and sequence numbering
//! - Rate and bandwidth statistics
//!
//! ### Reconcile Module (`reconcile`)
//! - Snapshot application with creation and removal of actors
//! - Optional rejection of out-of-order snapshots
//! - Apply-cost statistics
//!
//! ### Session Module (`session`)
//! The per-participant state machine tying the above together. It is driven
//! by relay frames, local button edges and ticks, and returns the messages
//! to send instead of touching the network itself.
//!
//! ### Network Module (`network`)
//! WebSocket driver that feeds a session from the relay and a tick interval
//! on a single task.
//!
//! ### Input Module (`input`)
//! Button edges from line commands on stdin.
//!
//! ### Demo Module (`demo`)
//! A small game used by the binary to exercise replication.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use client::session::{Session, SessionConfig};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::passive(SessionConfig::default());
//!     let mut client = Client::new("ws://127.0.0.1:8080", session, 60);
//!
//!     let (_edges_tx, mut edges_rx) = mpsc::channel(16);
//!     let outcome = client.run(&mut edges_rx).await?;
//!     println!("Disconnected: {:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod demo;
pub mod input;
pub mod network;
pub mod reconcile;
pub mod role;
pub mod session;
