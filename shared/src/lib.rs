//! # Shared World Model and Wire Protocol
//!
//! Types used on both sides of the relay: the actor model each participant
//! keeps locally, the full-state snapshot the host emits, and the JSON messages
//! the relay forwards between participants.
//!
//! ## Module Organization
//!
//! ### Actor Module (`actor`)
//! The replicated entity and its metadata:
//! - Kind tags and the flag bitset (ghost, invisible, tombstone...)
//! - Free-form data bag with typed accessors
//! - Overlap and visibility rules
//!
//! ### Image Module (`image`)
//! Palette-indexed pixel grids carried by actors. Out-of-range palette
//! indices are clamped to transparent on every write path.
//!
//! ### World Module (`world`)
//! The actor set itself. Hosts advance it with [`World::step`]; followers
//! only ever overwrite it from snapshots.
//!
//! ### Controller Module (`controller`)
//! One button state per participant slot. The host feeds received `input`
//! messages in here and optionally lets a controller steer an actor.
//!
//! ### Snapshot Module (`snapshot`)
//! [`WorldSnapshot`] is a complete statement of every live actor. An id
//! missing from a snapshot means the actor is gone.
//!
//! ### Protocol Module (`protocol`)
//! The closed set of relay messages (`assign`, `input`, `state`) and the
//! frame codec. Anything that does not decode into [`Message`] is rejected
//! before a single field is looked at.
//!
//! ## Participants and Authority
//!
//! At most [`MAX_PARTICIPANTS`] participants share a relay. The one holding
//! [`HOST_PARTICIPANT_ID`] runs the simulation; every other participant
//! mirrors the host through snapshots and only contributes button edges.

pub mod actor;
pub mod controller;
pub mod image;
pub mod protocol;
pub mod snapshot;
pub mod world;

pub use actor::{primitive_projection, Actor, ActorFlags, ActorKind, DataBag, INPUT_LOCKED_KEY};
pub use controller::{Controller, Controllers};
pub use image::PixelImage;
pub use protocol::{default_name, Button, Message, ProtocolError};
pub use snapshot::{ActorRecord, WorldSnapshot};
pub use world::World;

/// Relay capacity; participant ids run from 1 to this value.
pub const MAX_PARTICIPANTS: usize = 4;
/// The only participant whose `state` messages the relay forwards.
pub const HOST_PARTICIPANT_ID: u32 = 1;
pub const DEFAULT_PORT: u16 = 8080;

/// Minimum spacing between two snapshot sends.
pub const SNAPSHOT_INTERVAL_MS: u64 = 16;
/// Per-participant outbound frame queue on the relay.
pub const OUTBOUND_QUEUE_SIZE: usize = 64;

/// WebSocket close reason sent when every participant slot is taken.
pub const RELAY_FULL_REASON: &str = "Server full";

pub const MAX_PALETTE_INDEX: u8 = 15;
/// Extent reported by actors without a usable image.
pub const DEFAULT_EXTENT: u32 = 16;
/// Largest image width or height a follower will allocate from a snapshot.
pub const MAX_IMAGE_DIMENSION: u32 = 1024;
pub const SCREEN_WIDTH: f64 = 320.0;
pub const SCREEN_HEIGHT: f64 = 240.0;
