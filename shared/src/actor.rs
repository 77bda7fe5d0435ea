//! Actors: the simulated entities replicated from the host to followers.

use crate::image::PixelImage;
use crate::DEFAULT_EXTENT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Open key/value metadata attached to an actor by gameplay logic.
///
/// Any JSON value may be stored locally, but only primitives survive
/// capture (see [`primitive_projection`]).
pub type DataBag = BTreeMap<String, Value>;

/// Data key that stops controller input from overwriting velocity.
pub const INPUT_LOCKED_KEY: &str = "inputLocked";

/// Behavior/rendering class of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorKind(pub u32);

impl ActorKind {
    pub const PLAYER: ActorKind = ActorKind(1);
    pub const ENEMY: ActorKind = ActorKind(2);
    /// First id handed out for game-defined kinds.
    pub const FIRST_CUSTOM: u32 = 10;
}

impl Default for ActorKind {
    fn default() -> Self {
        ActorKind::PLAYER
    }
}

/// Actor flag bitset. Unknown bits are preserved across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorFlags(u32);

bitflags::bitflags! {
    impl ActorFlags: u32 {
        /// Excluded from overlap tests.
        const GHOST = 1 << 0;
        const RELATIVE_TO_CAMERA = 1 << 1;
        /// Tombstoned once it leaves the world bounds.
        const AUTO_DESTROY = 1 << 2;
        const INVISIBLE = 1 << 3;
        /// Tombstone; removed by the next sweep.
        const DESTROYED = 1 << 4;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: u32,
    pub kind: ActorKind,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub flags: ActorFlags,
    pub image: Option<PixelImage>,
    pub data: DataBag,
}

impl Actor {
    pub fn new(id: u32, kind: ActorKind, image: Option<PixelImage>) -> Self {
        Self {
            id,
            kind,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            flags: ActorFlags::empty(),
            image,
            data: DataBag::new(),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Width and height of the current image, or the default extent when
    /// the actor has no usable image.
    pub fn extent(&self) -> (u32, u32) {
        match &self.image {
            Some(image) if image.width() > 0 && image.height() > 0 => image.dimensions(),
            _ => (DEFAULT_EXTENT, DEFAULT_EXTENT),
        }
    }

    pub fn set_flag(&mut self, flag: ActorFlags, on: bool) {
        self.flags.set(flag, on);
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(ActorFlags::DESTROYED)
    }

    /// Marks the actor as a tombstone. It stays in the world until swept.
    pub fn destroy(&mut self) {
        self.flags.insert(ActorFlags::DESTROYED);
    }

    /// Whether a renderer should draw this actor: not invisible, not
    /// tombstoned and not carrying a fully transparent image.
    pub fn is_visible(&self) -> bool {
        if self.flags.intersects(ActorFlags::INVISIBLE | ActorFlags::DESTROYED) {
            return false;
        }
        !self.image.as_ref().map_or(false, PixelImage::is_blank)
    }

    /// Participates in overlap tests.
    pub fn is_collidable(&self) -> bool {
        !self.flags.intersects(ActorFlags::DESTROYED | ActorFlags::GHOST)
    }

    /// Axis-aligned overlap; positions are actor centers.
    pub fn overlaps(&self, other: &Actor) -> bool {
        let (aw, ah) = self.extent();
        let (bw, bh) = other.extent();
        let (aw, ah, bw, bh) = (aw as f64, ah as f64, bw as f64, bh as f64);

        self.x - aw / 2.0 < other.x + bw / 2.0
            && self.x + aw / 2.0 > other.x - bw / 2.0
            && self.y - ah / 2.0 < other.y + bh / 2.0
            && self.y + ah / 2.0 > other.y - bh / 2.0
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Numeric entry, or 0 when missing or not a number.
    pub fn read_number(&self, key: &str) -> f64 {
        self.data.get(key).and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn change_number_by(&mut self, key: &str, delta: f64) {
        let current = self.read_number(key);
        self.set_data(key, current + delta);
    }

    /// String entry, or empty when missing or not a string.
    pub fn read_string(&self, key: &str) -> &str {
        self.data.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Truthiness of an entry.
    pub fn read_bool(&self, key: &str) -> bool {
        match self.data.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map_or(false, |v| v != 0.0 && !v.is_nan()),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }
}

/// Copies only the JSON-primitive entries of a data bag. Arrays and objects
/// are dropped silently.
pub fn primitive_projection(bag: &DataBag) -> DataBag {
    bag.iter()
        .filter(|(_, value)| {
            matches!(
                value,
                Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
            )
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
