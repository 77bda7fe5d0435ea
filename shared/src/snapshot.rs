//! Full-state world snapshots sent from the host to followers.

use crate::actor::{ActorFlags, ActorKind, DataBag};
use crate::protocol::ProtocolError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete statement of every live actor at capture time.
///
/// An id missing from `actors` means that actor no longer exists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    /// Host session clock when this snapshot was captured.
    pub capture_time_ms: u64,
    /// Authoritative world time.
    pub simulation_runtime_ms: u64,
    pub background_index: u8,
    /// Monotonic per host session. Absent on older senders.
    #[serde(default)]
    pub sequence: u64,
    pub actors: Vec<ActorRecord>,
}

/// Per-actor state inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub id: u32,
    pub kind: ActorKind,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub width: u32,
    pub height: u32,
    pub flags: ActorFlags,
    #[serde(default)]
    pub data: DataBag,
    /// Flat row-major palette indices; present only for actors with an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixels: Option<Vec<i64>>,
}

impl WorldSnapshot {
    pub fn actor_ids(&self) -> HashSet<u32> {
        self.actors.iter().map(|record| record.id).collect()
    }

    pub fn find(&self, id: u32) -> Option<&ActorRecord> {
        self.actors.iter().find(|record| record.id == id)
    }

    /// Rough wire cost: a fixed overhead per actor plus one unit per pixel.
    pub fn approx_bytes(&self) -> usize {
        self.actors
            .iter()
            .map(|record| 32 + record.pixels.as_ref().map_or(0, Vec::len))
            .sum()
    }

    /// Serializes for debug save files.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: u32) -> ActorRecord {
        ActorRecord {
            id,
            kind: ActorKind::PLAYER,
            x: 10.0,
            y: 10.0,
            vx: 0.0,
            vy: 0.0,
            width: 2,
            height: 2,
            flags: ActorFlags::empty(),
            data: DataBag::new(),
            pixels: None,
        }
    }

    #[test]
    fn test_wire_field_names() {
        let snapshot = WorldSnapshot {
            capture_time_ms: 5,
            simulation_runtime_ms: 7,
            background_index: 3,
            sequence: 1,
            actors: vec![record(1)],
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["captureTimeMs"], json!(5));
        assert_eq!(value["simulationRuntimeMs"], json!(7));
        assert_eq!(value["backgroundIndex"], json!(3));
        assert_eq!(value["actors"][0]["kind"], json!(1));
        assert!(value["actors"][0].get("pixels").is_none());
    }

    #[test]
    fn test_sequence_defaults_when_absent() {
        let json = r#"{"captureTimeMs":1,"simulationRuntimeMs":2,"backgroundIndex":0,"actors":[]}"#;
        let snapshot: WorldSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.sequence, 0);
        assert!(snapshot.actors.is_empty());
    }

    #[test]
    fn test_actor_ids_and_find() {
        let snapshot = WorldSnapshot {
            actors: vec![record(4), record(9)],
            ..Default::default()
        };
        let ids = snapshot.actor_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&4) && ids.contains(&9));
        assert_eq!(snapshot.find(9).map(|r| r.id), Some(9));
        assert!(snapshot.find(5).is_none());
    }

    #[test]
    fn test_approx_bytes_counts_pixels() {
        let mut with_pixels = record(2);
        with_pixels.pixels = Some(vec![0; 16]);
        let snapshot = WorldSnapshot {
            actors: vec![record(1), with_pixels],
            ..Default::default()
        };
        assert_eq!(snapshot.approx_bytes(), 32 + 32 + 16);
    }

    #[test]
    fn test_debug_save_load() {
        let mut actor = record(3);
        actor.data.insert("hp".into(), json!(4));
        let snapshot = WorldSnapshot {
            simulation_runtime_ms: 1200,
            actors: vec![actor],
            ..Default::default()
        };

        let saved = snapshot.to_json().unwrap();
        let loaded = WorldSnapshot::from_json(&saved).unwrap();
        assert_eq!(loaded, snapshot);
    }
}
