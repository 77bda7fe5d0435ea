//! Wire messages exchanged through the relay.
//!
//! Every frame is one JSON object, internally tagged by `"type"`:
//!
//! | tag      | direction              | fields                                  |
//! |----------|------------------------|-----------------------------------------|
//! | `assign` | relay → client         | `participantId`, `name`                 |
//! | `input`  | client → relay → others| `sender` (relay-stamped), `button`, `pressed` |
//! | `state`  | host → relay → others  | `sender` (must be 1), `snapshot`        |
//!
//! Decoding is the only validation step: a frame that does not match one of
//! these shapes exactly is rejected before any field is trusted.

use crate::snapshot::WorldSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    EmptyFrame,
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Controller buttons carried by `input` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "right")]
    Right,
    #[serde(rename = "up")]
    Up,
    #[serde(rename = "down")]
    Down,
    A,
    B,
}

impl Button {
    pub const ALL: [Button; 6] = [
        Button::Left,
        Button::Right,
        Button::Up,
        Button::Down,
        Button::A,
        Button::B,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Button::Left => "left",
            Button::Right => "right",
            Button::Up => "up",
            Button::Down => "down",
            Button::A => "A",
            Button::B => "B",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Assign {
        #[serde(rename = "participantId")]
        participant_id: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Input {
        /// Overwritten by the relay; clients may omit it.
        #[serde(default)]
        sender: u32,
        button: Button,
        pressed: bool,
    },
    State {
        #[serde(default)]
        sender: u32,
        snapshot: WorldSnapshot,
    },
}

impl Message {
    pub fn assign(participant_id: u32) -> Self {
        Message::Assign {
            participant_id,
            name: Some(default_name(participant_id)),
        }
    }

    pub fn input(button: Button, pressed: bool) -> Self {
        Message::Input {
            sender: 0,
            button,
            pressed,
        }
    }

    pub fn state(sender: u32, snapshot: WorldSnapshot) -> Self {
        Message::State { sender, snapshot }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Message::Assign { .. } => "assign",
            Message::Input { .. } => "input",
            Message::State { .. } => "state",
        }
    }

    pub fn sender(&self) -> Option<u32> {
        match self {
            Message::Assign { .. } => None,
            Message::Input { sender, .. } | Message::State { sender, .. } => Some(*sender),
        }
    }

    /// Overwrites the sender of `input`/`state` messages. No-op for `assign`.
    pub fn stamp_sender(&mut self, id: u32) {
        match self {
            Message::Assign { .. } => {}
            Message::Input { sender, .. } | Message::State { sender, .. } => *sender = id,
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        if frame.trim().is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        Ok(serde_json::from_str(frame)?)
    }
}

/// Display name handed out with an assignment.
pub fn default_name(participant_id: u32) -> String {
    format!("Player{}", participant_id)
}
