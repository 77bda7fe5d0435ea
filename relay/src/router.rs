//! Frame routing rules for the relay.
//!
//! Routing is a pure function of the sender's participant id and the raw
//! frame, so it is tested without sockets. The relay never interprets game
//! content beyond these rules.

use shared::{Message, ProtocolError, HOST_PARTICIPANT_ID};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] ProtocolError),
    #[error("participant {sender} sent state but is not the host")]
    NotHost { sender: u32 },
    #[error("participant {sender} sent an unexpected `{tag}` message")]
    UnexpectedTag { sender: u32, tag: &'static str },
}

/// Decides what to forward for a text frame received from `sender`.
///
/// On success the returned frame goes to every participant except `sender`.
/// The sender field is always overwritten with the connection's own id, so
/// a client can neither omit nor spoof it.
pub fn route(sender: u32, frame: &str) -> Result<String, RouteError> {
    let mut message = Message::decode(frame)?;
    match message {
        Message::Input { .. } => {}
        Message::State { .. } if sender == HOST_PARTICIPANT_ID => {}
        Message::State { .. } => return Err(RouteError::NotHost { sender }),
        Message::Assign { .. } => {
            return Err(RouteError::UnexpectedTag {
                sender,
                tag: message.tag(),
            })
        }
    }
    message.stamp_sender(sender);
    Ok(message.encode()?)
}
