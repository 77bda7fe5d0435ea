//! Relay network layer handling WebSocket connections and frame fan-out

use crate::participants::ParticipantTable;
use crate::router::{route, RouteError};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{Message, DEFAULT_PORT, MAX_PARTICIPANTS, OUTBOUND_QUEUE_SIZE, RELAY_FULL_REASON};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{accept_async, WebSocketStream};

/// How long a rejected connection gets to acknowledge the close frame
const REJECT_LINGER: Duration = Duration::from_secs(1);

/// Listen address and capacity for a relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Clamped to `1..=MAX_PARTICIPANTS`
    pub max_participants: usize,
}

impl RelayConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_participants: MAX_PARTICIPANTS,
        }
    }
}

/// Connection broker forwarding frames between participants
///
/// One task per connection reads frames and routes them; a second task per
/// connection drains that participant's outbound queue into its socket.
pub struct Relay {
    listener: TcpListener,
    participants: Arc<RwLock<ParticipantTable>>,
}

impl Relay {
    pub async fn bind(config: RelayConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(config.address()).await?;
        let table = ParticipantTable::new(config.max_participants);
        info!(
            "Relay listening on {} ({} participant slots)",
            listener.local_addr()?,
            table.capacity()
        );

        Ok(Relay {
            listener,
            participants: Arc::new(RwLock::new(table)),
        })
    }

    /// Bound address, useful when binding port 0
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle on the connection table
    pub fn participants(&self) -> Arc<RwLock<ParticipantTable>> {
        Arc::clone(&self.participants)
    }

    /// Accept loop; runs until the task is dropped
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Relay started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let participants = Arc::clone(&self.participants);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, participants).await {
                            debug!("Connection from {} ended with error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

/// Drives one connection from handshake to release of its participant slot
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    participants: Arc<RwLock<ParticipantTable>>,
) -> Result<(), WsError> {
    let mut ws = accept_async(stream).await?;

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_SIZE);
    let admitted = {
        let mut table = participants.write().await;
        table.add(addr, outbound_tx)
    };

    let Some(id) = admitted else {
        warn!("Rejecting connection from {}: all participant slots taken", addr);
        return reject_full(ws).await;
    };

    match Message::assign(id).encode() {
        Ok(frame) => {
            if let Err(e) = ws.send(WsMessage::Text(frame)).await {
                participants.write().await.remove(id);
                return Err(e);
            }
        }
        Err(e) => error!("Failed to encode assignment for participant {}: {}", id, e),
    }

    let (mut sink, mut stream) = ws.split();

    // Ends when the table drops this participant's sender
    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                debug!("Failed to write to participant {}: {}", id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(WsMessage::Text(frame)) => relay_frame(&participants, id, &frame).await,
            Ok(WsMessage::Binary(data)) => {
                warn!("Dropping {}-byte binary frame from participant {}", data.len(), id);
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Socket error from participant {}: {}", id, e);
                break;
            }
        }
    }

    participants.write().await.remove(id);
    Ok(())
}

/// Routes one text frame and fans the result out to everyone else
async fn relay_frame(participants: &RwLock<ParticipantTable>, sender: u32, frame: &str) {
    match route(sender, frame) {
        Ok(routed) => {
            let report = participants.read().await.broadcast_except(sender, &routed);
            if report.dropped > 0 {
                debug!(
                    "Frame from participant {}: {} delivered, {} dropped",
                    sender, report.delivered, report.dropped
                );
            }
        }
        Err(RouteError::NotHost { sender }) => {
            warn!("Ignoring state from participant {}: only the host may send state", sender);
        }
        Err(e) => warn!("Dropping frame from participant {}: {}", sender, e),
    }
}

/// Closes a connection the relay has no slot for with 1013 "Server full"
async fn reject_full(mut ws: WebSocketStream<TcpStream>) -> Result<(), WsError> {
    ws.close(Some(CloseFrame {
        code: CloseCode::Again,
        reason: RELAY_FULL_REASON.into(),
    }))
    .await?;

    // Wait for the peer's close acknowledgement so the frame is not lost
    let _ = tokio::time::timeout(REJECT_LINGER, async {
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_participants, MAX_PARTICIPANTS);
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let relay = Relay::bind(RelayConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_participants: 2,
        })
        .await
        .unwrap();

        assert_ne!(relay.local_addr().unwrap().port(), 0);
        assert_eq!(relay.participants().read().await.capacity(), 2);
    }

    #[tokio::test]
    async fn test_relay_frame_fans_out_to_others() {
        let table = RwLock::new(ParticipantTable::new(4));
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        {
            let mut guard = table.write().await;
            guard.add(SocketAddr::from(([127, 0, 0, 1], 1)), tx1);
            guard.add(SocketAddr::from(([127, 0, 0, 1], 2)), tx2);
        }

        relay_frame(&table, 2, r#"{"type":"input","button":"up","pressed":true}"#).await;

        let forwarded = rx1.try_recv().unwrap();
        assert_eq!(Message::decode(&forwarded).unwrap().sender(), Some(2));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_relay_frame_drops_non_host_state() {
        let table = RwLock::new(ParticipantTable::new(4));
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, _rx2) = mpsc::channel(4);
        {
            let mut guard = table.write().await;
            guard.add(SocketAddr::from(([127, 0, 0, 1], 1)), tx1);
            guard.add(SocketAddr::from(([127, 0, 0, 1], 2)), tx2);
        }

        let frame = Message::state(1, shared::WorldSnapshot::default())
            .encode()
            .unwrap();
        relay_frame(&table, 2, &frame).await;

        assert!(rx1.try_recv().is_err());
    }
}
