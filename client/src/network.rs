//! Client network driver: connects a [`Session`] to the relay

use crate::session::Session;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{Button, Message, OUTBOUND_QUEUE_SIZE};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Longest simulation step after a stall
const MAX_DT: f64 = 0.05;

/// Why a connected run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnect {
    /// The relay sent a close frame
    Closed { code: u16, reason: String },
    /// The socket ended without a close frame, or failed
    Lost,
    /// Local input source went away
    InputClosed,
}

pub struct Client {
    session: Session,
    server_url: String,
    tick_rate: u32,
    started: Instant,
}

impl Client {
    pub fn new(server_url: impl Into<String>, session: Session, tick_rate: u32) -> Self {
        Self {
            session,
            server_url: server_url.into(),
            tick_rate: tick_rate.max(1),
            started: Instant::now(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Milliseconds since this client was created
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Connects to the relay and drives the session until the connection or
    /// the local input source ends.
    ///
    /// Frames, local button edges and ticks are handled one at a time on this
    /// task. Snapshots go through a single-slot queue: when the previous one
    /// has not been written yet the new one is dropped.
    pub async fn run(
        &mut self,
        local_inputs: &mut mpsc::Receiver<(Button, bool)>,
    ) -> Result<Disconnect, Box<dyn std::error::Error>> {
        info!("Connecting to {}", self.server_url);
        let (ws, _) = connect_async(self.server_url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();

        let (input_tx, mut input_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_SIZE);
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<String>(1);

        let writer = tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    biased;
                    Some(frame) = input_rx.recv() => frame,
                    Some(frame) = snapshot_rx.recv() => frame,
                    else => break,
                };
                if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                    debug!("Failed to write to relay: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        self.session.on_connected();

        let mut ticker = interval(Duration::from_secs_f64(1.0 / self.tick_rate as f64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        let outcome = loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Err(e) = self.session.handle_frame(&text) {
                            warn!("Dropping malformed frame from relay: {}", e);
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => break closed(frame),
                    Some(Ok(WsMessage::Binary(_))) => warn!("Dropping binary frame from relay"),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Connection to relay failed: {}", e);
                        break Disconnect::Lost;
                    }
                    None => break Disconnect::Lost,
                },

                edge = local_inputs.recv() => match edge {
                    Some((button, pressed)) => {
                        if let Some(message) = self.session.local_input(button, pressed) {
                            match message.encode() {
                                Ok(frame) => {
                                    if input_tx.send(frame).await.is_err() {
                                        break Disconnect::Lost;
                                    }
                                }
                                Err(e) => error!("Failed to encode input: {}", e),
                            }
                        }
                    }
                    None => break Disconnect::InputClosed,
                },

                _ = ticker.tick() => {
                    let now = Instant::now();
                    let dt = (now - last_tick).as_secs_f64().min(MAX_DT);
                    last_tick = now;

                    let now_ms = self.elapsed_ms();
                    if let Some(message) = self.session.tick(now_ms, dt) {
                        match message.encode() {
                            Ok(frame) => {
                                if snapshot_tx.try_send(frame).is_err() {
                                    debug!("Previous snapshot still queued, skipping this one");
                                }
                            }
                            Err(e) => error!("Failed to encode snapshot: {}", e),
                        }
                    }
                },
            }
        };

        self.session.on_disconnected();
        drop(input_tx);
        drop(snapshot_tx);
        let _ = tokio::time::timeout(Duration::from_secs(1), writer).await;

        match &outcome {
            Disconnect::Closed { code, reason } => info!("Relay closed connection: {} {}", code, reason),
            Disconnect::Lost => warn!("Connection to relay lost"),
            Disconnect::InputClosed => info!("Local input closed, leaving"),
        }
        Ok(outcome)
    }

    /// Drives the session without a relay until the local input source ends.
    pub async fn run_standalone(&mut self, local_inputs: &mut mpsc::Receiver<(Button, bool)>) {
        info!("Running standalone");
        let mut ticker = interval(Duration::from_secs_f64(1.0 / self.tick_rate as f64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                edge = local_inputs.recv() => match edge {
                    Some((button, pressed)) => {
                        let _ = self.session.local_input(button, pressed);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let dt = (now - last_tick).as_secs_f64().min(MAX_DT);
                    last_tick = now;
                    let now_ms = self.elapsed_ms();
                    let _ = self.session.tick(now_ms, dt);
                },
            }
        }
    }
}

fn closed(frame: Option<CloseFrame<'_>>) -> Disconnect {
    match frame {
        Some(frame) => Disconnect::Closed {
            code: u16::from(frame.code),
            reason: frame.reason.into_owned(),
        },
        None => Disconnect::Closed {
            code: 1005,
            reason: String::new(),
        },
    }
}
