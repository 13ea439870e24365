//! Server network layer handling WebSocket connections and the event loop
//!
//! Every connection gets its own task pair: a reader that decodes inbound
//! frames and forwards them as `ServerEvent`s, and a writer that drains the
//! connection's outbound queue into the socket. Timer firings arrive on the
//! same event queue, so the single loop in `Server::run` is the only place
//! `RaceState` is ever mutated.

use crate::broadcast::{send_message, Broadcaster, Outbound};
use crate::config::RaceConfig;
use crate::error::RaceError;
use crate::game::{Effect, RaceState, TimerId};
use crate::timers::TimerService;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerMessage};
use std::error::Error;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub type ServerResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Everything the event loop reacts to, in arrival order
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        conn_id: String,
        outbound: Outbound,
    },
    Frame {
        conn_id: String,
        message: ClientMessage,
    },
    Disconnected {
        conn_id: String,
    },
    TimerFired {
        timer: TimerId,
    },
}

/// Main server owning the listener and the authoritative race state
pub struct Server {
    listener: TcpListener,
    race: RaceState,
    broadcaster: Broadcaster,
    timers: TimerService,
    next_conn_id: u64,

    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn bind(addr: &str, config: RaceConfig) -> ServerResult<Self> {
        Self::with_race(addr, RaceState::new(config)).await
    }

    /// Binds a server around an existing race, e.g. one with a fixed AI interval
    pub async fn with_race(addr: &str, race: RaceState) -> ServerResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            race,
            broadcaster: Broadcaster::new(),
            timers: TimerService::new(event_tx.clone()),
            next_conn_id: 1,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn race(&self) -> &RaceState {
        &self.race
    }

    /// Number of connections currently receiving broadcasts
    pub fn connected(&self) -> usize {
        self.broadcaster.len()
    }

    /// Accepts connections and processes events until the queue closes
    pub async fn run(&mut self) -> ServerResult<()> {
        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let conn_id = format!("conn-{}", self.next_conn_id);
                            self.next_conn_id += 1;
                            debug!("TCP connection {} from {}", conn_id, peer);
                            spawn_connection(stream, conn_id, self.event_tx.clone());
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                },

                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Event queue closed, server shutting down");
                            break;
                        }
                    }
                },
            }
        }

        Ok(())
    }

    /// Applies one event to the race and executes the resulting effects
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected { conn_id, outbound } => match self.race.accept(&conn_id) {
                Ok(()) => {
                    info!("Player {} joined ({} on roster)", conn_id, self.race.roster_len());
                    self.broadcaster.register(conn_id, outbound);
                }
                Err(RaceError::RosterFull) => {
                    info!("Rejecting {}: roster full", conn_id);
                    send_message(&outbound, &ServerMessage::GameFull);
                }
                Err(e) => {
                    warn!("Failed to admit {}: {}", conn_id, e);
                }
            },

            ServerEvent::Frame { conn_id, message } => {
                if let Err(e) = self.race.handle(&conn_id, message) {
                    debug!("Ignored message from {}: {}", conn_id, e);
                }
            }

            ServerEvent::Disconnected { conn_id } => {
                self.broadcaster.unregister(&conn_id);
                match self.race.remove(&conn_id) {
                    Ok(()) => info!("Player {} left", conn_id),
                    Err(e) => debug!("Disconnect from {}: {}", conn_id, e),
                }
            }

            ServerEvent::TimerFired { timer } => {
                self.timers.fired(timer);
                if let Err(e) = self.race.on_timer(timer) {
                    debug!("Dropped firing: {}", e);
                }
            }
        }

        self.apply_effects();
    }

    fn apply_effects(&mut self) {
        for effect in self.race.take_effects() {
            match effect {
                Effect::Broadcast(snapshot) => {
                    self.broadcaster.broadcast(snapshot);
                }
                Effect::StartTimer { id, after } => self.timers.start(id, after),
                Effect::CancelTimer(id) => {
                    self.timers.cancel(id);
                }
            }
        }
    }
}

/// Spawns the reader and writer tasks for one TCP connection
fn spawn_connection(
    stream: TcpStream,
    conn_id: String,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    tokio::spawn(async move {
        let ws = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake failed for {}: {}", conn_id, e);
                return;
            }
        };
        let (mut sink, mut source) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

        let connected = ServerEvent::Connected {
            conn_id: conn_id.clone(),
            outbound: out_tx,
        };
        if events.send(connected).is_err() {
            return;
        }

        // Ends once the event loop drops the outbound sender
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    debug!("Write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Text(text)) => match ClientMessage::from_json(&text) {
                    Ok(message) => {
                        let event = ServerEvent::Frame {
                            conn_id: conn_id.clone(),
                            message,
                        };
                        if events.send(event).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Malformed frame from {}: {}", conn_id, e);
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("Read error on {}: {}", conn_id, e);
                    break;
                }
            }
        }

        let _ = events.send(ServerEvent::Disconnected { conn_id });
    });
}
