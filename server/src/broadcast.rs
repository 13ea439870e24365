//! Fan-out of encoded frames to connected endpoints
//!
//! Each accepted connection hands the broadcaster the sending half of an
//! unbounded channel; a writer task on the other end owns the socket. Pushing
//! a frame never blocks and never waits for delivery, so broadcasting from
//! inside the event loop stays cheap. Endpoints whose writer has gone away
//! are pruned on the next broadcast.

use log::{debug, warn};
use shared::{ServerMessage, Snapshot};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Sending half of a connection's outbound frame queue
pub type Outbound = mpsc::UnboundedSender<String>;

/// Encodes and queues one message for a single endpoint. Returns false if
/// the endpoint is gone or the message could not be encoded.
pub fn send_message(outbound: &Outbound, message: &ServerMessage) -> bool {
    match message.to_json() {
        Ok(frame) => outbound.send(frame).is_ok(),
        Err(e) => {
            warn!("Failed to encode message: {}", e);
            false
        }
    }
}

/// Registry of the connections that receive `updateGame` snapshots
///
/// Only admitted players are registered. A connection rejected with
/// `gameFull` never appears here, so it never sees a snapshot.
#[derive(Default)]
pub struct Broadcaster {
    endpoints: HashMap<String, Outbound>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an endpoint under `conn_id`, replacing any previous one
    ///
    /// Register before executing the effects of the admitting mutation so
    /// the new player receives the snapshot that includes them.
    pub fn register(&mut self, conn_id: impl Into<String>, outbound: Outbound) {
        self.endpoints.insert(conn_id.into(), outbound);
    }

    /// Removes an endpoint and hands back its sender
    ///
    /// Dropping the returned sender ends the connection's writer task, which
    /// then closes the socket.
    pub fn unregister(&mut self, conn_id: &str) -> Option<Outbound> {
        self.endpoints.remove(conn_id)
    }

    /// Pushes `snapshot` as an `updateGame` frame to every endpoint
    ///
    /// The frame is encoded once and shared. Returns how many endpoints
    /// accepted it.
    pub fn broadcast(&mut self, snapshot: Snapshot) -> usize {
        let frame = match ServerMessage::UpdateGame(snapshot).to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode snapshot: {}", e);
                return 0;
            }
        };

        let mut closed = Vec::new();
        for (conn_id, outbound) in &self.endpoints {
            if outbound.send(frame.clone()).is_err() {
                closed.push(conn_id.clone());
            }
        }

        for conn_id in &closed {
            debug!("Dropping closed endpoint {}", conn_id);
            self.endpoints.remove(conn_id);
        }

        self.endpoints.len()
    }

    /// Number of live endpoints after the most recent pruning
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Player, RaceStatus};

    fn snapshot() -> Snapshot {
        Snapshot {
            players: vec![Player::new("a", 0)],
            game_state: RaceStatus::Waiting,
            countdown: None,
        }
    }

    #[test]
    fn test_broadcast_reaches_every_endpoint() {
        let mut broadcaster = Broadcaster::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        broadcaster.register("a", tx_a);
        broadcaster.register("b", tx_b);

        assert_eq!(broadcaster.broadcast(snapshot()), 2);

        let frame_a = rx_a.try_recv().unwrap();
        let frame_b = rx_b.try_recv().unwrap();
        assert_eq!(frame_a, frame_b);
        assert_eq!(
            ServerMessage::from_json(&frame_a).unwrap(),
            ServerMessage::UpdateGame(snapshot())
        );
    }

    #[test]
    fn test_broadcast_prunes_closed_endpoints() {
        let mut broadcaster = Broadcaster::new();
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        broadcaster.register("a", tx_a);
        broadcaster.register("b", tx_b);
        drop(rx_a);

        assert_eq!(broadcaster.broadcast(snapshot()), 1);
        assert_eq!(broadcaster.len(), 1);
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_unregistered_endpoint_gets_nothing() {
        let mut broadcaster = Broadcaster::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.register("a", tx);

        assert!(broadcaster.unregister("a").is_some());
        broadcaster.broadcast(snapshot());

        assert!(broadcaster.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_message_to_single_endpoint() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(send_message(&tx, &ServerMessage::GameFull));
        assert_eq!(
            ServerMessage::from_json(&rx.try_recv().unwrap()).unwrap(),
            ServerMessage::GameFull
        );

        drop(rx);
        assert!(!send_message(&tx, &ServerMessage::GameFull));
    }
}
