//! Human roster and lane assignment
//!
//! This module tracks the players behind live connections, including:
//! - Lane assignment on accept, always the next lane after the current roster
//! - Lane reclamation on disconnect, renumbering survivors without reordering
//! - Capacity enforcement for human connections
//!
//! Players are stored in lane order, so a player's index in the roster is
//! always its lane. Bots are not tracked here; `ai::AiRoster` lays them out
//! directly after the last human lane.

use crate::error::RaceError;
use log::debug;
use shared::Player;

/// Manages all connected human players and their lanes
pub struct ClientManager {
    /// Active players, index == lane
    players: Vec<Player>,
    /// Maximum number of concurrent human players allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty roster that admits at most `max_clients` humans
    ///
    /// Capacity here only bounds humans. The combined human and bot limit
    /// is enforced by `RaceState::accept` before a client reaches this point.
    pub fn new(max_clients: usize) -> Self {
        Self {
            players: Vec::with_capacity(max_clients),
            max_clients,
        }
    }

    /// Adds a player for `conn_id` at the next free lane
    ///
    /// Fails with `RosterFull` at capacity and with `DuplicatePlayer` if the
    /// connection is already registered.
    pub fn add_client(&mut self, conn_id: &str) -> Result<&Player, RaceError> {
        if self.players.len() >= self.max_clients {
            return Err(RaceError::RosterFull);
        }
        if self.get(conn_id).is_some() {
            return Err(RaceError::DuplicatePlayer(conn_id.to_string()));
        }

        let lane = self.players.len();
        debug!("Player {} joined in lane {}", conn_id, lane);
        self.players.push(Player::new(conn_id, lane));
        Ok(&self.players[lane])
    }

    /// Removes a player and renumbers the survivors to `0..len`
    pub fn remove_client(&mut self, conn_id: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == conn_id)?;
        let removed = self.players.remove(index);
        self.compact_lanes();
        debug!("Player {} left lane {}", conn_id, removed.lane);
        Some(removed)
    }

    fn compact_lanes(&mut self) {
        for (lane, player) in self.players.iter_mut().enumerate() {
            if player.lane != lane {
                player.assign_lane(lane);
            }
        }
    }

    /// Looks up the player behind a connection id
    ///
    /// Returns `None` for connections that were rejected or have already
    /// been removed.
    pub fn get(&self, conn_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == conn_id)
    }

    /// Mutable lookup used for names, ready flags and positions
    ///
    /// Callers must not change `lane` through this handle; lanes are owned
    /// by `add_client` and `remove_client`.
    pub fn get_mut(&mut self, conn_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == conn_id)
    }

    /// All human players in lane order, so `players()[i].lane == i`
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Iterates players mutably in lane order, e.g. to reset a race
    ///
    /// Lanes must stay untouched for the same reason as in `get_mut`.
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    /// True when at least one human is present and every human is ready
    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.ready)
    }

    /// Number of humans, which is also the first lane free for bots
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
