//! Lobby: display names, game mode selection and the ready check

use crate::error::RaceError;
use crate::game::RaceState;
use log::{debug, info};
use shared::{sanitize_name, GameMode, RaceStatus, MAX_PLAYERS};

impl RaceState {
    /// Renames a player and, in AI mode, refills the free lanes with bots
    ///
    /// The name is always applied. Selecting AI mode only rebuilds the bot
    /// roster while Waiting; the bots start moving when the race starts.
    pub fn set_name(&mut self, conn_id: &str, name: &str, mode: GameMode) -> Result<(), RaceError> {
        let player = self
            .clients
            .get_mut(conn_id)
            .ok_or_else(|| RaceError::UnknownPlayer(conn_id.to_string()))?;
        player.name = sanitize_name(name);
        debug!("Player {} is now {:?}", conn_id, player.name);

        if mode == GameMode::Ai {
            if self.status == RaceStatus::Waiting {
                let humans = self.clients.len();
                self.bots.rebuild(MAX_PLAYERS.saturating_sub(humans), humans);
            } else {
                debug!(
                    "Ignoring AI mode from {} while {:?}",
                    conn_id, self.status
                );
            }
        }

        self.broadcast();
        Ok(())
    }

    /// Flips a player's ready flag and starts the countdown once quorum is met
    pub fn toggle_ready(&mut self, conn_id: &str) -> Result<(), RaceError> {
        if self.clients.get(conn_id).is_none() {
            return Err(RaceError::UnknownPlayer(conn_id.to_string()));
        }
        if self.status != RaceStatus::Waiting {
            return Err(RaceError::InvalidPhase {
                action: "toggleReady",
                status: self.status,
            });
        }

        if let Some(player) = self.clients.get_mut(conn_id) {
            player.ready = !player.ready;
        }

        if self.quorum_reached() {
            info!(
                "Quorum reached with {} humans and {} bots",
                self.clients.len(),
                self.bots.len()
            );
            self.start_countdown();
        } else {
            self.broadcast();
        }
        Ok(())
    }

    /// At least two participants and every human ready; bots are always ready
    pub fn quorum_reached(&self) -> bool {
        self.roster_len() >= 2 && self.clients.all_ready()
    }
}
