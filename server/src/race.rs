//! Race engine: moves, win detection, AI ticks and reset
//!
//! Win detection only ever looks at the player that just moved. Two players
//! can therefore never both win one race: whichever move the event queue
//! delivers first flips the status to Finished, and every later move is
//! rejected as out of phase.

use crate::error::RaceError;
use crate::game::RaceState;
use log::{debug, info};
use shared::{RaceStatus, MAX_PLAYERS, START_POSITION};

impl RaceState {
    /// Advances a human one step; crossing the finish line ends the race
    pub fn move_player(&mut self, conn_id: &str) -> Result<(), RaceError> {
        if self.status != RaceStatus::Racing {
            return Err(RaceError::InvalidPhase {
                action: "move",
                status: self.status,
            });
        }

        let player = self
            .clients
            .get_mut(conn_id)
            .ok_or_else(|| RaceError::UnknownPlayer(conn_id.to_string()))?;

        if player.advance() {
            player.wins += 1;
            info!("{} ({}) wins, {} total", player.name, conn_id, player.wins);
            self.finish();
        }

        self.broadcast();
        Ok(())
    }

    /// Honored only once a race has finished
    pub fn request_restart(&mut self) -> Result<(), RaceError> {
        if self.status != RaceStatus::Finished {
            return Err(RaceError::InvalidPhase {
                action: "requestRestart",
                status: self.status,
            });
        }
        self.reset();
        Ok(())
    }

    /// Returns everyone to the start line and the lobby
    ///
    /// Humans must ready up again; bots are rebuilt for the lanes the humans
    /// leave free and keep their win counters.
    pub fn reset(&mut self) {
        self.cancel_countdown_timer();
        self.cancel_ai_timer();

        for player in self.clients.players_mut() {
            player.position = START_POSITION;
            player.ready = false;
        }

        if !self.bots.is_empty() {
            let humans = self.clients.len();
            self.bots
                .rebuild_keeping_wins(MAX_PLAYERS.saturating_sub(humans), humans);
        }

        self.status = RaceStatus::Waiting;
        self.countdown = None;
        info!("Race reset, back to lobby");
        self.broadcast();
    }

    pub(crate) fn start_ai_ticker(&mut self) {
        self.cancel_ai_timer();
        let delay = self.bots.next_interval();
        self.ai_timer = Some(self.schedule(delay));
    }

    /// Handles one AI tick; the timer has already been consumed
    pub(crate) fn ai_tick(&mut self) {
        if self.status != RaceStatus::Racing {
            debug!("AI tick outside a race, letting the ticker lapse");
            return;
        }

        if let Some(winner) = self.bots.advance_all() {
            info!("Bot {} wins", winner);
            self.finish();
        } else {
            self.start_ai_ticker();
        }
        self.broadcast();
    }

    fn finish(&mut self) {
        self.status = RaceStatus::Finished;
        self.cancel_ai_timer();
    }
}
