//! Countdown phase between a full lobby and the start of the race

use crate::game::RaceState;
use log::info;
use shared::RaceStatus;

impl RaceState {
    /// Enters Countdown at the configured start value and arms the first tick
    ///
    /// Any countdown timer still armed is cancelled first, so rapid ready
    /// toggling never leaves two countdowns running.
    pub(crate) fn start_countdown(&mut self) {
        self.cancel_countdown_timer();

        self.status = RaceStatus::Countdown;
        self.countdown = Some(self.config.countdown_start);
        info!("Countdown started at {}", self.config.countdown_start);

        self.countdown_timer = Some(self.schedule(self.config.countdown_interval));
        self.broadcast();
    }

    /// Handles one countdown tick; the timer has already been consumed
    pub(crate) fn countdown_tick(&mut self) {
        if self.status != RaceStatus::Countdown {
            return;
        }

        let remaining = self.countdown.unwrap_or(0).saturating_sub(1);
        if remaining > 0 {
            self.countdown = Some(remaining);
            self.countdown_timer = Some(self.schedule(self.config.countdown_interval));
            self.broadcast();
            return;
        }

        self.countdown = None;
        self.status = RaceStatus::Racing;
        info!("Race started with {} players", self.roster_len());
        self.broadcast();

        if !self.bots.is_empty() {
            self.start_ai_ticker();
        }
    }
}
