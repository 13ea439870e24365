//! Synthetic opponents and the delay source that paces them
//!
//! Bots are ordinary `Player` records tagged `is_ai`, always ready, with ids
//! `ai-1`, `ai-2`, ... They occupy the lanes directly after the humans. The
//! roster never moves on its own: `RaceState` arms a one-shot AI timer with
//! a delay drawn from the `IntervalSource`, and each firing calls
//! `advance_all` once before the timer is re-armed.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::Player;
use std::collections::HashMap;
use std::time::Duration;

/// Produces the delay before the next AI tick
pub trait IntervalSource: Send {
    /// Called once each time the AI ticker is armed
    fn next_interval(&mut self) -> Duration;
}

/// Uniformly random delay in `[min, max]`
pub struct RandomInterval {
    min: Duration,
    max: Duration,
    rng: StdRng,
}

impl RandomInterval {
    /// Creates a source seeded from OS entropy
    ///
    /// When `min >= max` every draw returns `min`, so a degenerate range
    /// behaves like `FixedInterval`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self::with_rng(min, max, StdRng::from_entropy())
    }

    /// Creates a reproducible source; the same seed yields the same delays
    pub fn seeded(min: Duration, max: Duration, seed: u64) -> Self {
        Self::with_rng(min, max, StdRng::seed_from_u64(seed))
    }

    fn with_rng(min: Duration, max: Duration, rng: StdRng) -> Self {
        Self { min, max, rng }
    }
}

impl IntervalSource for RandomInterval {
    fn next_interval(&mut self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        self.rng.gen_range(self.min..=self.max)
    }
}

/// Always returns the same delay
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval(pub Duration);

impl IntervalSource for FixedInterval {
    fn next_interval(&mut self) -> Duration {
        self.0
    }
}

/// The bots in the current lobby and the source that paces their moves
///
/// Bots are kept in lane order. `RaceState` keeps their lanes directly
/// behind the humans by calling `relayout` whenever the human count changes.
pub struct AiRoster {
    bots: Vec<Player>,
    interval: Box<dyn IntervalSource>,
}

impl AiRoster {
    /// Creates an empty roster paced by `interval`
    pub fn new(interval: Box<dyn IntervalSource>) -> Self {
        Self {
            bots: Vec::new(),
            interval,
        }
    }

    /// Replaces every bot with `count` fresh ones starting at `first_lane`
    pub fn rebuild(&mut self, count: usize, first_lane: usize) {
        self.bots = (0..count)
            .map(|i| {
                let n = i + 1;
                Player::bot(format!("ai-{}", n), format!("AI {}", n), first_lane + i)
            })
            .collect();
        info!("AI roster rebuilt with {} bots", count);
    }

    /// Like `rebuild`, but bots that keep their id also keep their wins
    pub fn rebuild_keeping_wins(&mut self, count: usize, first_lane: usize) {
        let wins: HashMap<String, u32> = self
            .bots
            .drain(..)
            .map(|bot| (bot.id, bot.wins))
            .collect();

        self.rebuild(count, first_lane);
        for bot in &mut self.bots {
            if let Some(&won) = wins.get(&bot.id) {
                bot.wins = won;
            }
        }
    }

    /// Removes every bot, e.g. when the last human leaves
    ///
    /// Win counters are lost; a later `rebuild` starts from zero.
    pub fn clear(&mut self) {
        self.bots.clear();
    }

    /// Renumbers bot lanes to `first_lane..first_lane + len`
    pub fn relayout(&mut self, first_lane: usize) {
        for (i, bot) in self.bots.iter_mut().enumerate() {
            if bot.lane != first_lane + i {
                bot.assign_lane(first_lane + i);
            }
        }
    }

    /// Draws the delay before the next AI tick from the interval source
    pub fn next_interval(&mut self) -> Duration {
        self.interval.next_interval()
    }

    /// Moves every unfinished bot one step, in lane order
    ///
    /// The first bot to cross the finish line wins: its win counter is
    /// bumped, its id returned, and the bots after it are left untouched.
    pub fn advance_all(&mut self) -> Option<String> {
        for bot in &mut self.bots {
            if bot.advance() {
                bot.wins += 1;
                return Some(bot.id.clone());
            }
        }
        None
    }

    /// Current bots in lane order
    pub fn bots(&self) -> &[Player] {
        &self.bots
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}
