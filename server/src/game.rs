//! Authoritative race state and the effects it asks the runtime to perform
//!
//! `RaceState` is the single owner of everything clients can observe: the
//! human roster, the AI roster, the current phase and the countdown value.
//! Every operation runs to completion against `&mut self`, so the caller
//! decides how mutations are serialized (the network layer funnels them
//! through one event queue).
//!
//! The state never touches sockets or spawns tasks. Instead each mutation
//! queues `Effect`s (snapshots to broadcast, timers to start or cancel) which
//! the runtime drains with `take_effects` and executes in order. This keeps
//! the whole state machine deterministic and drivable from plain unit tests.
//!
//! Operations are split across modules by concern:
//! - `client_manager` owns lane assignment for humans
//! - `lobby` handles names, ready flags and quorum
//! - `countdown` bridges Waiting and Racing
//! - `race` applies moves, win detection, AI ticks and reset

use crate::ai::{AiRoster, IntervalSource, RandomInterval};
use crate::client_manager::ClientManager;
use crate::config::RaceConfig;
use crate::error::RaceError;
use log::{debug, info};
use shared::{ClientMessage, Player, RaceStatus, SetName, Snapshot, MAX_PLAYERS};
use std::fmt;
use std::time::Duration;

/// Identifies one scheduled timer. Ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Side effects requested by a state mutation, executed by the runtime in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Push this snapshot to every connected endpoint
    Broadcast(Snapshot),
    /// Deliver a `TimerFired` event for `id` after `after` has elapsed
    StartTimer { id: TimerId, after: Duration },
    /// Abort a previously started timer
    CancelTimer(TimerId),
}

pub struct RaceState {
    pub(crate) config: RaceConfig,
    pub(crate) status: RaceStatus,
    pub(crate) countdown: Option<u32>,
    pub(crate) clients: ClientManager,
    pub(crate) bots: AiRoster,
    pub(crate) countdown_timer: Option<TimerId>,
    pub(crate) ai_timer: Option<TimerId>,
    next_timer_id: u64,
    effects: Vec<Effect>,
}

impl RaceState {
    pub fn new(config: RaceConfig) -> Self {
        let interval = RandomInterval::new(config.ai_move_min, config.ai_move_max);
        Self::with_interval_source(config, Box::new(interval))
    }

    /// Creates a race whose AI ticker draws its delays from `interval`.
    pub fn with_interval_source(config: RaceConfig, interval: Box<dyn IntervalSource>) -> Self {
        Self {
            config,
            status: RaceStatus::Waiting,
            countdown: None,
            clients: ClientManager::new(MAX_PLAYERS),
            bots: AiRoster::new(interval),
            countdown_timer: None,
            ai_timer: None,
            next_timer_id: 1,
            effects: Vec::new(),
        }
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn countdown(&self) -> Option<u32> {
        self.countdown
    }

    pub fn human_count(&self) -> usize {
        self.clients.len()
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    pub fn roster_len(&self) -> usize {
        self.human_count() + self.bot_count()
    }

    /// All active players in lane order: humans first, then bots
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.clients.players().iter().chain(self.bots.bots().iter())
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players().find(|p| p.id == id)
    }

    /// Timers the state currently considers live
    pub fn active_timers(&self) -> Vec<TimerId> {
        self.countdown_timer.into_iter().chain(self.ai_timer).collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            players: self.players().cloned().collect(),
            game_state: self.status,
            countdown: self.countdown,
        }
    }

    /// Drains the effects queued since the last call
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Registers a new human connection at the next free lane
    ///
    /// A join during Countdown aborts back to Waiting so the newcomer gets a
    /// ready check like everyone else.
    pub fn accept(&mut self, conn_id: &str) -> Result<(), RaceError> {
        if self.roster_len() >= MAX_PLAYERS {
            return Err(RaceError::RosterFull);
        }

        self.clients.add_client(conn_id)?;
        self.bots.relayout(self.clients.len());

        if self.status == RaceStatus::Countdown {
            info!("Player {} joined during countdown, back to lobby", conn_id);
            self.reset();
        } else {
            self.broadcast();
        }
        Ok(())
    }

    /// Drops a human connection and recompacts every lane behind it
    ///
    /// A departure during Countdown or Racing aborts the race back to
    /// Waiting. When the last human leaves the bots leave with them.
    pub fn remove(&mut self, conn_id: &str) -> Result<(), RaceError> {
        self.clients
            .remove_client(conn_id)
            .ok_or_else(|| RaceError::UnknownPlayer(conn_id.to_string()))?;

        if self.clients.is_empty() && !self.bots.is_empty() {
            debug!("Last human left, dropping {} bots", self.bots.len());
            self.bots.clear();
        }
        self.bots.relayout(self.clients.len());

        match self.status {
            RaceStatus::Countdown | RaceStatus::Racing => {
                info!("Player {} left mid-race, aborting to lobby", conn_id);
                self.reset();
            }
            _ => self.broadcast(),
        }
        Ok(())
    }

    /// Applies one inbound client message from a human on the roster
    pub fn handle(&mut self, conn_id: &str, message: ClientMessage) -> Result<(), RaceError> {
        if self.clients.get(conn_id).is_none() {
            return Err(RaceError::UnknownPlayer(conn_id.to_string()));
        }

        match message {
            ClientMessage::SetName(SetName { name, mode }) => self.set_name(conn_id, &name, mode),
            ClientMessage::ToggleReady => self.toggle_ready(conn_id),
            ClientMessage::Move => self.move_player(conn_id),
            ClientMessage::RequestRestart => self.request_restart(),
        }
    }

    /// Dispatches a timer firing to whichever phase owns it
    ///
    /// Firings for timers that were cancelled or replaced after the event was
    /// queued are rejected with `StaleTimer` and change nothing.
    pub fn on_timer(&mut self, timer: TimerId) -> Result<(), RaceError> {
        if self.countdown_timer == Some(timer) {
            self.countdown_timer = None;
            self.countdown_tick();
            Ok(())
        } else if self.ai_timer == Some(timer) {
            self.ai_timer = None;
            self.ai_tick();
            Ok(())
        } else {
            Err(RaceError::StaleTimer(timer))
        }
    }

    pub(crate) fn broadcast(&mut self) {
        let snapshot = self.snapshot();
        self.effects.push(Effect::Broadcast(snapshot));
    }

    pub(crate) fn schedule(&mut self, after: Duration) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        debug!("Scheduling {} in {:?}", id, after);
        self.effects.push(Effect::StartTimer { id, after });
        id
    }

    pub(crate) fn cancel_countdown_timer(&mut self) {
        if let Some(id) = self.countdown_timer.take() {
            self.effects.push(Effect::CancelTimer(id));
        }
    }

    pub(crate) fn cancel_ai_timer(&mut self) {
        if let Some(id) = self.ai_timer.take() {
            self.effects.push(Effect::CancelTimer(id));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ai::FixedInterval;
    use shared::{GameMode, START_POSITION};

    pub(crate) fn test_race() -> RaceState {
        RaceState::with_interval_source(
            RaceConfig::default(),
            Box::new(FixedInterval(Duration::from_millis(1000))),
        )
    }

    pub(crate) fn broadcasts(effects: &[Effect]) -> Vec<Snapshot> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Broadcast(snapshot) => Some(snapshot.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn lanes(race: &RaceState) -> Vec<usize> {
        race.players().map(|p| p.lane).collect()
    }

    #[test]
    fn test_race_creation() {
        let race = test_race();
        assert_eq!(race.status(), RaceStatus::Waiting);
        assert_eq!(race.countdown(), None);
        assert_eq!(race.roster_len(), 0);
        assert!(race.active_timers().is_empty());
    }

    #[test]
    fn test_accept_broadcasts_snapshot() {
        let mut race = test_race();
        race.accept("conn-1").unwrap();

        let effects = race.take_effects();
        let snapshots = broadcasts(&effects);
        assert_eq!(effects.len(), 1);
        assert_eq!(snapshots[0].players.len(), 1);
        assert_eq!(snapshots[0].players[0].position, START_POSITION);
        assert_eq!(snapshots[0].game_state, RaceStatus::Waiting);
    }

    #[test]
    fn test_accept_assigns_sequential_lanes() {
        let mut race = test_race();
        for i in 0..MAX_PLAYERS {
            race.accept(&format!("conn-{}", i)).unwrap();
            assert_eq!(lanes(&race), (0..=i).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_accept_rejects_when_full() {
        let mut race = test_race();
        for i in 0..MAX_PLAYERS {
            race.accept(&format!("conn-{}", i)).unwrap();
        }
        race.take_effects();

        assert_eq!(race.accept("conn-extra"), Err(RaceError::RosterFull));
        assert_eq!(race.roster_len(), MAX_PLAYERS);
        assert!(race.take_effects().is_empty());
    }

    #[test]
    fn test_accept_counts_bots_against_capacity() {
        let mut race = test_race();
        race.accept("conn-1").unwrap();
        race.set_name("conn-1", "Ada", GameMode::Ai).unwrap();
        assert_eq!(race.roster_len(), MAX_PLAYERS);

        assert_eq!(race.accept("conn-2"), Err(RaceError::RosterFull));
    }

    #[test]
    fn test_remove_recompacts_lanes_in_order() {
        let mut race = test_race();
        for id in ["a", "b", "c", "d"] {
            race.accept(id).unwrap();
        }

        race.remove("b").unwrap();

        let ids: Vec<&str> = race.players().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
        assert_eq!(lanes(&race), vec![0, 1, 2]);
        assert_eq!(race.player("c").unwrap().color, shared::lane_color(1));
    }

    #[test]
    fn test_remove_unknown_player() {
        let mut race = test_race();
        race.accept("a").unwrap();
        race.take_effects();

        assert_eq!(
            race.remove("ghost"),
            Err(RaceError::UnknownPlayer("ghost".to_string()))
        );
        assert!(race.take_effects().is_empty());
    }

    #[test]
    fn test_remove_shifts_bots_behind_humans() {
        let mut race = test_race();
        race.accept("a").unwrap();
        race.accept("b").unwrap();
        race.set_name("a", "Ada", GameMode::Ai).unwrap();
        assert_eq!(race.bot_count(), 2);

        race.remove("a").unwrap();

        assert_eq!(race.human_count(), 1);
        assert_eq!(race.bot_count(), 2);
        assert_eq!(lanes(&race), vec![0, 1, 2]);
        assert!(race.players().skip(1).all(|p| p.is_ai));
    }

    #[test]
    fn test_last_human_leaving_drops_bots() {
        let mut race = test_race();
        race.accept("a").unwrap();
        race.set_name("a", "Ada", GameMode::Ai).unwrap();

        race.remove("a").unwrap();

        assert_eq!(race.roster_len(), 0);
    }

    #[test]
    fn test_join_during_countdown_aborts() {
        let mut race = test_race();
        race.accept("a").unwrap();
        race.accept("b").unwrap();
        race.toggle_ready("a").unwrap();
        race.toggle_ready("b").unwrap();
        let countdown_timer = race.countdown_timer.unwrap();
        race.take_effects();

        race.accept("c").unwrap();

        let effects = race.take_effects();
        assert!(effects.contains(&Effect::CancelTimer(countdown_timer)));
        assert_eq!(race.status(), RaceStatus::Waiting);
        assert_eq!(race.countdown(), None);
        assert!(race.players().all(|p| !p.ready));
        assert!(race.active_timers().is_empty());
        assert_eq!(race.on_timer(countdown_timer), Err(RaceError::StaleTimer(countdown_timer)));
        assert_eq!(lanes(&race), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_during_countdown_aborts() {
        let mut race = test_race();
        race.accept("a").unwrap();
        race.accept("b").unwrap();
        race.accept("c").unwrap();
        race.toggle_ready("a").unwrap();
        race.toggle_ready("b").unwrap();
        race.toggle_ready("c").unwrap();
        assert_eq!(race.status(), RaceStatus::Countdown);
        let countdown_timer = race.countdown_timer.unwrap();
        race.take_effects();

        race.remove("c").unwrap();

        let effects = race.take_effects();
        assert!(effects.contains(&Effect::CancelTimer(countdown_timer)));
        assert_eq!(race.status(), RaceStatus::Waiting);
        assert_eq!(race.countdown(), None);
        assert!(race.players().all(|p| !p.ready));
        assert!(race.active_timers().is_empty());
        assert_eq!(broadcasts(&effects).len(), 1);
    }

    #[test]
    fn test_handle_rejects_unknown_player() {
        let mut race = test_race();
        for message in [
            ClientMessage::Move,
            ClientMessage::ToggleReady,
            ClientMessage::RequestRestart,
        ] {
            assert_eq!(
                race.handle("ghost", message),
                Err(RaceError::UnknownPlayer("ghost".to_string()))
            );
        }
        assert!(race.take_effects().is_empty());
    }

    #[test]
    fn test_stale_timer_is_ignored() {
        let mut race = test_race();
        race.accept("a").unwrap();
        race.take_effects();

        assert_eq!(
            race.on_timer(TimerId(99)),
            Err(RaceError::StaleTimer(TimerId(99)))
        );
        assert!(race.take_effects().is_empty());
    }

    #[test]
    fn test_timer_ids_are_unique() {
        let mut race = test_race();
        let first = race.schedule(Duration::from_millis(1));
        let second = race.schedule(Duration::from_millis(1));
        assert_ne!(first, second);
    }

    #[test]
    fn test_snapshot_orders_humans_before_bots() {
        let mut race = test_race();
        race.accept("a").unwrap();
        race.set_name("a", "Ada", GameMode::Ai).unwrap();

        let snapshot = race.snapshot();
        assert!(!snapshot.players[0].is_ai);
        assert!(snapshot.players[1..].iter().all(|p| p.is_ai));
        assert_eq!(snapshot.countdown, None);
    }
}
