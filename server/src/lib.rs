//! # Lane Race Server Library
//!
//! This library provides the authoritative server for a small lane race
//! played over WebSockets. Up to four participants, humans or AI bots, each
//! own a lane and advance toward a finish line one fixed step at a time. The
//! server decides everything clients see: lane assignment, the ready check,
//! the countdown, every position and every win.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Race State
//! A single `RaceState` holds the roster and the race phase
//! (`waiting → countdown → racing → finished → waiting`). Clients only send
//! intents (`setName`, `toggleReady`, `move`, `requestRestart`); the server
//! validates each one against the current phase and ignores the rest.
//!
//! ### Client Management
//! Handles the lifecycle of each connection:
//! - Admission and lowest-free-lane assignment
//! - Rejection with `gameFull` once four lanes are taken
//! - Lane compaction and race abort when a participant leaves
//!
//! ### State Broadcasting
//! Every accepted change is followed by a full `updateGame` snapshot sent to
//! every connected client. There are no deltas; a client that receives the
//! latest snapshot knows everything.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Event Loop
//! Connections, inbound frames, disconnects and timer firings are all
//! funnelled into one event queue. The loop in `network::Server::run` is the
//! only code that touches `RaceState`, so no locks are needed and every
//! event is applied atomically in arrival order.
//!
//! ### Effects Instead of I/O
//! `RaceState` never writes to sockets or spawns timers. Each mutation
//! queues `game::Effect`s that the loop executes afterwards, which keeps the
//! state machine synchronous and testable without a runtime.
//!
//! ### One-Shot Timers
//! The countdown and the AI ticker each re-arm a one-shot timer after every
//! firing. Cancelled or replaced timers are recognised by id and their late
//! firings are dropped.
//!
//! ## Module Organization
//!
//! - `game`: the race state, timer ids and effects
//! - `client_manager`: human roster and lane bookkeeping
//! - `ai`: bot roster and the AI move interval source
//! - `broadcast`: fan-out of encoded frames to connection writers
//! - `timers`: one-shot timer tasks feeding the event queue
//! - `network`: WebSocket accept loop, per-connection tasks and the event loop
//! - `config`: timing configuration and validation
//! - `error`: race and configuration errors
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::RaceConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut server = Server::bind("0.0.0.0:3001", RaceConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod broadcast;
pub mod client_manager;
pub mod config;
mod countdown;
pub mod error;
pub mod game;
mod lobby;
pub mod network;
mod race;
pub mod timers;

pub use config::RaceConfig;
pub use error::{ConfigError, RaceError};
pub use game::{Effect, RaceState, TimerId};
pub use network::Server;
