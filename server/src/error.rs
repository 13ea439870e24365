use crate::game::TimerId;
use shared::RaceStatus;
use std::time::Duration;
use thiserror::Error;

/// Reasons a race operation was refused. None of them change any state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RaceError {
    #[error("roster is full")]
    RosterFull,
    #[error("{action} is not allowed while {status:?}")]
    InvalidPhase {
        action: &'static str,
        status: RaceStatus,
    },
    #[error("unknown player {0}")]
    UnknownPlayer(String),
    #[error("player {0} is already on the roster")]
    DuplicatePlayer(String),
    #[error("{0} is no longer active")]
    StaleTimer(TimerId),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("countdown must start above zero")]
    ZeroCountdown,
    #[error("countdown interval must be non-zero")]
    ZeroCountdownInterval,
    #[error("AI move interval must be non-zero")]
    ZeroAiInterval,
    #[error("AI move interval minimum {min:?} exceeds maximum {max:?}")]
    InvertedAiInterval { min: Duration, max: Duration },
}
