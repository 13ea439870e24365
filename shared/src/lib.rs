use serde::{Deserialize, Serialize};

pub const MAX_PLAYERS: usize = 4;
pub const MAX_LANES: usize = MAX_PLAYERS;
pub const FINISH_LINE: u32 = 2000;
pub const MOVE_AMOUNT: u32 = 25;
pub const START_POSITION: u32 = 50;
pub const COUNTDOWN_START: u32 = 3;
pub const COUNTDOWN_INTERVAL_MS: u64 = 1000;
pub const AI_MOVE_MIN_MS: u64 = 800;
pub const AI_MOVE_MAX_MS: u64 = 1500;
pub const MAX_NAME_LEN: usize = 15;
pub const DEFAULT_NAME: &str = "Anonymous";

/// Lane colors, indexed by lane number.
pub const LANE_COLORS: [&str; MAX_LANES] = ["#e74c3c", "#3498db", "#2ecc71", "#f39c12"];

pub fn lane_color(lane: usize) -> &'static str {
    LANE_COLORS[lane % LANE_COLORS.len()]
}

/// Frames sent by clients, encoded as `{"event": ..., "data": ...}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    SetName(SetName),
    ToggleReady,
    Move,
    RequestRestart,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SetName {
    pub name: String,
    #[serde(default)]
    pub mode: GameMode,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Ai,
    /// Also covers any mode name this server does not know
    #[default]
    #[serde(other)]
    Multiplayer,
}

/// Frames sent by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    GameFull,
    UpdateGame(Snapshot),
}

impl ClientMessage {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RaceStatus {
    #[default]
    Waiting,
    Countdown,
    Racing,
    Finished,
}

/// Full race document pushed to every client after each mutation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub game_state: RaceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub lane: usize,
    pub color: String,
    pub position: u32,
    pub ready: bool,
    pub wins: u32,
    #[serde(rename = "isAI", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_ai: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, lane: usize) -> Self {
        Self {
            id: id.into(),
            name: DEFAULT_NAME.to_string(),
            lane,
            color: lane_color(lane).to_string(),
            position: START_POSITION,
            ready: false,
            wins: 0,
            is_ai: false,
        }
    }

    pub fn bot(id: impl Into<String>, name: impl Into<String>, lane: usize) -> Self {
        Self {
            name: name.into(),
            ready: true,
            is_ai: true,
            ..Self::new(id, lane)
        }
    }

    /// Moves the player to `lane` and picks up that lane's color.
    pub fn assign_lane(&mut self, lane: usize) {
        self.lane = lane;
        self.color = lane_color(lane).to_string();
    }

    pub fn has_finished(&self) -> bool {
        self.position >= FINISH_LINE
    }

    /// Advances by one step, clamped to the finish line. Returns true when
    /// this step crossed it.
    pub fn advance(&mut self) -> bool {
        if self.has_finished() {
            return false;
        }
        self.position = (self.position + MOVE_AMOUNT).min(FINISH_LINE);
        self.has_finished()
    }
}

/// Trims a requested display name and caps it at `MAX_NAME_LEN` characters.
pub fn sanitize_name(raw: &str) -> String {
    let trimmed: String = raw.trim().chars().take(MAX_NAME_LEN).collect();
    let trimmed = trimmed.trim_end();
    if trimmed.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
