use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::EnumString;

#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContestantId(pub u64);

impl std::fmt::Display for ContestantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContestantId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Start of the unix epoch, used for contestants we have no data for yet
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

fn epoch_if_null<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    Ok(Option::<DateTime<Utc>>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NavigationTask {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub route: Route,
    #[serde(default)]
    pub contestant_set: Vec<Contestant>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub gate_check: bool,
    #[serde(default)]
    pub time_check: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contestant {
    pub id: ContestantId,
    #[serde(default)]
    pub contestant_number: u32,
    #[serde(default)]
    pub team: Option<Team>,
    #[serde(default)]
    pub tracker_device_id: Option<String>,
    #[serde(default)]
    pub takeoff_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_by_time: Option<DateTime<Utc>>,
    /// Score snapshot embedded by the backend in the task payload
    #[serde(default)]
    pub contestanttrack: Option<TrackSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackSnapshot {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub score_log: Vec<ScoreLogEntry>,
    #[serde(default)]
    pub current_state: TrackState,
    #[serde(default)]
    pub current_leg: String,
}

/// The live tracking record of a single contestant, as delivered by one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestantTrack {
    pub contestant_id: ContestantId,
    #[serde(default = "epoch", deserialize_with = "epoch_if_null")]
    pub latest_time: DateTime<Utc>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub more_data: bool,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub score_log: Vec<ScoreLogEntry>,
    #[serde(default)]
    pub current_state: TrackState,
}

impl ContestantTrack {
    /// A track entry for a contestant that was (re)announced by a task load.
    /// Positions are cleared and `more_data` is set so the poller keeps
    /// fetching from `latest_time`.
    pub fn seeded(contestant: &Contestant, latest_time: DateTime<Utc>, progress: f64) -> Self {
        let snapshot = contestant.contestanttrack.clone().unwrap_or_default();
        Self {
            contestant_id: contestant.id,
            latest_time,
            positions: Vec::new(),
            annotations: Vec::new(),
            more_data: true,
            progress,
            score: snapshot.score,
            score_log: snapshot.score_log,
            current_state: snapshot.current_state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
    #[serde(alias = "timestamp")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub course: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub gate: Option<String>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreLogEntry {
    #[serde(default)]
    pub gate: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub planned: Option<String>,
    #[serde(default)]
    pub actual: Option<String>,
    #[serde(default)]
    pub offset_string: Option<String>,
}

/// Tracking state as reported by the backend. Unknown states are kept verbatim.
#[derive(Debug, Clone, Eq, PartialEq, Default, EnumString, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrackState {
    #[default]
    #[strum(serialize = "Waiting...")]
    Waiting,
    Tracking,
    Backtracking,
    #[strum(serialize = "Procedure turn")]
    ProcedureTurn,
    Finished,
    #[strum(default)]
    Other(String),
}

impl TrackState {
    pub fn as_str(&self) -> &str {
        match self {
            TrackState::Waiting => "Waiting...",
            TrackState::Tracking => "Tracking",
            TrackState::Backtracking => "Backtracking",
            TrackState::ProcedureTurn => "Procedure turn",
            TrackState::Finished => "Finished",
            TrackState::Other(s) => s,
        }
    }
}

impl std::fmt::Display for TrackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TrackState {
    fn from(value: String) -> Self {
        TrackState::from_str(&value).unwrap_or(TrackState::Other(value))
    }
}

impl From<TrackState> for String {
    fn from(value: TrackState) -> Self {
        value.as_str().to_string()
    }
}
