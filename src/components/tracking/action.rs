use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::state::DisplayMode;
use crate::environment::entities::{ContestantId, NavigationTask};
use crate::environment::model::TrackPayload;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestantSelection {
    pub contestant_ids: Vec<ContestantId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestantRef {
    pub contestant_id: ContestantId,
}

/// Every state transition of the tracking view. The serialized form uses
/// the action names of the web front end, so recorded sessions can be
/// replayed. Tags we don't know decode to `Unknown`.
#[allow(clippy::large_enum_variant)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackingAction {
    #[serde(rename = "SET_DISPLAY")]
    SetDisplay {
        #[serde(rename = "payload")]
        display: DisplayMode,
    },
    #[serde(rename = "GET_NAVIGATION_TASK_SUCCESSFUL")]
    NavigationTaskLoaded {
        #[serde(rename = "payload")]
        task: NavigationTask,
    },
    #[serde(rename = "INITIAL_LOADING")]
    InitialLoadingStarted {
        #[serde(rename = "contestantId")]
        contestant_id: ContestantId,
    },
    #[serde(rename = "INITIAL_LOADING_COMPLETE")]
    InitialLoadingCompleted {
        #[serde(rename = "contestantId")]
        contestant_id: ContestantId,
    },
    #[serde(rename = "GET_CONTESTANT_DATA_REQUEST")]
    ContestantDataRequested { id: ContestantId },
    #[serde(rename = "GET_CONTESTANT_DATA_FAILED")]
    ContestantDataFailed { id: ContestantId },
    #[serde(rename = "GET_CONTESTANT_DATA_SUCCESSFUL")]
    ContestantDataLoaded { payload: TrackPayload },
    #[serde(rename = "DISPLAY_TRACK_FOR_CONTESTANT")]
    DisplayTrackForContestants { payload: ContestantSelection },
    #[serde(rename = "DISPLAY_ALL_TRACKS")]
    DisplayAllTracks,
    #[serde(rename = "HIDE_ALL_TRACKS")]
    HideAllTracks,
    #[serde(rename = "EXCLUSIVE_DISPLAY_TRACK_FOR_CONTESTANT")]
    ExclusiveDisplayTrackForContestant { payload: ContestantRef },
    #[serde(rename = "EXPAND_TRACKING_TABLE")]
    ExpandTrackingTable,
    #[serde(rename = "SHRINK_TRACKING_TABLE")]
    ShrinkTrackingTable,
    #[serde(rename = "SHOW_LOWER_THIRDS")]
    ShowLowerThirds { payload: ContestantRef },
    #[serde(rename = "HIDE_LOWER_THIRDS")]
    HideLowerThirds,
    #[serde(other)]
    Unknown,
}

impl TrackingAction {
    pub fn display_tracks(ids: impl IntoIterator<Item = ContestantId>) -> Self {
        TrackingAction::DisplayTrackForContestants {
            payload: ContestantSelection {
                contestant_ids: ids.into_iter().collect(),
            },
        }
    }

    pub fn exclusive_track(contestant_id: ContestantId) -> Self {
        TrackingAction::ExclusiveDisplayTrackForContestant {
            payload: ContestantRef { contestant_id },
        }
    }

    pub fn show_lower_thirds(contestant_id: ContestantId) -> Self {
        TrackingAction::ShowLowerThirds {
            payload: ContestantRef { contestant_id },
        }
    }

    pub fn loaded(payload: TrackPayload) -> Self {
        TrackingAction::ContestantDataLoaded { payload }
    }

    /// Shape checks beyond what the type system enforces. An action that
    /// fails here must not reach the reducer.
    pub fn validate(&self) -> Result<()> {
        match self {
            TrackingAction::NavigationTaskLoaded { task } => {
                if !task.contestant_set.iter().map(|c| c.id).all_unique() {
                    return Err(Error::InvalidAction(format!(
                        "navigation task {} lists a contestant twice",
                        task.id
                    )));
                }
                Ok(())
            }
            TrackingAction::ContestantDataLoaded {
                payload: TrackPayload::Track(track),
            } => {
                if !track.progress.is_finite() || !(0.0..=100.0).contains(&track.progress) {
                    return Err(Error::InvalidAction(format!(
                        "progress {} for contestant {} is outside 0..=100",
                        track.progress, track.contestant_id
                    )));
                }
                if !track.score.is_finite() {
                    return Err(Error::InvalidAction(format!(
                        "score {} for contestant {} is not a number",
                        track.score, track.contestant_id
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
