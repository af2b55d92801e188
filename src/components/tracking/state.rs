use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::environment::entities::{Contestant, ContestantId, ContestantTrack, NavigationTask};

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayType {
    #[default]
    SimpleRankDisplay,
    ContestantDetailsDisplay,
}

#[derive(Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMode {
    pub display_type: DisplayType,
    /// Only meaningful for the details display
    #[serde(default)]
    pub contestant_id: Option<ContestantId>,
}

impl DisplayMode {
    pub fn details(contestant_id: ContestantId) -> Self {
        Self {
            display_type: DisplayType::ContestantDetailsDisplay,
            contestant_id: Some(contestant_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct State {
    pub navigation_task: NavigationTask,
    pub contestant_data: im::HashMap<ContestantId, ContestantTrack>,
    pub contestants: im::HashMap<ContestantId, Contestant>,
    pub current_display: DisplayMode,
    /// `None` shows every track, an empty set shows none
    pub display_tracks: Option<im::OrdSet<ContestantId>>,
    pub display_expanded_tracking_table: bool,
    pub is_fetching_contestant_data: im::HashMap<ContestantId, bool>,
    pub initial_loading_contestant_data: im::HashMap<ContestantId, bool>,
    /// Contestant whose team badge is shown in the lower third
    pub display_lower_thirds: Option<ContestantId>,
}

impl State {
    pub fn is_fetching(&self, id: ContestantId) -> bool {
        self.is_fetching_contestant_data
            .get(&id)
            .copied()
            .unwrap_or(false)
    }

    /// `None` until the first load for this contestant started
    pub fn initial_loading(&self, id: ContestantId) -> Option<bool> {
        self.initial_loading_contestant_data.get(&id).copied()
    }

    pub fn contestant_ids(&self) -> Vec<ContestantId> {
        let mut ids: Vec<_> = self.contestants.keys().copied().collect();
        ids.sort();
        ids
    }
}
