use crate::environment::entities::{epoch, ContestantTrack};
use crate::environment::model::TrackPayload;

use super::{State, TrackingAction};

/// Computes the state that follows `state` once `action` is applied.
/// `state` itself is left untouched; the persistent maps make the copy cheap.
pub fn reduce(state: &State, action: TrackingAction) -> State {
    let mut next = state.clone();
    apply(action, &mut next);
    next
}

fn apply(action: TrackingAction, state: &mut State) {
    log::trace!("{action:?}");

    match action {
        TrackingAction::SetDisplay { display } => {
            state.current_display = display;
        }
        TrackingAction::NavigationTaskLoaded { task } => {
            let mut contestant_data = im::HashMap::new();
            let mut contestants = im::HashMap::new();
            for contestant in task.contestant_set.iter() {
                let (latest_time, progress) = state
                    .contestant_data
                    .get(&contestant.id)
                    .map(|e| (e.latest_time, e.progress))
                    .unwrap_or((epoch(), 0.0));
                contestant_data.insert(
                    contestant.id,
                    ContestantTrack::seeded(contestant, latest_time, progress),
                );
                contestants.insert(contestant.id, contestant.clone());
            }
            state.contestant_data = contestant_data;
            state.contestants = contestants;
            state.navigation_task = task;
        }
        TrackingAction::InitialLoadingStarted { contestant_id } => {
            state
                .initial_loading_contestant_data
                .insert(contestant_id, true);
        }
        TrackingAction::InitialLoadingCompleted { contestant_id } => {
            state
                .initial_loading_contestant_data
                .insert(contestant_id, false);
        }
        TrackingAction::ContestantDataRequested { id } => {
            state.is_fetching_contestant_data.insert(id, true);
        }
        TrackingAction::ContestantDataFailed { id } => {
            state.is_fetching_contestant_data.insert(id, false);
        }
        TrackingAction::ContestantDataLoaded { payload } => match payload {
            TrackPayload::Empty { contestant_id } => {
                if let Some(id) = contestant_id {
                    state.is_fetching_contestant_data.insert(id, false);
                }
            }
            TrackPayload::Track(mut track) => {
                let id = track.contestant_id;
                state.is_fetching_contestant_data.insert(id, false);
                if !state.contestants.contains_key(&id) {
                    log::debug!("Ignoring data for {id}, not part of the navigation task");
                    return;
                }
                if let Some(current) = state.contestant_data.get(&id) {
                    if track.latest_time == epoch() {
                        // nothing new was recorded, keep polling from where we are
                        track.latest_time = current.latest_time;
                    } else if track.latest_time < current.latest_time {
                        log::debug!(
                            "Ignoring stale data for {id}: {} < {}",
                            track.latest_time,
                            current.latest_time
                        );
                        return;
                    }
                }
                state.contestant_data.insert(id, track);
            }
        },
        TrackingAction::DisplayTrackForContestants { payload } => {
            let mut tracks = state.display_tracks.take().unwrap_or_default();
            tracks.extend(payload.contestant_ids);
            state.display_tracks = Some(tracks);
        }
        TrackingAction::DisplayAllTracks => {
            state.display_tracks = None;
        }
        TrackingAction::HideAllTracks => {
            state.display_tracks = Some(im::OrdSet::new());
        }
        TrackingAction::ExclusiveDisplayTrackForContestant { payload } => {
            state.display_tracks = Some(im::OrdSet::unit(payload.contestant_id));
        }
        TrackingAction::ExpandTrackingTable => {
            state.display_expanded_tracking_table = true;
        }
        TrackingAction::ShrinkTrackingTable => {
            state.display_expanded_tracking_table = false;
        }
        TrackingAction::ShowLowerThirds { payload } => {
            state.display_lower_thirds = Some(payload.contestant_id);
        }
        TrackingAction::HideLowerThirds => {
            state.display_lower_thirds = None;
        }
        TrackingAction::Unknown => {}
    }
}
