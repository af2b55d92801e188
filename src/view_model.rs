use std::cmp::Ordering;

use itertools::Itertools;

use crate::components::tracking::State;
use crate::environment::entities::{Contestant, ContestantId, ContestantTrack, TrackState};
use crate::helper::{format_projected_score, format_rank, format_score};

/// Progress as displayed: clamped to 0..=100, garbage becomes 0
pub fn clamped_progress(progress: f64) -> f64 {
    if progress.is_finite() {
        progress.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Linear estimate of the final score. `None` while nothing can be said
/// (no progress yet).
pub fn projected_score(score: f64, progress: f64) -> Option<f64> {
    let progress = clamped_progress(progress);
    if progress <= 0.0 {
        return None;
    }
    let projected = score * 100.0 / progress;
    projected.is_finite().then_some(projected)
}

pub fn is_finished(track: &ContestantTrack) -> bool {
    track.current_state == TrackState::Finished
}

/// Lower score is better. Ties go to the lower contestant number, then the
/// lower id, so the order is total.
fn compare_score(a: &(&Contestant, &ContestantTrack), b: &(&Contestant, &ContestantTrack)) -> Ordering {
    a.1.score
        .total_cmp(&b.1.score)
        .then_with(|| a.0.contestant_number.cmp(&b.0.contestant_number))
        .then_with(|| a.0.id.cmp(&b.0.id))
}

/// Contestants with both metadata and tracking data, best first
pub fn ranking(state: &State) -> Vec<ContestantId> {
    state
        .contestant_data
        .iter()
        .filter_map(|(id, track)| state.contestants.get(id).map(|c| (c, track)))
        .sorted_by(compare_score)
        .map(|(c, _)| c.id)
        .collect()
}

/// 1-based position of `id` in [`ranking`]
pub fn rank(state: &State, id: ContestantId) -> Option<usize> {
    ranking(state)
        .iter()
        .position(|e| *e == id)
        .map(|index| index + 1)
}

/// Share of known contestants whose first load finished, in percent
pub fn loading_percentage(state: &State) -> u8 {
    let known = state.contestants.len();
    if known == 0 {
        return 100;
    }
    let finished = state
        .contestants
        .keys()
        .filter(|id| state.initial_loading(**id) == Some(false))
        .count();
    (100.0 * finished as f64 / known as f64).round() as u8
}

pub fn is_track_visible(state: &State, id: ContestantId) -> bool {
    match &state.display_tracks {
        None => true,
        Some(tracks) => tracks.contains(&id),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContestantRow {
    pub id: ContestantId,
    pub contestant_number: u32,
    pub team_name: Option<String>,
    pub rank: usize,
    pub rank_str: String,
    pub score: f64,
    pub score_str: String,
    pub projected_score: Option<f64>,
    pub projected_score_str: String,
    pub progress: f64,
    pub finished: bool,
    pub current_state: TrackState,
    pub loading: bool,
    pub track_visible: bool,
}

/// One row per ranked contestant, in rank order
pub fn score_table(state: &State) -> Vec<ContestantRow> {
    ranking(state)
        .into_iter()
        .enumerate()
        .filter_map(|(index, id)| {
            let contestant = state.contestants.get(&id)?;
            let track = state.contestant_data.get(&id)?;
            let progress = clamped_progress(track.progress);
            let projected = projected_score(track.score, progress);
            Some(ContestantRow {
                id,
                contestant_number: contestant.contestant_number,
                team_name: contestant.team.as_ref().and_then(|t| t.name.clone()),
                rank: index + 1,
                rank_str: format_rank(Some(index + 1)),
                score: track.score,
                score_str: format_score(track.score),
                projected_score: projected,
                projected_score_str: format_projected_score(projected),
                progress,
                finished: is_finished(track),
                current_state: track.current_state.clone(),
                loading: state.initial_loading(id).unwrap_or(false),
                track_visible: is_track_visible(state, id),
            })
        })
        .collect()
}
