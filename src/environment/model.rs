use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::entities::{ContestantId, ContestantTrack, NavigationTask};
use super::types::Configuration;
use crate::error::{Error, Result, ResultExt};

/// Result of a successful track poll. The backend answers `{}` when it has
/// nothing for a contestant; that and undecodable bodies become `Empty`.
#[allow(clippy::large_enum_variant)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackPayload {
    Track(ContestantTrack),
    Empty {
        #[serde(default)]
        contestant_id: Option<ContestantId>,
    },
}

impl TrackPayload {
    pub fn contestant_id(&self) -> Option<ContestantId> {
        match self {
            TrackPayload::Track(track) => Some(track.contestant_id),
            TrackPayload::Empty { contestant_id } => *contestant_id,
        }
    }

    /// Interpret a raw response body
    pub fn from_value(value: serde_json::Value) -> Self {
        let contestant_id = value
            .get("contestant_id")
            .and_then(|e| e.as_u64())
            .map(ContestantId);
        if value.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            return TrackPayload::Empty { contestant_id };
        }
        match serde_json::from_value::<ContestantTrack>(value) {
            Ok(track) => TrackPayload::Track(track),
            Err(e) => {
                log::warn!("Discarding malformed track payload for {contestant_id:?}: {e}");
                TrackPayload::Empty { contestant_id }
            }
        }
    }
}

/// The data the poller needs from the backend
#[async_trait]
pub trait Backend: Send + Sync {
    async fn navigation_task(&self) -> Result<NavigationTask>;
    async fn contestant_track(
        &self,
        contestant: ContestantId,
        from_time: DateTime<Utc>,
    ) -> Result<TrackPayload>;
}

#[derive(Clone)]
pub struct Model {
    base: Url,
    contest_id: u64,
    navigation_task_id: u64,
    client: reqwest::Client,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("base", &self.base.as_str())
            .field("contest_id", &self.contest_id)
            .field("navigation_task_id", &self.navigation_task_id)
            .finish()
    }
}

impl Model {
    pub fn new(config: &Configuration, client: reqwest::Client) -> Self {
        Self {
            base: config.server_url.clone(),
            contest_id: config.contest_id,
            navigation_task_id: config.navigation_task_id,
            client,
        }
    }

    fn task_url(&self, suffix: &str) -> Result<Url> {
        let path = format!(
            "api/v1/contests/{}/navigationtasks/{}/{suffix}",
            self.contest_id, self.navigation_task_id
        );
        self.base
            .join(&path)
            .map_err(|e| Error::Configuration(format!("Invalid url for {path}: {e}")))
    }
}

#[async_trait]
impl Backend for Model {
    async fn navigation_task(&self) -> Result<NavigationTask> {
        let url = self.task_url("")?;
        log::trace!("Navigation task {url}");
        self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .api_error("navigation_task")?
            .json::<NavigationTask>()
            .await
            .api_error("navigation_task")
    }

    async fn contestant_track(
        &self,
        contestant: ContestantId,
        from_time: DateTime<Utc>,
    ) -> Result<TrackPayload> {
        let mut url = self.task_url(&format!("contestants/{contestant}/track_frontend/"))?;
        url.query_pairs_mut().append_pair(
            "from_time",
            &from_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        log::trace!("Contestant track {url}");
        let value = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .api_error("contestant_track")?
            .json::<serde_json::Value>()
            .await
            .api_error("contestant_track")?;
        Ok(TrackPayload::from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> Model {
        let config: Configuration = serde_json::from_value(json!({
            "navigation_task_id": 8,
            "contest_id": 2,
            "server_url": "https://airsports.no/"
        }))
        .unwrap();
        Model::new(&config, reqwest::Client::new())
    }

    #[test]
    fn builds_task_urls() {
        let url = model().task_url("contestants/4/track_frontend/").unwrap();
        assert_eq!(
            url.as_str(),
            "https://airsports.no/api/v1/contests/2/navigationtasks/8/contestants/4/track_frontend/"
        );
    }

    #[test]
    fn empty_object_is_empty_payload() {
        assert_eq!(
            TrackPayload::from_value(json!({})),
            TrackPayload::Empty {
                contestant_id: None
            }
        );
    }

    #[test]
    fn malformed_payload_keeps_id() {
        let payload = TrackPayload::from_value(json!({"contestant_id": 5, "positions": "nope"}));
        assert_eq!(
            payload,
            TrackPayload::Empty {
                contestant_id: Some(ContestantId(5))
            }
        );
    }

    #[test]
    fn full_payload_is_track() {
        let payload = TrackPayload::from_value(json!({
            "contestant_id": 5,
            "latest_time": "2021-05-01T10:00:00Z",
            "positions": [],
            "annotations": [],
            "more_data": false,
            "progress": 30.0,
            "score": 12.0,
            "score_log": [],
            "current_state": "Tracking"
        }));
        let TrackPayload::Track(track) = payload else {
            panic!("expected a track")
        };
        assert_eq!(track.progress, 30.0);
        assert_eq!(track.contestant_id, ContestantId(5));
    }
}
