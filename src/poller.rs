use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::components::tracking::TrackingAction;
use crate::environment::entities::{epoch, ContestantId};
use crate::environment::model::TrackPayload;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::store::Store;

/// Feeds the store from the backend: loads the navigation task once, then
/// requests fresh track data for every contestant on each tick.
#[derive(Clone, Debug)]
pub struct Poller {
    environment: Environment,
    store: Store,
}

impl Poller {
    pub fn new(environment: Environment, store: Store) -> Self {
        Self { environment, store }
    }

    pub async fn load_navigation_task(&self) -> Result<()> {
        let task = self.environment.backend.navigation_task().await?;
        log::info!(
            "Loaded navigation task {} '{}' with {} contestants",
            task.id,
            task.name,
            task.contestant_set.len()
        );
        self.store
            .dispatch(TrackingAction::NavigationTaskLoaded { task })?;
        Ok(())
    }

    /// One poll cycle. Contestants with a request in flight are skipped;
    /// all others are requested concurrently.
    pub async fn poll_once(&self) -> Result<()> {
        let state = self.store.state()?;
        let pending: Vec<_> = state
            .contestant_ids()
            .into_iter()
            .filter(|id| !state.is_fetching(*id))
            .collect();
        log::trace!("Polling {} contestants", pending.len());
        join_all(pending.into_iter().map(|id| self.poll_contestant(id)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    async fn poll_contestant(&self, id: ContestantId) -> Result<()> {
        let state = self.store.state()?;
        let from_time = state
            .contestant_data
            .get(&id)
            .map(|track| track.latest_time)
            .unwrap_or_else(epoch);
        if state.initial_loading(id).is_none() {
            self.store
                .dispatch(TrackingAction::InitialLoadingStarted { contestant_id: id })?;
        }
        self.store
            .dispatch(TrackingAction::ContestantDataRequested { id })?;

        let payload = match self
            .environment
            .backend
            .contestant_track(id, from_time)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Could not fetch data for contestant {id}: {e}");
                self.store
                    .dispatch(TrackingAction::ContestantDataFailed { id })?;
                return Ok(());
            }
        };

        let payload = match payload {
            TrackPayload::Track(track) if track.contestant_id != id => {
                log::warn!(
                    "Asked for contestant {id}, got data for {}",
                    track.contestant_id
                );
                TrackPayload::Empty {
                    contestant_id: Some(id),
                }
            }
            TrackPayload::Empty { .. } => TrackPayload::Empty {
                contestant_id: Some(id),
            },
            track => track,
        };
        let complete = match &payload {
            TrackPayload::Track(track) => !track.more_data,
            TrackPayload::Empty { .. } => true,
        };

        match self.store.dispatch(TrackingAction::loaded(payload)) {
            Ok(next) => {
                if complete && next.initial_loading(id) == Some(true) {
                    log::debug!("Initial loading for contestant {id} complete");
                    self.store
                        .dispatch(TrackingAction::InitialLoadingCompleted { contestant_id: id })?;
                }
                Ok(())
            }
            Err(Error::InvalidAction(_)) => {
                self.store
                    .dispatch(TrackingAction::ContestantDataFailed { id })?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Outside of live mode there is nothing left to fetch once every
    /// contestant finished its initial load.
    fn is_done(&self) -> Result<bool> {
        if self.environment.config.live_mode {
            return Ok(false);
        }
        let state = self.store.state()?;
        Ok(state
            .contestants
            .keys()
            .all(|id| state.initial_loading(*id) == Some(false)))
    }

    /// Runs until `shutdown` flips (or, for playback, until all data is in)
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let period = self.environment.config.fetch_interval();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let loaded = tokio::select! {
                        loaded = self.load_navigation_task() => loaded,
                        _ = shutdown.changed() => return Ok(()),
                    };
                    match loaded {
                        Ok(()) => break,
                        Err(Error::StorePoisoned) => return Err(Error::StorePoisoned),
                        Err(e) => log::warn!("Could not load navigation task, retrying: {e}"),
                    }
                }
                _ = shutdown.changed() => return Ok(()),
            }
        }

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // a stalled request must not hold up shutdown
                    let polled = tokio::select! {
                        polled = self.poll_once() => polled,
                        _ = shutdown.changed() => {
                            log::debug!("Poller shutting down with requests in flight");
                            return Ok(());
                        }
                    };
                    if let Err(e) = polled {
                        log::error!("Poll failed: {e}");
                        if matches!(e, Error::StorePoisoned) {
                            return Err(e);
                        }
                    }
                    if self.is_done()? {
                        log::info!("All contestant data loaded, stopping");
                        return Ok(());
                    }
                }
                _ = shutdown.changed() => {
                    log::debug!("Poller shutting down");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    use super::*;
    use crate::environment::entities::{
        Contestant, ContestantTrack, NavigationTask, TrackState,
    };
    use crate::environment::types::Configuration;
    use crate::environment::Backend;

    type Responses = HashMap<ContestantId, VecDeque<Result<TrackPayload>>>;

    struct FakeBackend {
        task: NavigationTask,
        responses: Mutex<Responses>,
        requests: Mutex<Vec<(ContestantId, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn navigation_task(&self) -> Result<NavigationTask> {
            Ok(self.task.clone())
        }

        async fn contestant_track(
            &self,
            contestant: ContestantId,
            from_time: DateTime<Utc>,
        ) -> Result<TrackPayload> {
            self.requests.lock().unwrap().push((contestant, from_time));
            self.responses
                .lock()
                .unwrap()
                .get_mut(&contestant)
                .and_then(|queue| queue.pop_front())
                .unwrap_or(Ok(TrackPayload::Empty {
                    contestant_id: None,
                }))
        }
    }

    /// Knows the task but never answers a track request
    struct StalledBackend {
        task: NavigationTask,
    }

    #[async_trait]
    impl Backend for StalledBackend {
        async fn navigation_task(&self) -> Result<NavigationTask> {
            Ok(self.task.clone())
        }

        async fn contestant_track(
            &self,
            _contestant: ContestantId,
            _from_time: DateTime<Utc>,
        ) -> Result<TrackPayload> {
            std::future::pending().await
        }
    }

    fn id(n: u64) -> ContestantId {
        ContestantId(n)
    }

    fn config(live_mode: bool) -> Configuration {
        serde_json::from_value(json!({
            "navigation_task_id": 1,
            "contest_id": 1,
            "server_url": "http://localhost/",
            "fetch_interval_ms": 5,
            "live_mode": live_mode
        }))
        .unwrap()
    }

    fn contestant(n: u64) -> Contestant {
        Contestant {
            id: id(n),
            contestant_number: n as u32,
            team: None,
            tracker_device_id: None,
            takeoff_time: None,
            finished_by_time: None,
            contestanttrack: None,
        }
    }

    fn track(n: u64, latest: &str, more_data: bool, progress: f64) -> TrackPayload {
        TrackPayload::Track(ContestantTrack {
            contestant_id: id(n),
            latest_time: latest.parse().unwrap(),
            positions: Vec::new(),
            annotations: Vec::new(),
            more_data,
            progress,
            score: 4.0,
            score_log: Vec::new(),
            current_state: TrackState::Tracking,
        })
    }

    fn setup(
        ids: &[u64],
        responses: Vec<(u64, Result<TrackPayload>)>,
        live_mode: bool,
    ) -> (Poller, Store, Arc<FakeBackend>) {
        let mut queues = Responses::new();
        for (n, response) in responses {
            queues.entry(id(n)).or_default().push_back(response);
        }
        let backend = Arc::new(FakeBackend {
            task: NavigationTask {
                id: 1,
                name: "Fake".to_string(),
                route: Default::default(),
                contestant_set: ids.iter().map(|n| contestant(*n)).collect(),
            },
            responses: Mutex::new(queues),
            requests: Mutex::default(),
        });
        let store = Store::default();
        let environment = Environment::with_backend(config(live_mode), backend.clone());
        (Poller::new(environment, store.clone()), store, backend)
    }

    #[tokio::test]
    async fn poll_applies_results_and_failures() {
        let (poller, store, _) = setup(
            &[1, 2],
            vec![
                (1, Ok(track(1, "2021-05-01T10:00:00Z", false, 25.0))),
                (
                    2,
                    Err(Error::Api {
                        call: "contestant_track",
                        message: "timeout".to_string(),
                    }),
                ),
            ],
            true,
        );
        poller.load_navigation_task().await.unwrap();
        poller.poll_once().await.unwrap();

        let state = store.state().unwrap();
        assert_eq!(state.contestant_data[&id(1)].progress, 25.0);
        assert!(!state.is_fetching(id(1)));
        assert!(!state.is_fetching(id(2)));
        assert_eq!(state.initial_loading(id(1)), Some(false));
        assert_eq!(state.initial_loading(id(2)), Some(true));
        assert_eq!(state.contestant_data[&id(2)].progress, 0.0);
    }

    #[tokio::test]
    async fn dispatch_sequence_for_one_contestant() {
        let (poller, store, _) = setup(
            &[1],
            vec![(1, Ok(track(1, "2021-05-01T10:00:00Z", false, 25.0)))],
            true,
        );
        poller.load_navigation_task().await.unwrap();
        let receiver = store.subscribe().unwrap();
        poller.poll_once().await.unwrap();

        let snapshots: Vec<_> = receiver
            .try_iter()
            .map(|s| (s.initial_loading(id(1)), s.is_fetching(id(1))))
            .collect();
        assert_eq!(
            snapshots,
            vec![
                (None, false),
                (Some(true), false),
                (Some(true), true),
                (Some(true), false),
                (Some(false), false),
            ]
        );
    }

    #[tokio::test]
    async fn next_poll_continues_from_latest_time() {
        let (poller, _, backend) = setup(
            &[1],
            vec![
                (1, Ok(track(1, "2021-05-01T10:00:00Z", true, 10.0))),
                (1, Ok(track(1, "2021-05-01T10:02:00Z", false, 20.0))),
            ],
            true,
        );
        poller.load_navigation_task().await.unwrap();
        poller.poll_once().await.unwrap();
        poller.poll_once().await.unwrap();

        let requests = backend.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1, epoch());
        assert_eq!(
            requests[1].1,
            "2021-05-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[tokio::test]
    async fn in_flight_contestants_are_skipped() {
        let (poller, store, backend) = setup(&[1, 2], Vec::new(), true);
        poller.load_navigation_task().await.unwrap();
        store
            .dispatch(TrackingAction::ContestantDataRequested { id: id(1) })
            .unwrap();
        poller.poll_once().await.unwrap();

        let requested: Vec<_> = backend
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(requested, vec![id(2)]);
    }

    #[tokio::test]
    async fn rejected_payload_counts_as_failure() {
        let (poller, store, _) = setup(
            &[1],
            vec![(1, Ok(track(1, "2021-05-01T10:00:00Z", false, 180.0)))],
            true,
        );
        poller.load_navigation_task().await.unwrap();
        poller.poll_once().await.unwrap();
        let state = store.state().unwrap();
        assert!(!state.is_fetching(id(1)));
        assert_eq!(state.contestant_data[&id(1)].progress, 0.0);
        assert_eq!(state.initial_loading(id(1)), Some(true));
    }

    #[tokio::test]
    async fn mismatched_payload_only_clears_flag() {
        let (poller, store, _) = setup(
            &[1, 2],
            vec![(1, Ok(track(2, "2021-05-01T10:00:00Z", false, 50.0)))],
            true,
        );
        poller.load_navigation_task().await.unwrap();
        poller.poll_once().await.unwrap();
        let state = store.state().unwrap();
        assert!(!state.is_fetching(id(1)));
        assert_eq!(state.contestant_data[&id(2)].progress, 0.0);
    }

    #[tokio::test]
    async fn playback_stops_after_initial_load() {
        let (poller, store, _) = setup(
            &[1],
            vec![(1, Ok(track(1, "2021-05-01T10:00:00Z", false, 100.0)))],
            false,
        );
        let (_sender, shutdown) = watch::channel(false);
        tokio::time::timeout(Duration::from_secs(5), poller.run(shutdown))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.state().unwrap().initial_loading(id(1)), Some(false));
    }

    #[tokio::test]
    async fn live_mode_runs_until_shutdown() {
        let (poller, store, backend) = setup(&[1], Vec::new(), true);
        let (sender, shutdown) = watch::channel(false);
        let handle = tokio::spawn(poller.run(shutdown));
        tokio::time::sleep(Duration::from_millis(50)).await;
        sender.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(!backend.requests.lock().unwrap().is_empty());
        assert_eq!(store.state().unwrap().navigation_task.name, "Fake");
    }

    #[tokio::test]
    async fn shutdown_interrupts_stalled_requests() {
        let backend = Arc::new(StalledBackend {
            task: NavigationTask {
                id: 1,
                name: "Stalled".to_string(),
                route: Default::default(),
                contestant_set: vec![contestant(1)],
            },
        });
        let store = Store::default();
        let environment = Environment::with_backend(config(true), backend);
        let (sender, shutdown) = watch::channel(false);
        let handle = tokio::spawn(Poller::new(environment, store.clone()).run(shutdown));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.state().unwrap().is_fetching(id(1)));
        sender.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
