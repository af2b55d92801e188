use std::sync::Arc;

use tokio::sync::watch;

use crate::components::tracking::State;
use crate::environment::types::Configuration;
use crate::environment::Environment;
use crate::error::Result;
use crate::poller::Poller;
use crate::store::Store;
use crate::view_model::{loading_percentage, score_table};

pub fn init_logging() {
    use env_logger::Env;
    use std::io::Write;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stdout)
        .init();
}

/// Tracks the configured navigation task until Ctrl-C (or, outside of
/// live mode, until every contestant is loaded).
pub async fn run(config: Configuration) -> Result<()> {
    log::info!(
        "Tracking navigation task {} of contest {} at {}",
        config.navigation_task_id,
        config.contest_id,
        config.server_url
    );
    let environment = Environment::new(config)?;
    let store = Store::default();
    let (shutdown_sender, shutdown) = watch::channel(false);

    let updates = store.subscribe()?;
    let reporter = tokio::spawn(report(environment.clone(), updates, shutdown.clone()));
    let mut poller = tokio::spawn(Poller::new(environment, store).run(shutdown));

    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, shutting down");
            Ok(())
        }
        finished = &mut poller => {
            finished.unwrap_or_else(|e| {
                log::error!("Poller task failed: {e:?}");
                Ok(())
            })
        }
    };

    let _ = shutdown_sender.send(true);
    if !poller.is_finished() {
        let _ = poller.await;
    }
    let _ = reporter.await;
    result
}

/// Logs what a score board would show whenever it changes
async fn report(
    environment: Environment,
    updates: flume::Receiver<Arc<State>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut last_loading = None;
    let mut last_board = Vec::new();
    let mut checked_devices = false;
    loop {
        let state = tokio::select! {
            received = updates.recv_async() => match received {
                Ok(state) => state,
                Err(_) => return,
            },
            _ = shutdown.changed() => return,
        };

        if !checked_devices && !state.contestants.is_empty() {
            checked_devices = true;
            tokio::spawn(check_devices(environment.clone(), state.clone()));
        }

        let loading = loading_percentage(&state);
        if last_loading != Some(loading) {
            last_loading = Some(loading);
            if loading < 100 {
                log::info!("Loading contestant data: {loading}%");
            }
        }

        let board: Vec<_> = score_table(&state)
            .into_iter()
            .map(|row| {
                format!(
                    "{} #{} {} score {} est {} ({:.0}%)",
                    row.rank_str,
                    row.contestant_number,
                    row.team_name.unwrap_or_default(),
                    row.score_str,
                    row.projected_score_str,
                    row.progress,
                )
            })
            .collect();
        if board != last_board {
            for line in board.iter() {
                log::debug!("{line}");
            }
            last_board = board;
        }
    }
}

async fn check_devices(environment: Environment, state: Arc<State>) {
    let Some(devices) = environment.devices else {
        return;
    };
    for id in state.contestant_ids() {
        let Some(contestant) = state.contestants.get(&id) else {
            continue;
        };
        let Some(name) = contestant.tracker_device_id.as_deref() else {
            continue;
        };
        match devices.device_by_name(name).await {
            Ok(Some(device)) => log::info!(
                "Contestant {id} tracker {name}: {} (last update {:?})",
                device.status,
                device.last_update
            ),
            Ok(None) => log::warn!("Contestant {id} tracker {name} is unknown to traccar"),
            Err(e) => {
                log::warn!("Could not check trackers: {e}");
                return;
            }
        }
    }
}
