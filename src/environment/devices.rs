use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::types::{Device, TraccarConfig};
use crate::error::{Error, Result, ResultExt};

#[derive(Clone, Debug)]
enum LoadState {
    Loading,
    Loaded(Arc<Vec<Device>>),
    Failed(String),
}

/// Locally cached list of Traccar devices. The list is fetched in the
/// background; lookups wait for that fetch (bounded by `timeout`).
#[derive(Clone)]
pub struct DeviceList {
    config: Option<TraccarConfig>,
    client: reqwest::Client,
    timeout: Duration,
    state: Arc<watch::Sender<LoadState>>,
    /// Bumped by every `refresh`; only the newest fetch may publish
    generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for DeviceList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceList")
            .field("url", &self.config.as_ref().map(|c| c.url.as_str()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DeviceList {
    /// Starts fetching immediately. Must be called within a tokio runtime.
    pub fn new(config: TraccarConfig, client: reqwest::Client, timeout: Duration) -> Self {
        let (sender, _) = watch::channel(LoadState::Loading);
        let list = Self {
            config: Some(config),
            client,
            timeout,
            state: Arc::new(sender),
            generation: Arc::default(),
        };
        list.refresh();
        list
    }

    /// A list that never talks to a server
    pub fn from_devices(devices: Vec<Device>, timeout: Duration) -> Self {
        let (sender, _) = watch::channel(LoadState::Loaded(Arc::new(devices)));
        Self {
            config: None,
            client: reqwest::Client::new(),
            timeout,
            state: Arc::new(sender),
            generation: Arc::default(),
        }
    }

    /// Re-fetch the device list. Lookups issued meanwhile wait for the new data.
    pub fn refresh(&self) {
        let Some(config) = self.config.clone() else {
            return;
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(LoadState::Loading);
        let client = self.client.clone();
        let state = self.state.clone();
        let latest = self.generation.clone();
        tokio::spawn(async move {
            let next = match fetch_devices(&client, &config).await {
                Ok(devices) => {
                    log::debug!("Loaded {} devices", devices.len());
                    LoadState::Loaded(Arc::new(devices))
                }
                Err(e) => LoadState::Failed(e.to_string()),
            };
            state.send_if_modified(|current| {
                if latest.load(Ordering::SeqCst) != generation {
                    log::debug!("Dropping device list of superseded fetch {generation}");
                    return false;
                }
                *current = next;
                true
            });
        });
    }

    pub async fn devices(&self) -> Result<Arc<Vec<Device>>> {
        let mut receiver = self.state.subscribe();
        let waited = tokio::time::timeout(
            self.timeout,
            receiver.wait_for(|s| !matches!(s, LoadState::Loading)),
        )
        .await
        .map_err(|_| Error::DeviceListTimeout(self.timeout))?
        .map_err(|_| Error::DeviceList("device list was dropped".to_string()))?;
        match &*waited {
            LoadState::Loaded(devices) => Ok(devices.clone()),
            LoadState::Failed(e) => Err(Error::DeviceList(e.clone())),
            LoadState::Loading => Err(Error::DeviceList("still loading".to_string())),
        }
    }

    pub async fn device_by_id(&self, id: u64) -> Result<Option<Device>> {
        Ok(self.devices().await?.iter().find(|d| d.id == id).cloned())
    }

    pub async fn device_by_name(&self, name: &str) -> Result<Option<Device>> {
        Ok(self
            .devices()
            .await?
            .iter()
            .find(|d| d.name == name)
            .cloned())
    }
}

async fn fetch_devices(client: &reqwest::Client, config: &TraccarConfig) -> Result<Vec<Device>> {
    let url = config
        .url
        .join("api/devices")
        .map_err(|e| Error::Configuration(format!("Invalid traccar url: {e}")))?;
    let mut request = client.get(url);
    if let Some(token) = &config.token {
        request = request.bearer_auth(token);
    }
    request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .api_error("devices")?
        .json::<Vec<Device>>()
        .await
        .api_error("devices")
}
