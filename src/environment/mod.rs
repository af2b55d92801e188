pub mod devices;
pub mod entities;
pub mod model;
pub mod types;

use std::sync::Arc;

pub use devices::DeviceList;
pub use model::{Backend, Model};

use self::types::Configuration;
use crate::error::{Result, ResultExt};

/// Everything the tracking core talks to outside of its own state
#[derive(Clone)]
pub struct Environment {
    pub config: Arc<Configuration>,
    pub backend: Arc<dyn Backend>,
    pub devices: Option<DeviceList>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("devices", &self.devices)
            .finish()
    }
}

impl Environment {
    /// Builds the live environment. Starts the device fetch, so this has to
    /// run inside a tokio runtime.
    pub fn new(config: Configuration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .api_error("http_client")?;
        let model = Model::new(&config, client.clone());
        let devices = config
            .traccar
            .clone()
            .map(|traccar| DeviceList::new(traccar, client, config.device_timeout()));
        Ok(Self {
            config: Arc::new(config),
            backend: Arc::new(model),
            devices,
        })
    }

    pub fn with_backend(config: Configuration, backend: Arc<dyn Backend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            devices: None,
        }
    }
}
