use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API Error: {call} {message}")]
    Api { call: &'static str, message: String },

    #[error("Rejected action: {0}")]
    InvalidAction(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Device list unavailable: {0}")]
    DeviceList(String),

    #[error("Device list did not load within {0:?}")]
    DeviceListTimeout(Duration),

    #[error("Store lock poisoned")]
    StorePoisoned,
}

/// Maps transport errors into [`Error::Api`] and logs them on the way.
pub trait ResultExt {
    type Output;
    fn api_error(self, call: &'static str) -> Result<Self::Output>;
}

impl<T, E: std::fmt::Debug> ResultExt for std::result::Result<T, E> {
    type Output = T;
    fn api_error(self, call: &'static str) -> Result<T> {
        self.map_err(|e| {
            let message = format!("{e:?}");
            log::error!("API Error: {call} {message}");
            Error::Api { call, message }
        })
    }
}
