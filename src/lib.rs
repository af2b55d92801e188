mod app;
pub mod components;
pub mod environment;
pub mod error;
pub mod helper;
pub mod poller;
pub mod store;
pub mod view_model;

pub use app::{init_logging, run};
pub use components::tracking::{reduce, DisplayMode, DisplayType, State, TrackingAction};
pub use environment::types::Configuration;
pub use environment::Environment;
pub use error::{Error, Result};
pub use poller::Poller;
pub use store::Store;
