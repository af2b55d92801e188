mod action;
mod reducer;
mod state;

pub use action::{ContestantRef, ContestantSelection, TrackingAction};
pub use reducer::reduce;
pub use state::{DisplayMode, DisplayType, State};
