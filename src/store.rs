use std::sync::{Arc, Mutex};

use crate::components::tracking::{reduce, State, TrackingAction};
use crate::error::{Error, Result};

struct Inner {
    state: Mutex<Arc<State>>,
    subscribers: Mutex<Vec<flume::Sender<Arc<State>>>>,
}

/// Holds the canonical tracking state. Every dispatch runs the reducer on
/// the current snapshot and swaps in the result, so readers only ever see
/// complete states. Clones share the same state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(State::default())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.inner.subscribers.lock().map(|s| s.len()).ok();
        f.debug_struct("Store")
            .field("subscribers", &subscribers)
            .finish()
    }
}

impl Store {
    pub fn new(initial: State) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(Arc::new(initial)),
                subscribers: Mutex::default(),
            }),
        }
    }

    /// The current snapshot
    pub fn state(&self) -> Result<Arc<State>> {
        Ok(self
            .inner
            .state
            .lock()
            .map_err(|_| Error::StorePoisoned)?
            .clone())
    }

    /// Validates and applies `action`. Dispatches are serialized; the new
    /// snapshot is published to subscribers before the next one can start.
    pub fn dispatch(&self, action: TrackingAction) -> Result<Arc<State>> {
        if let Err(e) = action.validate() {
            log::warn!("{e}");
            return Err(e);
        }
        let mut current = self
            .inner
            .state
            .lock()
            .map_err(|_| Error::StorePoisoned)?;
        let next = Arc::new(reduce(&current, action));
        *current = next.clone();
        self.publish(&next)?;
        Ok(next)
    }

    /// Receives the current snapshot right away, then one per dispatch
    pub fn subscribe(&self) -> Result<flume::Receiver<Arc<State>>> {
        let (sender, receiver) = flume::unbounded();
        // hold the state lock so no dispatch slips in between
        let current = self
            .inner
            .state
            .lock()
            .map_err(|_| Error::StorePoisoned)?;
        let _ = sender.send(current.clone());
        self.inner
            .subscribers
            .lock()
            .map_err(|_| Error::StorePoisoned)?
            .push(sender);
        Ok(receiver)
    }

    fn publish(&self, state: &Arc<State>) -> Result<()> {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .map_err(|_| Error::StorePoisoned)?;
        subscribers.retain(|s| s.send(state.clone()).is_ok());
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .map(|s| s.len())
            .unwrap_or_default()
    }
}
