//! Note mutation broadcast bus and one-shot action slots

use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::models::Note;

const EVENT_BUS_CAPACITY: usize = 64;

/// A note mutation visible to other parts of the app.
#[derive(Debug, Clone)]
pub enum NoteEvent {
    Created(Note),
    Updated(Note),
    Deleted(i64),
}

/// Process-scoped publish/subscribe bus for note mutations.
///
/// Subscribers receive subsequent events only; there is no replay.
#[derive(Clone)]
pub struct NoteEventBus {
    sender: broadcast::Sender<NoteEvent>,
}

impl NoteEventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _rx) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NoteEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: NoteEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for NoteEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A single settable action slot: set, then invoke.
///
/// Deliberately not a multi-subscriber system; setting again replaces the
/// previous action.
#[derive(Default)]
pub struct ActionSlot {
    action: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl ActionSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_action(&self, action: impl Fn() + Send + 'static) {
        if let Ok(mut slot) = self.action.lock() {
            *slot = Some(Box::new(action));
        }
    }

    /// Invoke the registered action; a no-op until one is set.
    pub fn invoke(&self) {
        if let Ok(slot) = self.action.lock() {
            if let Some(action) = slot.as_ref() {
                action();
            }
        }
    }
}

/// An [`ActionSlot`] whose action takes an optional parameter.
pub struct ParameterizedActionSlot<T> {
    action: Mutex<Option<Box<dyn Fn(Option<T>) + Send>>>,
}

impl<T> ParameterizedActionSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            action: Mutex::new(None),
        }
    }

    pub fn set_action(&self, action: impl Fn(Option<T>) + Send + 'static) {
        if let Ok(mut slot) = self.action.lock() {
            *slot = Some(Box::new(action));
        }
    }

    pub fn invoke(&self, parameter: Option<T>) {
        if let Ok(slot) = self.action.lock() {
            if let Some(action) = slot.as_ref() {
                action(parameter);
            }
        }
    }
}

impl<T> Default for ParameterizedActionSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
