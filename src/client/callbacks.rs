//! Single-slot event handlers.
//!
//! Each event kind has exactly one slot. Setting a slot replaces whatever was
//! there; an empty slot means the event is handled without calling user code.
//! Handlers are cloned out of their slot before being invoked, so a handler
//! may itself replace or clear slots.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{FeedClient, FeedId};

/// Handler for connect and clean disconnect events.
pub type LifecycleHandler = Arc<dyn Fn(&FeedClient) + Send + Sync>;

/// Handler for feed updates: the feed id and the raw payload.
pub type MessageHandler = Arc<dyn Fn(&FeedClient, &FeedId, &[u8]) + Send + Sync>;

/// Acquire mutex guard, ignoring poisoning
fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Default)]
pub(crate) struct CallbackSlots {
    // ---
    connect: Mutex<Option<LifecycleHandler>>,
    disconnect: Mutex<Option<LifecycleHandler>>,
    message: Mutex<Option<MessageHandler>>,
}

impl CallbackSlots {
    // ---
    pub(crate) fn set_connect(&self, handler: Option<LifecycleHandler>) {
        *lock_ignore_poison(&self.connect) = handler;
    }

    pub(crate) fn set_disconnect(&self, handler: Option<LifecycleHandler>) {
        *lock_ignore_poison(&self.disconnect) = handler;
    }

    pub(crate) fn set_message(&self, handler: Option<MessageHandler>) {
        *lock_ignore_poison(&self.message) = handler;
    }

    pub(crate) fn connect(&self) -> Option<LifecycleHandler> {
        lock_ignore_poison(&self.connect).clone()
    }

    pub(crate) fn disconnect(&self) -> Option<LifecycleHandler> {
        lock_ignore_poison(&self.disconnect).clone()
    }

    pub(crate) fn message(&self) -> Option<MessageHandler> {
        lock_ignore_poison(&self.message).clone()
    }
}
