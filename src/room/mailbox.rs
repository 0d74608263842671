//! Latest-intent mailbox
//!
//! Connection tasks overwrite the slot as often as they like; the tick task
//! takes whatever is there once per tick.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::sim::Intent;

/// One overwritten intent per train
#[derive(Debug, Default)]
pub struct IntentSlot {
    latest: Mutex<Option<Intent>>,
}

impl IntentSlot {
    fn lock(&self) -> MutexGuard<'_, Option<Intent>> {
        // An intent is plain data, a panicked writer cannot leave it torn
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace any intent not yet consumed
    pub fn submit(&self, intent: Intent) {
        *self.lock() = Some(intent);
    }

    /// Take the latest intent, leaving the slot empty
    pub fn take(&self) -> Option<Intent> {
        self.lock().take()
    }

    pub fn clear(&self) {
        self.lock().take();
    }
}
