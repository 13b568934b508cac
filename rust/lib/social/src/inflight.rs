use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::SocialError;

/// At most one outstanding remote action per key.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

/// Held while an action on `key` is outstanding; released on drop.
#[derive(Debug)]
pub struct Permit {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

fn lock(keys: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    keys.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or fail with `SocialError::InFlight` if already claimed.
    pub fn try_acquire(&self, key: &str) -> Result<Permit, SocialError> {
        if !lock(&self.keys).insert(key.to_string()) {
            return Err(SocialError::InFlight(key.to_string()));
        }
        Ok(Permit {
            keys: Arc::clone(&self.keys),
            key: key.to_string(),
        })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        lock(&self.keys).contains(key)
    }
}

impl Permit {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}
