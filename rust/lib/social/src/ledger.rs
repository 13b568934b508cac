use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Versioned, keyed state with optimistic transactions.
///
/// Every write bumps a per-ledger monotonic version stamped on the entry.
/// An optimistic change goes through `begin` → (`commit` | `rollback`):
///
/// - `begin` captures the pre-image, applies the speculative change and
///   hands back a [`Pending`] ticket carrying the version it wrote.
/// - `commit` applies the server-confirmed value on top of whatever is
///   current. The confirmed answer is the newest write for the key. Its
///   base is the pre-image, or the current value if a newer confirmed
///   write landed after `begin`.
/// - `rollback` restores the pre-image only if the entry still carries the
///   ticket's version. A newer confirmed write is never overwritten by a
///   stale pre-image.
///
/// The lock is never held across an `.await`; callers do their remote call
/// between `begin` and `commit`/`rollback`.
pub struct Ledger<T> {
    entries: Mutex<HashMap<String, Entry<T>>>,
    clock: AtomicU64,
}

struct Entry<T> {
    value: T,
    version: u64,
}

/// Ticket for an optimistic change that has not been confirmed yet.
#[derive(Debug)]
#[must_use = "a pending change must be committed or rolled back"]
pub struct Pending<T> {
    key: String,
    pre_image: T,
    version: u64,
}

impl<T> Pending<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn pre_image(&self) -> &T {
        &self.pre_image
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// What `rollback` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    /// The pre-image is back in place.
    Restored,
    /// A newer write landed after `begin`; it was kept.
    Superseded,
    /// The key was removed in the meantime.
    Missing,
}

impl<T: Clone> Ledger<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.lock().get(key).map(|e| e.value.clone())
    }

    pub fn version(&self, key: &str) -> Option<u64> {
        self.lock().get(key).map(|e| e.version)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a server-confirmed value. Returns the new version.
    pub fn confirm(&self, key: &str, value: T) -> u64 {
        let version = self.tick();
        self.lock()
            .insert(key.to_string(), Entry { value, version });
        version
    }

    /// Store a server-confirmed value derived from the current one, if any.
    pub fn confirm_with<F>(&self, key: &str, f: F) -> u64
    where
        F: FnOnce(Option<&T>) -> T,
    {
        let mut entries = self.lock();
        let value = f(entries.get(key).map(|e| &e.value));
        let version = self.tick();
        entries.insert(key.to_string(), Entry { value, version });
        version
    }

    /// Apply a speculative change to an existing entry.
    ///
    /// Returns `None` if the key is unknown.
    pub fn begin<R, F>(&self, key: &str, f: F) -> Option<(Pending<T>, R)>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut entries = self.lock();
        let entry = entries.get_mut(key)?;
        let pre_image = entry.value.clone();
        let out = f(&mut entry.value);
        entry.version = self.tick();
        Some((
            Pending {
                key: key.to_string(),
                pre_image,
                version: entry.version,
            },
            out,
        ))
    }

    /// Like `begin`, but registers `init()` first when the key is unknown.
    pub fn begin_or_insert<R, I, F>(&self, key: &str, init: I, f: F) -> (Pending<T>, R)
    where
        I: FnOnce() -> T,
        F: FnOnce(&mut T) -> R,
    {
        let mut entries = self.lock();
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: init(),
            version: 0,
        });
        let pre_image = entry.value.clone();
        let out = f(&mut entry.value);
        entry.version = self.tick();
        (
            Pending {
                key: key.to_string(),
                pre_image,
                version: entry.version,
            },
            out,
        )
    }

    /// Apply the confirmed outcome of `pending`.
    ///
    /// `f` receives the base and the current value. The base is the
    /// pre-image while the entry still carries the ticket's version, and a
    /// copy of the current value once something newer has been written.
    /// Returns the stored value, or `None` if the key was removed while the
    /// call was in flight.
    pub fn commit<F>(&self, pending: Pending<T>, f: F) -> Option<T>
    where
        F: FnOnce(&T, &mut T),
    {
        let mut entries = self.lock();
        let entry = entries.get_mut(&pending.key)?;
        let base = if entry.version == pending.version {
            pending.pre_image
        } else {
            entry.value.clone()
        };
        f(&base, &mut entry.value);
        entry.version = self.tick();
        Some(entry.value.clone())
    }

    /// Undo `pending` unless something newer has been written since.
    pub fn rollback(&self, pending: Pending<T>) -> Rollback {
        let mut entries = self.lock();
        match entries.get_mut(&pending.key) {
            None => Rollback::Missing,
            Some(entry) if entry.version != pending.version => Rollback::Superseded,
            Some(entry) => {
                entry.value = pending.pre_image;
                entry.version = self.tick();
                Rollback::Restored
            }
        }
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        self.lock().remove(key).map(|e| e.value)
    }

    /// All entries, ordered by key.
    pub fn snapshot(&self) -> Vec<(String, T)> {
        let mut out: Vec<(String, T)> = self
            .lock()
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl<T: Clone> Default for Ledger<T> {
    fn default() -> Self {
        Self::new()
    }
}
