//! The typed keyspace (`spec.md` §4.2).
//!
//! Grounded in the teacher's `db.rs` `Db`/`DbSharedState` split: a cheap
//! `Clone` handle over an `Arc`, state guarded by a `std::sync::RwLock` (no
//! `.await` is ever held across the guard, so a blocking lock is
//! appropriate), and a background reaper spawned at construction. Unlike the
//! teacher, the single mutating primitive is `mutate` — every write command
//! goes through it — and keys are `Bytes` rather than `String`, since the
//! store must be binary-safe (`spec.md` §3).
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::error::CmdError;
use crate::expiry::ExpiryManager;
use crate::value::{TypeTag, Value};

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.map(|d| d > now).unwrap_or(true)
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<Bytes, Entry>,
}

struct Shared {
    state: RwLock<State>,
    expiry: Arc<ExpiryManager>,
}

/// A handle to the shared keyspace. Cloning is shallow (an `Arc` bump).
#[derive(Clone)]
pub struct Store {
    shared: Arc<Shared>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlResult {
    Missing,
    NoExpiry,
    ExpiresInSeconds(i64),
}

impl Store {
    pub fn new() -> Self {
        let expiry = Arc::new(ExpiryManager::new());
        let shared = Arc::new(Shared {
            state: RwLock::new(State::default()),
            expiry: expiry.clone(),
        });
        expiry.attach(Store { shared: shared.clone() });
        Store { shared }
    }

    /// Shut down the background expiry worker. Only meaningful for tests
    /// that want to assert no further background activity occurs.
    pub async fn shutdown(&self) {
        self.shared.expiry.shutdown().await;
    }

    /// Lazily-expiring read of a whole entry's value, ignoring type.
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        let now = Instant::now();
        let mut state = self.shared.state.write().unwrap();
        match state.entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn get_string(&self, key: &[u8]) -> Result<Option<Bytes>, CmdError> {
        match self.get(key) {
            Some(Value::String(b)) => Ok(Some(b)),
            Some(_) => Err(CmdError::WrongType),
            None => Ok(None),
        }
    }

    pub fn get_list(&self, key: &[u8]) -> Result<Option<std::collections::VecDeque<Bytes>>, CmdError> {
        match self.get(key) {
            Some(Value::List(l)) => Ok(Some(l)),
            Some(_) => Err(CmdError::WrongType),
            None => Ok(None),
        }
    }

    pub fn get_stream(
        &self,
        key: &[u8],
    ) -> Result<Option<BTreeMap<crate::stream_id::StreamId, crate::value::StreamEntry>>, CmdError> {
        match self.get(key) {
            Some(Value::Stream(s)) => Ok(Some(s)),
            Some(_) => Err(CmdError::WrongType),
            None => Ok(None),
        }
    }

    /// Replace the value at `key` outright. If `ttl` is `None`, any existing
    /// deadline is cleared (a fresh write is persistent unless told
    /// otherwise — this is the fix for the "re-add without TTL after TTL"
    /// regression called out in `spec.md` §8).
    pub fn put(&self, key: Bytes, value: Value, ttl: Option<Duration>) {
        let deadline = ttl.map(|d| Instant::now() + d);
        {
            let mut state = self.shared.state.write().unwrap();
            state.entries.insert(key.clone(), Entry { value, deadline });
        }
        match deadline {
            Some(d) => self.shared.expiry.schedule(key, d),
            None => self.shared.expiry.cancel(&key),
        }
    }

    pub fn delete(&self, key: &[u8]) -> bool {
        let now = Instant::now();
        let mut state = self.shared.state.write().unwrap();
        match state.entries.remove(key) {
            Some(entry) => {
                self.shared.expiry.cancel(key);
                entry.is_live(now)
            }
            None => false,
        }
    }

    pub fn delete_many(&self, keys: &[Bytes]) -> usize {
        keys.iter().filter(|k| self.delete(k)).count()
    }

    pub fn type_of(&self, key: &[u8]) -> Option<TypeTag> {
        self.get(key).map(|v| v.type_tag())
    }

    /// Update the deadline of an existing, non-expired key. Returns `false`
    /// if the key is absent.
    pub fn expire(&self, key: &[u8], ttl: Duration) -> bool {
        let now = Instant::now();
        let deadline = now + ttl;
        let mut state = self.shared.state.write().unwrap();
        match state.entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.deadline = Some(deadline);
                drop(state);
                self.shared.expiry.schedule(Bytes::copy_from_slice(key), deadline);
                true
            }
            Some(_) => {
                state.entries.remove(key);
                false
            }
            None => false,
        }
    }

    /// Cancel a key's expiry without deleting it (the `PERSIST` command).
    pub fn persist(&self, key: &[u8]) -> bool {
        let now = Instant::now();
        let mut state = self.shared.state.write().unwrap();
        match state.entries.get_mut(key) {
            Some(entry) if entry.is_live(now) && entry.deadline.is_some() => {
                entry.deadline = None;
                drop(state);
                self.shared.expiry.cancel(key);
                true
            }
            _ => false,
        }
    }

    pub fn ttl(&self, key: &[u8]) -> TtlResult {
        let now = Instant::now();
        let mut state = self.shared.state.write().unwrap();
        match state.entries.get(key) {
            Some(entry) if entry.is_live(now) => match entry.deadline {
                None => TtlResult::NoExpiry,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(now);
                    TtlResult::ExpiresInSeconds(remaining.as_secs() as i64)
                }
            },
            Some(_) => {
                state.entries.remove(key);
                TtlResult::Missing
            }
            None => TtlResult::Missing,
        }
    }

    /// The sole read-modify-write primitive. `f` receives the current,
    /// already-lazily-expired value (`None` if absent or expired) and
    /// returns the new value (`None` to delete) plus an arbitrary result
    /// `R` computed alongside it. The prior deadline is preserved only if
    /// the prior entry existed and was live; a freshly-created entry is
    /// persistent.
    pub fn mutate<F, R>(&self, key: &[u8], f: F) -> R
    where
        F: FnOnce(Option<Value>) -> (Option<Value>, R),
    {
        let now = Instant::now();
        let mut state = self.shared.state.write().unwrap();

        let (prior_value, prior_deadline) = match state.entries.remove(key) {
            Some(entry) if entry.is_live(now) => (Some(entry.value), entry.deadline),
            _ => (None, None),
        };

        let (new_value, result) = f(prior_value);

        match new_value {
            Some(value) => {
                state.entries.insert(
                    Bytes::copy_from_slice(key),
                    Entry {
                        value,
                        deadline: prior_deadline,
                    },
                );
            }
            None => {
                drop(state);
                self.shared.expiry.cancel(key);
                return result;
            }
        }
        drop(state);
        result
    }

    /// Called by the expiry manager: delete `key` only if it is still live
    /// and its deadline still matches `expected`. This is the race fix
    /// required by `spec.md` §4.3 — a `put`/`expire` landing between the
    /// reaper's queue pop and this call must not be clobbered.
    pub(crate) fn expire_if_due(&self, key: &[u8], expected: Instant) {
        let mut state = self.shared.state.write().unwrap();
        if let Some(entry) = state.entries.get(key) {
            if entry.deadline == Some(expected) {
                state.entries.remove(key);
            }
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
