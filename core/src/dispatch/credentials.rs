//! Rotating credential state shared across dispatch attempts.

use std::collections::HashSet;
use tokio::sync::Mutex;

/// Cyclic API key ring with permanent invalidation.
///
/// The key list, the cursor, and the invalidated set live behind a single
/// mutex, so the exhaustion check, the cursor advance, and the selection
/// happen as one critical section. A key marked invalid stays invalid for
/// the life of the ring.
#[derive(Debug)]
pub struct KeyRing {
    state: Mutex<KeyRingState>,
}

#[derive(Debug)]
struct KeyRingState {
    keys: Vec<String>,
    cursor: usize,
    invalid: HashSet<String>,
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            state: Mutex::new(KeyRingState {
                keys,
                cursor: 0,
                invalid: HashSet::new(),
            }),
        }
    }

    /// Advance past the current position to the next usable key.
    ///
    /// Returns `None` when the ring is empty or every key has been
    /// invalidated. The scan is bounded by the ring length, so a ring whose
    /// distinct keys are all invalid cannot spin.
    pub async fn next_valid(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        if state.keys.is_empty() || state.invalid.len() >= state.keys.len() {
            return None;
        }
        for _ in 0..state.keys.len() {
            state.cursor = (state.cursor + 1) % state.keys.len();
            let key = &state.keys[state.cursor];
            if !state.invalid.contains(key) {
                return Some(key.clone());
            }
        }
        None
    }

    /// Permanently mark a key as unusable (spent quota)
    pub async fn invalidate(&self, key: &str) {
        let mut state = self.state.lock().await;
        state.invalid.insert(key.to_string());
    }

    /// Number of keys still usable
    pub async fn remaining(&self) -> usize {
        let state = self.state.lock().await;
        state
            .keys
            .iter()
            .filter(|key| !state.invalid.contains(*key))
            .count()
    }
}

/// Cyclic rotation over configured organization identifiers.
///
/// Organizations are never invalidated; the cursor just advances under its
/// own mutex, independent of the key ring.
#[derive(Debug)]
pub struct OrgRing {
    orgs: Vec<String>,
    cursor: Mutex<usize>,
}

impl OrgRing {
    /// Returns `None` when no organizations are configured
    pub fn new(orgs: Vec<String>) -> Option<Self> {
        if orgs.is_empty() {
            return None;
        }
        Some(Self {
            orgs,
            cursor: Mutex::new(0),
        })
    }

    pub async fn next(&self) -> String {
        let mut cursor = self.cursor.lock().await;
        *cursor = (*cursor + 1) % self.orgs.len();
        self.orgs[*cursor].clone()
    }
}

/// Short fingerprint of a key, safe for logs
pub(crate) fn redact(key: &str) -> String {
    match key.char_indices().nth_back(3) {
        Some((idx, _)) => format!("…{}", &key[idx..]),
        None => "…".to_string(),
    }
}
