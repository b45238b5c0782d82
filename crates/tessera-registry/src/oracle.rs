//! Controller key-state oracle: the read port through which the TEL core
//! observes the controller's KEL.
//!
//! The oracle is an injected capability rather than a module global, so
//! validation engines can run against deterministic fakes in tests and
//! against a real KEL database in the service process. The core only ever
//! reads through it; registry validation never mutates controller state.

use std::collections::HashMap;

/// Read access to controller key-state.
pub trait KeyStateOracle {
    /// Returns the digest of the controller's event at `(prefix, sn)` if
    /// that event is known, else `None`.
    fn resolve(&self, prefix: &str, sn: u64) -> Option<String>;
}

/// A deterministic in-memory oracle: a map from `(prefix, sn)` to event
/// digest. Used by tests and by services that mirror controller KELs into
/// memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOracle {
    events: HashMap<(String, u64), String>,
}

impl InMemoryOracle {
    /// Creates an empty oracle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the controller `prefix` has an event with `digest` at
    /// sequence `sn`.
    pub fn insert(&mut self, prefix: &str, sn: u64, digest: &str) {
        self.events
            .insert((prefix.to_string(), sn), digest.to_string());
    }
}

impl KeyStateOracle for InMemoryOracle {
    fn resolve(&self, prefix: &str, sn: u64) -> Option<String> {
        self.events.get(&(prefix.to_string(), sn)).cloned()
    }
}
