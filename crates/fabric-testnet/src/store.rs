//! Shared key/value ledger state

use std::sync::Arc;

use dashmap::DashMap;

use fabric_types::WriteOp;

/// Thread-safe ledger state shared by the endorsing peers and the
/// orderer. The simulated ledger is consistent by construction: peers
/// read it, only the orderer writes it.
#[derive(Clone, Default)]
pub struct LedgerStore {
    entries: Arc<DashMap<String, String>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn put(&self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Apply an endorsed write set
    pub fn apply(&self, write_set: &[WriteOp]) {
        for op in write_set {
            match &op.value {
                Some(value) => {
                    self.entries.insert(op.key.clone(), value.clone());
                }
                None => {
                    self.entries.remove(&op.key);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
