//! Last-used selection persistence.
//!
//! The store is a simple key-value blob; failures are logged and otherwise
//! ignored, the playground never breaks because persistence is unavailable.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::binding::LibraryFlavor;

const KEY_CONTRACTS: &str = "web3playground-last-used-contracts";
const KEY_LIBRARY: &str = "web3playground-last-used-library";
const KEY_NETWORK: &str = "web3playground-network";

/// The persisted shape of one selected contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedContract {
    pub address: String,
    pub name: String,
    #[serde(rename = "isProxy")]
    pub is_proxy: bool,
}

pub trait SelectionStore: Send + Sync {
    fn load_last_selection(&self) -> Option<Vec<SavedContract>>;
    fn save_last_selection(&self, contracts: &[SavedContract]);
    fn load_last_flavor(&self) -> Option<LibraryFlavor>;
    fn save_last_flavor(&self, flavor: LibraryFlavor);
    fn load_last_network(&self) -> Option<u64>;
    fn save_last_network(&self, id: u64);
}

/// Raw string storage behind [`SelectionStore`].
trait KvBlob: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

impl<T: KvBlob> SelectionStore for T {
    fn load_last_selection(&self) -> Option<Vec<SavedContract>> {
        let raw = self.get(KEY_CONTRACTS)?;
        match serde_json::from_str(&raw) {
            Ok(contracts) => Some(contracts),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable saved selection");
                None
            }
        }
    }

    fn save_last_selection(&self, contracts: &[SavedContract]) {
        match serde_json::to_string(contracts) {
            Ok(raw) => self.set(KEY_CONTRACTS, &raw),
            Err(e) => tracing::warn!(error = %e, "failed to serialize selection"),
        }
    }

    fn load_last_flavor(&self) -> Option<LibraryFlavor> {
        self.get(KEY_LIBRARY)?.parse().ok()
    }

    fn save_last_flavor(&self, flavor: LibraryFlavor) {
        self.set(KEY_LIBRARY, flavor.as_str());
    }

    fn load_last_network(&self) -> Option<u64> {
        self.get(KEY_NETWORK)?.parse().ok()
    }

    fn save_last_network(&self, id: u64) {
        self.set(KEY_NETWORK, &id.to_string());
    }
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl KvBlob for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }
}

/// File-backed store holding the whole blob as one JSON object.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> HashMap<String, String> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }
}

impl KvBlob for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        let Ok(raw) = serde_json::to_string_pretty(&map) else {
            return;
        };
        if let Err(e) = fs::write(&self.path, raw) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist selection");
        }
    }
}
