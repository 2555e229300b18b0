//! The script-execution environment.
//!
//! An explicit scope map, handed to the execution host by reference at run
//! time. Bindings of records that left the selection are retracted before
//! new ones are installed, so one name never reaches two instances.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::binding::{ContractBinding, LibraryFlavor};
use crate::selection::Selection;

/// Library-level globals installed alongside the contract bindings.
pub fn library_globals(flavor: LibraryFlavor) -> &'static [&'static str] {
    match flavor {
        LibraryFlavor::Web3 => &["web3"],
        LibraryFlavor::Ethers => &["ethers", "provider"],
    }
}

pub enum ScopeEntry {
    Contract(Arc<dyn ContractBinding>),
    Library(LibraryFlavor),
}

/// Names visible to a running script.
#[derive(Default)]
pub struct ScopeMap {
    entries: BTreeMap<String, ScopeEntry>,
}

impl ScopeMap {
    /// Retract every previous record's binding, (re)install the library
    /// globals for `flavor` (dropping any other flavor's), then bind every
    /// next record with a live instance. Idempotent.
    pub fn apply_bindings(
        &mut self,
        previous: &Selection,
        next: &Selection,
        flavor: LibraryFlavor,
    ) {
        for record in previous.values().filter(|r| r.is_bound()) {
            self.entries.remove(&record.name);
        }
        self.entries.retain(|_, entry| match entry {
            ScopeEntry::Library(installed) => *installed == flavor,
            ScopeEntry::Contract(_) => true,
        });
        for global in library_globals(flavor) {
            self.entries
                .insert((*global).to_string(), ScopeEntry::Library(flavor));
        }
        for record in next.values().filter(|r| r.is_bound()) {
            if let Some(instance) = &record.instance {
                self.entries
                    .insert(record.name.clone(), ScopeEntry::Contract(instance.clone()));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ScopeEntry> {
        self.entries.get(name)
    }

    pub fn contract(&self, name: &str) -> Option<&Arc<dyn ContractBinding>> {
        match self.entries.get(name) {
            Some(ScopeEntry::Contract(binding)) => Some(binding),
            _ => None,
        }
    }

    /// Names bound to contracts, excluding library globals.
    pub fn contract_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|(name, entry)| match entry {
                ScopeEntry::Contract(_) => Some(name.as_str()),
                ScopeEntry::Library(_) => None,
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
