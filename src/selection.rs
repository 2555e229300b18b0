//! The user's contract selection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;

use crate::binding::ContractBinding;
use crate::error::BindError;
use crate::interface::ContractInterface;

/// One selected contract. Records are replaced wholesale on every edit;
/// the bound instance is never mutated in place.
#[derive(Clone)]
pub struct ContractRecord {
    pub address: Address,
    /// Scope identifier the contract is bound under; unique per selection.
    pub name: String,
    pub is_proxy: bool,
    /// Parsed interface, retained so a library switch never refetches.
    pub interface: Option<Arc<ContractInterface>>,
    pub instance: Option<Arc<dyn ContractBinding>>,
    pub error: Option<BindError>,
}

impl ContractRecord {
    pub fn new(address: Address, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            is_proxy: false,
            interface: None,
            instance: None,
            error: None,
        }
    }

    /// Whether this record contributes a live scope binding.
    pub fn is_bound(&self) -> bool {
        self.instance.is_some()
    }
}

impl fmt::Debug for ContractRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractRecord")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("is_proxy", &self.is_proxy)
            .field("bound", &self.is_bound())
            .field("error", &self.error)
            .finish()
    }
}

/// Address-keyed selection. Map order doubles as the deterministic
/// iteration order for declaration synthesis.
pub type Selection = BTreeMap<Address, ContractRecord>;
