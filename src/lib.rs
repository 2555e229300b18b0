//! Headless core of an EVM contract playground.
//!
//! Given a set of user-selected on-chain addresses, the pipeline resolves
//! each through its proxy (when flagged), fetches and parses the
//! implementation's interface from a chain indexing API, materializes a
//! live callable binding per contract, synthesizes ambient type
//! declarations for the editor host, and keeps the script-execution scope
//! in step with the selection.

pub mod binding;
pub mod chains;
pub mod controller;
pub mod declarations;
pub mod error;
pub mod explorer;
pub mod host;
pub mod interface;
pub mod persistence;
pub mod proxy;
pub mod scope;
pub mod selection;

pub use binding::{ContractBinding, LibraryFlavor};
pub use controller::{ApiFactory, Playground};
pub use error::{BindError, BindResult};
