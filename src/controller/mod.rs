//! Selection state and the transitions driven by user edits.
//!
//! Every transition computes the affected record anew (re-resolving and
//! re-binding as needed), replaces it in the selection wholesale, then
//! regenerates declarations, reapplies the scope bindings, and persists
//! the selection. Overlapping edits to the same address are last-write-wins.

use std::sync::Arc;

use alloy_primitives::Address;

use crate::binding::{self, LibraryFlavor};
use crate::chains::{Chain, chain_by_id};
use crate::declarations::{base_declarations, synthesize_declarations};
use crate::error::{BindError, BindResult};
use crate::explorer::{AbiOutcome, ChainApi};
use crate::host::{ExecutionHost, WalletBridge};
use crate::interface::{ContractInterface, sanitize_abi};
use crate::persistence::{SavedContract, SelectionStore};
use crate::proxy;
use crate::scope::ScopeMap;
use crate::selection::{ContractRecord, Selection};

/// Builds a [`ChainApi`] for the current chain; invoked again whenever the
/// wallet reports a network switch.
pub type ApiFactory = Arc<dyn Fn(Chain) -> Arc<dyn ChainApi> + Send + Sync>;

pub struct Playground {
    api_factory: ApiFactory,
    api: Arc<dyn ChainApi>,
    store: Arc<dyn SelectionStore>,
    host: Option<Arc<dyn ExecutionHost>>,
    chain: Chain,
    flavor: LibraryFlavor,
    selection: Selection,
    scope: ScopeMap,
    declarations: String,
}

impl Playground {
    pub fn new(
        chain_id: u64,
        flavor: LibraryFlavor,
        api_factory: ApiFactory,
        store: Arc<dyn SelectionStore>,
        host: Option<Arc<dyn ExecutionHost>>,
    ) -> Self {
        let chain = chain_by_id(chain_id);
        let api = (*api_factory)(chain);
        Self {
            api_factory,
            api,
            store,
            host,
            chain,
            flavor,
            selection: Selection::new(),
            scope: ScopeMap::default(),
            declarations: base_declarations(flavor).to_string(),
        }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn flavor(&self) -> LibraryFlavor {
        self.flavor
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn scope(&self) -> &ScopeMap {
        &self.scope
    }

    /// The complete declaration text as last registered with the host.
    pub fn declarations(&self) -> &str {
        &self.declarations
    }

    /// The address field changed. An emptied field deletes the record (and
    /// its binding); new text creates or replaces the record at that
    /// address, resolving and binding it.
    pub async fn address_changed(
        &mut self,
        previous: Option<Address>,
        input: &str,
        name: &str,
    ) -> BindResult<()> {
        let input = input.trim();
        if input.is_empty() {
            if let Some(previous) = previous {
                let before = self.selection.clone();
                self.selection.remove(&previous);
                self.after_mutation(&before);
            }
            return Ok(());
        }

        let address: Address = input
            .parse()
            .map_err(|e| BindError::Parse(format!("invalid address: {e}")))?;
        let is_proxy = self
            .selection
            .get(&address)
            .map(|record| record.is_proxy)
            .unwrap_or(false);

        let mut record = ContractRecord::new(address, strip_whitespace(name));
        record.is_proxy = is_proxy;
        self.resolve_and_bind(&mut record).await;

        let before = self.selection.clone();
        if let Some(previous) = previous {
            if previous != address {
                self.selection.remove(&previous);
            }
        }
        self.selection.insert(address, record);
        self.after_mutation(&before);
        Ok(())
    }

    /// Rename a record. Collisions with another record's name reject the
    /// transition: the old name stays, the error lands on the record, and
    /// the scope is untouched.
    pub fn name_changed(&mut self, address: Address, new_name: &str) {
        let name = strip_whitespace(new_name);
        let Some(record) = self.selection.get(&address) else {
            return;
        };

        let in_use = self
            .selection
            .values()
            .any(|other| other.address != address && other.name == name);

        let before = self.selection.clone();
        let mut updated = record.clone();
        if name.is_empty() || in_use {
            updated.error = Some(BindError::NameCollision(name));
        } else {
            updated.name = name;
            if matches!(updated.error, Some(BindError::NameCollision(_))) {
                updated.error = None;
            }
        }
        self.selection.insert(address, updated);
        self.after_mutation(&before);
    }

    /// Toggle the upgradeable-proxy flag and re-resolve the record.
    pub async fn proxy_toggled(&mut self, address: Address) {
        let Some(mut record) = self.selection.get(&address).cloned() else {
            return;
        };
        record.is_proxy = !record.is_proxy;
        self.resolve_and_bind(&mut record).await;

        let before = self.selection.clone();
        self.selection.insert(address, record);
        self.after_mutation(&before);
    }

    /// Manually supplied interface text for a record; no fetching. Parse
    /// failures stay on this record, siblings are untouched.
    pub fn abi_supplied(&mut self, address: Address, text: &str) {
        let Some(mut record) = self.selection.get(&address).cloned() else {
            return;
        };

        record.interface = None;
        record.instance = None;
        record.error = None;
        match ContractInterface::parse(&sanitize_abi(text)) {
            Ok(interface) => {
                let interface = Arc::new(interface);
                self.bind_record(&mut record, interface);
            }
            Err(e) => record.error = Some(e),
        }

        let before = self.selection.clone();
        self.selection.insert(address, record);
        self.after_mutation(&before);
    }

    /// Switch the client library. Rebuilds every binding from the retained
    /// interfaces; never touches the network.
    pub fn flavor_changed(&mut self, flavor: LibraryFlavor) {
        self.flavor = flavor;
        self.store.save_last_flavor(flavor);

        let before = self.selection.clone();
        let addresses: Vec<Address> = self.selection.keys().copied().collect();
        for address in addresses {
            let Some(mut record) = self.selection.get(&address).cloned() else {
                continue;
            };
            let Some(interface) = record.interface.clone() else {
                continue;
            };
            self.bind_record(&mut record, interface);
            self.selection.insert(address, record);
        }
        self.after_mutation(&before);
    }

    /// Wallet reported a network switch: re-derive the chain and re-run
    /// resolution and binding for every record.
    pub async fn chain_changed(&mut self, chain_id: u64) {
        self.chain = chain_by_id(chain_id);
        self.api = (*self.api_factory)(self.chain);
        self.store.save_last_network(chain_id);

        let before = self.selection.clone();
        let addresses: Vec<Address> = self.selection.keys().copied().collect();
        for address in addresses {
            let Some(mut record) = self.selection.get(&address).cloned() else {
                continue;
            };
            self.resolve_and_bind(&mut record).await;
            self.selection.insert(address, record);
        }
        self.after_mutation(&before);
    }

    /// Load the last-used network, library, and contract list.
    pub async fn restore(&mut self) {
        if let Some(id) = self.store.load_last_network() {
            self.chain = chain_by_id(id);
            self.api = (*self.api_factory)(self.chain);
        }
        if let Some(flavor) = self.store.load_last_flavor() {
            self.flavor = flavor;
        }

        let before = self.selection.clone();
        if let Some(saved) = self.store.load_last_selection() {
            for entry in saved {
                let Ok(address) = entry.address.parse::<Address>() else {
                    tracing::warn!(address = %entry.address, "skipping unparseable saved address");
                    continue;
                };
                let mut record = ContractRecord::new(address, entry.name);
                record.is_proxy = entry.is_proxy;
                self.resolve_and_bind(&mut record).await;
                self.selection.insert(address, record);
            }
        }
        self.after_mutation(&before);
    }

    /// Request wallet access and adopt the wallet's chain.
    pub async fn connect(&mut self, wallet: &dyn WalletBridge) -> anyhow::Result<String> {
        let account = wallet.request_account().await?;
        let id = wallet.chain_id();
        if id != self.chain.id {
            self.chain_changed(id).await;
        }
        Ok(account)
    }

    /// Evaluate a script in the attached host against the current scope.
    pub async fn run_script(&self, source: &str) -> anyhow::Result<serde_json::Value> {
        let Some(host) = &self.host else {
            anyhow::bail!("no execution host attached");
        };
        host.run_script(source, &self.scope).await
    }

    /// Resolve (for proxies), fetch, parse, and bind one record.
    async fn resolve_and_bind(&self, record: &mut ContractRecord) {
        record.interface = None;
        record.instance = None;
        record.error = None;

        let lookup = if record.is_proxy {
            match proxy::resolve_implementation(self.api.as_ref(), record.address).await {
                Some(implementation) => implementation,
                // No heuristic matched: treat the address as not a proxy.
                None => record.address,
            }
        } else {
            record.address
        };

        match self.api.get_abi(lookup).await {
            Ok(AbiOutcome::NotVerified) => record.error = Some(BindError::NotVerified),
            Err(e) => record.error = Some(e),
            Ok(AbiOutcome::Verified(text)) => match ContractInterface::parse(&text) {
                Ok(interface) => self.bind_record(record, Arc::new(interface)),
                Err(e) => record.error = Some(e),
            },
        }
    }

    /// Bind a parsed interface at the record's own address (the proxy
    /// address when proxied, so calls route through the proxy).
    fn bind_record(&self, record: &mut ContractRecord, interface: Arc<ContractInterface>) {
        match binding::bind(
            interface.clone(),
            record.address,
            self.flavor,
            self.api.clone(),
        ) {
            Ok(instance) => {
                record.interface = Some(interface);
                record.instance = Some(instance);
                record.error = None;
            }
            Err(e) => {
                record.interface = Some(interface);
                record.instance = None;
                record.error = Some(e);
            }
        }
    }

    /// Persist, regenerate declarations, and reapply scope bindings after
    /// the selection changed.
    fn after_mutation(&mut self, previous: &Selection) {
        let saved: Vec<SavedContract> = self
            .selection
            .values()
            .map(|record| SavedContract {
                address: format!("{:#x}", record.address),
                name: record.name.clone(),
                is_proxy: record.is_proxy,
            })
            .collect();
        self.store.save_last_selection(&saved);

        self.declarations =
            synthesize_declarations(base_declarations(self.flavor), &self.selection, self.flavor);
        if let Some(host) = &self.host {
            host.register_declarations(&self.declarations);
        }

        self.scope
            .apply_bindings(previous, &self.selection, self.flavor);
    }
}

fn strip_whitespace(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::LogEntry;
    use crate::explorer::mock::MockApi;
    use crate::host::recording::RecordingHost;
    use crate::interface::fixtures::ERC20_ABI;
    use crate::persistence::MemoryStore;
    use crate::scope::ScopeEntry;
    use alloy_primitives::address;
    use async_trait::async_trait;

    const A: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const B: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
    const C: Address = address!("cccccccccccccccccccccccccccccccccccccccc");

    const UPGRADED_TOPIC: &str =
        "0xbc7cd75a20ee27fd9adebab32041f755214dbc6bffa90cc0225b39da2e5c2d3b";

    struct Fixture {
        api: Arc<MockApi>,
        host: Arc<RecordingHost>,
        store: Arc<MemoryStore>,
        playground: Playground,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(MockApi::default());
        let host = Arc::new(RecordingHost::default());
        let store = Arc::new(MemoryStore::default());
        let factory_api = api.clone();
        let playground = Playground::new(
            1,
            LibraryFlavor::Web3,
            Arc::new(move |_chain| factory_api.clone() as Arc<dyn ChainApi>),
            store.clone(),
            Some(host.clone()),
        );
        Fixture {
            api,
            host,
            store,
            playground,
        }
    }

    fn padded(address: Address) -> String {
        format!("0x000000000000000000000000{address:x}")
    }

    #[tokio::test]
    async fn scope_tracks_adds_and_removals() {
        let mut fx = fixture();
        fx.api.verified(A, ERC20_ABI).verified(B, ERC20_ABI);

        fx.playground
            .address_changed(None, &A.to_string(), "foo")
            .await
            .unwrap();
        fx.playground
            .address_changed(None, &B.to_string(), "bar")
            .await
            .unwrap();
        assert_eq!(fx.playground.scope().contract_names(), vec!["bar", "foo"]);

        fx.playground
            .address_changed(Some(A), "", "")
            .await
            .unwrap();
        assert_eq!(fx.playground.scope().contract_names(), vec!["bar"]);
        assert!(fx.playground.selection().get(&A).is_none());
    }

    #[tokio::test]
    async fn flavor_switch_never_refetches() {
        let mut fx = fixture();
        fx.api
            .verified(A, ERC20_ABI)
            .verified(B, ERC20_ABI)
            .verified(C, ERC20_ABI);

        for (address, name) in [(A, "foo"), (B, "bar"), (C, "baz")] {
            fx.playground
                .address_changed(None, &address.to_string(), name)
                .await
                .unwrap();
        }
        let fetches_before = fx.api.abi_fetch_count();
        assert_eq!(fetches_before, 3);

        fx.playground.flavor_changed(LibraryFlavor::Ethers);

        assert_eq!(fx.api.abi_fetch_count(), fetches_before);
        for record in fx.playground.selection().values() {
            let instance = record.instance.as_ref().unwrap();
            assert_eq!(instance.flavor(), LibraryFlavor::Ethers);
        }
        assert!(matches!(
            fx.playground.scope().get("ethers"),
            Some(ScopeEntry::Library(LibraryFlavor::Ethers))
        ));
        assert!(fx.playground.scope().get("web3").is_none());
    }

    #[tokio::test]
    async fn proxy_resolution_uses_the_implementation_interface() {
        let mut fx = fixture();
        // ABI only exists at the implementation; binding must target the proxy.
        fx.api.verified(B, ERC20_ABI);
        fx.api.log(
            A,
            UPGRADED_TOPIC,
            LogEntry {
                topics: vec![UPGRADED_TOPIC.to_string()],
                data: padded(B),
            },
        );

        fx.playground
            .address_changed(None, &A.to_string(), "token")
            .await
            .unwrap();
        fx.playground.proxy_toggled(A).await;

        let record = fx.playground.selection().get(&A).unwrap();
        assert!(record.is_proxy);
        let instance = record.instance.as_ref().unwrap();
        assert_eq!(instance.address(), A);
        assert!(instance.interface().function("transfer").is_some());
    }

    #[tokio::test]
    async fn pasted_garbage_only_breaks_its_own_record() {
        let mut fx = fixture();
        fx.api.verified(A, ERC20_ABI).verified(B, ERC20_ABI);
        fx.playground
            .address_changed(None, &A.to_string(), "foo")
            .await
            .unwrap();
        fx.playground
            .address_changed(None, &B.to_string(), "bar")
            .await
            .unwrap();

        fx.playground.abi_supplied(B, "not json");

        let broken = fx.playground.selection().get(&B).unwrap();
        assert!(matches!(broken.error, Some(BindError::Parse(_))));
        assert!(broken.instance.is_none());

        let intact = fx.playground.selection().get(&A).unwrap();
        assert!(intact.instance.is_some());
        assert_eq!(fx.playground.scope().contract_names(), vec!["foo"]);
    }

    #[tokio::test]
    async fn pasted_abi_binds_without_fetching() {
        let mut fx = fixture();
        fx.playground
            .address_changed(None, &A.to_string(), "foo")
            .await
            .unwrap();
        // Unverified address: one fetch, no binding yet.
        assert_eq!(fx.api.abi_fetch_count(), 1);
        assert!(matches!(
            fx.playground.selection().get(&A).unwrap().error,
            Some(BindError::NotVerified)
        ));

        fx.playground.abi_supplied(A, ERC20_ABI);

        assert_eq!(fx.api.abi_fetch_count(), 1);
        assert!(fx.playground.selection().get(&A).unwrap().instance.is_some());
        assert_eq!(fx.playground.scope().contract_names(), vec!["foo"]);
    }

    #[tokio::test]
    async fn rename_collision_is_rejected() {
        let mut fx = fixture();
        fx.api.verified(A, ERC20_ABI).verified(B, ERC20_ABI);
        fx.playground
            .address_changed(None, &A.to_string(), "foo")
            .await
            .unwrap();
        fx.playground
            .address_changed(None, &B.to_string(), "bar")
            .await
            .unwrap();

        fx.playground.name_changed(A, "bar");

        let record = fx.playground.selection().get(&A).unwrap();
        assert_eq!(record.name, "foo");
        assert!(matches!(record.error, Some(BindError::NameCollision(_))));
        assert_eq!(fx.playground.scope().contract_names(), vec!["bar", "foo"]);
    }

    #[tokio::test]
    async fn rename_rebinds_under_the_new_name() {
        let mut fx = fixture();
        fx.api.verified(A, ERC20_ABI);
        fx.playground
            .address_changed(None, &A.to_string(), "foo")
            .await
            .unwrap();

        fx.playground.name_changed(A, "renamed");

        assert_eq!(fx.playground.scope().contract_names(), vec!["renamed"]);
        assert!(fx.playground.scope().contract("foo").is_none());
        assert!(fx.playground.declarations().contains("declare var renamed"));
    }

    #[tokio::test]
    async fn declarations_are_registered_with_the_host() {
        let mut fx = fixture();
        fx.api.verified(A, ERC20_ABI);
        fx.playground
            .address_changed(None, &A.to_string(), "foo")
            .await
            .unwrap();

        let registered = fx.host.declarations.lock().unwrap();
        let last = registered.last().unwrap();
        assert!(last.starts_with(base_declarations(LibraryFlavor::Web3)));
        assert!(last.contains("declare var foo: Contract"));
    }

    #[tokio::test]
    async fn selection_is_persisted_and_restored() {
        let fx = fixture();
        fx.api.verified(A, ERC20_ABI);
        fx.store.save_last_selection(&[SavedContract {
            address: format!("{A:#x}"),
            name: "foo".to_string(),
            is_proxy: false,
        }]);
        fx.store.save_last_flavor(LibraryFlavor::Ethers);
        fx.store.save_last_network(137);

        let mut playground = fx.playground;
        playground.restore().await;

        assert_eq!(playground.chain().id, 137);
        assert_eq!(playground.flavor(), LibraryFlavor::Ethers);
        let record = playground.selection().get(&A).unwrap();
        assert!(record.instance.is_some());
        assert_eq!(playground.scope().contract_names(), vec!["foo"]);
    }

    #[tokio::test]
    async fn run_script_receives_the_scope() {
        let mut fx = fixture();
        fx.api.verified(A, ERC20_ABI);
        fx.playground
            .address_changed(None, &A.to_string(), "foo")
            .await
            .unwrap();

        let result = fx.playground.run_script("return names").await.unwrap();
        assert_eq!(result, serde_json::json!(["foo"]));
    }

    struct StubWallet;

    #[async_trait]
    impl WalletBridge for StubWallet {
        fn chain_id(&self) -> u64 {
            137
        }

        async fn request_account(&self) -> anyhow::Result<String> {
            Ok("0x00000000000000000000000000000000000000ff".to_string())
        }
    }

    #[tokio::test]
    async fn connect_adopts_the_wallet_chain() {
        let mut fx = fixture();
        let account = fx.playground.connect(&StubWallet).await.unwrap();
        assert!(account.starts_with("0x"));
        assert_eq!(fx.playground.chain().id, 137);
        assert_eq!(fx.store.load_last_network(), Some(137));
    }
}
