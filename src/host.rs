//! Boundaries toward the execution host and the wallet provider.

use async_trait::async_trait;

use crate::scope::ScopeMap;

/// The editor/runner the playground core feeds. The core only supplies
/// declaration text and the scope; evaluation is entirely the host's.
#[async_trait]
pub trait ExecutionHost: Send + Sync {
    /// Replace the ambient declarations visible to static analysis.
    fn register_declarations(&self, declarations: &str);

    /// Evaluate a script against the given scope.
    async fn run_script(
        &self,
        source: &str,
        scope: &ScopeMap,
    ) -> anyhow::Result<serde_json::Value>;
}

/// Wallet/chain-connectivity provider.
#[async_trait]
pub trait WalletBridge: Send + Sync {
    /// Chain id the wallet currently reports.
    fn chain_id(&self) -> u64;

    /// One-shot account-access request.
    async fn request_account(&self) -> anyhow::Result<String>;
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Host that records registrations and answers scripts with the bound
    /// contract names.
    #[derive(Default)]
    pub(crate) struct RecordingHost {
        pub declarations: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExecutionHost for RecordingHost {
        fn register_declarations(&self, declarations: &str) {
            self.declarations
                .lock()
                .unwrap()
                .push(declarations.to_string());
        }

        async fn run_script(
            &self,
            _source: &str,
            scope: &ScopeMap,
        ) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!(scope.contract_names()))
        }
    }
}
