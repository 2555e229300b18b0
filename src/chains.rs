//! Supported chains and their explorer API endpoints.

// Chain ID constants
pub const ETHEREUM_MAINNET: u64 = 1;
pub const GOERLI: u64 = 5;
pub const SEPOLIA: u64 = 11155111;
pub const POLYGON: u64 = 137;
pub const ARBITRUM: u64 = 42161;
pub const OPTIMISM: u64 = 10;
pub const BASE: u64 = 8453;

/// A supported network: numeric id, human-readable name, and the indexing
/// API it is served by. At most one chain is current at a time; the
/// controller re-derives it from wallet network-change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    pub id: u64,
    pub name: &'static str,
    pub label: &'static str,
    pub api_url: &'static str,
    pub api_key: &'static str,
}

// Shared default key, overridable per client.
const DEFAULT_API_KEY: &str = "YourApiKeyToken";

const CHAINS: &[Chain] = &[
    Chain {
        id: ETHEREUM_MAINNET,
        name: "mainnet",
        label: "Ethereum Mainnet",
        api_url: "https://api.etherscan.io/api",
        api_key: DEFAULT_API_KEY,
    },
    Chain {
        id: GOERLI,
        name: "goerli",
        label: "Goerli Testnet",
        api_url: "https://api-goerli.etherscan.io/api",
        api_key: DEFAULT_API_KEY,
    },
    Chain {
        id: SEPOLIA,
        name: "sepolia",
        label: "Sepolia Testnet",
        api_url: "https://api-sepolia.etherscan.io/api",
        api_key: DEFAULT_API_KEY,
    },
    Chain {
        id: POLYGON,
        name: "polygon",
        label: "Polygon Mainnet",
        api_url: "https://api.polygonscan.com/api",
        api_key: DEFAULT_API_KEY,
    },
    Chain {
        id: ARBITRUM,
        name: "arbitrum",
        label: "Arbitrum One",
        api_url: "https://api.arbiscan.io/api",
        api_key: DEFAULT_API_KEY,
    },
    Chain {
        id: OPTIMISM,
        name: "optimism",
        label: "OP Mainnet",
        api_url: "https://api-optimistic.etherscan.io/api",
        api_key: DEFAULT_API_KEY,
    },
    Chain {
        id: BASE,
        name: "base",
        label: "Base",
        api_url: "https://api.basescan.org/api",
        api_key: DEFAULT_API_KEY,
    },
];

/// All supported chains, for pickers.
pub fn chains() -> &'static [Chain] {
    CHAINS
}

/// Look up a chain by id. Unknown ids fall back to mainnet.
pub fn chain_by_id(id: u64) -> Chain {
    CHAINS
        .iter()
        .copied()
        .find(|chain| chain.id == id)
        .unwrap_or(CHAINS[0])
}
