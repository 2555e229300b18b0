//! Implementation-address resolution for upgradeable proxies.
//!
//! Heuristics run sequentially in a fixed priority order; the first hit
//! wins. Any chain-API failure inside a heuristic is a miss for that
//! heuristic only, never fatal to the resolution.

use std::str::FromStr;

use alloy_primitives::Address;

use crate::explorer::{ChainApi, LogEntry};

pub const EMPTY_SLOT: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Where an upgrade event encodes the implementation address.
#[derive(Debug, Clone, Copy)]
enum AddressSource {
    /// Indexed topic slot.
    Topic(usize),
    /// 32-byte word index (1-based) in the data payload.
    Data(usize),
}

struct UpgradeSignature {
    topic: &'static str,
    source: AddressSource,
}

const UPGRADE_SIGNATURES: &[UpgradeSignature] = &[
    // Upgrade(address,bytes)
    UpgradeSignature {
        topic: "0xe74baeef5988edac1159d9177ca52f0f3d68f624a1996f77467eb3ebfb316537",
        source: AddressSource::Topic(1),
    },
    // Upgraded(address)
    UpgradeSignature {
        topic: "0xbc7cd75a20ee27fd9adebab32041f755214dbc6bffa90cc0225b39da2e5c2d3b",
        source: AddressSource::Data(1),
    },
    // Aragon initialization
    UpgradeSignature {
        topic: "0x4d72fe0577a3a3f7da968d7b892779dde102519c25527b29cf7054f245c791b9",
        source: AddressSource::Topic(2),
    },
];

/// Storage slots used by known proxy standards, checked in order.
const IMPLEMENTATION_SLOTS: &[&str] = &[
    // EIP-1967 logic slot: keccak256("eip1967.proxy.implementation") - 1
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc",
    // EIP-1967 beacon slot: keccak256("eip1967.proxy.beacon") - 1
    "0xa3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50",
    // OpenZeppelin legacy: keccak256("org.zeppelinos.proxy.implementation")
    "0x7050c9e0f4ca769c69bd3a8ef740bc37934f8e2c036e5a723fd8ee048ed3f8c3",
    // EIP-1822 (UUPS): keccak256("PROXIABLE")
    "0xc5f16f0fcc639fa48a6947836d9850f504798523bf8c9a3a87d5876cf622bcf7",
];

// Minimal proxies forward with DELEGATECALL; its opcode pair is the marker.
const DELEGATE_MARKER: &str = "5af4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    UpgradeLogs,
    StorageSlots,
    MinimalProxy,
}

/// The fixed priority order; earlier entries win when several would match.
pub const HEURISTIC_PRIORITY: [Heuristic; 3] = [
    Heuristic::UpgradeLogs,
    Heuristic::StorageSlots,
    Heuristic::MinimalProxy,
];

/// Resolve the implementation address behind `proxy`, or `None` when no
/// heuristic matches (the caller then treats the address as not a proxy).
pub async fn resolve_implementation(api: &dyn ChainApi, proxy: Address) -> Option<Address> {
    for heuristic in HEURISTIC_PRIORITY {
        match heuristic.run(api, proxy).await {
            Some(implementation) => {
                tracing::debug!(?heuristic, %proxy, %implementation, "proxy resolved");
                return Some(implementation);
            }
            None => tracing::debug!(?heuristic, %proxy, "heuristic missed"),
        }
    }
    None
}

impl Heuristic {
    async fn run(self, api: &dyn ChainApi, proxy: Address) -> Option<Address> {
        match self {
            Heuristic::UpgradeLogs => upgrade_logs(api, proxy).await,
            Heuristic::StorageSlots => storage_slots(api, proxy).await,
            Heuristic::MinimalProxy => minimal_proxy(api, proxy).await,
        }
    }
}

async fn upgrade_logs(api: &dyn ChainApi, proxy: Address) -> Option<Address> {
    for signature in UPGRADE_SIGNATURES {
        let entries = match api.get_logs(proxy, signature.topic).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(topic = signature.topic, error = %e, "log lookup failed");
                continue;
            }
        };
        // Entries come back oldest first; the latest upgrade is authoritative.
        let Some(event) = entries.last() else { continue };
        let candidate = match signature.source {
            AddressSource::Topic(index) => address_from_topic(event, index),
            AddressSource::Data(index) => address_from_data(event, index),
        };
        match candidate {
            Some(address) if !address.is_zero() => return Some(address),
            _ => continue,
        }
    }
    None
}

async fn storage_slots(api: &dyn ChainApi, proxy: Address) -> Option<Address> {
    for slot in IMPLEMENTATION_SLOTS {
        let word = match api.get_storage_at(proxy, slot).await {
            Ok(word) => word,
            Err(e) => {
                tracing::debug!(slot, error = %e, "storage read failed");
                continue;
            }
        };
        if word == EMPTY_SLOT {
            continue;
        }
        match address_from_word(&word) {
            Some(address) if !address.is_zero() => return Some(address),
            _ => continue,
        }
    }
    None
}

async fn minimal_proxy(api: &dyn ChainApi, proxy: Address) -> Option<Address> {
    let code = match api.get_code(proxy).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = %e, "code fetch failed");
            return None;
        }
    };
    extract_minimal_proxy_target(&code)
}

/// Pull the forwarding target out of minimal-proxy runtime code.
///
/// EIP-1167 runtime starts `363d3d373d3d3d363d73` and embeds the target
/// right after (hex offset 22 including the `0x` prefix); the older clone
/// variant carries a one-byte prelude, shifting the target to offset 24.
pub fn extract_minimal_proxy_target(code: &str) -> Option<Address> {
    if !code.contains(DELEGATE_MARKER) {
        return None;
    }
    let start = if code.starts_with("0x36") { 22 } else { 24 };
    let candidate = code.get(start..start + 40)?;
    Address::from_str(&format!("0x{candidate}"))
        .ok()
        .filter(|address| !address.is_zero())
}

fn address_from_topic(event: &LogEntry, index: usize) -> Option<Address> {
    address_from_word(event.topics.get(index)?)
}

/// Address encoded in the `index`-th (1-based) 32-byte data word, right
/// aligned within the word.
fn address_from_data(event: &LogEntry, index: usize) -> Option<Address> {
    let data = event.data.strip_prefix("0x").unwrap_or(&event.data);
    let word_start = 64 * (index - 1);
    address_from_word(data.get(word_start..word_start + 64)?)
}

/// Lower 20 bytes of a 32-byte hex word, when syntactically a valid address.
fn address_from_word(word: &str) -> Option<Address> {
    let word = word.strip_prefix("0x").unwrap_or(word);
    if word.len() < 40 {
        return None;
    }
    Address::from_str(&format!("0x{}", &word[word.len() - 40..])).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::mock::MockApi;
    use alloy_primitives::address;

    const PROXY: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const IMPL_B: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
    const IMPL_C: Address = address!("cccccccccccccccccccccccccccccccccccccccc");

    const UPGRADED_TOPIC: &str =
        "0xbc7cd75a20ee27fd9adebab32041f755214dbc6bffa90cc0225b39da2e5c2d3b";
    const UPGRADE_TOPIC: &str =
        "0xe74baeef5988edac1159d9177ca52f0f3d68f624a1996f77467eb3ebfb316537";

    fn padded(address: Address) -> String {
        format!("0x000000000000000000000000{:x}", address)
    }

    #[tokio::test]
    async fn event_log_wins_over_storage_slot() {
        let api = MockApi::default();
        api.log(
            PROXY,
            UPGRADED_TOPIC,
            LogEntry {
                topics: vec![UPGRADED_TOPIC.to_string()],
                data: padded(IMPL_B),
            },
        );
        api.storage_slot(PROXY, IMPLEMENTATION_SLOTS[0], &padded(IMPL_C));

        let resolved = resolve_implementation(&api, PROXY).await;
        assert_eq!(resolved, Some(IMPL_B));
    }

    #[tokio::test]
    async fn indexed_topic_decoding() {
        let api = MockApi::default();
        api.log(
            PROXY,
            UPGRADE_TOPIC,
            LogEntry {
                topics: vec![UPGRADE_TOPIC.to_string(), padded(IMPL_B)],
                data: "0x".to_string(),
            },
        );

        let resolved = resolve_implementation(&api, PROXY).await;
        assert_eq!(resolved, Some(IMPL_B));
    }

    #[tokio::test]
    async fn latest_log_is_authoritative() {
        let api = MockApi::default();
        api.log(
            PROXY,
            UPGRADED_TOPIC,
            LogEntry {
                topics: vec![UPGRADED_TOPIC.to_string()],
                data: padded(IMPL_C),
            },
        );
        api.log(
            PROXY,
            UPGRADED_TOPIC,
            LogEntry {
                topics: vec![UPGRADED_TOPIC.to_string()],
                data: padded(IMPL_B),
            },
        );

        let resolved = resolve_implementation(&api, PROXY).await;
        assert_eq!(resolved, Some(IMPL_B));
    }

    #[tokio::test]
    async fn zero_address_in_log_is_rejected() {
        let api = MockApi::default();
        api.log(
            PROXY,
            UPGRADED_TOPIC,
            LogEntry {
                topics: vec![UPGRADED_TOPIC.to_string()],
                data: padded(Address::ZERO),
            },
        );
        api.storage_slot(PROXY, IMPLEMENTATION_SLOTS[2], &padded(IMPL_C));

        // The zero-address log is a miss; the storage slot answers instead.
        let resolved = resolve_implementation(&api, PROXY).await;
        assert_eq!(resolved, Some(IMPL_C));
    }

    #[tokio::test]
    async fn empty_slot_sentinel_is_skipped() {
        let api = MockApi::default();
        api.storage_slot(PROXY, IMPLEMENTATION_SLOTS[0], EMPTY_SLOT);
        api.storage_slot(PROXY, IMPLEMENTATION_SLOTS[3], &padded(IMPL_B));

        let resolved = resolve_implementation(&api, PROXY).await;
        assert_eq!(resolved, Some(IMPL_B));
    }

    #[tokio::test]
    async fn minimal_proxy_is_last_resort() {
        let api = MockApi::default();
        api.code_at(
            PROXY,
            &format!("0x363d3d373d3d3d363d73{:x}5af43d82803e903d91602b57fd5bf3", IMPL_B),
        );

        let resolved = resolve_implementation(&api, PROXY).await;
        assert_eq!(resolved, Some(IMPL_B));
    }

    #[tokio::test]
    async fn nothing_matches_means_not_a_proxy() {
        let api = MockApi::default();
        let resolved = resolve_implementation(&api, PROXY).await;
        assert_eq!(resolved, None);
    }

    #[test]
    fn minimal_proxy_extraction_requires_marker() {
        assert_eq!(extract_minimal_proxy_target("0x6080604052"), None);
    }

    #[test]
    fn data_word_indexing() {
        let entry = LogEntry {
            topics: vec![],
            data: format!(
                "0x{}{}",
                "11".repeat(32),
                &padded(IMPL_B)[2..],
            ),
        };
        assert_eq!(address_from_data(&entry, 2), Some(IMPL_B));
    }

    #[test]
    fn short_word_is_rejected() {
        assert_eq!(address_from_word("0x1234"), None);
    }
}
