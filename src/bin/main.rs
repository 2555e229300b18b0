use std::sync::Arc;

use anyhow::Result;
use chainpad::LibraryFlavor;
use chainpad::chains;
use chainpad::controller::{ApiFactory, Playground};
use chainpad::explorer::{ChainApi, ExplorerClient};
use chainpad::persistence::JsonFileStore;
use tracing_subscriber::{self, EnvFilter};

/// CHAINPAD_CHAIN_ID=1 CHAINPAD_API_KEY=… chainpad token=0xdac1…1ec7 0xa0b8…eb48
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let chain_id = std::env::var("CHAINPAD_CHAIN_ID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(chains::ETHEREUM_MAINNET);
    let flavor = std::env::var("CHAINPAD_LIBRARY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(LibraryFlavor::Ethers);
    let api_key = std::env::var("CHAINPAD_API_KEY").ok();

    let factory: ApiFactory = Arc::new(move |chain| {
        let client = match &api_key {
            Some(key) => ExplorerClient::with_api_key(chain, key.clone()),
            None => ExplorerClient::new(chain),
        };
        Arc::new(client) as Arc<dyn ChainApi>
    });
    let store = Arc::new(JsonFileStore::new(".chainpad.json"));

    let mut playground = Playground::new(chain_id, flavor, factory, store, None);
    playground.restore().await;
    tracing::info!(
        chain = playground.chain().name,
        flavor = playground.flavor().as_str(),
        "playground ready"
    );

    // Arguments are `name=address` pairs or bare addresses.
    for (index, arg) in std::env::args().skip(1).enumerate() {
        let (name, address) = match arg.split_once('=') {
            Some((name, address)) => (name.to_string(), address.to_string()),
            None => (format!("contract{index}"), arg),
        };
        if let Err(e) = playground.address_changed(None, &address, &name).await {
            tracing::warn!(%address, error = %e, "skipping contract");
        }
    }

    for record in playground.selection().values() {
        match &record.error {
            Some(error) => println!("{:<12} {}  {error}", record.name, record.address),
            None => println!("{:<12} {}  bound", record.name, record.address),
        }
    }
    println!("\nscope: {:?}", playground.scope().names());
    println!("\n{}", playground.declarations());
    Ok(())
}
