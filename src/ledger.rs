//! Ledger interfaces for the on-chain key registry and inboxes.
//!
//! The ledger is modelled on the SecretDot contract: `setKey`, `keyOf`,
//! `send` and `inbox`. Implementations can talk to any EVM RPC endpoint;
//! [`InMemoryLedger`] is provided for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::reference::Reference;
use crate::types::{Result, SecretDotError};

/// Configuration for ledger and blob store connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Human-readable network name.
    pub network_name: String,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// EVM chain id.
    pub chain_id: u64,
    /// Address of the deployed SecretDot contract.
    pub contract_address: String,
    /// Blob store API URL (optional).
    pub blob_api_url: Option<String>,
}

impl NetworkConfig {
    /// Creates a new configuration for the given endpoint and contract.
    pub fn new(network_name: &str, rpc_url: &str, chain_id: u64, contract_address: &str) -> Self {
        Self {
            network_name: network_name.to_string(),
            rpc_url: rpc_url.to_string(),
            chain_id,
            contract_address: contract_address.to_string(),
            blob_api_url: None,
        }
    }

    /// Sets the blob store API URL.
    pub fn with_blob_api(mut self, url: &str) -> Self {
        self.blob_api_url = Some(url.to_string());
        self
    }

    /// Creates configuration for a local Anvil node.
    pub fn localnet() -> Self {
        Self::new(
            "anvil",
            "http://localhost:8545",
            31337,
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
        )
        .with_blob_api("http://localhost:5001")
    }

    /// Creates configuration for Moonbase Alpha.
    pub fn moonbase_alpha() -> Self {
        Self::new(
            "moonbase-alphanet",
            "https://rpc.testnet.moonbeam.network",
            1287,
            "0x068592Ad3355F4C6Ec5106B9633AeED34F09d42c",
        )
    }

    /// Creates configuration for the Paseo Asset Hub testnet.
    pub fn paseo_asset_hub() -> Self {
        Self::new(
            "paseo-asset-hub",
            "https://testnet-passet-hub-eth-rpc.polkadot.io",
            420420422,
            "0x775969a56f3EE47cd3F56Da602D6F5Bf2625296A",
        )
    }

    /// Reads configuration from `SECRETDOT_*` environment variables.
    ///
    /// `SECRETDOT_RPC_URL`, `SECRETDOT_CHAIN_ID` and
    /// `SECRETDOT_CONTRACT_ADDRESS` are required; `SECRETDOT_NETWORK` and
    /// `SECRETDOT_BLOB_API_URL` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| SecretDotError::Config(format!("{} is not set", name)))
        };

        let rpc_url = required("SECRETDOT_RPC_URL")?;
        let chain_id = required("SECRETDOT_CHAIN_ID")?
            .trim()
            .parse::<u64>()
            .map_err(|e| SecretDotError::Config(format!("SECRETDOT_CHAIN_ID: {}", e)))?;
        let contract_address = required("SECRETDOT_CONTRACT_ADDRESS")?;
        let network_name = lookup("SECRETDOT_NETWORK").unwrap_or_else(|| "custom".to_string());

        let mut config = Self::new(&network_name, rpc_url.trim(), chain_id, contract_address.trim());
        config.blob_api_url = lookup("SECRETDOT_BLOB_API_URL").filter(|url| !url.trim().is_empty());
        Ok(config)
    }
}

/// One message pointer in a recipient's inbox.
///
/// Field names on the wire match the contract's `Msg` struct. The `ipfs`
/// field must hold a [`Reference`]; entries carrying raw IPFS CIDs (`Qm` +
/// base58) do not deserialize, so a ledger adapter reading such an inbox
/// fails as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxEntry {
    /// Reference of the stored envelope.
    #[serde(rename = "ipfs")]
    pub reference: Reference,
    /// Sender address.
    #[serde(rename = "from")]
    pub sender: String,
    /// Unix time in seconds.
    #[serde(rename = "t")]
    pub timestamp: u64,
}

impl InboxEntry {
    /// Creates a new inbox entry.
    pub fn new(reference: Reference, sender: impl Into<String>, timestamp: u64) -> Self {
        Self {
            reference,
            sender: sender.into(),
            timestamp,
        }
    }
}

/// Trait for the on-chain registry of public keys and inboxes.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// Get the public key registered for an address.
    async fn lookup_public_key(&self, address: &str) -> Result<Option<Vec<u8>>>;

    /// Register (or overwrite) the public key for an address.
    async fn register_public_key(&self, address: &str, public_key: &[u8]) -> Result<()>;

    /// Append an entry to a recipient's inbox.
    async fn append_inbox_entry(&self, recipient: &str, entry: InboxEntry) -> Result<()>;

    /// List a recipient's inbox in insertion order.
    async fn list_inbox(&self, address: &str) -> Result<Vec<InboxEntry>>;
}

/// Looks up a recipient's encryption key, treating unset slots as absent.
///
/// Contract storage returns empty or zero-filled values for addresses that
/// never registered; those count as no key.
pub async fn discover_public_key<L: Ledger + ?Sized>(
    ledger: &L,
    address: &str,
) -> Result<Option<Vec<u8>>> {
    let key = ledger.lookup_public_key(address).await?;
    Ok(key.filter(|bytes| bytes.iter().any(|&b| b != 0)))
}

/// Canonical map key for an address: trimmed and lowercased.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// In-memory implementation of [`Ledger`].
#[derive(Default)]
pub struct InMemoryLedger {
    keys: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    inboxes: Arc<RwLock<HashMap<String, Vec<InboxEntry>>>>,
    fail_appends: AtomicBool,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `append_inbox_entry` calls fail with an I/O error.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Total number of inbox entries across all recipients.
    pub async fn entry_count(&self) -> usize {
        let inboxes = self.inboxes.read().await;
        inboxes.values().map(Vec::len).sum()
    }
}

#[async_trait::async_trait]
impl Ledger for InMemoryLedger {
    async fn lookup_public_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
        let keys = self.keys.read().await;
        Ok(keys.get(&normalize_address(address)).cloned())
    }

    async fn register_public_key(&self, address: &str, public_key: &[u8]) -> Result<()> {
        let mut keys = self.keys.write().await;
        keys.insert(normalize_address(address), public_key.to_vec());
        Ok(())
    }

    async fn append_inbox_entry(&self, recipient: &str, entry: InboxEntry) -> Result<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(SecretDotError::Io("ledger rejected transaction".to_string()));
        }

        let mut inboxes = self.inboxes.write().await;
        inboxes
            .entry(normalize_address(recipient))
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn list_inbox(&self, address: &str) -> Result<Vec<InboxEntry>> {
        let inboxes = self.inboxes.read().await;
        Ok(inboxes
            .get(&normalize_address(address))
            .cloned()
            .unwrap_or_default())
    }
}
