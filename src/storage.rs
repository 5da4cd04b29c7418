//! Blob storage interfaces and implementations for SecretDot.
//!
//! Envelopes live off-ledger in a content-addressed blob store keyed by
//! [`Reference`]. This module provides the [`BlobStore`] trait, an in-memory
//! store, a directory-backed store, an IPFS HTTP API store, and a TTL cache
//! for recipients' public keys.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use tokio::sync::RwLock;

use crate::ledger::NetworkConfig;
use crate::reference::Reference;
use crate::types::{Result, SecretDotError};

/// Key prefix for stored envelopes.
pub const BLOB_KEY_PREFIX: &str = "secretdot_msg_";

/// Storage key under which an envelope is kept.
pub fn blob_key(reference: &Reference) -> String {
    format!("{}{}", BLOB_KEY_PREFIX, reference)
}

// ============================================================================
// Blob Store
// ============================================================================

/// Trait for content-addressed envelope storage.
///
/// Only `put` and `get` are relied upon; entries are never updated or
/// deleted by the protocol.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a reference.
    async fn put(&self, reference: &Reference, data: &[u8]) -> Result<()>;

    /// Fetch the bytes stored under a reference.
    async fn get(&self, reference: &Reference) -> Result<Option<Vec<u8>>>;
}

/// In-memory implementation of [`BlobStore`].
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<Reference, Vec<u8>>>>,
    fail_puts: AtomicBool,
}

impl InMemoryBlobStore {
    /// Creates a new, empty in-memory blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `put` calls fail with an I/O error.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Drop a stored blob, simulating data loss in the backing store.
    pub async fn remove(&self, reference: &Reference) -> Option<Vec<u8>> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(reference)
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        let blobs = self.blobs.read().await;
        blobs.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, reference: &Reference, data: &[u8]) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(SecretDotError::Io("blob store unavailable".to_string()));
        }

        let mut blobs = self.blobs.write().await;
        blobs.insert(reference.clone(), data.to_vec());
        Ok(())
    }

    async fn get(&self, reference: &Reference) -> Result<Option<Vec<u8>>> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(reference).cloned())
    }
}

/// Directory-backed implementation of [`BlobStore`].
///
/// Each envelope is one file named `secretdot_msg_<reference>`.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory holding the blobs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, reference: &Reference) -> PathBuf {
        self.root.join(blob_key(reference))
    }
}

#[async_trait::async_trait]
impl BlobStore for FileBlobStore {
    async fn put(&self, reference: &Reference, data: &[u8]) -> Result<()> {
        let path = self.path_for(reference);
        let staging = path.with_extension("tmp");

        tokio::fs::write(&staging, data).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn get(&self, reference: &Reference) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(reference)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Directory in the IPFS node's mutable file system that holds envelopes.
pub const IPFS_BLOB_DIR: &str = "/secretdot";

/// [`BlobStore`] backed by an IPFS node's HTTP API.
///
/// Envelopes are written into the node's mutable file system as
/// `/secretdot/secretdot_msg_<reference>`, so they are addressed by
/// [`Reference`] rather than by the CID the node assigns.
#[derive(Debug, Clone)]
pub struct IpfsBlobStore {
    api_url: Url,
    client: Client,
}

impl IpfsBlobStore {
    /// Creates a store talking to the API at `api_url` (e.g. `http://localhost:5001`).
    pub fn new(api_url: &str) -> Result<Self> {
        let mut api_url = Url::parse(api_url.trim()).map_err(|e| {
            SecretDotError::Config(format!("invalid blob API URL {:?}: {}", api_url, e))
        })?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        Ok(Self {
            api_url,
            client: Client::new(),
        })
    }

    /// Creates a store for the network's `blob_api_url`.
    pub fn from_network(config: &NetworkConfig) -> Result<Self> {
        let url = config.blob_api_url.as_deref().ok_or_else(|| {
            SecretDotError::Config(format!(
                "network {} has no blob API URL",
                config.network_name
            ))
        })?;
        Self::new(url)
    }

    /// Base URL of the IPFS HTTP API.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn files_endpoint(&self, command: &str, reference: &Reference) -> Result<Url> {
        let mut url = self
            .api_url
            .join(&format!("api/v0/files/{}", command))
            .map_err(|e| SecretDotError::Config(format!("invalid blob API URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("arg", &format!("{}/{}", IPFS_BLOB_DIR, blob_key(reference)));
        Ok(url)
    }
}

#[async_trait::async_trait]
impl BlobStore for IpfsBlobStore {
    async fn put(&self, reference: &Reference, data: &[u8]) -> Result<()> {
        let mut url = self.files_endpoint("write", reference)?;
        url.query_pairs_mut()
            .append_pair("create", "true")
            .append_pair("parents", "true")
            .append_pair("truncate", "true");

        let part = Part::bytes(data.to_vec()).file_name(blob_key(reference));
        let response = self
            .client
            .post(url)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(request_failed)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SecretDotError::Io(format!(
                "blob API write failed ({}): {}",
                status,
                body.trim()
            )));
        }
        Ok(())
    }

    async fn get(&self, reference: &Reference) -> Result<Option<Vec<u8>>> {
        let url = self.files_endpoint("read", reference)?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await.map_err(request_failed)?;
            return Ok(Some(bytes.to_vec()));
        }

        let body = response.text().await.unwrap_or_default();
        if body.contains("does not exist") {
            return Ok(None);
        }
        Err(SecretDotError::Io(format!(
            "blob API read failed ({}): {}",
            status,
            body.trim()
        )))
    }
}

fn request_failed(e: reqwest::Error) -> SecretDotError {
    SecretDotError::Io(format!("blob API request failed: {}", e))
}

// ============================================================================
// Public Key Cache
// ============================================================================

/// Entry in the public key cache with expiration.
struct CacheEntry {
    key: Vec<u8>,
    expires_at: Instant,
}

/// In-memory cache for recipients' public keys with TTL expiration.
pub struct PublicKeyCache {
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl PublicKeyCache {
    /// Creates a new public key cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Creates a cache with default TTL (24 hours).
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(86400))
    }

    /// Store a public key for an address.
    pub async fn store(&self, address: &str, key: Vec<u8>) {
        let mut cache = self.cache.write().await;
        cache.insert(
            crate::ledger::normalize_address(address),
            CacheEntry {
                key,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Retrieve a public key for an address (returns None if expired).
    pub async fn retrieve(&self, address: &str) -> Option<Vec<u8>> {
        let cache = self.cache.read().await;
        cache
            .get(&crate::ledger::normalize_address(address))
            .and_then(|entry| {
                if entry.expires_at > Instant::now() {
                    Some(entry.key.clone())
                } else {
                    None
                }
            })
    }

    /// Invalidate the cached key for an address.
    pub async fn invalidate(&self, address: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(&crate::ledger::normalize_address(address));
    }
}

impl Default for PublicKeyCache {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
