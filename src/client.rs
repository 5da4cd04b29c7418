//! Sending and receiving SecretDot messages.
//!
//! A send seals the plaintext to the recipient's registered key, stores the
//! envelope in the blob store, and only then advertises its reference on the
//! ledger. Receiving walks the ledger inbox and opens every entry
//! independently.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use x25519_dalek::StaticSecret;

use crate::crypto::{decrypt_message, encrypt_message};
use crate::envelope::{Envelope, EnvelopeFormat};
use crate::keys::{parse_public_key, KeyPair};
use crate::ledger::{discover_public_key, InboxEntry, Ledger};
use crate::models::{ReadError, ReceivedMessage};
use crate::reference::{compute_reference, reference_salt, Reference};
use crate::retry::{retry, RetryConfig};
use crate::storage::{BlobStore, PublicKeyCache};
use crate::types::{Result, SecretDotError};

/// Default deadline for a single ledger or blob store call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for the free-standing [`send`] and [`receive_all`] functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// Stored form of the envelope.
    pub envelope_format: EnvelopeFormat,
    /// Deadline for each collaborator call.
    pub call_timeout: Duration,
    /// Reject plaintexts larger than this many bytes.
    pub max_plaintext_size: Option<usize>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            envelope_format: EnvelopeFormat::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_plaintext_size: None,
        }
    }
}

/// Configuration for the [`SecretDot`] client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Stored form of outgoing envelopes.
    pub envelope_format: EnvelopeFormat,
    /// Deadline for each collaborator call.
    pub call_timeout: Duration,
    /// Reject plaintexts larger than this many bytes.
    pub max_plaintext_size: Option<usize>,
    /// Whether to cache recipients' public keys.
    pub cache_public_keys: bool,
    /// How long cached public keys stay valid.
    pub key_cache_ttl: Duration,
    /// Retry policy for collaborator calls.
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            envelope_format: EnvelopeFormat::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_plaintext_size: None,
            cache_public_keys: true,
            key_cache_ttl: Duration::from_secs(86400),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// The subset of settings used by a single send or receive.
    pub fn send_options(&self) -> SendOptions {
        SendOptions {
            envelope_format: self.envelope_format,
            call_timeout: self.call_timeout,
            max_plaintext_size: self.max_plaintext_size,
        }
    }
}

/// Encrypt `plaintext` for `recipient`, store it, and record it on the ledger.
///
/// Nothing is written to the ledger unless the blob store accepted the
/// envelope. A ledger failure after the blob was stored is returned as
/// [`SecretDotError::LedgerAppendFailed`] carrying the orphaned reference.
pub async fn send<L, B>(
    plaintext: &[u8],
    recipient: &str,
    sender: &str,
    ledger: &L,
    blob_store: &B,
    options: &SendOptions,
) -> Result<Reference>
where
    L: Ledger + ?Sized,
    B: BlobStore + ?Sized,
{
    check_size(plaintext, options.max_plaintext_size)?;

    let public_key = with_timeout(options.call_timeout, discover_public_key(ledger, recipient))
        .await?
        .ok_or_else(|| SecretDotError::RecipientKeyNotFound(recipient.trim().to_string()))?;

    let timestamp_ms = now_millis()?;
    let (reference, blob) = seal_for_recipient(
        plaintext,
        &public_key,
        recipient,
        timestamp_ms,
        options.envelope_format,
    )?;

    with_timeout(options.call_timeout, blob_store.put(&reference, &blob)).await?;
    debug!(reference = %reference, bytes = blob.len(), "envelope stored");

    let entry = InboxEntry::new(reference.clone(), sender.trim(), timestamp_ms / 1000);
    with_timeout(options.call_timeout, ledger.append_inbox_entry(recipient, entry))
        .await
        .map_err(|e| orphaned(reference.clone(), e))?;

    info!(reference = %reference, recipient = recipient.trim(), "message sent");
    Ok(reference)
}

/// Read and decrypt every message in `recipient`'s inbox.
///
/// Entries are processed concurrently; the output keeps ledger order. A
/// failure on one entry is reported in that entry's
/// [`ReceivedMessage::content`] and never affects the others. Only a failure
/// to list the inbox fails the call as a whole.
pub async fn receive_all<L, B>(
    recipient: &str,
    private_key: &StaticSecret,
    ledger: &L,
    blob_store: &B,
    options: &SendOptions,
) -> Result<Vec<ReceivedMessage>>
where
    L: Ledger + ?Sized,
    B: BlobStore + ?Sized,
{
    let entries = with_timeout(options.call_timeout, ledger.list_inbox(recipient)).await?;
    debug!(recipient = recipient.trim(), count = entries.len(), "inbox listed");
    Ok(open_entries(&entries, private_key, blob_store, options.call_timeout).await)
}

/// Publish `public_key` as `address`'s encryption key, replacing any previous one.
pub async fn register_key<L>(
    address: &str,
    public_key: &[u8],
    ledger: &L,
    call_timeout: Duration,
) -> Result<()>
where
    L: Ledger + ?Sized,
{
    parse_public_key(public_key)?;
    if public_key.iter().all(|&b| b == 0) {
        return Err(SecretDotError::InvalidKey(
            "all-zero public key cannot be registered".to_string(),
        ));
    }

    with_timeout(call_timeout, ledger.register_public_key(address, public_key)).await?;
    info!(address = address.trim(), "public key registered");
    Ok(())
}

/// The main SecretDot client for encrypted messaging.
///
/// Holds the user's address and key pair together with the ledger and blob
/// store it talks to. Collaborator calls are retried according to
/// [`ClientConfig::retry`].
pub struct SecretDot<L, B>
where
    L: Ledger,
    B: BlobStore,
{
    address: String,
    keys: KeyPair,
    config: ClientConfig,
    ledger: L,
    blob_store: B,
    public_key_cache: PublicKeyCache,
}

impl<L, B> SecretDot<L, B>
where
    L: Ledger,
    B: BlobStore,
{
    /// Creates a new client for `address` using `keys`.
    pub fn new(address: &str, keys: KeyPair, config: ClientConfig, ledger: L, blob_store: B) -> Self {
        let public_key_cache = PublicKeyCache::new(config.key_cache_ttl);
        Self {
            address: address.trim().to_string(),
            keys,
            config,
            ledger,
            blob_store,
            public_key_cache,
        }
    }

    /// Creates a new client whose key pair is derived from a 32-byte seed.
    pub fn from_seed(
        seed: &[u8],
        address: &str,
        config: ClientConfig,
        ledger: L,
        blob_store: B,
    ) -> Result<Self> {
        let keys = KeyPair::from_seed(seed)?;
        Ok(Self::new(address, keys, config, ledger, blob_store))
    }

    /// Returns the user's address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the user's encryption public key as bytes.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.keys.public_key_bytes()
    }

    /// Returns the user's encryption public key as `0x`-prefixed hex.
    pub fn public_key_hex(&self) -> String {
        self.keys.public_key_hex()
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Returns the blob store.
    pub fn blob_store(&self) -> &B {
        &self.blob_store
    }

    /// Returns the public key cache.
    pub fn public_key_cache(&self) -> &PublicKeyCache {
        &self.public_key_cache
    }

    /// Publishes this client's public key on the ledger.
    pub async fn register(&self) -> Result<()> {
        let public_key = self.keys.public_key_bytes();
        let timeout = self.config.call_timeout;
        retry(&self.config.retry, || {
            register_key(&self.address, &public_key, &self.ledger, timeout)
        })
        .await?;

        if self.config.cache_public_keys {
            self.public_key_cache
                .store(&self.address, public_key.to_vec())
                .await;
        }
        Ok(())
    }

    /// Discovers the encryption public key for an address.
    ///
    /// Cached keys are trusted until [`ClientConfig::key_cache_ttl`] runs
    /// out, so a recipient who re-registers is only seen after expiry or a
    /// call to [`SecretDot::refresh_key`].
    pub async fn discover_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
        // Check cache first
        if self.config.cache_public_keys {
            if let Some(key) = self.public_key_cache.retrieve(address).await {
                return Ok(Some(key));
            }
        }

        let timeout = self.config.call_timeout;
        let key = retry(&self.config.retry, || {
            with_timeout(timeout, discover_public_key(&self.ledger, address))
        })
        .await?;

        // Cache if found
        if let Some(ref found) = key {
            if self.config.cache_public_keys {
                self.public_key_cache.store(address, found.clone()).await;
            }
        }

        Ok(key)
    }

    /// Drops any cached key for `address` and looks it up on the ledger again.
    pub async fn refresh_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
        self.public_key_cache.invalidate(address).await;
        self.discover_key(address).await
    }

    /// Encrypts and sends a message to `recipient`.
    ///
    /// Key lookup and the blob write are retried. The ledger append runs
    /// once; its failure comes back as [`SecretDotError::LedgerAppendFailed`].
    pub async fn send(&self, recipient: &str, plaintext: &[u8]) -> Result<Reference> {
        check_size(plaintext, self.config.max_plaintext_size)?;

        let public_key = self
            .discover_key(recipient)
            .await?
            .ok_or_else(|| SecretDotError::RecipientKeyNotFound(recipient.trim().to_string()))?;

        let timestamp_ms = now_millis()?;
        let (reference, blob) = seal_for_recipient(
            plaintext,
            &public_key,
            recipient,
            timestamp_ms,
            self.config.envelope_format,
        )?;

        let timeout = self.config.call_timeout;
        retry(&self.config.retry, || {
            with_timeout(timeout, self.blob_store.put(&reference, &blob))
        })
        .await?;
        debug!(reference = %reference, bytes = blob.len(), "envelope stored");

        // Not retried: appends are not idempotent.
        let entry = InboxEntry::new(reference.clone(), self.address.clone(), timestamp_ms / 1000);
        with_timeout(timeout, self.ledger.append_inbox_entry(recipient, entry))
            .await
            .map_err(|e| orphaned(reference.clone(), e))?;

        info!(reference = %reference, recipient = recipient.trim(), "message sent");
        Ok(reference)
    }

    /// Encrypts and sends a text message to `recipient`.
    pub async fn send_text(&self, recipient: &str, text: &str) -> Result<Reference> {
        self.send(recipient, text.as_bytes()).await
    }

    /// Fetches and decrypts every message in this client's inbox.
    pub async fn receive_all(&self) -> Result<Vec<ReceivedMessage>> {
        let timeout = self.config.call_timeout;
        let entries = retry(&self.config.retry, || {
            with_timeout(timeout, self.ledger.list_inbox(&self.address))
        })
        .await?;
        debug!(recipient = %self.address, count = entries.len(), "inbox listed");

        Ok(open_entries(&entries, self.keys.secret(), &self.blob_store, timeout).await)
    }
}

/// Encrypt and serialize, returning the reference and the bytes to store.
fn seal_for_recipient(
    plaintext: &[u8],
    public_key: &[u8],
    recipient: &str,
    timestamp_ms: u64,
    format: EnvelopeFormat,
) -> Result<(Reference, Vec<u8>)> {
    let envelope = encrypt_message(plaintext, public_key)?;
    let blob = envelope.to_bytes(format);
    let reference = compute_reference(&blob, &reference_salt(timestamp_ms, recipient));
    Ok((reference, blob))
}

async fn open_entries<B>(
    entries: &[InboxEntry],
    private_key: &StaticSecret,
    blob_store: &B,
    call_timeout: Duration,
) -> Vec<ReceivedMessage>
where
    B: BlobStore + ?Sized,
{
    let reads = entries.iter().map(|entry| {
        let private_key = private_key.clone();
        async move {
            let content = open_entry(entry, private_key, blob_store, call_timeout).await;
            if let Err(ref reason) = content {
                warn!(reference = %entry.reference, sender = %entry.sender, error = %reason, "inbox entry unreadable");
            }
            ReceivedMessage::new(entry, content)
        }
    });
    join_all(reads).await
}

/// Fetch one blob, then decrypt it on the blocking pool.
async fn open_entry<B>(
    entry: &InboxEntry,
    private_key: StaticSecret,
    blob_store: &B,
    call_timeout: Duration,
) -> std::result::Result<Vec<u8>, ReadError>
where
    B: BlobStore + ?Sized,
{
    let blob = match with_timeout(call_timeout, blob_store.get(&entry.reference)).await {
        Ok(Some(blob)) => blob,
        Ok(None) => return Err(ReadError::BlobNotFound),
        Err(e) => return Err(ReadError::Unavailable(e.to_string())),
    };

    let opened = tokio::task::spawn_blocking(move || {
        let envelope = Envelope::from_stored(&blob).map_err(|_| ReadError::DecryptFailed)?;
        decrypt_message(&envelope, &private_key).map_err(|_| ReadError::DecryptFailed)
    })
    .await;

    match opened {
        Ok(content) => content,
        Err(e) => Err(ReadError::Unavailable(format!("decrypt task failed: {}", e))),
    }
}

async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| SecretDotError::Timeout(limit))?
}

fn orphaned(reference: Reference, source: SecretDotError) -> SecretDotError {
    warn!(reference = %reference, error = %source, "ledger append failed; blob left orphaned");
    SecretDotError::LedgerAppendFailed {
        reference,
        source: Box::new(source),
    }
}

fn check_size(plaintext: &[u8], max: Option<usize>) -> Result<()> {
    match max {
        Some(max) if plaintext.len() > max => Err(SecretDotError::MessageTooLarge {
            size: plaintext.len(),
            max,
        }),
        _ => Ok(()),
    }
}

fn now_millis() -> Result<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| SecretDotError::Io(format!("system clock before Unix epoch: {}", e)))?;
    Ok(elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::storage::InMemoryBlobStore;

    const ALICE: &str = "0x00000000000000000000000000000000000A11CE";
    const BOB: &str = "0x0000000000000000000000000000000000000B0B";

    /// A ledger whose calls never finish in time.
    struct StalledLedger;

    #[async_trait::async_trait]
    impl Ledger for StalledLedger {
        async fn lookup_public_key(&self, _address: &str) -> Result<Option<Vec<u8>>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn register_public_key(&self, _address: &str, _public_key: &[u8]) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn append_inbox_entry(&self, _recipient: &str, _entry: InboxEntry) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn list_inbox(&self, _address: &str) -> Result<Vec<InboxEntry>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    /// A ledger that records appends but acknowledges them too late.
    #[derive(Default)]
    struct SlowAckLedger {
        inner: InMemoryLedger,
    }

    #[async_trait::async_trait]
    impl Ledger for SlowAckLedger {
        async fn lookup_public_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
            self.inner.lookup_public_key(address).await
        }

        async fn register_public_key(&self, address: &str, public_key: &[u8]) -> Result<()> {
            self.inner.register_public_key(address, public_key).await
        }

        async fn append_inbox_entry(&self, recipient: &str, entry: InboxEntry) -> Result<()> {
            self.inner.append_inbox_entry(recipient, entry).await?;
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }

        async fn list_inbox(&self, address: &str) -> Result<Vec<InboxEntry>> {
            self.inner.list_inbox(address).await
        }
    }

    fn quick_config() -> ClientConfig {
        ClientConfig {
            call_timeout: Duration::from_millis(50),
            retry: RetryConfig {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
            ..ClientConfig::default()
        }
    }

    fn client(address: &str) -> SecretDot<InMemoryLedger, InMemoryBlobStore> {
        SecretDot::new(
            address,
            KeyPair::generate(),
            quick_config(),
            InMemoryLedger::new(),
            InMemoryBlobStore::new(),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.envelope_format, EnvelopeFormat::Binary);
        assert_eq!(config.call_timeout, DEFAULT_CALL_TIMEOUT);
        assert!(config.cache_public_keys);
        assert_eq!(config.max_plaintext_size, None);
        assert_eq!(config.send_options(), SendOptions::default());
    }

    #[test]
    fn test_config_partial_json() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"envelope_format":"json","max_plaintext_size":1024}"#)
                .unwrap();
        assert_eq!(config.envelope_format, EnvelopeFormat::Json);
        assert_eq!(config.max_plaintext_size, Some(1024));
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[tokio::test]
    async fn test_client_send_and_receive_self() {
        let alice = client(ALICE);
        alice.register().await.unwrap();

        let reference = alice.send_text(ALICE, "note to self").await.unwrap();
        let inbox = alice.receive_all().await.unwrap();

        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].reference, reference);
        assert_eq!(inbox[0].sender, ALICE);
        assert_eq!(inbox[0].text(), Some("note to self"));
    }

    #[tokio::test]
    async fn test_client_uses_cached_key() {
        let alice = client(ALICE);
        let bob_keys = KeyPair::generate();

        alice
            .public_key_cache()
            .store(BOB, bob_keys.public_key_bytes().to_vec())
            .await;

        // Not on the ledger, but the cached key is enough to send.
        let reference = alice.send_text(BOB, "cached").await.unwrap();
        assert_eq!(alice.ledger().list_inbox(BOB).await.unwrap()[0].reference, reference);
    }

    #[tokio::test]
    async fn test_client_message_too_large() {
        let alice = SecretDot::new(
            ALICE,
            KeyPair::generate(),
            ClientConfig {
                max_plaintext_size: Some(4),
                ..quick_config()
            },
            InMemoryLedger::new(),
            InMemoryBlobStore::new(),
        );
        alice.register().await.unwrap();

        let result = alice.send_text(ALICE, "too long").await;
        assert!(matches!(
            result,
            Err(SecretDotError::MessageTooLarge { size: 8, max: 4 })
        ));
        assert!(alice.blob_store().is_empty().await);
    }

    #[tokio::test]
    async fn test_client_ledger_failure_reports_orphan() {
        let alice = client(ALICE);
        alice.register().await.unwrap();
        alice.ledger().fail_appends(true);

        let (reference, source) = match alice.send_text(ALICE, "lost pointer").await {
            Err(SecretDotError::LedgerAppendFailed { reference, source }) => (reference, source),
            other => panic!("expected LedgerAppendFailed, got {:?}", other),
        };

        assert!(matches!(*source, SecretDotError::Io(_)));
        assert!(alice.blob_store().get(&reference).await.unwrap().is_some());
        assert_eq!(alice.ledger().entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_keys() {
        let ledger = InMemoryLedger::new();

        let result = register_key(ALICE, &[1u8; 31], &ledger, DEFAULT_CALL_TIMEOUT).await;
        assert!(matches!(result, Err(SecretDotError::InvalidKey(_))));

        let result = register_key(ALICE, &[0u8; 32], &ledger, DEFAULT_CALL_TIMEOUT).await;
        assert!(matches!(result, Err(SecretDotError::InvalidKey(_))));

        assert_eq!(ledger.lookup_public_key(ALICE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stalled_ledger_times_out() {
        let options = SendOptions {
            call_timeout: Duration::from_millis(20),
            ..SendOptions::default()
        };
        let blobs = InMemoryBlobStore::new();

        let result = send(b"hi", BOB, ALICE, &StalledLedger, &blobs, &options).await;
        assert!(matches!(result, Err(SecretDotError::Timeout(_))));
        assert!(blobs.is_empty().await);

        let keys = KeyPair::generate();
        let result = receive_all(BOB, keys.secret(), &StalledLedger, &blobs, &options).await;
        assert!(matches!(result, Err(SecretDotError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_send_through_trait_objects() {
        let ledger: Box<dyn Ledger> = Box::new(InMemoryLedger::new());
        let blobs: Box<dyn BlobStore> = Box::new(InMemoryBlobStore::new());
        let bob = KeyPair::generate();

        register_key(BOB, &bob.public_key_bytes(), ledger.as_ref(), DEFAULT_CALL_TIMEOUT)
            .await
            .unwrap();
        send(b"dyn", BOB, ALICE, ledger.as_ref(), blobs.as_ref(), &SendOptions::default())
            .await
            .unwrap();

        let inbox = receive_all(BOB, bob.secret(), ledger.as_ref(), blobs.as_ref(), &SendOptions::default())
            .await
            .unwrap();
        assert_eq!(inbox[0].content, Ok(b"dyn".to_vec()));
    }

    #[tokio::test]
    async fn test_client_appends_once_on_late_ack() {
        let alice = SecretDot::new(
            ALICE,
            KeyPair::generate(),
            quick_config(),
            SlowAckLedger::default(),
            InMemoryBlobStore::new(),
        );
        alice.register().await.unwrap();

        let result = alice.send_text(ALICE, "exactly once").await;

        assert!(matches!(
            result,
            Err(SecretDotError::LedgerAppendFailed { ref source, .. })
                if matches!(**source, SecretDotError::Timeout(_))
        ));
        assert_eq!(alice.ledger().inner.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_refresh_key_sees_reregistration() {
        let alice = client(ALICE);
        let old_keys = KeyPair::generate();
        let new_keys = KeyPair::generate();

        register_key(BOB, &old_keys.public_key_bytes(), alice.ledger(), DEFAULT_CALL_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(
            alice.discover_key(BOB).await.unwrap(),
            Some(old_keys.public_key_bytes().to_vec())
        );

        register_key(BOB, &new_keys.public_key_bytes(), alice.ledger(), DEFAULT_CALL_TIMEOUT)
            .await
            .unwrap();

        // Still cached until refreshed.
        assert_eq!(
            alice.discover_key(BOB).await.unwrap(),
            Some(old_keys.public_key_bytes().to_vec())
        );
        assert_eq!(
            alice.refresh_key(BOB).await.unwrap(),
            Some(new_keys.public_key_bytes().to_vec())
        );
        assert_eq!(
            alice.discover_key(BOB).await.unwrap(),
            Some(new_keys.public_key_bytes().to_vec())
        );
    }

    #[tokio::test]
    async fn test_client_receive_keeps_order() {
        let alice = client(ALICE);
        alice.register().await.unwrap();

        for text in ["one", "two", "three", "four"] {
            alice.send_text(ALICE, text).await.unwrap();
        }

        let inbox = alice.receive_all().await.unwrap();
        let texts: Vec<_> = inbox.iter().filter_map(|m| m.text()).collect();
        assert_eq!(texts, vec!["one", "two", "three", "four"]);
    }
}
