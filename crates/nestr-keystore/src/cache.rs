//! In-memory cache of decrypted keys with time-based expiry.
//!
//! Entries are never persisted. Each `put` stamps the entry with a fresh
//! generation number and schedules a one-shot expiry task; the task only
//! removes the entry if it still carries that generation, so an older timer
//! can never evict a newer value. `get` also ignores entries older than the
//! TTL, so expiry holds even if the timer task has not run yet.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{KeystoreError, Result};
use crate::types::KeyMaterial;

type HmacSha256 = Hmac<Sha256>;

/// Default cache lifetime: 72 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(72 * 60 * 60);

const VERIFIER_SALT_LEN: usize = 16;
const MAC_KEY_LEN: usize = 32;

/// How a cache hit treats the passphrase supplied with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Every hit must present the passphrase the entry was populated with.
    #[default]
    VerifyPassphrase,
    /// A populated entry acts as an authenticated session: hits return the
    /// key regardless of the passphrase until the entry expires.
    Session,
}

/// Salted, keyed digest of the passphrase that populated an entry.
struct PassphraseVerifier {
    salt: [u8; VERIFIER_SALT_LEN],
    tag: [u8; 32],
}

struct CacheEntry {
    material: KeyMaterial,
    inserted_at: Instant,
    generation: u64,
    verifier: Option<PassphraseVerifier>,
}

struct CacheInner {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    policy: CachePolicy,
    /// Per-process MAC key for passphrase verifiers; never leaves memory.
    mac_key: Zeroizing<[u8; MAC_KEY_LEN]>,
    next_generation: AtomicU64,
}

/// Cache of decrypted key material keyed by key name.
///
/// Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct KeyCache {
    inner: Arc<CacheInner>,
}

impl KeyCache {
    /// Create an empty cache.
    pub fn new(ttl: Duration, policy: CachePolicy) -> Self {
        let mut mac_key = Zeroizing::new([0u8; MAC_KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut mac_key[..]);

        Self {
            inner: Arc::new(CacheInner {
                entries: RwLock::new(HashMap::new()),
                ttl,
                policy,
                mac_key,
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn policy(&self) -> CachePolicy {
        self.inner.policy
    }

    /// Insert or replace the entry for `key_name` and schedule its expiry.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn put(
        &self,
        key_name: &str,
        material: KeyMaterial,
        passphrase: &[u8],
    ) -> Result<()> {
        let verifier = match self.inner.policy {
            CachePolicy::VerifyPassphrase => Some(self.inner.make_verifier(passphrase)?),
            CachePolicy::Session => None,
        };
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        let inserted_at = Instant::now();
        let entry = CacheEntry {
            material,
            inserted_at,
            generation,
            verifier,
        };
        self.inner
            .entries
            .write()
            .await
            .insert(key_name.to_string(), entry);

        debug!(key_name, generation, "cached decrypted key");
        schedule_expiry(
            Arc::downgrade(&self.inner),
            key_name.to_string(),
            generation,
            inserted_at + self.inner.ttl,
        );
        Ok(())
    }

    /// Look up a live entry.
    ///
    /// Returns `Ok(None)` on a miss or an expired entry. Under
    /// [`CachePolicy::VerifyPassphrase`] a hit with a different passphrase is
    /// an [`KeystoreError::AuthenticationFailure`]; the entry stays cached.
    pub async fn get(&self, key_name: &str, passphrase: &[u8]) -> Result<Option<KeyMaterial>> {
        let entries = self.inner.entries.read().await;
        let Some(entry) = entries.get(key_name) else {
            return Ok(None);
        };

        if entry.inserted_at.elapsed() >= self.inner.ttl {
            return Ok(None);
        }

        if let Some(verifier) = &entry.verifier {
            if !self.inner.verify(verifier, passphrase)? {
                debug!(key_name, "cache hit rejected: passphrase mismatch");
                return Err(KeystoreError::AuthenticationFailure);
            }
        }

        Ok(Some(entry.material.clone()))
    }

    /// Remove the entry for `key_name` unconditionally.
    pub async fn evict(&self, key_name: &str) -> bool {
        self.inner.entries.write().await.remove(key_name).is_some()
    }

    /// Number of entries currently held, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }

    /// Whether an entry (live or awaiting its expiry task) exists for `key_name`.
    pub async fn contains(&self, key_name: &str) -> bool {
        self.inner.entries.read().await.contains_key(key_name)
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, CachePolicy::default())
    }
}

impl CacheInner {
    fn mac(&self, salt: &[u8], passphrase: &[u8]) -> Result<HmacSha256> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac_key[..])
            .map_err(|e| KeystoreError::Encryption(e.to_string()))?;
        mac.update(salt);
        mac.update(passphrase);
        Ok(mac)
    }

    fn make_verifier(&self, passphrase: &[u8]) -> Result<PassphraseVerifier> {
        let mut salt = [0u8; VERIFIER_SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let tag = self.mac(&salt, passphrase)?.finalize().into_bytes().into();
        Ok(PassphraseVerifier { salt, tag })
    }

    /// Constant-time comparison against the stored tag.
    fn verify(&self, verifier: &PassphraseVerifier, passphrase: &[u8]) -> Result<bool> {
        Ok(self
            .mac(&verifier.salt, passphrase)?
            .verify_slice(&verifier.tag)
            .is_ok())
    }

    /// Remove `key_name` only if the live entry is still the one scheduled.
    async fn expire(&self, key_name: &str, generation: u64) -> bool {
        let mut entries = self.entries.write().await;
        let current = entries.get(key_name).map(|e| e.generation) == Some(generation);
        if current {
            entries.remove(key_name);
            debug!(key_name, generation, "cache entry expired");
        }
        current
    }
}

fn schedule_expiry(inner: Weak<CacheInner>, key_name: String, generation: u64, deadline: Instant) {
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;
        if let Some(inner) = inner.upgrade() {
            inner.expire(&key_name, generation).await;
        }
    });
}
