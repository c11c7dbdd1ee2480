//! AES-256-GCM encryption under a scrypt-derived passphrase key.
//!
//! Every call to [`encrypt`] draws a fresh salt and nonce, so the same key
//! stored twice under the same passphrase never produces the same blob.
//! The output layout is fixed:
//!
//! ```text
//! salt (8) || nonce (12) || ciphertext (n) || tag (16)
//! ```
//!
//! The KDF work factors are constants rather than per-record parameters so
//! that every record in a keystore decrypts with the same algorithm version.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{KeystoreError, Result};
use crate::types::{EncryptedBlob, KeyMaterial};

pub const SALT_LEN: usize = 8;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

/// Bytes preceding the ciphertext in every blob.
pub const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

/// scrypt cost: N = 2^15.
pub const SCRYPT_LOG_N: u8 = 15;
pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_P: u32 = 1;

/// Derive a 256-bit cipher key from `passphrase` and an 8-byte `salt`.
pub fn derive_key(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .map_err(|e| KeystoreError::Encryption(format!("invalid scrypt parameters: {e}")))?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt::scrypt(passphrase, salt, &params, &mut key[..])
        .map_err(|e| KeystoreError::Encryption(format!("key derivation failed: {e}")))?;
    Ok(key)
}

/// Encrypt `plaintext` under `passphrase`.
///
/// The returned blob is exactly `HEADER_LEN + plaintext.len() + TAG_LEN` bytes.
pub fn encrypt(plaintext: &[u8], passphrase: &[u8]) -> Result<EncryptedBlob> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| KeystoreError::Encryption(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| KeystoreError::Encryption(e.to_string()))?;

    let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);

    EncryptedBlob::new(blob)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Input shorter than the fixed header is [`KeystoreError::InvalidFormat`].
/// Anything else that fails to verify, whether a wrong passphrase or a
/// tampered byte, is [`KeystoreError::AuthenticationFailure`].
pub fn decrypt(blob: &[u8], passphrase: &[u8]) -> Result<KeyMaterial> {
    if blob.len() < HEADER_LEN {
        return Err(KeystoreError::InvalidFormat(format!(
            "encrypted blob is {} bytes, expected at least {HEADER_LEN}",
            blob.len()
        )));
    }

    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let mut salt_arr = [0u8; SALT_LEN];
    salt_arr.copy_from_slice(salt);

    let key = derive_key(passphrase, &salt_arr).map_err(|_| KeystoreError::AuthenticationFailure)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|_| KeystoreError::AuthenticationFailure)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| KeystoreError::AuthenticationFailure)?;

    Ok(KeyMaterial::new(plaintext))
}
