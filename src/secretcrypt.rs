//! Key generation and authenticated encryption using XSalsa20Poly1305
//!
//! Every call to [`encrypt`] uses a fresh random nonce. Keys come from
//! [`SymmetricKey::generate`], one per encrypted file.
//!
//! The binary format is:
//! - nonce: 24 bytes
//! - sealed box: variable length (includes 16-byte Poly1305 MAC)

use crate::error::{ErrorCategory, ErrorKind, KeysealError, Result};
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroizing;

/// Length of a key in bytes
pub const KEY_LEN: usize = 32;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of the Poly1305 authenticator in bytes
pub const TAG_LEN: usize = 16;

/// Smallest possible ciphertext (empty plaintext)
pub const MIN_CIPHERTEXT_LEN: usize = NONCE_LEN + TAG_LEN;

const AUTH_FAILURE_MSG: &str = "authentication failed: corrupt input, tampered-with data, or wrong key";

/// A 256-bit secretbox key, wiped from memory on drop.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl SymmetricKey {
    /// Generate a new key from the operating system random source.
    pub fn generate() -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        fill_random(&mut bytes[..])?;
        Ok(Self { bytes })
    }

    /// Build a key from raw bytes, e.g. the contents of a key file.
    ///
    /// Anything that is not exactly [`KEY_LEN`] bytes is rejected as an
    /// authentication failure: a key of the wrong length can never open
    /// the box it is paired with.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        if raw.len() != KEY_LEN {
            return Err(auth_failure());
        }
        bytes.copy_from_slice(raw);
        Ok(Self { bytes })
    }

    /// The raw key bytes, as written to a key file.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..]
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Encrypt plaintext under `key` using a random nonce
///
/// Returns the binary format: nonce(24) + sealedbox(variable)
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    fill_random(&mut nonce)?;

    encrypt_with_nonce(key, plaintext, &nonce)
}

/// Encrypt plaintext under `key` using the provided nonce
///
/// Only for tests that need deterministic output. Reusing a nonce under
/// the same key destroys confidentiality; use [`encrypt`].
pub fn encrypt_with_nonce(
    key: &SymmetricKey,
    plaintext: &[u8],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let cipher = XSalsa20Poly1305::new(Key::from_slice(key.as_bytes()));

    let sealed_box = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| {
            KeysealError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::SecretboxFailure,
                format!("secretbox seal failed: {}", e),
            )
        })?;

    let mut output = Vec::with_capacity(NONCE_LEN + sealed_box.len());
    output.extend_from_slice(nonce);
    output.extend_from_slice(&sealed_box);

    Ok(output)
}

/// Verify and decrypt a ciphertext produced by [`encrypt`]
///
/// Short input, a wrong key and modified bytes all fail the same way, with
/// [`ErrorKind::AuthenticationFailed`].
pub fn decrypt(key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < MIN_CIPHERTEXT_LEN {
        return Err(auth_failure());
    }
    let (nonce, sealed_box) = ciphertext.split_at(NONCE_LEN);

    let cipher = XSalsa20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed_box)
        .map_err(|_| auth_failure())
}

fn fill_random(dest: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(dest).map_err(|e| {
        KeysealError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KeyGeneration,
            "secure random source unavailable",
            e,
        )
    })
}

/// The single error reported for any ciphertext that does not open.
pub(crate) fn auth_failure() -> KeysealError {
    KeysealError::with_kind(
        ErrorCategory::User,
        ErrorKind::AuthenticationFailed,
        AUTH_FAILURE_MSG,
    )
}
