//! Key storage
//!
//! A [`KeyStore`] persists the key generated for a ciphertext and finds it
//! again given only the ciphertext's path. The default store,
//! [`CompanionFileKeyStore`], writes the raw key next to the ciphertext.
//! Anyone who can read the ciphertext can usually read the key too, so
//! this protects against nothing more than a ciphertext copied on its own.

use crate::error::{ErrorCategory, ErrorKind, KeysealError, Result};
use crate::file_ops;
use crate::secretcrypt::SymmetricKey;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Suffix appended to a ciphertext path to locate its key file.
pub const DEFAULT_KEY_SUFFIX: &str = ".key";

/// Trait for persisting and retrieving per-ciphertext keys
pub trait KeyStore {
    /// Persist `key` as the key for the ciphertext at `ciphertext_path`.
    fn store_key(&mut self, ciphertext_path: &Path, key: &SymmetricKey) -> Result<()>;

    /// Retrieve the key for the ciphertext at `ciphertext_path`.
    fn load_key(&mut self, ciphertext_path: &Path) -> Result<SymmetricKey>;
}

/// Derive the key file path for a ciphertext path by appending `suffix`.
///
/// This is plain string concatenation on the OS path: `out.bin` becomes
/// `out.bin.key`, never `out.key`.
pub fn key_path_for(ciphertext_path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = ciphertext_path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Stores each key as raw bytes in a file beside its ciphertext
#[derive(Debug, Clone)]
pub struct CompanionFileKeyStore {
    suffix: String,
}

impl CompanionFileKeyStore {
    /// A store using [`DEFAULT_KEY_SUFFIX`].
    pub fn new() -> Self {
        Self {
            suffix: DEFAULT_KEY_SUFFIX.to_string(),
        }
    }

    /// Use a different suffix than [`DEFAULT_KEY_SUFFIX`]. An empty suffix
    /// would make the key path equal to the ciphertext path and is refused.
    pub fn with_suffix(suffix: impl Into<String>) -> Result<Self> {
        let suffix = suffix.into();
        if suffix.is_empty() {
            return Err(KeysealError::with_kind(
                ErrorCategory::User,
                ErrorKind::Usage,
                "key suffix must not be empty",
            ));
        }
        Ok(Self { suffix })
    }

    /// The suffix appended to ciphertext paths.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Where the key for `ciphertext_path` lives.
    pub fn key_path(&self, ciphertext_path: &Path) -> PathBuf {
        key_path_for(ciphertext_path, &self.suffix)
    }
}

impl Default for CompanionFileKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for CompanionFileKeyStore {
    fn store_key(&mut self, ciphertext_path: &Path, key: &SymmetricKey) -> Result<()> {
        let key_path = self.key_path(ciphertext_path);
        tracing::debug!(path = %key_path.display(), "writing key file");
        file_ops::write_file_atomic(&key_path, key.as_bytes())
            .map_err(|e| e.with_context(format!("failed to write key file {}", key_path.display())))
    }

    fn load_key(&mut self, ciphertext_path: &Path) -> Result<SymmetricKey> {
        let key_path = self.key_path(ciphertext_path);
        tracing::debug!(path = %key_path.display(), "reading key file");
        let raw = Zeroizing::new(
            fs::read(&key_path).map_err(|e| file_ops::read_error(&key_path, e))?,
        );
        SymmetricKey::from_bytes(&raw)
    }
}

/// Keeps keys in memory, keyed by ciphertext path (for testing and embedding)
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: HashMap<PathBuf, SymmetricKey>,
}

impl MemoryKeyStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no key has been stored.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyStore for MemoryKeyStore {
    fn store_key(&mut self, ciphertext_path: &Path, key: &SymmetricKey) -> Result<()> {
        self.keys.insert(ciphertext_path.to_path_buf(), key.clone());
        Ok(())
    }

    fn load_key(&mut self, ciphertext_path: &Path) -> Result<SymmetricKey> {
        self.keys.get(ciphertext_path).cloned().ok_or_else(|| {
            KeysealError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("no key stored for {}", ciphertext_path.display()),
            )
        })
    }
}
