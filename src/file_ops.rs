//! File encryption/decryption operations
//!
//! This module provides the high-level operations: encrypt a file under a
//! freshly generated key, and decrypt a file with the key its
//! [`KeyStore`] holds for it.

use crate::error::{ErrorCategory, ErrorKind, KeysealError, Result};
use crate::keystore::KeyStore;
use crate::secretcrypt::{self, SymmetricKey};
use crate::varmor;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use zeroize::Zeroizing;

/// How the ciphertext file is encoded on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The raw ciphertext blob.
    #[default]
    Raw,
    /// The blob armored as `keyseal1:<base64url>`.
    Armored,
}

/// Encrypt a file under a new key
///
/// Reads plaintext from `input_path`, generates a key, stores it through
/// `key_store` for `output_path` and then writes the raw ciphertext to
/// `output_path`.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    key_store: &mut dyn KeyStore,
) -> Result<()> {
    encrypt_file_as(input_path, output_path, OutputFormat::Raw, key_store)
}

/// Encrypt a file under a new key, writing the ciphertext in `format`
///
/// The key is stored before the ciphertext is written, so a ciphertext
/// file never exists without its key. Both files are created with mode
/// 0o600 on Unix systems.
pub fn encrypt_file_as(
    input_path: &Path,
    output_path: &Path,
    format: OutputFormat,
    key_store: &mut dyn KeyStore,
) -> Result<()> {
    let plaintext =
        Zeroizing::new(fs::read(input_path).map_err(|e| read_error(input_path, e))?);
    tracing::debug!(path = %input_path.display(), bytes = plaintext.len(), "read plaintext");

    let key = SymmetricKey::generate().map_err(|e| e.with_context("key generation failed"))?;
    let ciphertext =
        secretcrypt::encrypt(&key, &plaintext).map_err(|e| e.with_context("encryption failed"))?;

    key_store.store_key(output_path, &key)?;

    let encoded = match format {
        OutputFormat::Raw => ciphertext,
        OutputFormat::Armored => varmor::wrap(&ciphertext).into_bytes(),
    };
    write_file_atomic(output_path, &encoded)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    tracing::debug!(
        path = %output_path.display(),
        bytes = encoded.len(),
        ?format,
        "wrote ciphertext"
    );

    Ok(())
}

/// Decrypt a file with its stored key
///
/// Reads the ciphertext (raw or armored) from `input_path`, loads the key
/// `key_store` holds for `input_path`, verifies and decrypts, and writes the
/// plaintext to `output_path` with mode 0o600 on Unix systems.
///
/// Nothing is written unless authentication succeeds.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    key_store: &mut dyn KeyStore,
) -> Result<()> {
    let data = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    tracing::debug!(path = %input_path.display(), bytes = data.len(), "read ciphertext");

    let key = key_store
        .load_key(input_path)
        .map_err(|e| e.with_context(format!("failed to load key for {}", input_path.display())))?;

    let ciphertext = if varmor::is_armored(&data) {
        varmor::unwrap(&data).map_err(|e| e.with_context("failed to decrypt"))?
    } else {
        data
    };

    let plaintext = Zeroizing::new(
        secretcrypt::decrypt(&key, &ciphertext).map_err(|e| e.with_context("failed to decrypt"))?,
    );
    write_file_atomic(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    tracing::debug!(path = %output_path.display(), bytes = plaintext.len(), "wrote plaintext");

    Ok(())
}

/// Atomically replace `path` with `contents`
///
/// Writes to a tempfile in the target directory, fsyncs it, restricts it
/// to 0o600 on Unix and renames it over `path`. Readers see either the
/// previous file or the complete new one.
pub(crate) fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp_file =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| write_error(path, "create tempfile", e))?;

    temp_file
        .write_all(contents)
        .map_err(|e| write_error(path, "write tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| write_error(path, "flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| write_error(path, "sync tempfile", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = temp_file
            .as_file()
            .metadata()
            .map_err(|e| write_error(path, "read tempfile metadata", e))?
            .permissions();
        perms.set_mode(0o600);
        temp_file
            .as_file()
            .set_permissions(perms)
            .map_err(|e| write_error(path, "set tempfile permissions", e))?;
    }

    temp_file.persist(path).map_err(|e| {
        KeysealError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

pub(crate) fn read_error(path: &Path, err: io::Error) -> KeysealError {
    KeysealError::with_kind_and_source(
        io_category(&err),
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

fn write_error(path: &Path, step: &str, err: io::Error) -> KeysealError {
    KeysealError::with_kind_and_source(
        io_category(&err),
        ErrorKind::Io,
        format!("failed to {} for {}", step, path.display()),
        err,
    )
}

fn io_category(err: &io::Error) -> ErrorCategory {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ErrorCategory::User,
        _ => ErrorCategory::Internal,
    }
}
