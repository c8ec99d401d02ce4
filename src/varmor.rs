//! Text armor for ciphertext files
//!
//! `--armor` output is the raw blob as `keyseal1:` followed by unpadded
//! base64url, with no whitespace. Armor carries no integrity of its own:
//! anything that fails to decode is reported exactly like a blob that
//! fails to authenticate.

use crate::error::Result;
use crate::secretcrypt;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

const MAGIC: &[u8] = b"keyseal1:";

/// Armor a ciphertext blob.
pub fn wrap(blob: &[u8]) -> String {
    let mut armored = String::with_capacity(MAGIC.len() + blob.len().div_ceil(3) * 4);
    armored.push_str("keyseal1:");
    URL_SAFE_NO_PAD.encode_string(blob, &mut armored);
    armored
}

/// Whether a ciphertext file starts with the armor marker. Raw blobs
/// start with a random nonce and match only by negligible chance.
pub fn is_armored(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

/// Recover the blob from armored file contents.
pub fn unwrap(data: &[u8]) -> Result<Vec<u8>> {
    let encoded = data
        .strip_prefix(MAGIC)
        .ok_or_else(secretcrypt::auth_failure)?;
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| secretcrypt::auth_failure())
}
