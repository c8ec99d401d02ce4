//! Properties of encrypt/decrypt through the library API

use keyseal::error::{ErrorKind, FailureClass};
use keyseal::file_ops::{OutputFormat, decrypt_file, encrypt_file, encrypt_file_as};
use keyseal::keystore::CompanionFileKeyStore;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    store: CompanionFileKeyStore,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            store: CompanionFileKeyStore::new(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn encrypt_bytes(&mut self, name: &str, plaintext: &[u8]) -> PathBuf {
        let plain = self.path(&format!("{}.plain", name));
        let crypt = self.path(name);
        fs::write(&plain, plaintext).unwrap();
        encrypt_file(&plain, &crypt, &mut self.store).unwrap();
        crypt
    }

    fn encrypt_armored(&mut self, name: &str, plaintext: &[u8]) -> PathBuf {
        let plain = self.path(&format!("{}.plain", name));
        let crypt = self.path(name);
        fs::write(&plain, plaintext).unwrap();
        encrypt_file_as(&plain, &crypt, OutputFormat::Armored, &mut self.store).unwrap();
        crypt
    }

    fn decrypt(&mut self, crypt: &Path) -> keyseal::error::Result<Vec<u8>> {
        let out = self.path("decrypted.out");
        let _ = fs::remove_file(&out);
        decrypt_file(crypt, &out, &mut self.store)?;
        Ok(fs::read(&out).unwrap())
    }
}

#[test]
fn test_roundtrip_various_inputs() {
    let mut fx = Fixture::new();
    let inputs: Vec<Vec<u8>> = vec![
        Vec::new(),
        b"x".to_vec(),
        b"hello world".to_vec(),
        (0..=255).collect(),
        vec![0u8; 4096],
        vec![0xFFu8; 65537],
    ];

    for (i, input) in inputs.iter().enumerate() {
        let crypt = fx.encrypt_bytes(&format!("case{}.bin", i), input);
        assert_eq!(&fx.decrypt(&crypt).unwrap(), input, "case {}", i);
    }
}

#[test]
fn test_identical_input_gives_distinct_keys_and_ciphertexts() {
    let mut fx = Fixture::new();
    let a = fx.encrypt_bytes("a.bin", b"same data");
    let b = fx.encrypt_bytes("b.bin", b"same data");

    assert_ne!(
        fs::read(fx.path("a.bin.key")).unwrap(),
        fs::read(fx.path("b.bin.key")).unwrap()
    );
    assert_ne!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}

#[test]
fn test_foreign_keys_never_decrypt() {
    let mut fx = Fixture::new();
    let crypts: Vec<PathBuf> = (0..4)
        .map(|i| fx.encrypt_bytes(&format!("f{}.bin", i), b"payload"))
        .collect();
    let keys: Vec<Vec<u8>> = (0..4)
        .map(|i| fs::read(fx.path(&format!("f{}.bin.key", i))).unwrap())
        .collect();

    for (i, crypt) in crypts.iter().enumerate() {
        for (j, key) in keys.iter().enumerate() {
            if i == j {
                continue;
            }
            fs::write(fx.path(&format!("f{}.bin.key", i)), key).unwrap();
            let err = fx.decrypt(crypt).unwrap_err();
            assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
            assert_eq!(err.class(), Some(FailureClass::Decryption));
            assert!(!fx.path("decrypted.out").exists());
        }
        fs::write(fx.path(&format!("f{}.bin.key", i)), &keys[i]).unwrap();
        assert_eq!(fx.decrypt(crypt).unwrap(), b"payload");
    }
}

#[test]
fn test_every_single_byte_flip_is_detected() {
    let mut fx = Fixture::new();
    let crypt = fx.encrypt_bytes("t.bin", b"hello world");
    let original = fs::read(&crypt).unwrap();

    for offset in 0..original.len() {
        let mut tampered = original.clone();
        tampered[offset] ^= 0x80;
        fs::write(&crypt, &tampered).unwrap();

        let err = fx.decrypt(&crypt).unwrap_err();
        assert_eq!(
            err.kind,
            Some(ErrorKind::AuthenticationFailed),
            "offset {}",
            offset
        );
    }

    fs::write(&crypt, &original).unwrap();
    assert_eq!(fx.decrypt(&crypt).unwrap(), b"hello world");
}

#[test]
fn test_every_single_byte_flip_in_armor_is_detected() {
    let mut fx = Fixture::new();
    let crypt = fx.encrypt_armored("a.txt", b"hello world");
    let original = fs::read(&crypt).unwrap();
    let expected = fx.decrypt(&crypt).unwrap();
    assert_eq!(expected, b"hello world");

    for offset in 0..original.len() {
        for mask in [0x01u8, 0x80] {
            let mut tampered = original.clone();
            tampered[offset] ^= mask;
            fs::write(&crypt, &tampered).unwrap();

            let err = fx.decrypt(&crypt).unwrap_err();
            assert_eq!(
                err.kind,
                Some(ErrorKind::AuthenticationFailed),
                "offset {} mask {:#04x}",
                offset,
                mask
            );
            assert!(
                err.display_chain().ends_with(
                    "authentication failed: corrupt input, tampered-with data, or wrong key"
                ),
                "offset {}: {}",
                offset,
                err.display_chain()
            );
            assert!(!fx.path("decrypted.out").exists());
        }
    }
}

#[test]
fn test_truncated_ciphertext_is_detected() {
    let mut fx = Fixture::new();
    let crypt = fx.encrypt_bytes("t.bin", b"hello world");
    let original = fs::read(&crypt).unwrap();

    for len in 0..original.len() {
        fs::write(&crypt, &original[..len]).unwrap();
        let err = fx.decrypt(&crypt).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed), "len {}", len);
    }
}

#[test]
fn test_missing_key_file_is_io_error() {
    let mut fx = Fixture::new();
    let crypt = fx.encrypt_bytes("m.bin", b"hello world");
    fs::remove_file(fx.path("m.bin.key")).unwrap();

    let err = fx.decrypt(&crypt).unwrap_err();
    assert_eq!(err.kind, Some(ErrorKind::Io));
    assert_eq!(err.class(), Some(FailureClass::Io));
    assert!(!fx.path("decrypted.out").exists());
}
