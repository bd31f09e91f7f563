//! Passphrase-derived key material.
//!
//! The vault key is derived once, at open time, from a passphrase and a
//! salt persisted alongside the database directory. It never touches disk
//! itself and is zeroed on drop.

use std::fs;
use std::path::Path;

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{KDF_ITERATIONS, SALT_FILE_NAME, SALT_SIZE};
use crate::error::{Errno, Result, VaultError};

/// The 32-byte vault key, held in process memory for the lifetime of the
/// filesystem instance and zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; 32],
}

impl VaultKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// Derive a 32-byte vault key from a passphrase and salt using
/// PBKDF2-HMAC-SHA-512 with at least [`KDF_ITERATIONS`] rounds.
///
/// Deterministic: identical `(passphrase, salt)` always yields an identical
/// key, across calls and processes.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Result<VaultKey> {
    if salt.len() != SALT_SIZE {
        return Err(VaultError::Range(format!(
            "salt must be {} bytes, got {}",
            SALT_SIZE,
            salt.len()
        )));
    }

    let mut bytes = [0u8; 32];
    pbkdf2_hmac::<Sha512>(passphrase.as_bytes(), salt, KDF_ITERATIONS, &mut bytes);
    Ok(VaultKey { bytes })
}

/// Sample a fresh [`SALT_SIZE`]-byte salt from the OS CSPRNG.
pub fn random_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Read the dedicated salt file from `directory` if it exists, otherwise
/// generate a fresh random salt and persist it there. Must run before any
/// key derivation: the salt file is the sole authoritative salt store (a
/// per-file header salt is never trusted for key derivation).
pub fn load_or_create_salt(directory: &Path) -> Result<[u8; SALT_SIZE]> {
    let salt_path = directory.join(SALT_FILE_NAME);

    match fs::read(&salt_path) {
        Ok(data) => {
            if data.len() != SALT_SIZE {
                return Err(VaultError::io(
                    Errno::Eio,
                    format!("salt file has wrong length: expected {SALT_SIZE}, got {}", data.len()),
                ));
            }
            let mut salt = [0u8; SALT_SIZE];
            salt.copy_from_slice(&data);
            Ok(salt)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let salt = random_salt();
            fs::write(&salt_path, salt).map_err(|e| {
                VaultError::io(Errno::Eio, format!("cannot write salt file: {e}"))
            })?;
            Ok(salt)
        }
        Err(e) => Err(VaultError::io(Errno::Eio, format!("cannot read salt file: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [0x01u8; SALT_SIZE];
        let a = derive_key("test-passphrase", &salt).unwrap();
        let b = derive_key("test-passphrase", &salt).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_passphrases_diverge() {
        let salt = [0x01u8; SALT_SIZE];
        let a = derive_key("p1", &salt).unwrap();
        let b = derive_key("p2", &salt).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_salts_diverge() {
        let a = derive_key("same", &[0x01u8; SALT_SIZE]).unwrap();
        let b = derive_key("same", &[0x02u8; SALT_SIZE]).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn rejects_wrong_salt_length() {
        let result = derive_key("p", &[0u8; 4]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_passphrase_is_accepted() {
        let salt = random_salt();
        assert!(derive_key("", &salt).is_ok());
    }

    #[test]
    fn load_or_create_salt_persists_across_calls() {
        let dir = TempDir::new().unwrap();
        let first = load_or_create_salt(dir.path()).unwrap();
        let second = load_or_create_salt(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn load_or_create_salt_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SALT_FILE_NAME), b"short").unwrap();
        assert!(load_or_create_salt(dir.path()).is_err());
    }
}
