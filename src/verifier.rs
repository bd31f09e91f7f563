//! Verification token: proves a derived key is correct before any user
//! file is served.
//!
//! The token is a single fixed-path file whose content is exactly one
//! encrypted page. A wrong passphrase and a corrupted token file are
//! deliberately indistinguishable to the caller — both surface as
//! [`VaultError::InvalidPassphrase`].

use std::fs;
use std::path::Path;

use crate::codec::{decrypt_page, encrypt_page, file_id_from_path};
use crate::constants::{ENCRYPTED_PAGE_SIZE, PAGE_SIZE, TOKEN_FILE_NAME, TOKEN_MAGIC};
use crate::error::{Errno, Result, VaultError};
use crate::keys::VaultKey;

/// Verify an existing token against `key`, or create one if none exists.
///
/// Must run before any other file in the directory is opened: its success
/// is the precondition that the derived key is correct.
pub fn verify_or_create_token(directory: &Path, key: &VaultKey) -> Result<()> {
    let token_path = directory.join(TOKEN_FILE_NAME);
    let file_id = file_id_from_path(TOKEN_FILE_NAME);

    match fs::read(&token_path) {
        Ok(data) => {
            if data.len() != ENCRYPTED_PAGE_SIZE {
                return Err(VaultError::InvalidPassphrase);
            }
            let plaintext = decrypt_page(&data, 0, key.as_bytes(), &file_id)
                .map_err(|_| VaultError::InvalidPassphrase)?;
            if plaintext[..TOKEN_MAGIC.len()] != TOKEN_MAGIC {
                return Err(VaultError::InvalidPassphrase);
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let mut plaintext = vec![0u8; PAGE_SIZE];
            plaintext[..TOKEN_MAGIC.len()].copy_from_slice(&TOKEN_MAGIC);
            let encrypted = encrypt_page(&plaintext, 0, key.as_bytes(), &file_id)?;
            write_atomically(&token_path, &encrypted)?;
            Ok(())
        }
        Err(e) => Err(VaultError::io(Errno::Eio, format!("cannot read verification token: {e}"))),
    }
}

/// Write `data` to `path` via a sibling temp file plus rename, so a crash
/// mid-write never leaves a partially written token on disk.
fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data)
        .map_err(|e| VaultError::io(Errno::Eio, format!("cannot write verification token: {e}")))?;
    fs::rename(&tmp_path, path)
        .map_err(|e| VaultError::io(Errno::Eio, format!("cannot finalize verification token: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_key;
    use tempfile::TempDir;

    #[test]
    fn creates_token_on_first_open() {
        let dir = TempDir::new().unwrap();
        let key = derive_key("pw", &[0x01u8; 16]).unwrap();
        verify_or_create_token(dir.path(), &key).unwrap();
        let token_path = dir.path().join(TOKEN_FILE_NAME);
        let data = fs::read(&token_path).unwrap();
        assert_eq!(data.len(), ENCRYPTED_PAGE_SIZE);
    }

    #[test]
    fn accepts_same_passphrase_on_reopen() {
        let dir = TempDir::new().unwrap();
        let key = derive_key("pw", &[0x01u8; 16]).unwrap();
        verify_or_create_token(dir.path(), &key).unwrap();
        verify_or_create_token(dir.path(), &key).unwrap();
    }

    #[test]
    fn rejects_wrong_passphrase() {
        let dir = TempDir::new().unwrap();
        let key1 = derive_key("p1", &[0x01u8; 16]).unwrap();
        let key2 = derive_key("p2", &[0x01u8; 16]).unwrap();
        verify_or_create_token(dir.path(), &key1).unwrap();
        let result = verify_or_create_token(dir.path(), &key2);
        assert!(matches!(result, Err(VaultError::InvalidPassphrase)));
    }

    #[test]
    fn rejects_corrupted_token() {
        let dir = TempDir::new().unwrap();
        let key = derive_key("pw", &[0x01u8; 16]).unwrap();
        verify_or_create_token(dir.path(), &key).unwrap();
        let token_path = dir.path().join(TOKEN_FILE_NAME);
        fs::write(&token_path, vec![0u8; 10]).unwrap();
        let result = verify_or_create_token(dir.path(), &key);
        assert!(matches!(result, Err(VaultError::InvalidPassphrase)));
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let dir = TempDir::new().unwrap();
        let key = derive_key("pw", &[0x01u8; 16]).unwrap();
        verify_or_create_token(dir.path(), &key).unwrap();
        let token_path = dir.path().join(TOKEN_FILE_NAME);
        let mut data = fs::read(&token_path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0x01;
        fs::write(&token_path, data).unwrap();
        let result = verify_or_create_token(dir.path(), &key);
        assert!(matches!(result, Err(VaultError::InvalidPassphrase)));
    }
}
