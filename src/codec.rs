//! Authenticated page encryption and decryption.
//!
//! Each logical page is encrypted independently with AES-256-GCM. The
//! additional authenticated data binds a ciphertext to the file it belongs
//! to and its page number, so a page cannot be silently moved to a
//! different offset or a different file without decryption failing.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

use crate::constants::{AUTH_TAG_SIZE, ENCRYPTED_PAGE_SIZE, FILE_ID_SIZE, IV_SIZE, PAGE_SIZE};
use crate::error::{Errno, Result, VaultError};

/// Build the additional authenticated data for a page: `file_id || page_no_be32`.
fn build_aad(file_id: &[u8; FILE_ID_SIZE], page_no: u32) -> [u8; FILE_ID_SIZE + 4] {
    let mut aad = [0u8; FILE_ID_SIZE + 4];
    aad[..FILE_ID_SIZE].copy_from_slice(file_id);
    aad[FILE_ID_SIZE..].copy_from_slice(&page_no.to_be_bytes());
    aad
}

/// Encrypt one logical page.
///
/// `plaintext` may be shorter than [`PAGE_SIZE`]; it is zero-padded before
/// encryption. Returns `iv(12) || tag(16) || ciphertext(8192)`, exactly
/// [`ENCRYPTED_PAGE_SIZE`] bytes.
pub fn encrypt_page(
    plaintext: &[u8],
    page_no: u32,
    key: &[u8; 32],
    file_id: &[u8; FILE_ID_SIZE],
) -> Result<Vec<u8>> {
    if plaintext.len() > PAGE_SIZE {
        return Err(VaultError::Range(format!(
            "plaintext length {} exceeds page size {}",
            plaintext.len(),
            PAGE_SIZE
        )));
    }

    let mut padded = vec![0u8; PAGE_SIZE];
    padded[..plaintext.len()].copy_from_slice(plaintext);

    let aad = build_aad(file_id, page_no);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut iv_bytes = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv_bytes);
    let nonce = Nonce::from_slice(&iv_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: &padded, aad: &aad })
        .map_err(|_| VaultError::io(Errno::Eio, "page encryption failed"))?;

    // aes-gcm appends the tag to the ciphertext; split it back out so the
    // on-disk layout is iv || tag || ciphertext rather than iv || ciphertext || tag.
    let split = ciphertext.len() - AUTH_TAG_SIZE;
    let mut out = Vec::with_capacity(ENCRYPTED_PAGE_SIZE);
    out.extend_from_slice(&iv_bytes);
    out.extend_from_slice(&ciphertext[split..]);
    out.extend_from_slice(&ciphertext[..split]);
    Ok(out)
}

/// Decrypt and authenticate one encrypted page.
///
/// `encrypted_page` must be exactly [`ENCRYPTED_PAGE_SIZE`] bytes. Returns
/// the original [`PAGE_SIZE`]-byte plaintext (zero-padded if the original
/// input to [`encrypt_page`] was shorter).
pub fn decrypt_page(
    encrypted_page: &[u8],
    page_no: u32,
    key: &[u8; 32],
    file_id: &[u8; FILE_ID_SIZE],
) -> Result<Vec<u8>> {
    if encrypted_page.len() != ENCRYPTED_PAGE_SIZE {
        return Err(VaultError::Size {
            expected: ENCRYPTED_PAGE_SIZE,
            actual: encrypted_page.len(),
        });
    }

    let iv = &encrypted_page[..IV_SIZE];
    let tag = &encrypted_page[IV_SIZE..IV_SIZE + AUTH_TAG_SIZE];
    let ciphertext = &encrypted_page[IV_SIZE + AUTH_TAG_SIZE..];

    // aes-gcm expects ciphertext || tag.
    let mut combined = Vec::with_capacity(ciphertext.len() + AUTH_TAG_SIZE);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    let aad = build_aad(file_id, page_no);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(iv);

    cipher
        .decrypt(nonce, Payload { msg: &combined, aad: &aad })
        .map_err(|_| VaultError::Auth { page_no })
}

/// Deterministic file identifier for the fixed, well-known verification
/// token path. Never used for ordinary user files, whose `file_id` is
/// random (see [`crate::keys`]).
pub fn file_id_from_path(relative_path: &str) -> [u8; FILE_ID_SIZE] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(relative_path.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; FILE_ID_SIZE];
    out.copy_from_slice(&digest);
    out
}
