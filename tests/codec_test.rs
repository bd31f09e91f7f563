//! Cross-cutting property and seed-scenario tests for the page codec
//! (SPEC §4.1, §8 P1-P6, S1-S2).

use sha2::{Digest, Sha256};

use vaultfs::codec::{decrypt_page, encrypt_page, file_id_from_path};
use vaultfs::constants::{ENCRYPTED_PAGE_SIZE, PAGE_SIZE};
use vaultfs::error::VaultError;

/// S1: round trip a full page of 0x42 at page 0.
#[test]
fn seed_s1_full_page_roundtrip() {
    let salt = [0u8; 16];
    let _ = salt; // salt does not participate in the page codec directly
    let key = [0x11u8; 32];
    let file_id = [0x22u8; 32];

    let plaintext = vec![0x42u8; PAGE_SIZE];
    let encrypted = encrypt_page(&plaintext, 0, &key, &file_id).unwrap();
    assert_eq!(encrypted.len(), ENCRYPTED_PAGE_SIZE);

    let decrypted = decrypt_page(&encrypted, 0, &key, &file_id).unwrap();
    assert!(decrypted.iter().all(|&b| b == 0x42));
}

/// S2: a page encrypted at page 0 must not decrypt at page 1.
#[test]
fn seed_s2_wrong_page_number_fails() {
    let key = [0x33u8; 32];
    let mut hasher = Sha256::new();
    hasher.update(b"test/file");
    let file_id: [u8; 32] = hasher.finalize().into();

    let mut plaintext = vec![0u8; PAGE_SIZE];
    plaintext[..b"hello world".len()].copy_from_slice(b"hello world");

    let encrypted = encrypt_page(&plaintext, 0, &key, &file_id).unwrap();
    let result = decrypt_page(&encrypted, 1, &key, &file_id);
    assert!(matches!(result, Err(VaultError::Auth { page_no: 1 })));
}

/// P4: a page cannot be reinterpreted under a different file_id, nor a
/// different page number, even holding the key fixed.
#[test]
fn property_p4_aad_binds_file_and_page() {
    let key = [0x44u8; 32];
    let file_a = [0xaau8; 32];
    let file_b = [0xbbu8; 32];
    let plaintext = vec![0x07u8; PAGE_SIZE];

    let encrypted = encrypt_page(&plaintext, 5, &key, &file_a).unwrap();

    assert!(decrypt_page(&encrypted, 6, &key, &file_a).is_err());
    assert!(decrypt_page(&encrypted, 5, &key, &file_b).is_err());
    assert!(decrypt_page(&encrypted, 5, &key, &file_a).is_ok());
}

/// P5: a page encrypted under one key never decrypts under another.
#[test]
fn property_p5_wrong_key_fails() {
    let key = [0x55u8; 32];
    let wrong_key = [0x56u8; 32];
    let file_id = [0xccu8; 32];
    let plaintext = vec![0x09u8; PAGE_SIZE];

    let encrypted = encrypt_page(&plaintext, 0, &key, &file_id).unwrap();
    assert!(decrypt_page(&encrypted, 0, &wrong_key, &file_id).is_err());
}

/// P6: every single-bit flip anywhere in the encrypted page (IV, tag, or
/// ciphertext) must cause decryption to fail. Sampled at representative
/// offsets rather than exhaustively (8220 * 8 flips would be excessive for
/// a unit test) — one in the IV, one in the tag, one in the ciphertext.
#[test]
fn property_p6_single_bit_flips_are_detected() {
    let key = [0x66u8; 32];
    let file_id = [0xddu8; 32];
    let plaintext = vec![0xe0u8; PAGE_SIZE];
    let encrypted = encrypt_page(&plaintext, 0, &key, &file_id).unwrap();

    for &byte_offset in &[0usize, 12, 27, 28, 100, ENCRYPTED_PAGE_SIZE - 1] {
        let mut tampered = encrypted.clone();
        tampered[byte_offset] ^= 0x01;
        assert!(
            decrypt_page(&tampered, 0, &key, &file_id).is_err(),
            "flip at byte {byte_offset} was not detected"
        );
    }
}

#[test]
fn file_id_from_path_matches_sha256() {
    let expected: [u8; 32] = Sha256::digest(b".encryption-verify").into();
    assert_eq!(file_id_from_path(".encryption-verify"), expected);
}
