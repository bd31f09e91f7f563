//! Byte-size and layout constants for the encrypted page format.

/// Size of one logical (plaintext) database page, in bytes.
pub const PAGE_SIZE: usize = 8192;

/// Size of the PBKDF2 salt, in bytes.
pub const SALT_SIZE: usize = 16;

/// Size of the AES-GCM IV (nonce) prefixed to every encrypted page.
pub const IV_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag appended to every encrypted page.
pub const AUTH_TAG_SIZE: usize = 16;

/// Size of the random file identifier stored in every encrypted file's header.
pub const FILE_ID_SIZE: usize = 32;

/// Size of the per-file header: `salt || file_id`.
pub const FILE_HEADER_SIZE: usize = SALT_SIZE + FILE_ID_SIZE;

/// Size of one page once encrypted: `iv || tag || ciphertext`.
pub const ENCRYPTED_PAGE_SIZE: usize = PAGE_SIZE + IV_SIZE + AUTH_TAG_SIZE;

/// Minimum PBKDF2-HMAC-SHA-512 iteration count for key derivation.
pub const KDF_ITERATIONS: u32 = 256_000;

/// Relative path of the dedicated plaintext salt file inside a vault directory.
pub const SALT_FILE_NAME: &str = ".vault-salt";

/// Relative path of the verification token file inside a vault directory.
pub const TOKEN_FILE_NAME: &str = ".encryption-verify";

/// Magic prefix stored in the verification token's plaintext, identifying a
/// successfully decrypted token. 16 bytes: `"PGLITE_ENC"` padded with zeros.
pub const TOKEN_MAGIC: [u8; 16] = {
    let mut magic = [0u8; 16];
    let src = b"PGLITE_ENC";
    let mut i = 0;
    while i < src.len() {
        magic[i] = src[i];
        i += 1;
    }
    magic
};

/// `O_WRONLY`, Linux numeric value. Preserved exactly regardless of host OS
/// so callers that always pass Linux-numbered flags remain bit-compatible.
pub const O_WRONLY: i32 = 1;
/// `O_RDWR`, Linux numeric value.
pub const O_RDWR: i32 = 2;
/// `O_CREAT`, Linux numeric value.
pub const O_CREAT: i32 = 64;
/// `O_EXCL`, Linux numeric value.
pub const O_EXCL: i32 = 128;
/// `O_TRUNC`, Linux numeric value.
pub const O_TRUNC: i32 = 512;
/// `O_APPEND`, Linux numeric value.
pub const O_APPEND: i32 = 1024;

/// First virtual descriptor handed out by a fresh [`crate::facade::VaultFs`].
///
/// Chosen above typical OS-reserved low descriptor numbers so virtual and
/// real descriptors are trivially distinguishable in logs.
pub const FIRST_VIRTUAL_FD: u64 = 1024;
