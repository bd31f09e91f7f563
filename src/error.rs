//! Errors returned by `vaultfs` operations.

use thiserror::Error;

/// A symbolic POSIX error code, used to let a VFS shim translate failures
/// into the host database's own error model without parsing message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    /// No such file or directory.
    Enoent,
    /// Bad file descriptor.
    Ebadf,
    /// Is a directory.
    Eisdir,
    /// Not a directory.
    Enotdir,
    /// File exists.
    Eexist,
    /// Permission denied.
    Eacces,
    /// Directory not empty.
    Enotempty,
    /// I/O error.
    Eio,
    /// Invalid argument.
    Einval,
}

/// Errors returned by `vaultfs` operations.
///
/// [`VaultError::InvalidPassphrase`] and the authentication-failure path of
/// [`VaultError::Io`] carry constant, non-secret message text: they must
/// never distinguish "wrong key" from "corrupted data", and must never
/// interpolate key bytes or the passphrase.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The derived key failed to validate against the verification token,
    /// or the token itself is malformed. The passphrase may be wrong, or
    /// the token file may be corrupt — these are deliberately not
    /// distinguished.
    #[error("Invalid passphrase or corrupted encryption keys")]
    InvalidPassphrase,

    /// A host filesystem or page-level I/O failure, tagged with a symbolic
    /// errno for shim translation.
    #[error("I/O error ({code:?}): {message}")]
    Io { code: Errno, message: String },

    /// An encrypted page failed authentication (tampering or corruption).
    #[error("decryption failed, file may be corrupt (page {page_no})")]
    Auth { page_no: u32 },

    /// An encrypted page buffer was not exactly `ENCRYPTED_PAGE_SIZE` bytes.
    #[error("encrypted page has wrong size: expected {expected}, got {actual}")]
    Size { expected: usize, actual: usize },

    /// A page number or other numeric input was outside its valid range.
    #[error("value out of range: {0}")]
    Range(String),

    /// An operation was attempted against a virtual descriptor that does
    /// not name an open handle.
    #[error("bad file descriptor: {0}")]
    BadDescriptor(u64),

    /// An operation was attempted on a filesystem instance after teardown.
    #[error("vault filesystem instance has been torn down")]
    TornDown,
}

impl VaultError {
    /// The symbolic errno a VFS shim should surface for this error.
    pub fn errno(&self) -> Errno {
        match self {
            VaultError::InvalidPassphrase => Errno::Eacces,
            VaultError::Io { code, .. } => *code,
            VaultError::Auth { .. } => Errno::Eio,
            VaultError::Size { .. } => Errno::Eio,
            VaultError::Range(_) => Errno::Einval,
            VaultError::BadDescriptor(_) => Errno::Ebadf,
            VaultError::TornDown => Errno::Eio,
        }
    }

    pub(crate) fn io(code: Errno, message: impl Into<String>) -> Self {
        VaultError::Io { code, message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
