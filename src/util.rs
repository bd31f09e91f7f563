//! Path normalization and the plaintext/encrypted file-name policy.

use std::path::{Component, Path, PathBuf};

use crate::constants::{SALT_FILE_NAME, TOKEN_FILE_NAME};

/// Base-name patterns that are always stored as plaintext, never encrypted.
/// Matched against the final path component only.
const PLAINTEXT_PATTERNS: &[fn(&str) -> bool] = &[
    |name| name.ends_with(".conf"),
    |name| name.ends_with(".pid"),
    |name| name.contains("PG_VERSION"),
    |name| name.contains("pg_internal.init"),
    |name| name.contains("postmaster"),
    |name| name.contains(".lock"),
    |name| name.contains("replorigin_checkpoint"),
];

/// Returns true if `name` (a file's base name) is reserved for plaintext
/// storage, independent of the encrypted-by-default policy.
pub fn is_reserved_name(name: &str) -> bool {
    PLAINTEXT_PATTERNS.iter().any(|pattern| pattern(name))
}

/// Returns true if `name` is one of the internal files owned by the key
/// material / verifier subsystem and must never be exposed as an ordinary
/// user file through the facade.
pub fn is_internal_name(name: &str) -> bool {
    name == SALT_FILE_NAME || name == TOKEN_FILE_NAME
}

/// Whether a path, given its base name, should be encrypted by the facade.
pub fn is_encrypted_path(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => !is_reserved_name(name),
        None => true,
    }
}

/// Lexically resolve `path` against `base` (which is itself always
/// absolute and normalized), collapsing `.` and `..` components without
/// touching the filesystem. The target need not exist.
pub fn normalize(base: &Path, path: &Path) -> PathBuf {
    let joined: PathBuf = if path.is_absolute() { path.to_path_buf() } else { base.join(path) };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
