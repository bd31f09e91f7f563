//! Authenticated at-rest page encryption for an embedded relational
//! database's virtual filesystem.
//!
//! `vaultfs` interposes on a POSIX-style, byte-oriented file interface and
//! transparently encrypts each fixed-size database page before it reaches
//! the host filesystem. Every page is authenticated and bound to the file
//! and page number it belongs to, so pages cannot be swapped within or
//! between files without detection.
//!
//! # Layers
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`codec`] | AES-256-GCM page encryption/decryption with AAD binding |
//! | [`keys`] | Passphrase-derived key material and salt persistence |
//! | [`verifier`] | The verification token that rejects a wrong key before any data is served |
//! | [`layout`] | Logical ↔ physical offset/size mapping |
//! | [`handle`] | Per-open-file state |
//! | [`io_engine`] | Byte-granularity read/write/truncate over page-granularity crypto |
//! | [`facade`] | The POSIX-like surface a VFS shim drives: [`facade::VaultFs`] |
//!
//! # Quick example
//!
//! ```no_run
//! use vaultfs::facade::{KeyMaterial, VaultConfig, VaultFs};
//! use vaultfs::constants::{O_CREAT, O_RDWR};
//!
//! let mut fs = VaultFs::open(VaultConfig {
//!     data_dir: "/tmp/my-vault".into(),
//!     key_material: KeyMaterial::Passphrase("correct horse battery staple".into()),
//!     debug: false,
//! }).unwrap();
//!
//! let fd = fs.open_file("/base/1/16384", O_RDWR | O_CREAT).unwrap();
//! fs.write(fd, b"hello").unwrap();
//! fs.close(fd).unwrap();
//! ```

pub mod codec;
pub mod constants;
pub mod error;
pub mod facade;
pub mod handle;
pub mod io_engine;
pub mod keys;
pub mod layout;
pub mod util;
pub mod verifier;

pub use error::{Errno, Result, VaultError};
pub use facade::{KeyMaterial, Stat, VaultConfig, VaultFs};
