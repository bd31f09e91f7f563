//! POSIX-like filesystem operations exposed to a VFS shim.
//!
//! `VaultFs` owns all instance state directly — the open-handle table and
//! the monotonic descriptor counter are never process-global, so multiple
//! instances in one process never interfere with each other.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;
use rand::RngCore;

use crate::constants::{FILE_HEADER_SIZE, FILE_ID_SIZE, FIRST_VIRTUAL_FD, PAGE_SIZE};
use crate::error::{Errno, Result, VaultError};
use crate::handle::{Backing, FileHandle, OpenFlags};
use crate::io_engine;
use crate::keys::{derive_key, load_or_create_salt, VaultKey};
use crate::layout;
use crate::util;
use crate::verifier::verify_or_create_token;

/// How the vault key is supplied when constructing a [`VaultFs`].
pub enum KeyMaterial {
    /// Derive the key from a passphrase; the salt is loaded from (or
    /// created in) the data directory's dedicated salt file.
    Passphrase(String),
    /// Use an already-derived key and its salt directly, bypassing PBKDF2.
    Derived { key: VaultKey, salt: [u8; crate::constants::SALT_SIZE] },
}

/// Configuration for a [`VaultFs`] instance.
pub struct VaultConfig {
    pub data_dir: PathBuf,
    pub key_material: KeyMaterial,
    pub debug: bool,
}

/// Portable subset of file metadata reported by `fstat`/`lstat`.
#[derive(Debug, Clone)]
pub struct Stat {
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
    pub mode: u32,
    pub atime_ms: i64,
    pub mtime_ms: i64,
    pub ctime_ms: i64,
}

/// An encrypted, POSIX-like filesystem rooted at a host directory.
pub struct VaultFs {
    data_dir: PathBuf,
    current_dir: PathBuf,
    key: VaultKey,
    handles: HashMap<u64, FileHandle>,
    next_fd: u64,
    destroyed: bool,
    debug: bool,
}

impl VaultFs {
    /// Open (and, on first use, initialize) a vault directory.
    ///
    /// Derives or accepts the vault key, then verifies it against the
    /// verification token before returning — a wrong key surfaces here as
    /// [`VaultError::InvalidPassphrase`], never later as a decryption
    /// failure on some arbitrary file.
    pub fn open(config: VaultConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)
            .map_err(|e| VaultError::io(Errno::Eio, format!("cannot create data directory: {e}")))?;

        let key = match config.key_material {
            KeyMaterial::Passphrase(passphrase) => {
                let salt = load_or_create_salt(&config.data_dir)?;
                derive_key(&passphrase, &salt)?
            }
            KeyMaterial::Derived { key, .. } => key,
        };

        verify_or_create_token(&config.data_dir, &key)?;
        debug!("vault opened at {}", config.data_dir.display());

        Ok(VaultFs {
            data_dir: config.data_dir,
            current_dir: PathBuf::from("/"),
            key,
            handles: HashMap::new(),
            next_fd: FIRST_VIRTUAL_FD,
            destroyed: false,
            debug: config.debug,
        })
    }

    /// Best-effort teardown: zeroizes the vault key and marks the instance
    /// unusable. Complete erasure is not guaranteed — earlier copies made
    /// by the OS or allocator may persist.
    pub fn destroy(&mut self) {
        use zeroize::Zeroize;
        if self.debug {
            debug!("tearing down vault at {} ({} open handles)", self.data_dir.display(), self.handles.len());
        }
        self.key.zeroize();
        self.handles.clear();
        self.destroyed = true;
    }

    fn check_alive(&self) -> Result<()> {
        if self.destroyed {
            return Err(VaultError::TornDown);
        }
        Ok(())
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let virtual_path = util::normalize(&self.current_dir, Path::new(path));
        let relative = virtual_path.strip_prefix("/").unwrap_or(&virtual_path);
        self.data_dir.join(relative)
    }

    /// Reject a virtual path whose base name names the dedicated salt file
    /// or the verification token: those are owned by the key material /
    /// verifier subsystem and must never be reachable through the normal
    /// open/rename/unlink surface, not just hidden from `readdir`.
    fn check_not_internal(path: &str) -> Result<()> {
        let name = Path::new(path).file_name().and_then(|n| n.to_str());
        if matches!(name, Some(n) if util::is_internal_name(n)) {
            return Err(VaultError::io(Errno::Enoent, format!("{path}: no such file or directory")));
        }
        Ok(())
    }

    fn next_descriptor(&mut self) -> u64 {
        let fd = self.next_fd;
        self.next_fd += 1;
        fd
    }

    fn handle(&self, fd: u64) -> Result<&FileHandle> {
        self.handles.get(&fd).ok_or(VaultError::BadDescriptor(fd))
    }

    fn handle_mut(&mut self, fd: u64) -> Result<&mut FileHandle> {
        self.handles.get_mut(&fd).ok_or(VaultError::BadDescriptor(fd))
    }

    /// Open a file or directory, returning a virtual descriptor.
    ///
    /// `raw_flags` follows the Linux `O_*` numeric convention regardless of
    /// the host this crate is compiled for (see [`crate::constants`]).
    pub fn open_file(&mut self, path: &str, raw_flags: i32) -> Result<u64> {
        self.check_alive()?;
        Self::check_not_internal(path)?;
        let flags = OpenFlags::from_raw(raw_flags);
        let host_path = self.resolve(path);
        let encrypted = util::is_encrypted_path(Path::new(path));

        if host_path.is_dir() {
            let fd = self.next_descriptor();
            self.handles.insert(
                fd,
                FileHandle {
                    descriptor: fd,
                    backing: Backing::Directory,
                    path: host_path,
                    flags,
                    position: 0,
                    encrypted: false,
                    file_id: None,
                },
            );
            return Ok(fd);
        }

        let existed = host_path.exists();
        if flags.exclusive && flags.create && existed {
            return Err(VaultError::io(Errno::Eexist, format!("{path} already exists")));
        }

        let mut open_opts = OpenOptions::new();
        open_opts.read(true);
        if flags.writable() {
            open_opts.write(true);
        }
        if flags.create {
            open_opts.create(true);
        }
        // Encrypted files truncate by rewriting the header below instead;
        // letting OpenOptions truncate first would destroy it before we
        // can read the old file_id out of it.
        if flags.truncate && !encrypted {
            open_opts.truncate(true);
        }

        let mut file = open_opts
            .open(&host_path)
            .map_err(|e| VaultError::io(Errno::Enoent, format!("cannot open {path}: {e}")))?;

        let file_id = if encrypted {
            let needs_new_header = !existed || flags.truncate;
            if needs_new_header {
                if flags.truncate && existed {
                    file.set_len(0).map_err(|e| {
                        VaultError::io(Errno::Eio, format!("cannot truncate {path}: {e}"))
                    })?;
                }
                let mut id = [0u8; FILE_ID_SIZE];
                rand::thread_rng().fill_bytes(&mut id);
                let salt = load_or_create_salt(&self.data_dir)?;
                use std::io::Write as _;
                file.write_all(&salt).map_err(|e| {
                    VaultError::io(Errno::Eio, format!("cannot write header for {path}: {e}"))
                })?;
                file.write_all(&id).map_err(|e| {
                    VaultError::io(Errno::Eio, format!("cannot write header for {path}: {e}"))
                })?;
                id
            } else {
                use std::io::Read as _;
                use std::io::Seek as _;
                file.seek(std::io::SeekFrom::Start(crate::constants::SALT_SIZE as u64))
                    .map_err(|e| VaultError::io(Errno::Eio, format!("cannot seek header of {path}: {e}")))?;
                let mut id = [0u8; FILE_ID_SIZE];
                file.read_exact(&mut id).map_err(|e| {
                    VaultError::io(Errno::Eio, format!("cannot read header of {path}: {e}"))
                })?;
                id
            }
        } else {
            [0u8; FILE_ID_SIZE]
        };

        let fd = self.next_descriptor();
        if self.debug {
            debug!("opened {path} as fd {fd} (encrypted={encrypted})");
        }
        self.handles.insert(
            fd,
            FileHandle {
                descriptor: fd,
                backing: Backing::File(file),
                path: host_path,
                flags,
                position: 0,
                encrypted,
                file_id: if encrypted { Some(file_id) } else { None },
            },
        );
        Ok(fd)
    }

    pub fn close(&mut self, fd: u64) -> Result<()> {
        self.check_alive()?;
        self.handles.remove(&fd).ok_or(VaultError::BadDescriptor(fd))?;
        if self.debug {
            debug!("closed fd {fd}");
        }
        Ok(())
    }

    /// Read up to `length` bytes at the handle's current position,
    /// advancing it by the number of bytes actually read.
    pub fn read(&mut self, fd: u64, length: usize) -> Result<Vec<u8>> {
        self.check_alive()?;
        let key = self.key.clone();
        let handle = self.handle_mut(fd)?;

        let data = if handle.encrypted {
            io_engine::read(handle, &key, handle.position, length)?
        } else {
            use std::io::{Read as _, Seek as _, SeekFrom};
            let file = handle
                .file_mut()
                .ok_or_else(|| VaultError::io(Errno::Eisdir, "cannot read a directory"))?;
            file.seek(SeekFrom::Start(handle.position))
                .map_err(|e| VaultError::io(Errno::Eio, format!("seek failed: {e}")))?;
            let mut buf = vec![0u8; length];
            let n = file.read(&mut buf).map_err(|e| VaultError::io(Errno::Eio, format!("read failed: {e}")))?;
            buf.truncate(n);
            buf
        };

        handle.position += data.len() as u64;
        Ok(data)
    }

    /// Write `data` at the handle's current position, advancing it by
    /// `data.len()`.
    pub fn write(&mut self, fd: u64, data: &[u8]) -> Result<usize> {
        self.check_alive()?;
        let key = self.key.clone();
        let handle = self.handle_mut(fd)?;

        let written = if handle.encrypted {
            io_engine::write(handle, &key, handle.position, data)?
        } else {
            use std::io::{Seek as _, SeekFrom, Write as _};
            let file = handle
                .file_mut()
                .ok_or_else(|| VaultError::io(Errno::Eisdir, "cannot write a directory"))?;
            file.seek(SeekFrom::Start(handle.position))
                .map_err(|e| VaultError::io(Errno::Eio, format!("seek failed: {e}")))?;
            file.write_all(data).map_err(|e| VaultError::io(Errno::Eio, format!("write failed: {e}")))?;
            data.len()
        };

        handle.position += written as u64;
        Ok(written)
    }

    /// Convenience: write the entire contents of a file in one call,
    /// creating or truncating it first.
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.check_alive()?;
        use crate::constants::{O_CREAT, O_TRUNC, O_WRONLY};
        let fd = self.open_file(path, O_WRONLY | O_CREAT | O_TRUNC)?;
        let result = self.write(fd, data).map(|_| ());
        self.close(fd)?;
        result
    }

    pub fn fsync(&self, fd: u64) -> Result<()> {
        self.check_alive()?;
        let handle = self.handle(fd)?;
        if let Some(file) = handle.file() {
            file.sync_all().map_err(|e| VaultError::io(Errno::Eio, format!("fsync failed: {e}")))?;
        }
        Ok(())
    }

    pub fn fdatasync(&self, fd: u64) -> Result<()> {
        self.check_alive()?;
        let handle = self.handle(fd)?;
        if let Some(file) = handle.file() {
            file.sync_data().map_err(|e| VaultError::io(Errno::Eio, format!("fdatasync failed: {e}")))?;
        }
        Ok(())
    }

    pub fn fstat(&self, fd: u64) -> Result<Stat> {
        self.check_alive()?;
        let handle = self.handle(fd)?;
        self.stat_path(&handle.path, handle.encrypted)
    }

    pub fn lstat(&self, path: &str) -> Result<Stat> {
        self.check_alive()?;
        let host_path = self.resolve(path);
        let encrypted = util::is_encrypted_path(Path::new(path));
        self.stat_path(&host_path, encrypted)
    }

    fn stat_path(&self, host_path: &Path, encrypted: bool) -> Result<Stat> {
        let metadata = fs::symlink_metadata(host_path)
            .map_err(|e| VaultError::io(Errno::Enoent, format!("stat failed: {e}")))?;

        let size = if encrypted && metadata.is_file() {
            layout::logical_size(metadata.len())?
        } else {
            metadata.len()
        };

        Ok(Stat {
            size,
            is_dir: metadata.is_dir(),
            is_file: metadata.is_file(),
            mode: mode_bits(&metadata),
            atime_ms: to_millis(metadata.accessed().ok()),
            mtime_ms: to_millis(metadata.modified().ok()),
            ctime_ms: to_millis(metadata.modified().ok()),
        })
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        self.check_alive()?;
        let host_path = self.resolve(path);
        fs::create_dir(&host_path).map_err(|e| VaultError::io(Errno::Eio, format!("mkdir failed: {e}")))
    }

    /// List entries of a directory, filtering out the dedicated salt file
    /// and the verification token (internal files are never exposed to
    /// callers through the facade).
    pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
        self.check_alive()?;
        let host_path = self.resolve(path);
        let entries = fs::read_dir(&host_path)
            .map_err(|e| VaultError::io(Errno::Enoent, format!("readdir failed: {e}")))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VaultError::io(Errno::Eio, format!("readdir entry failed: {e}")))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if util::is_internal_name(&name) {
                continue;
            }
            names.push(name);
        }
        Ok(names)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.check_alive()?;
        Self::check_not_internal(from)?;
        Self::check_not_internal(to)?;
        let from_path = self.resolve(from);
        let to_path = self.resolve(to);
        fs::rename(&from_path, &to_path).map_err(|e| VaultError::io(Errno::Eio, format!("rename failed: {e}")))
    }

    pub fn rmdir(&self, path: &str) -> Result<()> {
        self.check_alive()?;
        let host_path = self.resolve(path);
        fs::remove_dir(&host_path).map_err(|e| VaultError::io(Errno::Enotempty, format!("rmdir failed: {e}")))
    }

    /// Truncate the file at `path` to logical length `new_len`.
    pub fn truncate(&mut self, path: &str, new_len: u64) -> Result<()> {
        self.check_alive()?;
        let encrypted = util::is_encrypted_path(Path::new(path));
        let host_path = self.resolve(path);

        if !encrypted {
            let file = OpenOptions::new()
                .write(true)
                .open(&host_path)
                .map_err(|e| VaultError::io(Errno::Enoent, format!("truncate failed: {e}")))?;
            file.set_len(new_len).map_err(|e| VaultError::io(Errno::Eio, format!("truncate failed: {e}")))?;
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&host_path)
            .map_err(|e| VaultError::io(Errno::Enoent, format!("truncate failed: {e}")))?;

        let exists_with_header = file.metadata().map(|m| m.len() >= FILE_HEADER_SIZE as u64).unwrap_or(false);
        let file_id = if exists_with_header {
            use std::io::{Read as _, Seek as _, SeekFrom};
            let mut f = &file;
            f.seek(SeekFrom::Start(crate::constants::SALT_SIZE as u64))
                .map_err(|e| VaultError::io(Errno::Eio, format!("cannot seek header: {e}")))?;
            let mut id = [0u8; FILE_ID_SIZE];
            f.read_exact(&mut id).map_err(|e| VaultError::io(Errno::Eio, format!("cannot read header: {e}")))?;
            id
        } else {
            [0u8; FILE_ID_SIZE]
        };

        let handle = FileHandle {
            descriptor: 0,
            backing: Backing::File(file),
            path: host_path,
            flags: OpenFlags { read_write: true, ..Default::default() },
            position: 0,
            encrypted: true,
            file_id: Some(file_id),
        };
        io_engine::truncate(&handle, &self.key, new_len)
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        self.check_alive()?;
        Self::check_not_internal(path)?;
        let host_path = self.resolve(path);
        fs::remove_file(&host_path).map_err(|e| VaultError::io(Errno::Enoent, format!("unlink failed: {e}")))
    }

    pub fn utimes(&self, path: &str, atime_ms: i64, mtime_ms: i64) -> Result<()> {
        self.check_alive()?;
        let host_path = self.resolve(path);
        let atime = filetime_from_millis(atime_ms);
        let mtime = filetime_from_millis(mtime_ms);
        set_file_times(&host_path, atime, mtime)
    }

    pub fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        self.check_alive()?;
        let host_path = self.resolve(path);
        use std::os::unix::fs::PermissionsExt;
        let permissions = fs::Permissions::from_mode(mode);
        fs::set_permissions(&host_path, permissions)
            .map_err(|e| VaultError::io(Errno::Eacces, format!("chmod failed: {e}")))
    }

    pub fn chdir(&mut self, path: &str) -> Result<()> {
        self.check_alive()?;
        self.current_dir = util::normalize(&self.current_dir, Path::new(path));
        Ok(())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    /// No-op: byte-range record locking is not modeled. Present so a VFS
    /// shim that always calls `fcntl` for locking has something to call.
    pub fn fcntl_lock(&self, _fd: u64) -> Result<()> {
        self.check_alive()
    }

    /// No-op: see [`VaultFs::fcntl_lock`].
    pub fn flock(&self, _fd: u64) -> Result<()> {
        self.check_alive()
    }

    /// Whether `name` would be treated as plaintext-reserved by this
    /// facade's encryption policy, without needing to open the path.
    pub fn is_reserved_name(&self, name: &str) -> bool {
        util::is_reserved_name(name)
    }
}

impl Drop for VaultFs {
    fn drop(&mut self) {
        if !self.destroyed {
            self.destroy();
        }
    }
}

/// Report a timestamp at whole-second resolution, per §4.6 "timestamps are
/// exposed as whole seconds" — the sub-second remainder is dropped, not
/// rounded.
fn to_millis(time: Option<SystemTime>) -> i64 {
    match time {
        Some(t) => t.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs() as i64 * 1000,
        None => 0,
    }
}

fn filetime_from_millis(ms: i64) -> SystemTime {
    if ms >= 0 {
        UNIX_EPOCH + Duration::from_millis(ms as u64)
    } else {
        UNIX_EPOCH - Duration::from_millis((-ms) as u64)
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(not(unix))]
fn mode_bits(_metadata: &fs::Metadata) -> u32 {
    0
}

#[cfg(unix)]
fn set_file_times(path: &Path, atime: SystemTime, mtime: SystemTime) -> Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let _ = OpenOptionsExt::custom_flags;
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| VaultError::io(Errno::Enoent, format!("utimes failed: {e}")))?;
    file.set_modified(mtime).map_err(|e| VaultError::io(Errno::Eio, format!("utimes failed: {e}")))?;
    let _ = atime;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_times(_path: &Path, _atime: SystemTime, _mtime: SystemTime) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_fs(dir: &TempDir) -> VaultFs {
        VaultFs::open(VaultConfig {
            data_dir: dir.path().to_path_buf(),
            key_material: KeyMaterial::Passphrase("test-passphrase".to_string()),
            debug: false,
        })
        .unwrap()
    }

    #[test]
    fn wrong_passphrase_on_reopen_fails() {
        let dir = TempDir::new().unwrap();
        {
            let _fs = open_fs(&dir);
        }
        let result = VaultFs::open(VaultConfig {
            data_dir: dir.path().to_path_buf(),
            key_material: KeyMaterial::Passphrase("wrong".to_string()),
            debug: false,
        });
        assert!(matches!(result, Err(VaultError::InvalidPassphrase)));
    }

    #[test]
    fn write_then_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);

        use crate::constants::{O_CREAT, O_RDWR};
        let fd = fs.open_file("/a", O_RDWR | O_CREAT).unwrap();
        fs.write(fd, &[0x42u8]).unwrap();
        fs.close(fd).unwrap();

        let stat = fs.lstat("/a").unwrap();
        assert_eq!(stat.size, PAGE_SIZE as u64);

        let fd = fs.open_file("/a", O_RDWR).unwrap();
        let data = fs.read(fd, 1).unwrap();
        assert_eq!(data, vec![0x42u8]);
        fs.close(fd).unwrap();
    }

    #[test]
    fn truncate_to_zero_resets_physical_size() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);

        use crate::constants::{O_CREAT, O_RDWR};
        let fd = fs.open_file("/a", O_RDWR | O_CREAT).unwrap();
        fs.write(fd, &vec![0x42u8; PAGE_SIZE + 1]).unwrap();
        fs.close(fd).unwrap();

        fs.truncate("/a", 0).unwrap();
        let stat = fs.lstat("/a").unwrap();
        assert_eq!(stat.size, 0);
    }

    #[test]
    fn truncate_extend_zero_fills() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);

        use crate::constants::{O_CREAT, O_RDWR};
        let fd = fs.open_file("/a", O_RDWR | O_CREAT).unwrap();
        fs.write(fd, &vec![0xAAu8; PAGE_SIZE]).unwrap();
        fs.close(fd).unwrap();

        fs.truncate("/a", 3 * PAGE_SIZE as u64).unwrap();

        let fd = fs.open_file("/a", O_RDWR).unwrap();
        let _ = fs.read(fd, PAGE_SIZE).unwrap();
        let tail = fs.read(fd, PAGE_SIZE).unwrap();
        assert!(tail.iter().all(|&b| b == 0));
        fs.close(fd).unwrap();
    }

    #[test]
    fn plaintext_reserved_file_is_stored_verbatim() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);

        fs.write_file("/postgresql.conf", b"max_connections = 100").unwrap();

        let raw = fs::read(dir.path().join("postgresql.conf")).unwrap();
        assert_eq!(raw, b"max_connections = 100");
    }

    #[test]
    fn reopening_plaintext_file_with_truncate_drops_old_content() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);

        fs.write_file("/postgresql.conf", b"max_connections = 100").unwrap();
        fs.write_file("/postgresql.conf", b"short").unwrap();

        let raw = fs::read(dir.path().join("postgresql.conf")).unwrap();
        assert_eq!(raw, b"short");
    }

    #[test]
    fn internal_files_cannot_be_opened_renamed_or_unlinked() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);

        use crate::constants::{O_CREAT, O_RDWR};
        assert!(matches!(
            fs.open_file("/.vault-salt", O_RDWR | O_CREAT),
            Err(VaultError::Io { code: Errno::Enoent, .. })
        ));
        assert!(matches!(
            fs.open_file("/.encryption-verify", O_RDWR),
            Err(VaultError::Io { code: Errno::Enoent, .. })
        ));
        assert!(matches!(fs.unlink("/.vault-salt"), Err(VaultError::Io { code: Errno::Enoent, .. })));
        assert!(matches!(
            fs.rename("/.vault-salt", "/stolen-salt"),
            Err(VaultError::Io { code: Errno::Enoent, .. })
        ));

        fs.write_file("/a", b"x").unwrap();
        assert!(matches!(
            fs.rename("/a", "/.vault-salt"),
            Err(VaultError::Io { code: Errno::Enoent, .. })
        ));

        // The salt file itself must survive untouched: same key still opens it.
        drop(fs);
        let reopened = VaultFs::open(VaultConfig {
            data_dir: dir.path().to_path_buf(),
            key_material: KeyMaterial::Passphrase("test-passphrase".to_string()),
            debug: false,
        });
        assert!(reopened.is_ok());
    }

    #[test]
    fn stat_timestamps_are_whole_seconds() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);
        fs.write_file("/a", b"x").unwrap();

        let stat = fs.lstat("/a").unwrap();
        assert_eq!(stat.mtime_ms % 1000, 0);
        assert_eq!(stat.atime_ms % 1000, 0);
        assert_eq!(stat.ctime_ms % 1000, 0);
    }

    #[test]
    fn readdir_hides_internal_files() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);
        fs.write_file("/user-file", b"hello").unwrap();

        let names = fs.readdir("/").unwrap();
        assert!(names.contains(&"user-file".to_string()));
        assert!(!names.iter().any(|n| util::is_internal_name(n)));
    }

    #[test]
    fn rename_preserves_file_id_and_content() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);

        use crate::constants::{O_CREAT, O_RDWR};
        let fd = fs.open_file("/a", O_RDWR | O_CREAT).unwrap();
        fs.write(fd, &[0x55u8; 10]).unwrap();
        fs.close(fd).unwrap();

        fs.rename("/a", "/b").unwrap();

        let fd = fs.open_file("/b", O_RDWR).unwrap();
        let data = fs.read(fd, 10).unwrap();
        assert_eq!(data, vec![0x55u8; 10]);
        fs.close(fd).unwrap();
    }

    #[test]
    fn unlink_removes_file() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);
        fs.write_file("/a", b"x").unwrap();
        assert!(fs.exists("/a"));
        fs.unlink("/a").unwrap();
        assert!(!fs.exists("/a"));
    }

    #[test]
    fn operations_after_destroy_fail() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);
        fs.destroy();
        let result = fs.write_file("/a", b"x");
        assert!(matches!(result, Err(VaultError::TornDown)));
    }

    #[test]
    fn bad_descriptor_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);
        let result = fs.read(9999, 10);
        assert!(matches!(result, Err(VaultError::BadDescriptor(9999))));
    }

    #[test]
    fn tampered_page_surfaces_as_io_error_naming_page() {
        let dir = TempDir::new().unwrap();
        let mut fs = open_fs(&dir);

        use crate::constants::{O_CREAT, O_RDWR};
        let fd = fs.open_file("/a", O_RDWR | O_CREAT).unwrap();
        fs.write(fd, &vec![0x01u8; PAGE_SIZE]).unwrap();
        fs.close(fd).unwrap();

        let raw_path = dir.path().join("a");
        let mut raw = fs::read(&raw_path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        fs::write(&raw_path, raw).unwrap();

        let fd = fs.open_file("/a", O_RDWR).unwrap();
        let result = fs.read(fd, PAGE_SIZE);
        assert!(matches!(result, Err(VaultError::Auth { page_no: 0 })));
    }
}
