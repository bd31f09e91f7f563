//! Per-open-file state.

use std::fs::File;
use std::path::PathBuf;

use crate::constants::FILE_ID_SIZE;

/// Open flags a caller requested, translated from the Linux numeric
/// convention (see [`crate::constants`]) into booleans the facade acts on.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub write: bool,
    pub read_write: bool,
    pub create: bool,
    pub exclusive: bool,
    pub truncate: bool,
    pub append: bool,
}

impl OpenFlags {
    pub fn from_raw(raw: i32) -> Self {
        use crate::constants::{O_APPEND, O_CREAT, O_EXCL, O_RDWR, O_TRUNC, O_WRONLY};
        OpenFlags {
            write: raw & O_WRONLY != 0,
            read_write: raw & O_RDWR != 0,
            create: raw & O_CREAT != 0,
            exclusive: raw & O_EXCL != 0,
            truncate: raw & O_TRUNC != 0,
            append: raw & O_APPEND != 0,
        }
    }

    pub fn writable(&self) -> bool {
        self.write || self.read_write
    }
}

/// Backing storage for a handle: a real file, or a sentinel for directory
/// handles (which have no descriptor to read or write).
pub enum Backing {
    File(File),
    Directory,
}

/// State tracked for one open virtual descriptor.
pub struct FileHandle {
    pub descriptor: u64,
    pub backing: Backing,
    pub path: PathBuf,
    pub flags: OpenFlags,
    pub position: u64,
    pub encrypted: bool,
    pub file_id: Option<[u8; FILE_ID_SIZE]>,
}

impl FileHandle {
    pub fn file(&self) -> Option<&File> {
        match &self.backing {
            Backing::File(f) => Some(f),
            Backing::Directory => None,
        }
    }

    pub fn file_mut(&mut self) -> Option<&mut File> {
        match &mut self.backing {
            Backing::File(f) => Some(f),
            Backing::Directory => None,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.backing, Backing::Directory)
    }
}
