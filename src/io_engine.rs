//! Translates arbitrary byte-granularity reads and writes into
//! page-granularity encrypt/decrypt operations, performing read-modify-write
//! for partial pages.

use std::os::unix::fs::FileExt;

use log::warn;

use crate::codec::{decrypt_page, encrypt_page};
use crate::constants::{ENCRYPTED_PAGE_SIZE, FILE_HEADER_SIZE, PAGE_SIZE};
use crate::error::{Errno, Result, VaultError};
use crate::handle::FileHandle;
use crate::keys::VaultKey;
use crate::layout::{self, physical_page_offset};

/// Read `length` bytes from `handle` starting at `position` (the handle's
/// own logical position if `position` is `None`), decrypting page-by-page.
/// Returns the bytes actually read (fewer than `length` at EOF) without
/// advancing the handle's position; the caller advances it.
pub fn read(
    handle: &FileHandle,
    key: &VaultKey,
    position: u64,
    length: usize,
) -> Result<Vec<u8>> {
    let file = handle
        .file()
        .ok_or_else(|| VaultError::io(Errno::Eisdir, "cannot read a directory handle"))?;
    let file_id = handle
        .file_id
        .ok_or_else(|| VaultError::io(Errno::Einval, "handle has no file id"))?;

    if length == 0 {
        return Ok(Vec::new());
    }

    let (start_page, start_offset) = layout::split_logical_position(position);
    let (end_page, _) = layout::split_logical_position(position + length as u64 - 1);

    let mut out = Vec::with_capacity(length);
    let mut remaining = length;
    let mut offset_in_page = start_offset;

    for page_no in start_page..=end_page {
        let physical_offset = physical_page_offset(page_no);
        let mut encrypted = vec![0u8; ENCRYPTED_PAGE_SIZE];
        let bytes_read = file
            .read_at(&mut encrypted, physical_offset)
            .map_err(|e| VaultError::io(Errno::Eio, format!("short read of page {page_no}: {e}")))?;

        if bytes_read == 0 {
            break;
        }
        if bytes_read != ENCRYPTED_PAGE_SIZE {
            return Err(VaultError::io(
                Errno::Eio,
                format!("short encrypted page read: page {page_no}, got {bytes_read} bytes"),
            ));
        }

        let plaintext = decrypt_page(&encrypted, page_no, key.as_bytes(), &file_id).map_err(|e| {
            warn!("decryption failed for page {page_no} of {}", handle.path.display());
            e
        })?;

        let take = (PAGE_SIZE - offset_in_page).min(remaining);
        out.extend_from_slice(&plaintext[offset_in_page..offset_in_page + take]);
        remaining -= take;
        offset_in_page = 0;

        if remaining == 0 {
            break;
        }
    }

    Ok(out)
}

/// Overlay `data` onto `handle` starting at logical position `position`,
/// performing read-modify-write on any partially touched page. Returns the
/// number of bytes written (always `data.len()` on success).
pub fn write(
    handle: &FileHandle,
    key: &VaultKey,
    position: u64,
    data: &[u8],
) -> Result<usize> {
    let file = handle
        .file()
        .ok_or_else(|| VaultError::io(Errno::Eisdir, "cannot write a directory handle"))?;
    let file_id = handle
        .file_id
        .ok_or_else(|| VaultError::io(Errno::Einval, "handle has no file id"))?;

    if data.is_empty() {
        return Ok(0);
    }

    let current_physical = file
        .metadata()
        .map_err(|e| VaultError::io(Errno::Eio, format!("cannot stat file: {e}")))?
        .len();

    let (start_page, start_offset) = layout::split_logical_position(position);
    let (end_page, _) = layout::split_logical_position(position + data.len() as u64 - 1);

    let mut consumed = 0usize;
    let mut offset_in_page = start_offset;

    for page_no in start_page..=end_page {
        let physical_offset = physical_page_offset(page_no);

        let mut plaintext = if physical_offset < current_physical {
            let mut encrypted = vec![0u8; ENCRYPTED_PAGE_SIZE];
            let bytes_read = file.read_at(&mut encrypted, physical_offset).map_err(|e| {
                VaultError::io(Errno::Eio, format!("cannot read existing page {page_no}: {e}"))
            })?;
            if bytes_read == ENCRYPTED_PAGE_SIZE {
                decrypt_page(&encrypted, page_no, key.as_bytes(), &file_id)?
            } else {
                vec![0u8; PAGE_SIZE]
            }
        } else {
            vec![0u8; PAGE_SIZE]
        };

        let take = (PAGE_SIZE - offset_in_page).min(data.len() - consumed);
        plaintext[offset_in_page..offset_in_page + take]
            .copy_from_slice(&data[consumed..consumed + take]);

        let encrypted = encrypt_page(&plaintext, page_no, key.as_bytes(), &file_id)?;
        file.write_at(&encrypted, physical_offset)
            .map_err(|e| VaultError::io(Errno::Eio, format!("cannot write page {page_no}: {e}")))?;

        consumed += take;
        offset_in_page = 0;
    }

    Ok(consumed)
}

/// Extend or shrink an encrypted file to logical length `new_len`.
///
/// Extension zero-fills new pages (each independently encrypted with a
/// fresh IV); shrinking truncates the underlying physical file to a whole
/// number of pages plus the header.
pub fn truncate(handle: &FileHandle, key: &VaultKey, new_len: u64) -> Result<()> {
    let file = handle
        .file()
        .ok_or_else(|| VaultError::io(Errno::Eisdir, "cannot truncate a directory handle"))?;
    let file_id = handle
        .file_id
        .ok_or_else(|| VaultError::io(Errno::Einval, "handle has no file id"))?;

    let current_physical = file
        .metadata()
        .map_err(|e| VaultError::io(Errno::Eio, format!("cannot stat file: {e}")))?
        .len();

    let cur_pages = layout::page_count(current_physical);
    let new_pages = layout::pages_for_logical_size(new_len);

    if new_pages > cur_pages {
        let zero_plaintext = vec![0u8; PAGE_SIZE];
        for page_no in cur_pages..new_pages {
            let encrypted = encrypt_page(&zero_plaintext, page_no as u32, key.as_bytes(), &file_id)?;
            let offset = physical_page_offset(page_no as u32);
            file.write_at(&encrypted, offset).map_err(|e| {
                VaultError::io(Errno::Eio, format!("cannot extend file with page {page_no}: {e}"))
            })?;
        }
    } else {
        let new_physical = FILE_HEADER_SIZE as u64 + new_pages * ENCRYPTED_PAGE_SIZE as u64;
        file.set_len(new_physical)
            .map_err(|e| VaultError::io(Errno::Eio, format!("cannot truncate file: {e}")))?;
    }

    Ok(())
}
