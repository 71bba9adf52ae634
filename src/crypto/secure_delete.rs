//! Wiping vault files and sweeping up interrupted writes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use aes_gcm::aead::rand_core::{OsRng, RngCore};

/// Extension of the staging file a vault write goes through before rename.
pub const PARTIAL_WRITE_EXTENSION: &str = "tmp";

const NOISE_BLOCK: usize = 64 * 1024;

/// Overwrite a file with random bytes, sync, then unlink it.
///
/// A missing file is not an error. If the overwrite itself fails the file is
/// still unlinked and the failure is logged.
pub fn secure_delete_file(path: &Path) -> io::Result<()> {
    let len = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if len > 0 {
        let wiped = OpenOptions::new()
            .write(true)
            .open(path)
            .and_then(|mut file| overwrite_with_noise(&mut file, len));
        if let Err(e) = wiped {
            tracing::warn!(bytes = len, "Vault file overwrite incomplete: {e}");
        }
    }

    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn overwrite_with_noise(file: &mut File, len: u64) -> io::Result<()> {
    let mut block = vec![0u8; NOISE_BLOCK.min(len as usize)];
    let mut left = len;
    while left > 0 {
        let n = left.min(block.len() as u64) as usize;
        OsRng.fill_bytes(&mut block[..n]);
        file.write_all(&block[..n])?;
        left -= n as u64;
    }
    file.sync_all()
}

/// Wipe `*.tmp` staging files a crashed write left in `data_dir`.
/// Returns how many were removed.
pub fn cleanup_partial_writes(data_dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(data_dir) else {
        return 0;
    };

    let removed = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == PARTIAL_WRITE_EXTENSION))
        .filter(|path| match secure_delete_file(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Could not remove partial vault write: {e}");
                false
            }
        })
        .count();

    if removed > 0 {
        tracing::info!(files = removed, "Removed partial vault writes");
    }
    removed
}
