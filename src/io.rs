//! Document loading.
//!
//! Large files are memory-mapped so the text is decoded straight from the
//! page cache instead of being copied through a read buffer first.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::error::{CommandError, Result};

/// Files at or above this size are memory-mapped.
pub const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Reads a UTF-8 text file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or mapped, and
/// [`CommandError::InvalidArgument`] if it is not valid UTF-8.
pub fn read_file(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();

    if len >= MMAP_THRESHOLD {
        // SAFETY: the map is read-only and dropped before this function
        // returns; the text is copied out into an owned String.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(path = %path.display(), bytes = len, "memory-mapped document");
        return decode(path, &mmap).map(str::to_string);
    }

    let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or_default());
    (&file).read_to_end(&mut bytes)?;
    decode(path, &bytes).map(str::to_string)
}

fn decode<'a>(path: &Path, bytes: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| {
        CommandError::InvalidArgument(format!("{} is not valid UTF-8: {e}", path.display()))
            .into()
    })
}
