use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use memmap2::Mmap;
use crate::log::warn;

/// Load a file using memory mapping.
pub fn load_with_memory_mapping(path: impl AsRef<Path>) -> io::Result<Mmap> {
    let file = File::open(&path)?;
    unsafe { Mmap::map(&file) }
}

/// Create `path` (and its parent directories) and hand a buffered writer to `write`.
///
/// The file handle is closed on every exit path. When `write` or the final flush fails,
/// the partially written file is removed before the error is returned. This is not an
/// atomic replacement: an existing file at `path` is truncated first.
pub fn write_with_scoped_file<T, E>(
    path: impl AsRef<Path>,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<io::Error>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let result = write(&mut writer).and_then(|value| {
        writer.flush()?;
        Ok(value)
    });
    drop(writer);

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove partially written file {:?}: {}", path, e);
        }
    }

    result
}
