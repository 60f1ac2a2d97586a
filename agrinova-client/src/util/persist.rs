use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{ClientError, ClientResult};

#[cfg(unix)]
const PRIVATE_FILE_MODE: u32 = 0o600;

/// Writes `value` as pretty JSON, readable only by the owner on unix.
/// The file is replaced atomically from a uniquely named sibling temp file.
pub fn write_private_json<T: Serialize>(path: &Path, value: &T) -> ClientResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(PRIVATE_FILE_MODE))?;
    }

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(path)
        .map_err(|e| ClientError::Persistence(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}

/// Reads JSON from `path`. A missing file is `None`; an unparseable one is
/// moved aside to `.bad` and also treated as missing.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ClientResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(path)?;
    match serde_json::from_slice::<T>(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(?e, path = %path.display(), "unreadable file, renaming to .bad");
            let bad = path.with_extension("bad");
            if let Err(e) = fs::rename(path, &bad) {
                warn!(?e, path = %path.display(), "could not move unreadable file aside");
            }
            Ok(None)
        }
    }
}

pub fn remove_file(path: &Path) -> ClientResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
