use crate::snapshot::Snapshot;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

pub const EXPORT_EXTENSION: &str = ".json";
pub const DEFAULT_FILE_NAME: &str = "system-info";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{path} is not a directory")]
    InvalidDirectory { path: String },
    #[error("permission denied writing to {path}: {source}")]
    PermissionDenied { path: String, source: io::Error },
    #[error("could not write {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("could not serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExportError {
    /// Whether asking the user for another destination could help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExportError::Serialize(_))
    }

    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.display().to_string();
        if source.kind() == io::ErrorKind::PermissionDenied {
            ExportError::PermissionDenied { path, source }
        } else {
            ExportError::Io { path, source }
        }
    }
}

/// True when `name` names a file directly, with no directory component.
pub fn is_bare_file_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Appends `.json` to a user-supplied base name; blank input gets the default.
pub fn export_file_name(base: &str) -> String {
    let base = base.trim();
    let base = if base.is_empty() {
        DEFAULT_FILE_NAME
    } else {
        base
    };
    if base.ends_with(EXPORT_EXTENSION) {
        base.to_string()
    } else {
        format!("{base}{EXPORT_EXTENSION}")
    }
}

/// Writes the snapshot as indented JSON into `dir`, returning the final path.
pub fn export_to_dir(
    snapshot: &Snapshot,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, ExportError> {
    if !dir.is_dir() {
        return Err(ExportError::InvalidDirectory {
            path: dir.display().to_string(),
        });
    }
    let path = dir.join(export_file_name(file_name));
    write_snapshot(snapshot, &path)?;
    info!(path = %path.display(), "snapshot exported");
    Ok(path)
}

/// The file at `path` is replaced only once the new content is fully on disk.
pub fn write_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), ExportError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ExportError::from_io(dir, e))?;
    debug!(tmp = %tmp.path().display(), "writing export to temp file");

    serde_json::to_writer_pretty(&mut tmp, snapshot)?;
    tmp.write_all(b"\n")
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ExportError::from_io(tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|e| ExportError::from_io(path, e.error))?;
    Ok(())
}
