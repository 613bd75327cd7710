//! Destination directory and image file writes

use std::io;
use std::path::{Path, PathBuf};

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use crate::utils::get_unique_path;

/// Suffix for in-progress writes
const PART_SUFFIX: &str = ".part";

/// Create `dir` and any missing parents
///
/// Failure here is fatal for the run and surfaces as [`Error::Storage`].
pub(crate) async fn ensure_destination(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| Error::Storage {
            path: dir.to_path_buf(),
            source,
        })?;

    let metadata = tokio::fs::metadata(dir)
        .await
        .map_err(|source| Error::Storage {
            path: dir.to_path_buf(),
            source,
        })?;
    if !metadata.is_dir() {
        return Err(Error::Storage {
            path: dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "not a directory"),
        });
    }

    Ok(())
}

/// Write `bytes` for `target`, honoring the collision policy
///
/// The data lands in `<name>.part` first and is renamed into place, so the
/// final name never holds a partial image. Returns the path written.
pub(crate) async fn write_image(
    target: &Path,
    bytes: &[u8],
    action: FileCollisionAction,
) -> io::Result<PathBuf> {
    let path = get_unique_path(target, action)?;
    let part = part_path(&path);

    if let Err(e) = tokio::fs::write(&part, bytes).await {
        remove_part(&part).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&part, &path).await {
        remove_part(&part).await;
        return Err(e);
    }

    Ok(path)
}

/// `foo1.jpg` -> `foo1.jpg.part`
pub(crate) fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(PART_SUFFIX);
    path.with_file_name(name)
}

async fn remove_part(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(path = %part.display(), error = %e, "Failed to remove partial file");
    }
}
