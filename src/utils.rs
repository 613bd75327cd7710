//! Filesystem helpers

use crate::config::FileCollisionAction;
use std::io;
use std::path::{Path, PathBuf};

/// Upper bound on `name (N).ext` probes before giving up
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Resolve the path a new file should be written to
///
/// - `Overwrite`: always `path`.
/// - `Skip`: `path` if it does not exist, otherwise `AlreadyExists`.
/// - `Rename`: `path` if free, otherwise the first free `stem (N).ext`.
///
/// # Examples
///
/// ```
/// use gallery_fetch::config::FileCollisionAction;
/// use gallery_fetch::utils::get_unique_path;
/// use std::path::Path;
///
/// let path = Path::new("/nonexistent/dir/foo1.jpg");
/// let resolved = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// assert_eq!(resolved, path);
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> io::Result<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", path.display()),
                ));
            }
            Ok(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot extract file stem from {}", path.display()),
                )
            })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent().unwrap_or_else(|| Path::new(""));

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{stem} ({i}).{ext}"),
                    None => format!("{stem} ({i})"),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(new_path);
                }
            }

            Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!(
                    "no free name for {} after {MAX_RENAME_ATTEMPTS} attempts",
                    path.display()
                ),
            ))
        }
    }
}
