//! Sandboxed file writer for completed transfers.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use crate::TransferError;
use crate::validation::resolve_within_root;

/// Writes files below a fixed root directory.
///
/// Safety checks, in order:
/// 1. The destination must resolve lexically inside the root.
/// 2. Every directory on the way down that already exists is canonicalized
///    (resolving symlinks) and must still be inside the root. Missing
///    directories are created one level at a time.
/// 3. Data goes to a temporary file in the destination directory which is
///    then renamed over the target, so a symlink at the target itself is
///    replaced rather than followed.
#[derive(Debug, Clone)]
pub struct SinkWriter {
    root: PathBuf,
}

impl SinkWriter {
    /// Creates the root if needed and pins its canonical form.
    pub fn new(root: &Path) -> Result<Self, TransferError> {
        fs::create_dir_all(root).map_err(|e| {
            TransferError::InvalidConfig(format!(
                "cannot create root directory {}: {e}",
                root.display()
            ))
        })?;
        let root = fs::canonicalize(root).map_err(|e| {
            TransferError::InvalidConfig(format!(
                "cannot resolve root directory {}: {e}",
                root.display()
            ))
        })?;
        if !root.is_dir() {
            return Err(TransferError::InvalidConfig(format!(
                "root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `data` to `relative` below the root, replacing any existing file.
    ///
    /// Returns the absolute path written.
    pub fn write(&self, relative: &str, data: &[u8]) -> Result<PathBuf, TransferError> {
        let target = resolve_within_root(&self.root, relative)?;

        let (Some(parent), Some(file_name)) = (target.parent(), target.file_name()) else {
            return Err(TransferError::Write(format!("no file name in {relative:?}")));
        };
        if target == self.root {
            return Err(TransferError::Write(format!(
                "destination is the root directory: {relative:?}"
            )));
        }
        let dir = self.ensure_dir(parent, relative)?;
        let target = dir.join(file_name);

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| TransferError::Write(e.to_string()))?;
        tmp.write_all(data)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| TransferError::Write(e.to_string()))?;
        tmp.persist(&target)
            .map_err(|e| TransferError::Write(e.error.to_string()))?;

        tracing::debug!(path = %target.display(), bytes = data.len(), "file written");
        Ok(target)
    }

    /// Walks from the root down to `dir`, creating missing levels and
    /// re-checking the boundary after resolving each existing one.
    fn ensure_dir(&self, dir: &Path, relative: &str) -> Result<PathBuf, TransferError> {
        let below_root = dir
            .strip_prefix(&self.root)
            .map_err(|_| TransferError::PathTraversal(relative.to_string()))?;

        let mut current = self.root.clone();
        for component in below_root.components() {
            let Component::Normal(name) = component else {
                return Err(TransferError::PathTraversal(relative.to_string()));
            };
            current.push(name);

            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    let resolved = fs::canonicalize(&current)
                        .map_err(|e| TransferError::Write(e.to_string()))?;
                    if !resolved.starts_with(&self.root) {
                        tracing::warn!(
                            link = %current.display(),
                            resolved = %resolved.display(),
                            "symlink escapes transfer root"
                        );
                        return Err(TransferError::PathTraversal(relative.to_string()));
                    }
                    if !resolved.is_dir() {
                        return Err(TransferError::Write(format!(
                            "not a directory: {}",
                            current.display()
                        )));
                    }
                    current = resolved;
                }
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    return Err(TransferError::Write(format!(
                        "not a directory: {}",
                        current.display()
                    )));
                }
                Err(e) if e.kind() == ErrorKind::NotFound => match fs::create_dir(&current) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::AlreadyExists && current.is_dir() => {}
                    Err(e) => return Err(TransferError::Write(e.to_string())),
                },
                Err(e) => return Err(TransferError::Write(e.to_string())),
            }
        }

        Ok(current)
    }
}
