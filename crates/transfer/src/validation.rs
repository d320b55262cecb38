use std::path::{Component, Path, PathBuf};

use crate::TransferError;

/// Lexically resolves an untrusted `relative` path against `root`.
///
/// `root` must already be absolute and canonical. `.` and `..` segments are
/// folded without touching the filesystem, and an absolute `relative`
/// replaces `root` the way [`Path::join`] does. The result must equal
/// `root` or sit below it, compared component-wise, so `/srv/root2` is not
/// inside `/srv/root`.
///
/// Symlinks are not resolved here; [`SinkWriter`](crate::SinkWriter) checks
/// each existing directory on the way down.
pub fn resolve_within_root(root: &Path, relative: &str) -> Result<PathBuf, TransferError> {
    let mut resolved = PathBuf::new();
    for component in root.join(relative).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                resolved.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
        }
    }

    if !resolved.starts_with(root) {
        return Err(TransferError::PathTraversal(relative.to_string()));
    }

    Ok(resolved)
}
