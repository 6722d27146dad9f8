use std::path::{Component, Path, PathBuf};

/// Canonical separator used in store keys, regardless of platform.
pub const KEY_SEPARATOR: char = '/';

/// Translate an absolute path under `root` into a store key.
///
/// The key is the path relative to `root` with components joined by the
/// canonical separator, so the same logical file maps to the same key from
/// any connection root. Returns `None` for `root` itself, for paths outside
/// `root`, and for paths containing `..` components.
pub fn key_for(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Translate a store key into an absolute path under `root`.
///
/// Inverse of [`key_for`] for any path actually produced by a walk or a watch
/// event under `root`.
pub fn path_for(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in key.split(KEY_SEPARATOR).filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}
