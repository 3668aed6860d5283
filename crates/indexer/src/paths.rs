use crate::error::{IndexerError, Result};
use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a client-supplied relative path.
///
/// Absolute paths, drive prefixes and `..` segments are rejected; `.` and
/// empty segments are dropped.
pub fn normalize_relative(relative: &str) -> Result<PathBuf> {
    let cleaned = relative.trim().replace('\\', "/");
    let mut normalized = PathBuf::new();
    for component in Path::new(&cleaned).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(IndexerError::InvalidPath(relative.to_string()));
            }
        }
    }
    Ok(normalized)
}

/// Canonical `/`-separated key for a relative path.
pub fn canonical_key(relative: &str) -> Result<String> {
    let normalized = normalize_relative(relative)?;
    Ok(normalized
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Joins `relative` onto `root`, refusing anything that escapes the root.
///
/// Existing targets are canonicalized so symlinks pointing outside the root
/// are rejected as well. Missing targets are returned as-is; callers decide
/// whether that is a 404.
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf> {
    let target = root.join(normalize_relative(relative)?);
    let Ok(resolved) = target.canonicalize() else {
        return Ok(target);
    };
    let root = root
        .canonicalize()
        .map_err(|_| IndexerError::NotFound(root.display().to_string()))?;
    if resolved != root && !resolved.starts_with(&root) {
        return Err(IndexerError::InvalidPath(relative.to_string()));
    }
    Ok(resolved)
}
