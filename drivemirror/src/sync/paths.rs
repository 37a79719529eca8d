use std::path::{Component, Path};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("path {path:?} is not under the sync root {root:?}")]
    NotUnderRoot { root: String, path: String },
    #[error("path contains an unsupported component: {0:?}")]
    UnsupportedComponent(String),
}

/// Normalizes `dir` (a descendant of `root`) into a forward-slash relative
/// subpath. The sync root itself maps to the empty string.
pub fn relative_subpath(root: &Path, dir: &Path) -> Result<String, PathError> {
    let relative = dir
        .strip_prefix(root)
        .map_err(|_| PathError::NotUnderRoot {
            root: root.display().to_string(),
            path: dir.display().to_string(),
        })?;

    let mut out = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| PathError::UnsupportedComponent(format!("{part:?}")))?;
                if !out.is_empty() {
                    out.push('/');
                }
                out.push_str(part);
            }
            Component::CurDir => continue,
            other => {
                return Err(PathError::UnsupportedComponent(format!("{other:?}")));
            }
        }
    }
    Ok(out)
}

/// Ordered segments of a normalized subpath; empty subpath yields nothing.
pub fn segments(subpath: &str) -> impl Iterator<Item = &str> {
    subpath.split('/').filter(|segment| !segment.is_empty())
}

/// True when any component of `subpath` equals `name`. Used for ignored
/// folder matching anywhere in a path.
pub fn contains_component(subpath: &str, name: &str) -> bool {
    segments(subpath).any(|segment| segment == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn root_maps_to_empty_subpath() {
        let root = PathBuf::from("/data/tree");
        assert_eq!(relative_subpath(&root, &root).unwrap(), "");
    }

    #[test]
    fn nested_directory_uses_forward_slashes() {
        let root = PathBuf::from("/data/tree");
        let dir = root.join("a").join("b").join("c");
        assert_eq!(relative_subpath(&root, &dir).unwrap(), "a/b/c");
    }

    #[test]
    fn path_outside_root_is_rejected() {
        let root = PathBuf::from("/data/tree");
        assert!(matches!(
            relative_subpath(&root, &PathBuf::from("/elsewhere")),
            Err(PathError::NotUnderRoot { .. })
        ));
    }

    #[test]
    fn segments_split_in_order() {
        let parts: Vec<&str> = segments("a/b/c").collect();
        assert_eq!(parts, vec!["a", "b", "c"]);
        assert_eq!(segments("").count(), 0);
    }

    #[test]
    fn component_match_hits_anywhere_in_the_path() {
        assert!(contains_component("src/.git/hooks", ".git"));
        assert!(contains_component(".git", ".git"));
        assert!(!contains_component("src/gitlab", "git"));
    }
}
