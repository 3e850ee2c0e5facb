use std::path::{Component, Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Path resolves outside the project root
    OutsideProject(PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::OutsideProject(path) => {
                write!(f, "Path outside project root: {}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::OutsideProject(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Normalize a path for comparison (resolve to absolute, canonicalize if
/// possible). Non-existent paths fall back to lexical resolution of `.` and
/// `..` components so that workspace checks work before files are created.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        resolve_dots(&absolute)
    })
}

fn resolve_dots(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}

/// Resolves paths relative to one project root.
///
/// Glob matching, workspace boundary checks, and change-event routing all
/// key on the exact same relative form, so every path goes through here
/// before it is stored or matched.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = project_root.into();
        Self {
            root: normalize_path(&root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert to a forward-slash path relative to the project root.
    /// Relative inputs are anchored at the root; absolute inputs must
    /// resolve inside it.
    pub fn to_workspace_path(&self, path: &Path) -> Result<String> {
        let absolute = if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.root.join(path))
        };

        let relative = absolute
            .strip_prefix(&self.root)
            .map_err(|_| Error::OutsideProject(path.to_path_buf()))?;

        let mut segments = Vec::new();
        for component in relative.components() {
            segments.push(component.as_os_str().to_string_lossy().into_owned());
        }
        Ok(segments.join("/"))
    }

    /// Whether the path stays inside the project after canonicalization.
    pub fn is_within_project(&self, path: &Path) -> bool {
        self.to_workspace_path(path).is_ok()
    }
}

/// Convenience wrapper for one-off conversions.
pub fn to_project_relative(project_root: &Path, path: &Path) -> Result<String> {
    PathResolver::new(project_root).to_workspace_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_dots() {
        assert_eq!(
            resolve_dots(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(resolve_dots(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn test_relative_input_is_anchored_at_root() {
        let resolver = PathResolver::new("/project");
        assert_eq!(
            resolver.to_workspace_path(Path::new("src/main.py")).unwrap(),
            "src/main.py"
        );
    }

    #[test]
    fn test_escape_via_parent_components_is_rejected() {
        let resolver = PathResolver::new("/project");
        assert!(
            resolver
                .to_workspace_path(Path::new("../outside/main.py"))
                .is_err()
        );
        assert!(!resolver.is_within_project(Path::new("src/../../etc/passwd")));
    }

    #[test]
    fn test_absolute_inside_root() {
        let resolver = PathResolver::new("/project");
        assert_eq!(
            resolver
                .to_workspace_path(Path::new("/project/src/lib.rs"))
                .unwrap(),
            "src/lib.rs"
        );
        assert!(
            resolver
                .to_workspace_path(Path::new("/elsewhere/lib.rs"))
                .is_err()
        );
    }
}
