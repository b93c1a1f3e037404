//! Workspace root and path confinement
//!
//! Every file-touching tool resolves its `path` argument through
//! [`Workspace::resolve`]. A path is rejected with `PATH_ESCAPE` when it
//! leaves the root lexically (`..`) or through a symlink.

use patchpilot_domain::ToolError;
use std::io;
use std::path::{Component, Path, PathBuf};

/// The repository directory the tools operate on.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace. The root must exist; it is canonicalized once.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("workspace root is not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path to an absolute path inside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let requested = Path::new(path);
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        let normalized = normalize(&joined).ok_or_else(|| ToolError::path_escape(path))?;
        if !normalized.starts_with(&self.root) {
            return Err(ToolError::path_escape(path));
        }

        // Symlinks: the deepest existing ancestor must still be inside the root
        if let Some(existing) = nearest_existing(&normalized)
            && let Ok(real) = existing.canonicalize()
            && !real.starts_with(&self.root)
        {
            return Err(ToolError::path_escape(path));
        }

        Ok(normalized)
    }

    /// Resolve a path that must be given relative to the root.
    pub fn resolve_relative(&self, path: &str) -> Result<PathBuf, ToolError> {
        if Path::new(path).is_absolute() {
            return Err(ToolError::path_escape(path));
        }
        self.resolve(path)
    }

    /// Root-relative display form used in tool output.
    pub fn display(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}

/// Lexically remove `.` and `..`. Returns `None` when `..` climbs past `/`.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}

fn nearest_existing(path: &Path) -> Option<&Path> {
    path.ancestors().find(|p| p.symlink_metadata().is_ok())
}
