//! Role prompt overrides loaded from `<prompts_dir>/<phase>.md`

use patchpilot_domain::Phase;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use tracing::debug;

/// Load every `<phase>.md` present in `dir`. Missing or blank files leave
/// the built-in prompt in place.
pub fn load_role_prompts(dir: &Path) -> io::Result<HashMap<Phase, String>> {
    let mut prompts = HashMap::new();
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("prompts directory not found: {}", dir.display()),
        ));
    }

    for phase in Phase::ALL {
        let path = dir.join(format!("{}.md", phase.as_str()));
        if !path.is_file() {
            continue;
        }
        let text = std::fs::read_to_string(&path)?;
        if text.trim().is_empty() {
            continue;
        }
        debug!(phase = %phase, path = %path.display(), "Loaded role prompt override");
        prompts.insert(phase, text.trim().to_string());
    }
    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_role_prompts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("coder.md"), "Write small patches.\n").unwrap();
        fs::write(dir.path().join("testlint.md"), "   \n").unwrap();
        fs::write(dir.path().join("reviewer.md"), "ignored").unwrap();

        let prompts = load_role_prompts(dir.path()).unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[&Phase::Coder], "Write small patches.");
    }

    #[test]
    fn test_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = load_role_prompts(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
