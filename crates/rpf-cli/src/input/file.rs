use std::fs;
use std::path::{Path, PathBuf};

/// Resolve `path` against the working directory and read it whole.
pub fn read_document(path: &Path) -> Result<(PathBuf, String), Box<dyn std::error::Error>> {
    let resolved = resolve(path)?;
    let text = fs::read_to_string(&resolved)
        .map_err(|e| format!("cannot read '{}': {e}", resolved.display()))?;
    tracing::debug!(path = %resolved.display(), bytes = text.len(), "input file read");
    Ok((resolved, text))
}

fn resolve(path: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    if !resolved.is_file() {
        return Err(format!("input file not found: {}", resolved.display()).into());
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_file_is_reported_with_its_path() {
        let err = read_document(Path::new("no-such-scenario.json")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("input file not found:"), "{msg}");
        assert!(msg.ends_with("no-such-scenario.json"), "{msg}");
    }

    #[test]
    fn test_directory_is_not_an_input_file() {
        let dir = std::env::temp_dir();
        assert!(read_document(&dir).is_err());
    }
}
