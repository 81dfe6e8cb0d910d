pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a scenario, asset sheet or solver request was read from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    File(PathBuf),
    Stdin,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "'{}'", path.display()),
            Source::Stdin => f.write_str("stdin"),
        }
    }
}

/// Load a document from `--input` when given, else from piped stdin.
/// `None` when neither is available, so commands fall back to defaults.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return read_file(path).map(Some);
    }
    match stdin::read_piped()? {
        Some(text) => Ok(Some(parse(&Source::Stdin, &text)?)),
        None => Ok(None),
    }
}

/// A document that must come from a file, such as `--asset`.
pub fn read_file<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let (resolved, text) = file::read_document(Path::new(path))?;
    Ok(parse(&Source::File(resolved), &text)?)
}

/// Parse errors name the source and position; unknown input names and
/// malformed decimals are reported by serde with the offending key.
pub fn parse<T: DeserializeOwned>(source: &Source, text: &str) -> Result<T, String> {
    serde_json::from_str(text).map_err(|e| {
        format!(
            "invalid input in {source} at line {}, column {}: {e}",
            e.line(),
            e.column()
        )
    })
}
