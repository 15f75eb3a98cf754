// edep-aio/src/json_io.rs
use std::path::Path;

use edep_common::error::{EdepError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::env::expand_env;

/// Writes serializable data to a JSON file (pretty-printed), replacing any
/// existing file atomically.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    debug!("Writing JSON to: {}", path.display());
    let mut json_bytes = serde_json::to_vec_pretty(data)?;
    json_bytes.push(b'\n');
    crate::fs::atomic_write_file(path, &json_bytes)
}

/// Reads and deserializes a JSON file.
///
/// With `substitute_env_vars` set, `$NAME`/`${NAME}` references in the raw
/// text are replaced by environment values before parsing; otherwise the
/// references survive so the file can be written back unchanged.
pub fn read_json<T: DeserializeOwned>(path: &Path, substitute_env_vars: bool) -> Result<T> {
    debug!(
        "Reading JSON from: {} (substitute env vars: {})",
        path.display(),
        substitute_env_vars
    );
    let bytes = crate::fs::read_to_bytes(path)?;
    let parse_error = |e: serde_json::Error| {
        EdepError::Parse(path.display().to_string(), e.to_string())
    };

    if substitute_env_vars {
        let text = String::from_utf8(bytes).map_err(|e| {
            EdepError::Parse(path.display().to_string(), format!("not UTF-8: {e}"))
        })?;
        serde_json::from_str(&expand_env(&text)).map_err(parse_error)
    } else {
        serde_json::from_slice(&bytes).map_err(parse_error)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        name: String,
    }

    #[test]
    fn round_trip_keeps_placeholders_without_substitution() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        let doc = Doc {
            name: "$SOME_UNLIKELY_EDEP_VAR".to_string(),
        };
        write_json(&path, &doc).unwrap();
        let back: Doc = read_json(&path, false).unwrap();
        assert_eq!(back, doc);

        let substituted: Doc = read_json(&path, true).unwrap();
        assert_eq!(substituted.name, "");
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"name\": ").unwrap();
        let err = read_json::<Doc>(&path, false).unwrap_err();
        assert!(matches!(err, EdepError::Parse(ref file, _) if file.ends_with("bad.json")));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_json::<Doc>(&dir.path().join("none.json"), false).unwrap_err();
        assert!(matches!(err, EdepError::IoError(_)));
    }
}
