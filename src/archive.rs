// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use log::debug;
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::CleanError;

pub const DEFAULT_INPUT: &str = "public/FEU HUMAIN/message_1.json";

const CLEAN_SUFFIX: &str = "_clean";

/// `dir/message_1.json` -> `dir/message_1_clean.json`
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "conversation".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "json".to_string());

    input.with_file_name(format!("{}{}.{}", stem, CLEAN_SUFFIX, extension))
}

pub fn load(path: &Path) -> Result<Value, CleanError> {
    let raw = fs::read(path).map_err(|source| CleanError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", raw.len(), path.display());

    // Invalid UTF-8 is reported by the parser, as malformed content.
    serde_json::from_slice(&raw).map_err(|source| CleanError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })
}

/// The source file is never a valid destination.
pub fn ensure_distinct(input: &Path, output: &Path) -> Result<(), CleanError> {
    let same = match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };

    if same {
        return Err(CleanError::OutputIsInput {
            path: output.to_path_buf(),
        });
    }
    Ok(())
}

/// Temporary file that ends up with the mode `File::create` would give:
/// 0o666 filtered by the process umask, instead of tempfile's 0o600.
#[cfg(unix)]
fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    tempfile::Builder::new()
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    NamedTempFile::new_in(dir)
}

/// Write `doc` as indented JSON with non-ASCII kept literal.
///
/// The whole document is serialized first, written to a temporary file next
/// to `path`, then renamed over it, so a failed run never leaves a partial
/// output behind. An existing output keeps its permissions.
pub fn save(path: &Path, doc: &Value) -> Result<(), CleanError> {
    let write_err = |source: io::Error| CleanError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let body = serde_json::to_string_pretty(doc).map_err(|e| write_err(e.into()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = temp_file_in(dir).map_err(write_err)?;
    if let Ok(existing) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(write_err)?;
    }
    tmp.write_all(body.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", body.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("public/FEU HUMAIN/message_1.json")),
            PathBuf::from("public/FEU HUMAIN/message_1_clean.json")
        );
        assert_eq!(
            default_output_path(Path::new("export")),
            PathBuf::from("export_clean.json")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = load(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CleanError::InputUnreadable { .. }));
    }

    #[test]
    fn test_load_malformed_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{\"messages\": [").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, CleanError::MalformedJson { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_save_keeps_layout_and_literal_accents() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in.json");
        let output = tmp.path().join("out.json");
        let text = "{\n  \"title\": \"Réunion\",\n  \"messages\": [\n    {\n      \"timestamp_ms\": 1612345678901234567890,\n      \"ratio\": 1.50,\n      \"content\": \"ça va? \\\"oui\\\"\"\n    }\n  ],\n  \"participants\": []\n}";
        fs::write(&input, text).unwrap();

        let doc = load(&input).unwrap();
        save(&output, &doc).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), text);
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("out.json");

        save(&output, &json!({"title": "é"})).unwrap();
        save(&output, &json!({"title": "è"})).unwrap();

        let entries: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "{\n  \"title\": \"è\"\n}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_save_uses_default_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("out.json");
        let plain = tmp.path().join("plain.json");

        save(&output, &json!({"a": 1})).unwrap();
        fs::write(&plain, "{}").unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&output), mode(&plain));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("out.json");
        fs::write(&output, "{}").unwrap();
        fs::set_permissions(&output, fs::Permissions::from_mode(0o640)).unwrap();

        save(&output, &json!({"a": 1})).unwrap();

        let mode = fs::metadata(&output).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_load_invalid_utf8_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("latin1.json");
        fs::write(&path, b"{\"title\": \"R\xe9union \xff\"}").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, CleanError::MalformedJson { .. }));
    }

    #[test]
    fn test_save_into_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("missing").join("out.json");

        let err = save(&output, &json!({})).unwrap_err();
        assert!(matches!(err, CleanError::OutputWrite { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_ensure_distinct() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("message_1.json");
        fs::write(&input, "{}").unwrap();

        assert!(ensure_distinct(&input, &default_output_path(&input)).is_ok());

        let dotted = tmp.path().join(".").join("message_1.json");
        let err = ensure_distinct(&input, &dotted).unwrap_err();
        assert!(matches!(err, CleanError::OutputIsInput { .. }));
    }
}
