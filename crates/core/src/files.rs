//! Ingestion of the auxiliary files submitted alongside the main code.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions treated as text and read verbatim. Anything else yields a
/// placeholder string instead of raw bytes.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["py", "txt", "md", "json", "yaml", "yml", "css", "html", "js"];

/// Reads one uploaded file. Supported extensions are read as UTF-8 text;
/// unsupported ones produce an "Unsupported file type" placeholder.
pub fn read_file_content(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
    } else {
        Ok(format!("Unsupported file type: .{extension}"))
    }
}

/// Loads the auxiliary files into a filename-to-content map. Unreadable
/// entries are logged and skipped rather than failing the whole submission.
pub fn load_aux_files(paths: &[PathBuf]) -> HashMap<String, String> {
    let mut files = HashMap::new();
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::error!("Skipping file with unusable name: {}", path.display());
            continue;
        };
        match read_file_content(path) {
            Ok(content) => {
                files.insert(name.to_string(), content);
            }
            Err(e) => tracing::error!("Error reading file: {e:#}"),
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn reads_supported_file_as_text() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("helpers.py");
        let mut file = File::create(&path)?;
        writeln!(file, "def helper(): pass")?;

        let content = read_file_content(&path)?;
        assert_eq!(content, "def helper(): pass\n");
        Ok(())
    }

    #[test]
    fn extension_match_is_case_insensitive() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("NOTES.MD");
        File::create(&path)?.write_all(b"# notes")?;

        assert_eq!(read_file_content(&path)?, "# notes");
        Ok(())
    }

    #[test]
    fn unsupported_extension_yields_placeholder() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("binary.exe");
        File::create(&path)?.write_all(&[0u8, 159, 146, 150])?;

        let content = read_file_content(&path)?;
        assert_eq!(content, "Unsupported file type: .exe");
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = read_file_content(Path::new("does_not_exist_for_testing.py"));
        assert!(result.is_err());
    }

    #[test]
    fn load_aux_files_skips_unreadable_entries() -> Result<()> {
        let dir = tempdir()?;
        let good = dir.path().join("config.yaml");
        File::create(&good)?.write_all(b"key: value")?;
        let missing = dir.path().join("gone.txt");

        let files = load_aux_files(&[good, missing]);
        assert_eq!(files.len(), 1);
        assert_eq!(files.get("config.yaml").map(String::as_str), Some("key: value"));
        Ok(())
    }
}
