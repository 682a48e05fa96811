//! Clearing the artifacts a previous run left in a working directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

pub const DEFAULT_ARTIFACT_EXTENSIONS: [&str; 4] = ["mp4", "csv", "srt", "vtt"];

/// Removes files directly inside `dir` whose extension is in `extensions`
/// (case-insensitive). Subdirectories are left alone. A missing directory is
/// not an error. Returns the removed file names, sorted.
pub fn reset_dir<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Result<Vec<String>> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "nothing to clean");
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list directory {:?}", dir))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {:?}", dir))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                extensions
                    .iter()
                    .any(|wanted| wanted.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false);
        if !matches {
            continue;
        }
        fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        removed.push(entry.file_name().to_string_lossy().into_owned());
    }

    removed.sort();
    debug!(dir = %dir.display(), removed = removed.len(), "cleaned directory");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn removes_only_matching_files() {
        let dir = tempdir().unwrap();
        for name in ["video.mp4", "video.csv", "subtitles.SRT", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("keep.csv")).unwrap();

        let removed = reset_dir(dir.path(), &DEFAULT_ARTIFACT_EXTENSIONS[..]).unwrap();

        assert_eq!(removed, vec!["subtitles.SRT", "video.csv", "video.mp4"]);
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("keep.csv").is_dir());
    }

    #[test]
    fn is_idempotent_and_tolerates_missing_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("0001.mp4"), b"x").unwrap();

        assert_eq!(reset_dir(dir.path(), &["mp4"][..]).unwrap().len(), 1);
        assert!(reset_dir(dir.path(), &["mp4"][..]).unwrap().is_empty());
        assert!(reset_dir(&dir.path().join("absent"), &["mp4"][..])
            .unwrap()
            .is_empty());
    }
}
