//! Reading inputs and templates from directories and writing generated files.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

/// First file in `dir` (by name) whose extension is one of `extensions`.
pub fn find_grammar_file(dir: &Path, extensions: &[String]) -> Result<Option<PathBuf>> {
    let found = sorted_files(dir)?.into_iter().find(|path| {
        path.extension()
            .map(|ext| extensions.iter().any(|wanted| ext == wanted.as_str()))
            .unwrap_or(false)
    });
    Ok(found)
}

/// Every regular file in `dir`, file name → content, sorted by name.
/// Invalid UTF-8 is replaced with U+FFFD rather than failing the read.
pub fn read_text_files(dir: &Path) -> Result<IndexMap<String, String>> {
    let mut files = IndexMap::new();
    for path in sorted_files(dir)? {
        let Some(name) = file_name(&path) else {
            continue;
        };
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let content = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(file = %path.display(), "file is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        files.insert(name, content);
    }
    Ok(files)
}

/// Writes each entry to `dir/<name>`, creating `dir` when needed.
/// Returns the written paths in entry order.
pub fn write_outputs(dir: &Path, results: &IndexMap<String, String>) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut written = Vec::with_capacity(results.len());
    for (name, content) in results {
        let path = dir.join(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
