//! Settings-file parsing and directory-hierarchy variable resolution
//!
//! Each settings file holds newline-delimited `KEY=VALUE` pairs. Files in the
//! same directory are merged into one table; lookups for a file walk from its
//! directory up to the filesystem root and the nearest definition wins.

use crate::fs::FileSystem;
use crate::types::SettingsTable;
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Parses every settings file and merges them per directory.
///
/// Within a directory, files are applied in the given order and later files
/// overwrite earlier ones on key collision. Unreadable files are skipped.
pub fn load_settings<F: FileSystem>(
    fs: &F,
    settings_files: &BTreeMap<PathBuf, Vec<PathBuf>>,
) -> SettingsTable {
    let mut table = SettingsTable::new();

    for (dir, files) in settings_files {
        for file in files {
            match parse_settings_file(fs, file) {
                Ok(vars) => {
                    debug!(path = %file.display(), variables = vars.len(), "Loaded settings file");
                    table.entry(dir.clone()).or_default().extend(vars);
                }
                Err(err) => {
                    warn!(path = %file.display(), error = %err, "Skipping unreadable settings file");
                }
            }
        }
    }

    table
}

/// Reads a single settings file
pub fn parse_settings_file<F: FileSystem>(fs: &F, path: &Path) -> Result<HashMap<String, String>> {
    let content = fs.read_to_string(path)?;
    Ok(parse_settings(&content))
}

/// Parses `KEY=VALUE` lines. Blank lines and `#` comments are ignored and
/// the first `=` separates key from value.
pub fn parse_settings(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            vars.insert(key.to_string(), unquote(value.trim()).to_string());
        }
    }

    vars
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Collects the variables visible to `file`, nearest directory first.
///
/// A key defined in a closer ancestor overrides the same key from a farther one.
pub fn resolve_for_file(table: &SettingsTable, file: &Path) -> HashMap<String, String> {
    let mut resolved = HashMap::new();

    let Some(dir) = file.parent() else {
        return resolved;
    };

    for ancestor in dir.ancestors() {
        if let Some(vars) = table.get(ancestor) {
            for (key, value) in vars {
                resolved
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
    }

    resolved
}
