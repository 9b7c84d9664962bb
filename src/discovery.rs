//! Candidate-file discovery
//!
//! Recursively finds index / persistent-store files under a folder,
//! bounded by a maximum depth and filtered by glob patterns
//! (`*.rdq`, `*.idx`, ...). Patterns match file names, not paths; they
//! are translated to anchored regexes. Results are deduplicated and
//! sorted so runs are reproducible.

use crate::error::{ConfigError, ReplayerError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Find all files under `folder` (up to `max_depth` levels deep) whose
/// name matches at least one glob pattern
pub fn find_files(folder: &Path, max_depth: usize, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let matchers = patterns
        .iter()
        .map(|p| compile_glob(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut found = Vec::new();
    walk(folder, 1, max_depth, &matchers, &mut found)?;
    found.sort();
    found.dedup();
    Ok(found)
}

fn walk(
    dir: &Path,
    depth: usize,
    max_depth: usize,
    matchers: &[Regex],
    found: &mut Vec<PathBuf>,
) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if depth > 1 => {
            // Unreadable subfolders are skipped, not fatal
            warn!(dir = %dir.display(), error = %err, "skipping unreadable directory");
            return Ok(());
        }
        Err(err) => return Err(ReplayerError::Io(err)),
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            if depth < max_depth {
                walk(&path, depth + 1, max_depth, matchers, found)?;
            }
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if matchers.iter().any(|re| re.is_match(name)) {
                found.push(path);
            }
        }
    }
    Ok(())
}

/// Translate a shell-style glob into an anchored regex
fn compile_glob(pattern: &str) -> std::result::Result<Regex, ConfigError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            ch => expr.push_str(&regex::escape(&ch.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|err| ConfigError::InvalidFilePattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}
