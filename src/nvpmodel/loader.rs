use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Candidate locations, highest priority first.
pub const DEFAULT_CONF_PATHS: &[&str] = &[
    "/odm/etc/nvpmodel.conf",
    "/vendor/etc/nvpmodel.conf",
    "/etc/nvpmodel.conf",
];

/// A loaded `nvpmodel.conf`, reduced to its meaningful lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// The candidate path that was opened.
    pub path: PathBuf,
    /// Where `path` points if it is a symlink; otherwise `path` itself.
    /// Only used for display.
    pub display_path: PathBuf,
    /// Trimmed lines with comments and blanks removed.
    pub lines: Vec<String>,
}

/// Strip each line and drop blank and `#` comment lines.
pub fn clean_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Load the first candidate that exists as a regular file.
///
/// Returns `Ok(None)` when none of the candidates exist; callers treat that
/// as "no nvpmodel support on this board".
pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Option<ConfigFile>> {
    for candidate in candidates {
        let path = candidate.as_ref();
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "nvpmodel config candidate not present");
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let display_path = match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                std::fs::read_link(path).unwrap_or_else(|_| path.to_path_buf())
            }
            _ => path.to_path_buf(),
        };

        let lines = clean_lines(&content);
        tracing::debug!(
            path = %path.display(),
            target = %display_path.display(),
            lines = lines.len(),
            "loaded nvpmodel config"
        );

        return Ok(Some(ConfigFile {
            path: path.to_path_buf(),
            display_path,
            lines,
        }));
    }

    Ok(None)
}
