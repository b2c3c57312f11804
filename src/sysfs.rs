use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Read access to the hardware interface files the mode resolver consults.
///
/// Paths are the absolute paths as they appear on a live system
/// (`/sys/devices/...`). Implementations return the trimmed contents, or
/// `None` when the file does not exist or cannot be read.
pub trait HardwareSource {
    fn read(&self, path: &Path) -> Option<String>;

    fn exists(&self, path: &Path) -> bool {
        self.read(path).is_some()
    }
}

/// Abstraction over the sysfs/debugfs filesystem root.
/// Defaults to `/` in production, redirectable to a temp directory for testing.
#[derive(Debug, Clone)]
pub struct SysfsRoot {
    root: PathBuf,
}

impl Default for SysfsRoot {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }
}

impl SysfsRoot {
    /// Create a SysfsRoot pointing at a custom directory (for testing or a
    /// target filesystem mounted elsewhere).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Re-root an absolute system path under this root.
    /// e.g., `/sys/kernel/debug/tegra_bwmgr/emc_max_rate` -> `<test_root>/sys/kernel/debug/...`
    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }
}

impl HardwareSource for SysfsRoot {
    fn read(&self, path: &Path) -> Option<String> {
        let full = self.path(path);
        match std::fs::read_to_string(&full) {
            Ok(s) => Some(s.trim().to_string()),
            Err(e) => {
                tracing::debug!(path = %full.display(), "hardware file unavailable: {e}");
                None
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.path(path).is_file()
    }
}

/// In-memory hardware files, keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct MemoryHardware {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl HardwareSource for MemoryHardware {
    fn read(&self, path: &Path) -> Option<String> {
        self.files.get(path).map(|s| s.trim().to_string())
    }
}

fn table_entries(hw: &dyn HardwareSource, path: &Path) -> Option<Vec<u64>> {
    let raw = hw.read(path)?;
    let parsed: Result<Vec<u64>, _> = raw.split_whitespace().map(str::parse::<u64>).collect();
    match parsed {
        Ok(v) if !v.is_empty() => Some(v),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "frequency table is empty");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "unparsable frequency table: {e}");
            None
        }
    }
}

/// Lowest available frequency: the first entry of the table.
pub fn min_available(hw: &dyn HardwareSource, path: &Path) -> Option<u64> {
    table_entries(hw, path)?.first().copied()
}

/// Highest available frequency: the second-to-last entry of the table.
/// The final slot is reserved by the driver interface and is not a frequency.
/// A single-entry table yields that entry.
pub fn max_available(hw: &dyn HardwareSource, path: &Path) -> Option<u64> {
    let entries = table_entries(hw, path)?;
    let idx = entries.len().saturating_sub(2);
    entries.get(idx).copied()
}

/// Read a file holding a single integer (e.g. `emc_max_rate`).
pub fn read_scalar(hw: &dyn HardwareSource, path: &Path) -> Option<u64> {
    let raw = hw.read(path)?;
    match raw.parse::<u64>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(path = %path.display(), "unparsable value '{raw}': {e}");
            None
        }
    }
}

/// Number of present CPUs from a `"<low>-<high>"` range file.
/// Falls back to one core when the file is missing or unreadable.
pub fn present_cpu_count(hw: &dyn HardwareSource, path: &Path) -> u32 {
    let Some(raw) = hw.read(path) else {
        return 1;
    };
    let high = raw.rsplit('-').next().unwrap_or(raw.as_str());
    match high.trim().parse::<u32>() {
        Ok(n) => n + 1,
        Err(e) => {
            tracing::warn!(path = %path.display(), "unparsable cpu range '{raw}': {e}");
            1
        }
    }
}
