use crate::nvpmodel::loader::DEFAULT_CONF_PATHS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level nvpm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NvpmConfig {
    /// nvpmodel.conf candidates, highest priority first.
    pub conf_paths: Vec<PathBuf>,
    /// Executable that persists the selected mode.
    pub script: PathBuf,
    /// EMC maximum rate file (not declared in nvpmodel.conf).
    pub emc_max_rate: PathBuf,
    /// Present CPU range file, `"<low>-<high>"`.
    pub cpu_present: PathBuf,
    /// Root that hardware paths are resolved under.
    pub sysfs_root: PathBuf,
}

impl Default for NvpmConfig {
    fn default() -> Self {
        Self {
            conf_paths: DEFAULT_CONF_PATHS.iter().map(PathBuf::from).collect(),
            script: PathBuf::from("/usr/lib/nvidia/nvpmodel/nvpmodel.sh"),
            emc_max_rate: PathBuf::from("/sys/kernel/debug/tegra_bwmgr/emc_max_rate"),
            cpu_present: PathBuf::from("/sys/devices/system/cpu/present"),
            sysfs_root: PathBuf::from("/"),
        }
    }
}

const SYSTEM_CONFIG: &str = "/etc/nvpm/config.toml";

/// Load the system config file if it exists.
fn load_system() -> Option<toml::Value> {
    let path = Path::new(SYSTEM_CONFIG);
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Load the user config file (~/.config/nvpm/config.toml) if it exists.
fn load_user() -> Option<toml::Value> {
    let dir = dirs::config_dir()?;
    let path = dir.join("nvpm").join("config.toml");
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Recursively merge two TOML values. Tables are merged key-by-key;
/// all other types in `overlay` replace `base`.
fn merge_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

fn load_from_path(path: &Path) -> NvpmConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "failed to parse config: {e}");
            NvpmConfig::default()
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to read config: {e}");
            NvpmConfig::default()
        }
    }
}

/// Load the merged config: system defaults, then user overrides.
/// If `override_path` is provided, use only that file instead.
pub fn load(override_path: Option<&PathBuf>) -> NvpmConfig {
    if let Some(path) = override_path {
        return load_from_path(path);
    }

    let merged = match (load_system(), load_user()) {
        (Some(s), Some(u)) => Some(merge_values(s, u)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    };

    match merged {
        Some(value) => value.try_into().unwrap_or_else(|e| {
            tracing::warn!("failed to deserialize config: {e}");
            NvpmConfig::default()
        }),
        None => NvpmConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NvpmConfig::default();
        assert_eq!(
            config.conf_paths,
            vec![
                PathBuf::from("/odm/etc/nvpmodel.conf"),
                PathBuf::from("/vendor/etc/nvpmodel.conf"),
                PathBuf::from("/etc/nvpmodel.conf"),
            ]
        );
        assert_eq!(
            config.script,
            PathBuf::from("/usr/lib/nvidia/nvpmodel/nvpmodel.sh")
        );
        assert_eq!(config.sysfs_root, PathBuf::from("/"));
    }

    #[test]
    fn test_merge_values_overlay_replaces_scalar() {
        let base: toml::Value = toml::from_str(r#"script = "/a.sh""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"script = "/b.sh""#).unwrap();
        let merged = merge_values(base, overlay);
        assert_eq!(merged["script"].as_str(), Some("/b.sh"));
    }

    #[test]
    fn test_merge_values_keeps_base_keys() {
        let base: toml::Value =
            toml::from_str("script = \"/a.sh\"\nsysfs_root = \"/mnt/target\"").unwrap();
        let overlay: toml::Value = toml::from_str(r#"script = "/b.sh""#).unwrap();
        let merged = merge_values(base, overlay);
        assert_eq!(merged["sysfs_root"].as_str(), Some("/mnt/target"));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: NvpmConfig = toml::from_str(
            r#"
            conf_paths = ["/tmp/nvpmodel.conf"]
        "#,
        )
        .unwrap();
        assert_eq!(config.conf_paths, vec![PathBuf::from("/tmp/nvpmodel.conf")]);
        assert_eq!(
            config.emc_max_rate,
            PathBuf::from("/sys/kernel/debug/tegra_bwmgr/emc_max_rate")
        );
    }

    #[test]
    fn test_load_from_nonexistent_path() {
        let config = load_from_path(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.conf_paths.len(), 3);
    }

    #[test]
    fn test_load_override_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "script = \"/opt/apply.sh\"\n").unwrap();

        let config = load(Some(&path));
        assert_eq!(config.script, PathBuf::from("/opt/apply.sh"));
        assert_eq!(config.conf_paths.len(), 3);
    }
}
