//! The `nvpmodel.conf` power-mode profile: loading, parsing and the typed
//! model the rest of the crate works with.

pub mod loader;
pub mod parser;

pub use loader::{ConfigFile, load};
pub use parser::parse;

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Param names whose `FREQ_TABLE` argument locates the CPU frequency table.
pub const CPU_PARAM_NAMES: &[&str] = &["CPU_A57", "CPU_DENVER_0"];
pub const GPU_PARAM_NAME: &str = "GPU";
pub const FREQ_TABLE_ARG: &str = "FREQ_TABLE";

/// One `NAME ATTRIBUTE VALUE` line inside a power mode block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    pub name: String,
    pub attribute: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerMode {
    pub id: String,
    pub name: String,
    pub settings: Vec<Setting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamArg {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub args: Vec<ParamArg>,
}

impl Param {
    pub fn arg(&self, name: &str) -> Option<&ParamArg> {
        self.args.iter().find(|a| a.name == name)
    }
}

/// Everything extracted from one `nvpmodel.conf`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedConfig {
    pub preset: Option<String>,
    pub power_modes: Vec<PowerMode>,
    pub params: Vec<Param>,
}

impl ParsedConfig {
    pub fn mode_by_id(&self, id: &str) -> Option<&PowerMode> {
        self.power_modes.iter().find(|m| m.id == id)
    }

    pub fn mode_by_name(&self, name: &str) -> Option<&PowerMode> {
        self.power_modes.iter().find(|m| m.name == name)
    }

    /// Name of the mode with `id`, or an empty string when there is none.
    pub fn name_by_id(&self, id: &str) -> &str {
        self.mode_by_id(id).map(|m| m.name.as_str()).unwrap_or("")
    }

    /// The mode named by the `PM_CONFIG DEFAULT` directive.
    pub fn default_mode(&self) -> Option<&PowerMode> {
        self.preset.as_deref().and_then(|id| self.mode_by_id(id))
    }

    /// Look a mode up by id first, then by name.
    pub fn find_mode(&self, key: &str) -> Option<&PowerMode> {
        self.mode_by_id(key).or_else(|| self.mode_by_name(key))
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Path of argument `arg` of the last param whose name is in `names`.
    pub fn param_arg_path(&self, names: &[&str], arg: &str) -> Option<PathBuf> {
        self.params
            .iter()
            .rev()
            .filter(|p| names.contains(&p.name.as_str()))
            .find_map(|p| p.arg(arg))
            .map(|a| PathBuf::from(&a.path))
    }
}

/// Hardware files the mode resolver reads limits from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreqTables {
    pub cpu: Option<PathBuf>,
    pub gpu: Option<PathBuf>,
    pub emc_max_rate: PathBuf,
    pub cpu_present: PathBuf,
}

impl FreqTables {
    /// CPU and GPU tables come from the config's params; the EMC rate and
    /// CPU range files are fixed locations supplied by the caller.
    pub fn from_config(conf: &ParsedConfig, emc_max_rate: &Path, cpu_present: &Path) -> Self {
        Self {
            cpu: conf.param_arg_path(CPU_PARAM_NAMES, FREQ_TABLE_ARG),
            gpu: conf.param_arg_path(&[GPU_PARAM_NAME], FREQ_TABLE_ARG),
            emc_max_rate: emc_max_rate.to_path_buf(),
            cpu_present: cpu_present.to_path_buf(),
        }
    }
}
