use crate::config::NvpmConfig;
use crate::error::{Error, Result};
use crate::nvpmodel::{self, ConfigFile, FreqTables, ParsedConfig, PowerMode};
use crate::resolve::{self, ModeInfo};
use crate::script::ModeScript;
use crate::sysfs::{HardwareSource, SysfsRoot};
use std::path::PathBuf;

/// Outcome of looking for nvpmodel support on this system.
pub enum Availability {
    Ready(Selector),
    /// None of the candidate config files exist.
    NoConfig,
    /// The config has no `PM_CONFIG DEFAULT` directive.
    NoPreset { path: PathBuf },
}

/// A loaded nvpmodel config plus the hardware it is resolved against.
pub struct Selector {
    pub file: ConfigFile,
    pub conf: ParsedConfig,
    pub default_id: String,
    tables: FreqTables,
    hw: Box<dyn HardwareSource>,
}

impl Selector {
    /// Load and parse the first available nvpmodel.conf.
    pub fn open(config: &NvpmConfig) -> Result<Availability> {
        let hw = SysfsRoot::new(&config.sysfs_root);
        let Some(file) = nvpmodel::load(config.conf_paths.as_slice())? else {
            tracing::debug!("no nvpmodel config found");
            return Ok(Availability::NoConfig);
        };
        let conf = nvpmodel::parse(&file.lines)?;
        Ok(Self::from_parts(file, conf, config, Box::new(hw)))
    }

    /// Assemble a selector from already-parsed parts and an arbitrary hardware source.
    pub fn from_parts(
        file: ConfigFile,
        conf: ParsedConfig,
        config: &NvpmConfig,
        hw: Box<dyn HardwareSource>,
    ) -> Availability {
        let Some(default_id) = conf.preset.clone() else {
            tracing::debug!(path = %file.path.display(), "nvpmodel config has no default mode");
            return Availability::NoPreset { path: file.display_path };
        };
        let tables = FreqTables::from_config(&conf, &config.emc_max_rate, &config.cpu_present);
        tracing::debug!(?tables, "frequency tables");

        Availability::Ready(Self {
            file,
            conf,
            default_id,
            tables,
            hw,
        })
    }

    pub fn default_name(&self) -> &str {
        self.conf.name_by_id(&self.default_id)
    }

    pub fn modes(&self) -> &[PowerMode] {
        &self.conf.power_modes
    }

    pub fn tables(&self) -> &FreqTables {
        &self.tables
    }

    /// Whether `mode` is the one named by the preset directive.
    pub fn is_default(&self, mode: &PowerMode) -> bool {
        mode.id == self.default_id
    }

    /// Mode list entries in file order, the default one annotated.
    pub fn mode_labels(&self) -> Vec<String> {
        self.modes()
            .iter()
            .map(|m| {
                if self.is_default(m) {
                    format!("{} - (Default)", m.name)
                } else {
                    m.name.clone()
                }
            })
            .collect()
    }

    /// Find a mode by id or name; `None` selects the default mode.
    pub fn find(&self, key: Option<&str>) -> Result<&PowerMode> {
        let key = key.unwrap_or(self.default_id.as_str());
        self.conf
            .find_mode(key)
            .ok_or_else(|| Error::UnknownMode(key.to_string()))
    }

    /// Recompute the effective limits of `mode` from current hardware state.
    pub fn resolve(&self, mode: &PowerMode) -> Result<ModeInfo> {
        resolve::resolve(mode, &self.tables, self.hw.as_ref())
    }

    /// Persist `mode` through the apply script.
    pub fn apply(&self, script: &ModeScript, mode: &PowerMode) -> Result<String> {
        script.apply(&self.default_id, &mode.id)
    }
}
