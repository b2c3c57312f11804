//! Effective limits of a power mode: the mode's own settings, topped up from
//! the live frequency tables where the mode leaves a bound unspecified.

use crate::error::{Error, Result};
use crate::nvpmodel::{CPU_PARAM_NAMES, FreqTables, PowerMode, Setting};
use crate::sysfs::{self, HardwareSource};
use serde::Serialize;
use std::path::Path;

/// Mode that runs every unit at its hardware ceiling.
pub const MAXN: &str = "MAXN";

/// CPU limits in nvpmodel.conf are kHz; they are reported in Hz.
const CPU_KHZ_TO_HZ: u64 = 1000;

/// The only CPU cluster whose `MIN_FREQ` a MAXN mode may lower.
const MAXN_CPU_MIN_PARAM: &str = "CPU_DENVER_0";

/// Derived limits for one mode. `0` means "not available".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModeInfo {
    pub online_cpus: u32,
    pub cpu_min_freq: u64,
    pub cpu_max_freq: u64,
    pub gpu_min_freq: u64,
    pub gpu_max_freq: u64,
    pub emc_max_freq: u64,
    pub dla_max_freq: u64,
}

fn setting_value(s: &Setting) -> Result<i64> {
    s.value.parse::<i64>().map_err(|_| Error::InvalidValue {
        name: s.name.clone(),
        attribute: s.attribute.clone(),
        value: s.value.clone(),
    })
}

fn non_negative(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

fn cpu_hz(khz: u64) -> u64 {
    khz.saturating_mul(CPU_KHZ_TO_HZ)
}

/// A configured table path that is actually present.
fn present<'a>(hw: &dyn HardwareSource, table: Option<&'a Path>) -> Option<&'a Path> {
    let path = table?;
    if hw.exists(path) {
        Some(path)
    } else {
        tracing::debug!(path = %path.display(), "frequency table not present");
        None
    }
}

fn table_min(hw: &dyn HardwareSource, table: Option<&Path>) -> Option<u64> {
    present(hw, table).and_then(|p| sysfs::min_available(hw, p))
}

fn table_max(hw: &dyn HardwareSource, table: Option<&Path>) -> Option<u64> {
    present(hw, table).and_then(|p| sysfs::max_available(hw, p))
}

/// Compute the effective limits of `mode`.
///
/// MAXN takes only its minimum bounds from settings (the CPU one from
/// `CPU_DENVER_0` alone); its maxima and core count come from the hardware. Any other mode takes everything it declares
/// (`CPU_ONLINE` values accumulate). Afterwards every CPU/GPU/EMC bound still
/// at zero is filled from the hardware tables when they can be read.
pub fn resolve(
    mode: &PowerMode,
    tables: &FreqTables,
    hw: &dyn HardwareSource,
) -> Result<ModeInfo> {
    let mut info = ModeInfo::default();
    let maxn = mode.name == MAXN;
    let mut online: i64 = 0;

    for s in &mode.settings {
        let cpu = CPU_PARAM_NAMES.contains(&s.name.as_str());
        match (s.name.as_str(), s.attribute.as_str()) {
            ("CPU_ONLINE", _) if !maxn => online = online.saturating_add(setting_value(s)?),
            (name, "MIN_FREQ") if cpu && (!maxn || name == MAXN_CPU_MIN_PARAM) => {
                info.cpu_min_freq = cpu_hz(non_negative(setting_value(s)?))
            }
            (_, "MAX_FREQ") if cpu && !maxn => {
                info.cpu_max_freq = cpu_hz(non_negative(setting_value(s)?))
            }
            ("GPU", "MIN_FREQ") => info.gpu_min_freq = non_negative(setting_value(s)?),
            ("GPU", "MAX_FREQ") if !maxn => info.gpu_max_freq = non_negative(setting_value(s)?),
            ("EMC", "MAX_FREQ") if !maxn => info.emc_max_freq = non_negative(setting_value(s)?),
            ("DLA_CORE", "MAX_FREQ") if !maxn => {
                info.dla_max_freq = non_negative(setting_value(s)?)
            }
            _ => {}
        }
    }

    let cpu_table = tables.cpu.as_deref();
    let gpu_table = tables.gpu.as_deref();

    if maxn {
        info.online_cpus = sysfs::present_cpu_count(hw, &tables.cpu_present);
    } else {
        info.online_cpus = u32::try_from(online.max(0)).unwrap_or(u32::MAX);
    }

    if info.cpu_min_freq == 0 {
        info.cpu_min_freq = table_min(hw, cpu_table).map(cpu_hz).unwrap_or(0);
    }
    if info.gpu_min_freq == 0 {
        info.gpu_min_freq = table_min(hw, gpu_table).unwrap_or(0);
    }
    if info.cpu_max_freq == 0 {
        info.cpu_max_freq = table_max(hw, cpu_table).map(cpu_hz).unwrap_or(0);
    }
    if info.gpu_max_freq == 0 {
        info.gpu_max_freq = table_max(hw, gpu_table).unwrap_or(0);
    }
    if info.emc_max_freq == 0 {
        info.emc_max_freq = sysfs::read_scalar(hw, &tables.emc_max_rate).unwrap_or(0);
    }

    tracing::debug!(mode = %mode.name, ?info, "resolved mode limits");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::MemoryHardware;
    use std::path::PathBuf;

    const CPU_TABLE: &str = "/sys/devices/system/cpu/cpu0/cpufreq/scaling_available_frequencies";
    const GPU_TABLE: &str = "/sys/devices/gpu.0/devfreq/17000000.gv11b/available_frequencies";
    const EMC_RATE: &str = "/sys/kernel/debug/tegra_bwmgr/emc_max_rate";
    const PRESENT: &str = "/sys/devices/system/cpu/present";

    fn tables() -> FreqTables {
        FreqTables {
            cpu: Some(PathBuf::from(CPU_TABLE)),
            gpu: Some(PathBuf::from(GPU_TABLE)),
            emc_max_rate: PathBuf::from(EMC_RATE),
            cpu_present: PathBuf::from(PRESENT),
        }
    }

    fn full_hardware() -> MemoryHardware {
        MemoryHardware::new()
            .with(CPU_TABLE, "115200 1190400 2265600 0\n")
            .with(GPU_TABLE, "114750000 522750000 1377000000 0\n")
            .with(EMC_RATE, "2133000000\n")
            .with(PRESENT, "0-7\n")
    }

    fn mode(name: &str, settings: &[(&str, &str, &str)]) -> PowerMode {
        PowerMode {
            id: "0".into(),
            name: name.into(),
            settings: settings
                .iter()
                .map(|(n, a, v)| Setting {
                    name: n.to_string(),
                    attribute: a.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_maxn_takes_maxima_from_hardware() {
        let m = mode(
            MAXN,
            &[
                ("CPU_ONLINE", "CORE_0", "1"),
                ("CPU_DENVER_0", "MIN_FREQ", "1190"),
                ("CPU_DENVER_0", "MAX_FREQ", "1200"),
                ("GPU", "MIN_FREQ", "0"),
                ("GPU", "MAX_FREQ", "1"),
                ("EMC", "MAX_FREQ", "1600000000"),
                ("DLA_CORE", "MAX_FREQ", "550000000"),
            ],
        );
        let info = resolve(&m, &tables(), &full_hardware()).unwrap();

        assert_eq!(info.online_cpus, 8);
        assert_eq!(info.cpu_min_freq, 1_190_000);
        assert_eq!(info.cpu_max_freq, 2_265_600_000);
        assert_eq!(info.gpu_min_freq, 114_750_000);
        assert_eq!(info.gpu_max_freq, 1_377_000_000);
        assert_eq!(info.emc_max_freq, 2_133_000_000);
        assert_eq!(info.dla_max_freq, 0);
    }

    #[test]
    fn test_maxn_ignores_a57_min_freq() {
        let m = mode(MAXN, &[("CPU_A57", "MIN_FREQ", "921600")]);
        let info = resolve(&m, &tables(), &full_hardware()).unwrap();
        assert_eq!(info.cpu_min_freq, 115_200_000);

        let m = mode("MODE_15W", &[("CPU_A57", "MIN_FREQ", "921600")]);
        let info = resolve(&m, &tables(), &full_hardware()).unwrap();
        assert_eq!(info.cpu_min_freq, 921_600_000);
    }

    #[test]
    fn test_cpu_online_sum_saturates() {
        let max = i64::MAX.to_string();
        let m = mode(
            "MODE_15W",
            &[
                ("CPU_ONLINE", "CORE_0", max.as_str()),
                ("CPU_ONLINE", "CORE_1", max.as_str()),
            ],
        );
        let info = resolve(&m, &tables(), &MemoryHardware::new()).unwrap();
        assert_eq!(info.online_cpus, u32::MAX);
    }

    #[test]
    fn test_cpu_online_accumulates() {
        let m = mode(
            "MODE_15W",
            &[("CPU_ONLINE", "CORE_0", "2"), ("CPU_ONLINE", "CORE_4", "2")],
        );
        let info = resolve(&m, &tables(), &MemoryHardware::new()).unwrap();
        assert_eq!(info.online_cpus, 4);
    }

    #[test]
    fn test_non_maxn_uses_settings() {
        let m = mode(
            "MODE_10W",
            &[
                ("CPU_A57", "MIN_FREQ", "345600"),
                ("CPU_A57", "MAX_FREQ", "1200000"),
                ("GPU", "MIN_FREQ", "76800000"),
                ("GPU", "MAX_FREQ", "640000000"),
                ("EMC", "MAX_FREQ", "1600000000"),
                ("DLA_CORE", "MAX_FREQ", "550000000"),
            ],
        );
        let info = resolve(&m, &tables(), &full_hardware()).unwrap();

        assert_eq!(info.online_cpus, 0);
        assert_eq!(info.cpu_min_freq, 345_600_000);
        assert_eq!(info.cpu_max_freq, 1_200_000_000);
        assert_eq!(info.gpu_min_freq, 76_800_000);
        assert_eq!(info.gpu_max_freq, 640_000_000);
        assert_eq!(info.emc_max_freq, 1_600_000_000);
        assert_eq!(info.dla_max_freq, 550_000_000);
    }

    #[test]
    fn test_missing_gpu_max_falls_back_to_table() {
        let m = mode("MODE_30W", &[("GPU", "MIN_FREQ", "0")]);
        let info = resolve(&m, &tables(), &full_hardware()).unwrap();
        assert_eq!(info.gpu_max_freq, 1_377_000_000);
        assert_eq!(info.gpu_min_freq, 114_750_000);
        assert_eq!(info.cpu_min_freq, 115_200_000);
        assert_eq!(info.cpu_max_freq, 2_265_600_000);
    }

    #[test]
    fn test_missing_tables_leave_sentinel() {
        let m = mode("MODE_30W", &[("CPU_ONLINE", "CORE_0", "1")]);
        let info = resolve(&m, &tables(), &MemoryHardware::new()).unwrap();
        assert_eq!(
            info,
            ModeInfo {
                online_cpus: 1,
                ..ModeInfo::default()
            }
        );
    }

    #[test]
    fn test_unresolved_table_paths() {
        let t = FreqTables {
            cpu: None,
            gpu: None,
            ..tables()
        };
        let info = resolve(&mode("MODE_30W", &[]), &t, &full_hardware()).unwrap();
        assert_eq!(info.cpu_max_freq, 0);
        assert_eq!(info.gpu_max_freq, 0);
        assert_eq!(info.emc_max_freq, 2_133_000_000);
    }

    #[test]
    fn test_maxn_without_present_file_reports_one_core() {
        let info = resolve(&mode(MAXN, &[]), &tables(), &MemoryHardware::new()).unwrap();
        assert_eq!(info.online_cpus, 1);
    }

    #[test]
    fn test_invalid_value() {
        let m = mode("MODE_10W", &[("GPU", "MAX_FREQ", "max")]);
        match resolve(&m, &tables(), &full_hardware()) {
            Err(Error::InvalidValue { name, value, .. }) => {
                assert_eq!(name, "GPU");
                assert_eq!(value, "max");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_has_no_memory_between_calls() {
        let busy = mode("MODE_10W", &[("GPU", "MAX_FREQ", "640000000")]);
        let idle = mode("MODE_30W", &[]);
        let hw = MemoryHardware::new();

        assert_eq!(resolve(&busy, &tables(), &hw).unwrap().gpu_max_freq, 640_000_000);
        assert_eq!(resolve(&idle, &tables(), &hw).unwrap().gpu_max_freq, 0);
    }
}
