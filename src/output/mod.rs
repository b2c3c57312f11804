use crate::nvpmodel::{Param, PowerMode};
use crate::resolve::ModeInfo;
use crate::selector::Selector;
use colored::Colorize;

const LABEL_W: usize = 18;

/// Render a sentinel-aware frequency or count.
fn value_or_na(v: u64) -> String {
    if v == 0 {
        "N/A".to_string()
    } else {
        v.to_string()
    }
}

/// Label/value rows shown for a resolved mode, in display order.
pub fn mode_info_rows(info: &ModeInfo) -> Vec<(&'static str, String)> {
    vec![
        ("CPU Online Cores", value_or_na(u64::from(info.online_cpus))),
        ("CPU Min Freq", value_or_na(info.cpu_min_freq)),
        ("CPU Max Freq", value_or_na(info.cpu_max_freq)),
        ("GPU Min Freq", value_or_na(info.gpu_min_freq)),
        ("GPU Max Freq", value_or_na(info.gpu_max_freq)),
        ("EMC Max Freq", value_or_na(info.emc_max_freq)),
        ("DLA Max Freq", value_or_na(info.dla_max_freq)),
    ]
}

pub fn print_mode_info(mode: &PowerMode, info: &ModeInfo) {
    let rows = mode_info_rows(info);

    // Box width from content
    let inner_w = rows
        .iter()
        .map(|(l, v)| l.len().max(LABEL_W) + 2 + v.len())
        .max()
        .unwrap_or(40);

    let title = format!("Mode {} ({})", mode.name, mode.id);
    let fill = inner_w.saturating_sub(1 + title.len());
    println!("╭─ {} {}╮", title.bold(), "─".repeat(fill));

    for (label, value) in &rows {
        let padded = format!("{:<w$}", label, w = LABEL_W);
        let pad = inner_w.saturating_sub(LABEL_W + 2 + value.len());
        let value = if value == "N/A" {
            value.dimmed().to_string()
        } else {
            value.clone()
        };
        println!("│ {}  {}{} │", padded.dimmed(), value, " ".repeat(pad));
    }

    println!("╰{}╯", "─".repeat(inner_w + 2));
}

pub fn print_mode_list(sel: &Selector) {
    println!(
        "  {} {}",
        "nvpmodel config:".bold(),
        sel.file.display_path.display()
    );
    println!();

    for (mode, label) in sel.modes().iter().zip(sel.mode_labels()) {
        let id = format!("{:>3}", mode.id);
        if sel.is_default(mode) {
            println!("  {}  {}", id.dimmed(), label.green().bold());
        } else {
            println!("  {}  {}", id.dimmed(), label);
        }
    }
    println!();
}

pub fn print_params(params: &[Param]) {
    if params.is_empty() {
        println!("{}", "  No params declared.".yellow());
        return;
    }

    for param in params {
        println!("  {} {}", param.name.bold(), format!("[{}]", param.kind).dimmed());
        for arg in &param.args {
            println!("     {:<w$}  {}", arg.name, arg.path, w = LABEL_W);
        }
    }
}

pub fn print_mode_list_json(sel: &Selector) {
    let output = serde_json::json!({
        "conf_path": sel.file.display_path,
        "default": sel.default_id,
        "modes": sel.modes().iter().map(|m| serde_json::json!({
            "id": m.id,
            "name": m.name,
            "default": sel.is_default(m),
        })).collect::<Vec<_>>(),
    });
    print_json(&output);
}

pub fn print_mode_info_json(mode: &PowerMode, info: &ModeInfo) {
    let output = serde_json::json!({
        "id": mode.id,
        "name": mode.name,
        "info": info,
    });
    print_json(&output);
}

pub fn print_params_json(params: &[Param]) {
    print_json(&serde_json::json!(params));
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to serialize output: {}", e),
    }
}
