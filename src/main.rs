use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use nvpm::cli::{Cli, Command};
use nvpm::config::NvpmConfig;
use nvpm::script::ModeScript;
use nvpm::selector::{Availability, Selector};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = nvpm::config::load(cli.config.as_ref());
    if let Some(conf) = cli.conf.clone() {
        config.conf_paths = vec![conf];
    }

    match cli.command {
        Command::List => cmd_list(&config, cli.json)?,
        Command::Show { mode } => cmd_show(&config, mode.as_deref(), cli.json)?,
        Command::Params => cmd_params(&config, cli.json)?,
        Command::Select { mode, yes } => cmd_select(&config, &mode, yes)?,
        Command::Completions { shell } => nvpm::cli::print_completions(shell),
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Open the selector, or explain why nvpmodel is unavailable and return None.
fn open(config: &NvpmConfig) -> Result<Option<Selector>> {
    match Selector::open(config)? {
        Availability::Ready(sel) => Ok(Some(sel)),
        Availability::NoConfig => {
            println!(
                "  {} No nvpmodel.conf found. Power mode selection is not available on this system.",
                "Note:".yellow()
            );
            for path in &config.conf_paths {
                println!("    {}", path.display().to_string().dimmed());
            }
            Ok(None)
        }
        Availability::NoPreset { path } => {
            println!(
                "  {} {} declares no default mode. Power mode selection is not available.",
                "Note:".yellow(),
                path.display()
            );
            Ok(None)
        }
    }
}

fn cmd_list(config: &NvpmConfig, json: bool) -> Result<()> {
    let Some(sel) = open(config)? else {
        return Ok(());
    };

    if json {
        nvpm::output::print_mode_list_json(&sel);
    } else {
        nvpm::output::print_mode_list(&sel);
    }
    Ok(())
}

fn cmd_show(config: &NvpmConfig, mode: Option<&str>, json: bool) -> Result<()> {
    let Some(sel) = open(config)? else {
        return Ok(());
    };

    let mode = sel.find(mode)?;
    let info = sel.resolve(mode)?;

    if json {
        nvpm::output::print_mode_info_json(mode, &info);
    } else {
        nvpm::output::print_mode_info(mode, &info);
    }
    Ok(())
}

fn cmd_params(config: &NvpmConfig, json: bool) -> Result<()> {
    let Some(sel) = open(config)? else {
        return Ok(());
    };

    if json {
        nvpm::output::print_params_json(&sel.conf.params);
    } else {
        nvpm::output::print_params(&sel.conf.params);
    }
    Ok(())
}

fn cmd_select(config: &NvpmConfig, mode: &str, yes: bool) -> Result<()> {
    let Some(sel) = open(config)? else {
        return Ok(());
    };

    let mode = sel.find(Some(mode))?;
    let info = sel.resolve(mode)?;
    nvpm::output::print_mode_info(mode, &info);

    nvpm::script::require_root(&format!("nvpm select {}", mode.name))?;

    if !yes {
        println!(
            "{} {} -> {}",
            "This will switch the power mode:".bold(),
            sel.default_name(),
            mode.name
        );
        print!("Continue? [y/N] ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let script = ModeScript::new(&config.script);
    let output = sel.apply(&script, mode).inspect_err(|_| {
        println!(
            "  The mode can still be changed later with {}.",
            "nvpmodel -m <id>".cyan()
        );
    });
    let output = output.with_context(|| format!("failed to apply power mode {}", mode.name))?;

    if !output.is_empty() {
        println!("{}", output);
    }
    println!("{} {}", "Power mode set:".green().bold(), mode.name);
    Ok(())
}
