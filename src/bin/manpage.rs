use clap::CommandFactory;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Writes `nvpm.1` plus one page per subcommand into the directory given as
/// the first argument (default `man/`).
fn main() -> io::Result<()> {
    let man_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&man_dir)?;

    let cmd = nvpm::cli::Cli::command();
    clap_mangen::generate_to(cmd, &man_dir)?;

    let mut pages: Vec<PathBuf> = fs::read_dir(&man_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    pages.sort();
    for page in pages {
        println!("Generated {}", page.display());
    }

    Ok(())
}
