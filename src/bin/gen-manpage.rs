//! Man page generator for ltmtool
//!
//! Writes `ltmtool.1` and one `ltmtool-<command>.1` per subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

fn render(man: clap_mangen::Man, path: &Path) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(path, buffer)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let main_page = output_dir.join("ltmtool.1");
    render(clap_mangen::Man::new(cmd.clone()), &main_page)?;
    println!("Man page generated at: {}", main_page.display());

    for sub in cmd.get_subcommands() {
        let name = format!("ltmtool-{}", sub.get_name());
        let path = output_dir.join(format!("{}.1", name));
        render(clap_mangen::Man::new(sub.clone()).title(name), &path)?;
        println!("Man page generated at: {}", path.display());
    }

    println!("\nTo view the man page:");
    println!("  man -l {}", main_page.display());
    Ok(())
}
