//! Build script generating man pages for the CLI.

use clap::CommandFactory;
use clap_mangen::Man;
use std::{env, fs, path::Path, path::PathBuf};

#[path = "src/cli.rs"]
#[expect(
    dead_code,
    reason = "Only type definitions are needed for man page generation"
)]
mod cli;

fn render(cmd: clap::Command, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut buf = Vec::new();
    Man::new(cmd).render(&mut buf)?;
    fs::write(path, buf)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");
    println!("cargo:rerun-if-env-changed=CARGO_PKG_NAME");
    println!("cargo:rerun-if-env-changed=CARGO_BIN_NAME");

    let out_dir = PathBuf::from("target/generated-man");
    if out_dir.exists() {
        fs::remove_dir_all(&out_dir)?;
    }
    fs::create_dir_all(&out_dir)?;

    let cmd = cli::Cli::command();
    let name = cmd.get_name().to_owned();
    let cargo_bin = env::var("CARGO_BIN_NAME")
        .or_else(|_| env::var("CARGO_PKG_NAME"))
        .unwrap_or_else(|_| name.clone());
    if name != cargo_bin {
        return Err(format!(
            "CLI name '{name}' differs from Cargo bin/package name '{cargo_bin}'; packaging expects {cargo_bin}.1"
        )
        .into());
    }

    // One page per subcommand, named the way `man fixture-cache-layout` expects.
    for sub in cmd.get_subcommands() {
        let page = format!("{cargo_bin}-{}", sub.get_name());
        render(sub.clone().name(page.clone()), &out_dir.join(format!("{page}.1")))?;
    }
    render(cmd, &out_dir.join(format!("{cargo_bin}.1")))
}
