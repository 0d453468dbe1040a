//! Execution of the `fixture-cache` subcommands.

use crate::cli::{Cli, Commands};
use crate::config::ScenarioConfig;
use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use std::io::Write;
use tracing::{debug, info};

/// Run the command selected by `cli`, writing its report to `out`.
///
/// # Errors
///
/// Returns an error when the configuration cannot be loaded or built, or
/// when writing the report fails.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let config = load_config(cli)?;
    match cli.command.unwrap_or(Commands::Layout) {
        Commands::Layout => layout(&config, out),
        Commands::Validate => validate(&config, out),
    }
}

fn load_config(cli: &Cli) -> Result<ScenarioConfig> {
    let Some(path) = &cli.config else {
        debug!("using the built-in cache layout");
        return Ok(ScenarioConfig::default());
    };
    let path = Utf8PathBuf::from_path_buf(path.clone())
        .map_err(|p| anyhow!("configuration path {} is not valid UTF-8", p.display()))?;
    ScenarioConfig::load(&path).with_context(|| format!("loading cache layout from {path}"))
}

fn layout(config: &ScenarioConfig, out: &mut dyn Write) -> Result<()> {
    let registry = config.build_registry().context("building cache registry")?;
    write!(out, "{registry}")?;
    if let Some(alias_cache) = &config.alias_cache {
        writeln!(out, "Alias cache: {alias_cache}")?;
    }
    Ok(())
}

fn validate(config: &ScenarioConfig, out: &mut dyn Write) -> Result<()> {
    let registry = config.build_registry().context("building cache registry")?;
    let dangling = config.dangling_siblings();
    for (cache, sibling) in &dangling {
        writeln!(out, "warning: cache '{cache}' may point into unknown cache '{sibling}'")?;
    }
    info!(caches = registry.len(), dangling = dangling.len(), "validated cache layout");
    writeln!(out, "configuration OK: {} cache(s)", registry.len())?;
    Ok(())
}
