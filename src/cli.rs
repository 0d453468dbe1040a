//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. It is also
//! compiled by the build script to render the manual page, so it depends only
//! on `std` and `clap`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and validate the fixture cache layout of a BDD test run.
#[derive(Debug, Parser)]
#[command(name = "fixture-cache", author, version, about, long_about = None)]
pub struct Cli {
    /// Cache layout file; the built-in layout is used when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `layout` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Parse the provided arguments, applying the default command when needed.
    ///
    /// # Panics
    ///
    /// Panics if argument parsing fails.
    #[must_use]
    pub fn parse_from_with_default<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
            .unwrap_or_else(|e| panic!("CLI parsing failed: {e}"))
            .with_default_command()
    }

    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Layout);
        }
        self
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone, Copy)]
pub enum Commands {
    /// Print every configured cache in teardown order. This is the default
    /// command.
    Layout,

    /// Check the layout and report aliases that point at missing caches.
    Validate,
}
