//! Command-line interface for qrcheckin.
//!
//! This module provides the CLI structure for the `qrcheckin` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, LocalCommand, LookupCommand, ScanCommand};

/// qrcheckin - Event check-in by QR code
///
/// Scans an attendee's QR code with a webcam, finds them in the attendee
/// spreadsheet and stamps their entry time.
#[derive(Debug, Parser)]
#[command(name = "qrcheckin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the interactive check-in console
    Run,

    /// Decode QR codes from image files
    Scan(ScanCommand),

    /// Look an attendee up without marking entry
    Lookup(LookupCommand),

    /// List available cameras
    Devices,

    /// Manage the local attendee sheet
    #[command(subcommand)]
    Local(LocalCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                2 => crate::logging::Verbosity::Debug,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }

    /// Take the command to execute, with the interactive console as default.
    #[must_use]
    pub fn take_command(&mut self) -> Command {
        self.command.take().unwrap_or(Command::Run)
    }
}
