//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Decode QR codes from these image files instead of the camera
    #[arg(short, long, value_name = "FILE", num_args = 1.., required = true)]
    pub image: Vec<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Lookup command arguments.
#[derive(Debug, Args)]
pub struct LookupCommand {
    /// Attendee identifier, as encoded in the QR code
    pub id: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Local sheet commands.
#[derive(Debug, Subcommand)]
pub enum LocalCommand {
    /// Replace the local sheet with rows from a JSON file
    ///
    /// The file holds an array of rows, each an array of cell strings. The
    /// first row is the header.
    Import {
        /// JSON file to import
        file: PathBuf,
    },

    /// Print the local sheet
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(subcommand)]
        local: LocalCommand,
    }

    #[test]
    fn test_local_import_takes_file() {
        let parsed = Harness::try_parse_from(["t", "import", "rows.json"]).unwrap();
        assert!(matches!(
            parsed.local,
            LocalCommand::Import { ref file } if file == &PathBuf::from("rows.json")
        ));
    }

    #[test]
    fn test_local_show_json_flag() {
        let parsed = Harness::try_parse_from(["t", "show", "--json"]).unwrap();
        assert!(matches!(parsed.local, LocalCommand::Show { json: true }));
    }
}
