//! `qrcheckin` - CLI for event check-in
//!
//! Runs the interactive check-in console by default, plus a few commands for
//! checking the setup without a camera.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;

use qrcheckin::cli::{Cli, Command, ConfigCommand, LocalCommand, LookupCommand, ScanCommand};
use qrcheckin::config::SheetBackend;
use qrcheckin::console::{terminal_password_reader, ScannerFactory};
use qrcheckin::scanner::{self, ImageFileSource, QrDecoder, WebcamSource};
use qrcheckin::storage::{self, LocalSheet};
use qrcheckin::{
    init_logging, CheckIn, Config, Console, GoogleSheet, ScanHandle, Scanner, Session, Worksheet,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let command = cli.take_command();

    // These must work even when the configuration does not load
    if let Command::Config(ConfigCommand::Path) = command {
        println!("{}", Config::default_config_path().display());
        return Ok(());
    }
    if let Command::Config(ConfigCommand::Validate { file }) = command {
        let path = file
            .or_else(|| cli.config.clone())
            .unwrap_or_else(Config::default_config_path);
        println!("Validating configuration: {}", path.display());
        return match Config::load_from(Some(path)) {
            Ok(_) => {
                println!("Configuration is valid.");
                Ok(())
            }
            Err(e) => Err(e).context("configuration is invalid"),
        };
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match command {
        Command::Run => handle_run(&config).await,
        Command::Scan(cmd) => handle_scan(&cmd),
        Command::Lookup(cmd) => handle_lookup(&config, &cmd).await,
        Command::Devices => handle_devices(),
        Command::Local(cmd) => handle_local(&config, cmd).await,
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

fn open_worksheet(config: &Config) -> anyhow::Result<Arc<dyn Worksheet>> {
    let sheet: Arc<dyn Worksheet> = match config.sheet.backend {
        SheetBackend::Google => Arc::new(
            GoogleSheet::from_key_file(
                &config.sheet.credentials_path,
                config.sheet.spreadsheet_id.clone(),
                config.sheet.worksheet.clone(),
                config.request_timeout(),
            )
            .context("failed to connect to Google Sheets")?,
        ),
        SheetBackend::Local => Arc::new(
            LocalSheet::open(config.local_sheet_path()).context("failed to open local sheet")?,
        ),
    };
    tracing::info!(sheet = %sheet.describe(), "Attendee sheet ready");
    Ok(sheet)
}

async fn handle_run(config: &Config) -> anyhow::Result<()> {
    if let Some(warning) = scanner::missing_camera_warning() {
        tracing::warn!("{warning}");
    }

    let sheet = open_worksheet(config)?;
    let checkin = CheckIn::new(
        sheet,
        config.sheet_layout(),
        config.display.timestamp_format.clone(),
    );

    let settings = config.capture_settings();
    let snapshot_dir = config.scanner.snapshot_dir.clone();
    let scanners: ScannerFactory = Arc::new(move || -> qrcheckin::Result<Scanner> {
        let source = WebcamSource::open(settings)?;
        Ok(Scanner::new(Box::new(source)).with_snapshot_dir(snapshot_dir.clone()))
    });

    let mut console = Console::new(
        Session::new(&config.operator),
        checkin,
        scanners,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    if std::io::stdin().is_terminal() {
        console = console.with_password_reader(terminal_password_reader());
    }
    console.run().await?;
    Ok(())
}

fn handle_scan(cmd: &ScanCommand) -> anyhow::Result<()> {
    let mut results = Vec::with_capacity(cmd.image.len());
    for path in &cmd.image {
        let mut source = ImageFileSource::new([path.clone()]);
        let detection = scanner::scan_for_code(&mut source, &QrDecoder, &ScanHandle::new())?;
        results.push((path, detection.map(|d| d.code)));
    }

    if cmd.json {
        let json: Vec<_> = results
            .iter()
            .map(|(path, code)| {
                serde_json::json!({
                    "path": path,
                    "payload": code.as_ref().map(|c| &c.payload),
                    "corners": code.as_ref().map(|c| c.corners),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for (path, code) in &results {
            match code {
                Some(code) => println!("{}: {}", path.display(), code.payload),
                None => println!("{}: no QR code found", path.display()),
            }
        }
    }
    Ok(())
}

async fn handle_lookup(config: &Config, cmd: &LookupCommand) -> anyhow::Result<()> {
    let sheet = open_worksheet(config)?;
    let found = qrcheckin::sheet::lookup(sheet.as_ref(), &cmd.id, &config.sheet_layout()).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }
    match found {
        Some(attendee) => {
            println!("ID:            {}", attendee.id);
            println!("Name:          {}", attendee.name);
            println!("Registration:  {}", attendee.registration);
            println!("Row:           {}", attendee.row);
            println!(
                "Entry:         {}",
                attendee.entry_time.as_deref().unwrap_or("not yet entered")
            );
        }
        None => println!("No Entry Found! 404"),
    }
    Ok(())
}

fn handle_devices() -> anyhow::Result<()> {
    let devices = qrcheckin_camera::list_devices()
        .with_context(|| format!("camera backend: {}", qrcheckin_camera::backend_name()))?;
    if devices.is_empty() {
        println!("No cameras found.");
    }
    for device in devices {
        println!("[{}] {} ({})", device.index, device.name, device.description);
    }
    Ok(())
}

async fn handle_local(config: &Config, cmd: LocalCommand) -> anyhow::Result<()> {
    let sheet = LocalSheet::open(config.local_sheet_path())?;
    match cmd {
        LocalCommand::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let rows = storage::rows_from_json(&raw)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            let cells = sheet.import_rows(&rows)?;
            println!(
                "Imported {} rows ({cells} cells) into {}",
                rows.len(),
                sheet.path().display()
            );
        }
        LocalCommand::Show { json } => {
            let values = sheet.all_values().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                let stats = sheet.stats()?;
                println!("Local sheet: {}", sheet.path().display());
                println!(
                    "Rows: {}  Columns: {}  Cells: {}",
                    stats.rows, stats.columns, stats.cells
                );
                println!();
                for (idx, row) in values.iter().enumerate() {
                    println!("{:>4}  {}", idx + 1, row.join(" | "));
                }
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                let mut shown = config.clone();
                shown.operator.password = "<redacted>".to_string();
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Operator]");
                println!("  Username:           {}", config.operator.username);
                println!();
                println!("[Sheet]");
                println!("  Backend:            {}", config.sheet.backend);
                match config.sheet.backend {
                    SheetBackend::Google => {
                        println!("  Spreadsheet:        {}", config.sheet.spreadsheet_id);
                        println!("  Worksheet:          {}", config.sheet.worksheet);
                        println!(
                            "  Credentials:        {}",
                            config.sheet.credentials_path.display()
                        );
                        println!("  Timeout (secs):     {}", config.sheet.request_timeout_secs);
                    }
                    SheetBackend::Local => {
                        println!(
                            "  Database path:      {}",
                            config.local_sheet_path().display()
                        );
                    }
                }
                println!("  ID header:          {}", config.sheet.id_header);
                println!("  Entry column:       {}", config.sheet.entry_column);
                println!();
                println!("[Scanner]");
                println!("  Camera backend:     {}", qrcheckin_camera::backend_name());
                println!("  Device index:       {}", config.scanner.device_index);
                println!(
                    "  Resolution:         {}x{} @ {} fps",
                    config.scanner.frame_width, config.scanner.frame_height, config.scanner.fps
                );
                if let Some(dir) = &config.scanner.snapshot_dir {
                    println!("  Snapshots:          {}", dir.display());
                }
                println!();
                println!("[Display]");
                println!("  Timestamp format:   {}", config.display.timestamp_format);
            }
        }
        // Handled before the configuration is loaded
        ConfigCommand::Path | ConfigCommand::Validate { .. } => {}
    }
    Ok(())
}
