use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

mod controller;
mod domain;
mod filter;
mod importer;
mod inputter;
mod loader;
mod logging;
mod model;
mod record;
mod ui;
mod workbook;

use controller::Controller;
use domain::{DEFAULT_EXPORT_NAME, TVConfig, XTVError};
use model::{Model, Status};
use ui::TableUI;

/// A tui based spreadsheet table viewer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Spreadsheet (.xlsx, .xlsm, .xls, .xlsb, .ods) or csv / parquet / arrow file to open
    path: Option<String>,

    /// File name used when exporting the visible rows
    #[arg(long, default_value = DEFAULT_EXPORT_NAME)]
    export_name: String,

    /// Directory exports are written to
    #[arg(long, default_value = ".")]
    export_dir: String,

    /// Log file, the terminal is used by the UI
    #[arg(long)]
    log_file: Option<String>,

    /// Upper bound for the rendered width of a column
    #[arg(long, default_value_t = 30)]
    max_column_width: usize,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn expand_path(path: &str) -> Result<PathBuf, XTVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| XTVError::InvalidPath(format!("{path}: {e}")))
}

fn main() -> ExitCode {
    let result = run();
    ratatui::restore();
    match result {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), XTVError> {
    let args = Args::parse();

    let log_file = match &args.log_file {
        Some(path) => expand_path(path)?,
        None => std::env::temp_dir().join("xtv.log"),
    };
    logging::init(&log_file)?;

    let config = TVConfig::default()
        .event_poll_time(args.poll_ms)
        .max_column_width(args.max_column_width)
        .export_dir(expand_path(&args.export_dir)?)
        .export_name(args.export_name.clone());
    info!("Starting xtv with {config:?}");

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(&config, size.width as usize, size.height as usize)?;
    if let Some(path) = &args.path {
        model.import(expand_path(path)?);
    }

    let ui = TableUI::new(&config);
    let controller = Controller::new(&config);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events, a tick without event still collects finished imports
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Bye");
    Ok(())
}
