use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

pub const DEFAULT_EXPORT_NAME: &str = "data.xlsx";

pub const HELP_TEXT: &str = "\
xtv - spreadsheet table viewer

  q            Quit
  ←↓↑→ / hjkl  Move selection
  PgUp / PgDn  Move one page
  g / G        First / last row
  /            Search all columns
  f            Search in selected column
  c            Clear all filters
  o            Open a spreadsheet file
  e            Export visible rows
  ?            Show this help
  Esc          Close popup / clear prompt";

#[derive(Debug, Error)]
pub enum XTVError {
    #[error("IO error: {0}")]
    IoError(#[from] Error),

    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),

    #[error("Spreadsheet read error: {0}")]
    SheetRead(#[from] calamine::Error),

    #[error("Spreadsheet write error: {0}")]
    SheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Loading failed: {0}")]
    LoadingFailed(String),

    #[error("File not found")]
    FileNotFound,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Unknown file type: {0}")]
    UnknownFileType(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, Setters)]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub export_dir: PathBuf,
    pub export_name: String,
}

impl Default for TVConfig {
    fn default() -> Self {
        TVConfig {
            event_poll_time: 100,
            max_column_width: 30,
            export_dir: PathBuf::from("."),
            export_name: DEFAULT_EXPORT_NAME.to_string(),
        }
    }
}

impl TVConfig {
    pub fn export_path(&self) -> PathBuf {
        self.export_dir.join(&self.export_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    SearchTable,
    SearchInColumn,
    OpenFile,
}

#[derive(Debug, Clone)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Resize(usize, usize),
    Help,
    Search,
    SearchInColumn,
    ClearFilters,
    Open,
    Export,
    Exit,
    RawKey(KeyEvent),
}
