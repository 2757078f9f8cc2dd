use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ratatui::crossterm::event::KeyEvent;
use rayon::prelude::*;
use tracing::{debug, error, info, trace, warn};

use crate::domain::{CMDMode, HELP_TEXT, Message, TVConfig, XTVError};
use crate::filter::{FilterMode, FilterState};
use crate::importer::{ImportOutcome, Importer};
use crate::inputter::{InputResult, Inputter};
use crate::record::{Record, schema, seed_dataset};
use crate::ui::{CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, SEARCHBAR_HEIGHT, TABLE_HEADER_HEIGHT};
use crate::workbook;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    LOADING,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// A header column, derived from the first record of the dataset.
struct Column {
    name: String,
    max_width: usize,
    render_width: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub filter: String,
    pub width: usize,
    pub data: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize, // Rows in the filtered view
    pub total_rows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub search_term: String,
    pub filter_mode: FilterMode,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub cmd_column: Option<String>,
    pub active_cmdinput: bool,
    pub pending_imports: usize,
    pub status_message: String,
    pub status_is_error: bool,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            nrows: 0,
            total_rows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            search_term: String::new(),
            filter_mode: FilterMode::Unfiltered,
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            cmd_column: None,
            active_cmdinput: false,
            pending_imports: 0,
            status_message: String::new(),
            status_is_error: false,
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_height = ui_height
            .saturating_sub(SEARCHBAR_HEIGHT + CMDLINE_HEIGH + TABLE_HEADER_HEIGHT)
            .max(1);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.max(1),
            table_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Owns the dataset, the filtered view and both search inputs.
pub struct Model {
    config: TVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    name: String,
    data: Vec<Record>,
    columns: Vec<Column>,
    rows: Arc<Vec<usize>>, // Filtered view as indices into data, always in data order
    filters: FilterState,
    visible_columns: Vec<usize>,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    uilayout: UILayout,
    uidata: UIData,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    cmd_column: Option<String>,
    last_input: InputResult,
    active_cmdinput: bool,
    importer: Importer,
    status_message: String,
    status_is_error: bool,
}

impl Model {
    pub fn init(config: &TVConfig, ui_width: usize, ui_height: usize) -> Result<Self, XTVError> {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            name: String::new(),
            data: Vec::new(),
            columns: Vec::new(),
            rows: Arc::new(Vec::new()),
            filters: FilterState::default(),
            visible_columns: Vec::new(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            input: Inputter::default(),
            cmd_mode: None,
            cmd_column: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            importer: Importer::default(),
            status_message: String::new(),
            status_is_error: false,
        };
        model.set_dataset("sample".to_string(), seed_dataset());
        model.set_status_message("Press ? for help, o to open a spreadsheet");
        Ok(model)
    }

    // -------------------------- Data and filtering -------------------------- //

    /// Replaces the dataset and resets the view to show every record.
    /// Stored search terms survive but stop being applied until edited again.
    fn set_dataset(&mut self, name: String, records: Vec<Record>) {
        let names = schema(&records);
        self.columns = names
            .into_par_iter()
            .map(|name| {
                let max_width = records
                    .iter()
                    .map(|r| r.cell_text(&name).chars().count())
                    .max()
                    .unwrap_or(0);
                Column {
                    max_width: std::cmp::max(max_width, name.chars().count()),
                    render_width: 0,
                    name,
                }
            })
            .collect();
        self.name = name;
        self.rows = Arc::new((0..records.len()).collect());
        self.data = records;
        self.filters.suspend();
        self.curser_row = 0;
        self.curser_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
        debug!(
            "Dataset \"{}\" has {} records and {} columns",
            self.name,
            self.data.len(),
            self.columns.len()
        );
        self.update_table_data();
    }

    #[cfg(test)]
    pub fn dataset(&self) -> &[Record] {
        &self.data
    }

    pub fn filtered_records(&self) -> Vec<&Record> {
        self.rows.iter().map(|&idx| &self.data[idx]).collect()
    }

    #[cfg(test)]
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn global_search(&mut self, term: &str) {
        self.filters.set_global(term);
        self.refresh_view();
    }

    pub fn column_search(&mut self, field: &str, term: &str) {
        self.filters.set_column(field, term);
        self.refresh_view();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.refresh_view();
        self.set_status_message("Filters cleared");
    }

    fn refresh_view(&mut self) {
        let start_time = Instant::now();
        self.rows = Arc::new(self.filters.apply(&self.data));
        trace!(
            "Recomputed view in {}ms",
            start_time.elapsed().as_millis()
        );
        self.move_table_selection_beginning();
        self.set_status_message(format!(
            "Showing {} of {} rows",
            self.rows.len(),
            self.data.len()
        ));
        self.update_table_data();
    }

    // ---------------------------- Import / Export --------------------------- //

    /// Starts a background import. An empty path means nothing was selected.
    pub fn import(&mut self, path: PathBuf) {
        if path.as_os_str().is_empty() {
            trace!("No file selected, nothing to import");
            return;
        }
        self.importer.start(path.clone());
        self.status = Status::LOADING;
        self.set_status_message(format!("Loading {} ...", path.display()));
    }

    fn open_path(&mut self, input: &str) {
        let input = input.trim();
        if input.is_empty() {
            trace!("Open prompt left empty");
            return;
        }
        match shellexpand::full(input) {
            Ok(expanded) => self.import(PathBuf::from(expanded.as_ref())),
            Err(e) => self.set_error_message(format!("Invalid path {input}: {e}")),
        }
    }

    pub fn poll_imports(&mut self) {
        for outcome in self.importer.poll() {
            self.apply_import(outcome);
        }
    }

    /// Applies a finished import. Completions are taken in arrival order, so an
    /// older import finishing late still replaces the data.
    pub fn apply_import(&mut self, outcome: ImportOutcome) {
        let latest = self.importer.latest_ticket();
        if outcome.ticket < latest {
            warn!(
                "Import #{} of {} finished after newer import #{latest}",
                outcome.ticket,
                outcome.path.display()
            );
        }
        match outcome.result {
            Ok(records) => {
                let name = outcome
                    .path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("???")
                    .to_string();
                info!("Imported {} records from {}", records.len(), outcome.path.display());
                let nrecords = records.len();
                self.set_dataset(name, records);
                self.set_status_message(format!(
                    "Loaded {nrecords} rows from {}",
                    outcome.path.display()
                ));
            }
            Err(e) => {
                error!("Import of {} failed: {e}", outcome.path.display());
                self.set_error_message(format!(
                    "Could not import {}: {e}",
                    outcome.path.display()
                ));
            }
        }
        if self.importer.in_flight() == 0 && self.status == Status::LOADING {
            self.status = Status::READY;
        }
    }

    /// Writes the filtered view to the configured export file.
    pub fn export(&self) -> Result<PathBuf, XTVError> {
        let path = self.config.export_path();
        let records = self.filtered_records();
        workbook::save_records(&records, &path)?;
        info!("Exported {} rows to {}", records.len(), path.display());
        Ok(path)
    }

    fn export_table(&mut self) {
        match self.export() {
            Ok(path) => self.set_status_message(format!(
                "Exported {} rows to {}",
                self.rows.len(),
                path.display()
            )),
            Err(e) => {
                error!("Export failed: {e}");
                self.set_error_message(format!("Export failed: {e}"));
            }
        }
    }

    // ------------------------------- UI data -------------------------------- //

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_is_error = false;
        self.uidata.status_message = self.status_message.clone();
        self.uidata.status_is_error = false;
    }

    fn set_error_message(&mut self, message: impl Into<String>) {
        self.set_status_message(message);
        self.status_is_error = true;
        self.uidata.status_is_error = true;
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return String::new();
        }
        if name.chars().count() > width {
            let mut reduced: String = name.chars().take(width - 3).collect();
            reduced.push_str("...");
            reduced
        } else {
            name.to_string()
        }
    }

    fn get_visible_cell(text: String, width: usize) -> String {
        let text = text.replace("\r\n", " ↵ ").replace('\n', " ↵ ");
        if text.chars().count() > width {
            text.chars().take(width).collect()
        } else {
            text
        }
    }

    fn update_table_data(&mut self) {
        let table_width = self.uilayout.table_width;
        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, self.rows.len());

        // Create a list of columns that fit in the table, starting at the column offset
        self.visible_columns.clear();
        let mut visible_width = 0;
        for (cidx, column) in self.columns.iter_mut().enumerate().skip(self.offset_column) {
            let width = std::cmp::min(
                column.max_width + COLUMN_WIDTH_MARGIN,
                self.config.max_column_width,
            );
            if visible_width + width + 1 <= table_width {
                column.render_width = width;
                visible_width += width + 1;
                self.visible_columns.push(cidx);
            } else {
                // Add the last partial visible column
                if visible_width < table_width {
                    column.render_width = table_width - visible_width;
                    self.visible_columns.push(cidx);
                }
                break;
            }
        }
        self.curser_column = std::cmp::min(
            self.curser_column,
            self.visible_columns.len().saturating_sub(1),
        );

        let table: Vec<ColumnView> = self
            .visible_columns
            .iter()
            .map(|&idx| {
                let column = &self.columns[idx];
                let data = self.rows[rbegin..rend]
                    .iter()
                    .map(|&ridx| {
                        Self::get_visible_cell(
                            self.data[ridx].cell_text(&column.name),
                            column.render_width,
                        )
                    })
                    .collect();
                ColumnView {
                    name: Self::get_visible_name(&column.name, column.render_width),
                    filter: self.filters.column_term(&column.name).to_string(),
                    width: column.render_width,
                    data,
                }
            })
            .collect();

        self.uidata = UIData {
            name: self.name.clone(),
            table,
            nrows: self.rows.len(),
            total_rows: self.data.len(),
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            abs_selected_row: self.offset_row + self.curser_row,
            search_term: self.filters.search_term().to_string(),
            filter_mode: self.filters.mode(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.uidata.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            cmd_column: self.cmd_column.clone(),
            active_cmdinput: self.active_cmdinput,
            pending_imports: self.importer.in_flight(),
            status_message: self.status_message.clone(),
            status_is_error: self.status_is_error,
        };
    }

    fn current_column_name(&self) -> Option<String> {
        self.visible_columns
            .get(self.curser_column)
            .map(|&idx| self.columns[idx].name.clone())
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        let abs_row = self.offset_row + self.curser_row;
        self.select_row(abs_row);
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), XTVError> {
        self.poll_imports();

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_table_selection_down(1),
                    Message::MoveUp => self.move_table_selection_up(1),
                    Message::MoveLeft => self.move_table_selection_left(),
                    Message::MoveRight => self.move_table_selection_right(),
                    Message::MovePageUp => {
                        self.move_table_selection_up(self.uilayout.table_height)
                    }
                    Message::MovePageDown => {
                        self.move_table_selection_down(self.uilayout.table_height)
                    }
                    Message::MoveBeginning => self.move_table_selection_beginning(),
                    Message::MoveEnd => self.move_table_selection_end(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Help => self.show_help(),
                    Message::Search => self.enter_cmd_mode(CMDMode::SearchTable),
                    Message::SearchInColumn => self.enter_cmd_mode(CMDMode::SearchInColumn),
                    Message::Open => self.enter_cmd_mode(CMDMode::OpenFile),
                    Message::ClearFilters => self.clear_filters(),
                    Message::Export => self.export_table(),
                    Message::Exit | Message::RawKey(_) => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }

        self.update_table_data();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        if self.modus == Modus::POPUP {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
            self.uidata.show_popup = false;
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        let prefill = match mode {
            CMDMode::SearchTable => self.filters.search_term().to_string(),
            CMDMode::SearchInColumn => match self.current_column_name() {
                Some(name) => {
                    let term = self.filters.column_term(&name).to_string();
                    self.cmd_column = Some(name);
                    term
                }
                None => {
                    self.set_status_message("No columns to search in");
                    return;
                }
            },
            CMDMode::OpenFile => String::new(),
        };
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.set(&prefill);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        if self.last_input.changed {
            self.apply_live_input();
        }
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    // Search prompts filter on every keystroke
    fn apply_live_input(&mut self) {
        let term = self.last_input.input.clone();
        match self.cmd_mode {
            Some(CMDMode::SearchTable) => self.global_search(&term),
            Some(CMDMode::SearchInColumn) => {
                if let Some(field) = self.cmd_column.clone() {
                    self.column_search(&field, &term);
                }
            }
            Some(CMDMode::OpenFile) | None => {}
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        if self.cmd_mode == Some(CMDMode::OpenFile) && !self.last_input.canceled {
            let path = self.last_input.input.clone();
            self.open_path(&path);
        }
        self.cmd_mode = None;
        self.cmd_column = None;
        self.input.clear();
    }

    fn select_row(&mut self, row: usize) {
        if self.rows.is_empty() {
            self.curser_row = 0;
            self.offset_row = 0;
            return;
        }
        let height = self.uilayout.table_height;
        let row = std::cmp::min(row, self.rows.len() - 1);
        if row < self.offset_row {
            self.offset_row = row;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
        }
        self.curser_row = row - self.offset_row;
    }

    fn move_table_selection_beginning(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
    }

    fn move_table_selection_end(&mut self) {
        self.select_row(self.rows.len().saturating_sub(1));
    }

    fn move_table_selection_up(&mut self, size: usize) {
        let row = (self.offset_row + self.curser_row).saturating_sub(size);
        self.select_row(row);
    }

    fn move_table_selection_down(&mut self, size: usize) {
        self.select_row(self.offset_row + self.curser_row + size);
    }

    fn move_table_selection_left(&mut self) {
        if self.curser_column > 0 {
            self.curser_column -= 1;
        } else if self.offset_column > 0 {
            self.offset_column -= 1;
        }
    }

    fn move_table_selection_right(&mut self) {
        if self.offset_column + self.curser_column + 1 < self.columns.len() {
            if self.curser_column + 1 < self.visible_columns.len() {
                self.curser_column += 1;
            } else {
                // At the end of the screen
                self.offset_column += 1;
            }
        }
    }
}
