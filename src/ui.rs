use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use crate::domain::{CMDMode, TVConfig};
use crate::filter::FilterMode;
use crate::model::{Model, UIData};

pub const SEARCHBAR_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 2;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

#[derive(Debug)]
pub struct TableUI {
    selected_row_style: Style,
    selected_cell_style: Style,
    active_filter_style: Style,
}

impl TableUI {
    pub fn new(_cfg: &TVConfig) -> Self {
        Self {
            selected_row_style: Style::default().add_modifier(Modifier::REVERSED),
            selected_cell_style: Style::default()
                .add_modifier(Modifier::REVERSED | Modifier::BOLD)
                .fg(Color::Yellow),
            active_filter_style: Style::default().fg(Color::Yellow),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let chunks = Layout::vertical([
            Constraint::Length(SEARCHBAR_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .split(frame.area());

        self.draw_searchbar(uidata, frame, chunks[0]);
        self.draw_table(uidata, frame, chunks[1]);
        self.draw_statusline(uidata, frame, chunks[2]);
        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_searchbar(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let term_style = if uidata.filter_mode == FilterMode::Global {
            self.active_filter_style
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let mut spans = vec![
            " Search: ".bold(),
            Span::styled(uidata.search_term.clone(), term_style),
        ];
        if uidata.pending_imports > 0 {
            spans.push(format!("  loading {} file(s) ...", uidata.pending_imports).italic());
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        // No records, no header and no column filters
        if uidata.table.is_empty() {
            let empty = Paragraph::new("No data").centered().dim();
            frame.render_widget(empty, area);
            return;
        }

        let column_filter_active = uidata.filter_mode == FilterMode::Column;
        let header = Row::new(uidata.table.iter().map(|column| {
            let filter = if column.filter.is_empty() {
                Line::from("·").dim()
            } else if column_filter_active {
                Line::styled(format!("⌕ {}", column.filter), self.active_filter_style)
            } else {
                Line::from(format!("⌕ {}", column.filter)).dim()
            };
            Cell::from(Text::from(vec![Line::from(column.name.clone()).bold(), filter]))
        }))
        .height(TABLE_HEADER_HEIGHT as u16);

        let nrows = uidata.table[0].data.len();
        let rows = (0..nrows).map(|ridx| {
            let cells = uidata.table.iter().enumerate().map(|(cidx, column)| {
                let cell = Cell::from(column.data[ridx].clone());
                if ridx == uidata.selected_row && cidx == uidata.selected_column {
                    cell.style(self.selected_cell_style)
                } else {
                    cell
                }
            });
            let row = Row::new(cells);
            if ridx == uidata.selected_row {
                row.style(self.selected_row_style)
            } else {
                row
            }
        });

        let widths = uidata
            .table
            .iter()
            .map(|column| Constraint::Length(column.width as u16));

        let table = Table::new(rows, widths).header(header).column_spacing(1);
        frame.render_widget(table, area);
    }

    fn draw_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match (uidata.cmd_mode, &uidata.cmd_column) {
                (Some(CMDMode::SearchTable), _) => "/".to_string(),
                (Some(CMDMode::SearchInColumn), Some(column)) => format!("{column}: "),
                (Some(CMDMode::OpenFile), _) => "Open: ".to_string(),
                _ => ":".to_string(),
            };
            let prompt_width = prompt.chars().count();
            let line = Line::from(vec![prompt.bold(), uidata.cmdinput.input.clone().into()]);
            frame.render_widget(Paragraph::new(line), area);
            frame.set_cursor_position(Position::new(
                area.x + (prompt_width + uidata.cmdinput.curser_pos) as u16,
                area.y,
            ));
            return;
        }

        let position = if uidata.nrows > 0 {
            format!(
                "{} {}/{} ({} total) ",
                uidata.name,
                uidata.abs_selected_row + 1,
                uidata.nrows,
                uidata.total_rows
            )
        } else {
            format!("{} 0/0 ({} total) ", uidata.name, uidata.total_rows)
        };
        let [message_area, position_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(position.chars().count() as u16),
        ])
        .areas(area);

        let message = if uidata.status_is_error {
            Span::styled(uidata.status_message.clone(), Style::default().fg(Color::Red))
        } else {
            Span::raw(uidata.status_message.clone())
        };
        frame.render_widget(Paragraph::new(Line::from(message)), message_area);
        frame.render_widget(Paragraph::new(position.blue()), position_area);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = Self::centered_rect(60, 70, frame.area());
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(" <Esc> close ".blue()).centered())
            .border_set(border::THICK);
        let popup = Paragraph::new(uidata.popup_message.clone())
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }

    fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
        let [_, vertical, _] = Layout::vertical([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .areas(area);
        let [_, center, _] = Layout::horizontal([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .areas(vertical);
        center
    }
}
