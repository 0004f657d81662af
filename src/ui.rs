use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row as TableRow, Table, TableState},
};

use crate::columns::ColumnSpec;
use crate::domain::RosterConfig;
use crate::model::{Model, Modus};

pub const FILTERBAR_HEIGHT: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const MAX_COLUMN_WIDTH: usize = 28;

pub struct TableUI {
    _config: RosterConfig,
}

impl TableUI {
    pub fn new(config: &RosterConfig) -> Self {
        Self {
            _config: config.clone(),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let [filterbar, table, statusline] = Layout::vertical([
            Constraint::Length(FILTERBAR_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(frame.area());

        self.draw_filterbar(model, frame, filterbar);
        self.draw_table(model, frame, table);
        self.draw_statusline(model, frame, statusline);

        match model.modus() {
            Modus::SELECT => self.draw_select_popup(model, frame),
            Modus::POPUP => self.draw_popup(model, frame),
            _ => {}
        }
    }

    fn draw_filterbar(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let mut spans: Vec<Span> = Vec::new();
        for (idx, (key, kind)) in model.pipeline().fields().iter().enumerate() {
            let active = idx == model.active_filter();
            let value = if active && model.modus() == Modus::FILTER {
                model.cmdinput().input.clone()
            } else {
                model.pipeline().describe(key, *kind)
            };
            let label = format!(" {key}:[{value}] ");
            if active {
                spans.push(label.bold().fg(Color::Yellow));
            } else {
                spans.push(label.into());
            }
        }
        if spans.is_empty() {
            spans.push(" no filterable fields ".dim());
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_table(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let columns = &model.spec().columns;
        let widths: Vec<Constraint> = columns
            .iter()
            .map(|c| Constraint::Length(Self::column_width(model, c) as u16))
            .collect();

        let header = TableRow::new(
            columns
                .iter()
                .map(|c| Cell::from(c.header.clone()).style(Style::new().bold())),
        );

        let (curser_row, offset_row) = model.curser();
        let height = area.height.saturating_sub(1) as usize;
        let visible = model.visible_rows();
        let rend = std::cmp::min(offset_row + height, visible.len());
        let rows = visible[offset_row.min(visible.len())..rend].iter().map(|&idx| {
            let row = &model.dataset().rows()[idx];
            TableRow::new(columns.iter().map(|c| {
                let mut value = row.field(&c.accessor_key);
                if c.show_avatar {
                    value = format!("({}) {}", Self::initials(&value), value);
                }
                Cell::from(value)
            }))
        });

        let table = Table::new(rows, widths)
            .header(header)
            .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default();
        if !visible.is_empty() {
            state.select(Some(curser_row));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_statusline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let hint = match model.modus() {
            Modus::FILTER => "type to filter, Enter/Esc to leave",
            Modus::SELECT => "Space toggles, Enter/Esc to leave",
            Modus::POPUP => "any key to close",
            Modus::TABLE => "? for help",
        };
        let line = Line::from(vec![
            model.status_message().to_string().into(),
            "  ".into(),
            hint.dim(),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_select_popup(&self, model: &Model, frame: &mut Frame) {
        let select = model.select_state();
        let (key, _) = &model.pipeline().fields()[model.active_filter()];
        let selection = model.pipeline().selection(key);

        let lines: Vec<Line> = select
            .choices
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                let checked = selection.is_some_and(|s| s.contains(value));
                let mark = if checked { "[x] " } else { "[ ] " };
                let line = Line::from(format!("{mark}{value}"));
                if idx == select.curser_row {
                    line.style(Style::new().add_modifier(Modifier::REVERSED))
                } else {
                    line
                }
            })
            .collect();

        let area = Self::centered_rect(frame.area(), 40, lines.len() as u16 + 2);
        let block = Block::bordered()
            .title(Line::from(format!(" Filter by {key} ").bold()).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_popup(&self, model: &Model, frame: &mut Frame) {
        let text = model.popup_message();
        let height = text.lines().count() as u16 + 2;
        let area = Self::centered_rect(frame.area(), 50, height);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(text.to_string()).block(block), area);
    }

    fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width);
        let height = height.min(area.height);
        Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        }
    }

    fn column_width(model: &Model, col: &ColumnSpec) -> usize {
        let mut width = col.header.len();
        for row in model.dataset().rows() {
            let mut len = row.field(&col.accessor_key).len();
            if col.show_avatar {
                len += 5; // "(XX) " prefix
            }
            width = std::cmp::max(width, len);
        }
        std::cmp::min(width, MAX_COLUMN_WIDTH)
    }

    fn initials(name: &str) -> String {
        name.split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase()
    }
}
