use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace};

use crate::columns::{FilterKind, TableSpec};
use crate::dataset::Dataset;
use crate::domain::{HELP_TEXT, Message, RosterConfig, RosterError};
use crate::filter::{FilterPipeline, distinct_values};
use crate::inputter::{InputResult, Inputter};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    TABLE,
    FILTER,
    SELECT,
    POPUP,
}

/// Distinct-value choices shown while a multi-select criterion is edited.
pub struct SelectState {
    pub choices: Vec<String>,
    pub curser_row: usize,
}

pub struct Model {
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    dataset: Dataset,
    spec: TableSpec,
    pipeline: FilterPipeline,
    rows: Vec<usize>, // Mapping of visible row index to dataset index.
    curser_row: usize,
    offset_row: usize,
    table_height: usize,
    active_filter: usize, // Index into pipeline.fields().
    input: Inputter,
    last_input: InputResult,
    select: SelectState,
    popup_message: String,
    status_message: String,
}

impl Model {
    pub fn init(config: &RosterConfig, dataset: Dataset, spec: TableSpec) -> Self {
        let pipeline = FilterPipeline::new(
            &spec,
            std::time::Duration::from_millis(config.debounce_ms),
        );
        let rows = pipeline.filtered_rows(&dataset);
        info!(
            "Model initialized: {} rows, {} filterable fields",
            rows.len(),
            pipeline.fields().len()
        );
        Model {
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            dataset,
            spec,
            pipeline,
            rows,
            curser_row: 0,
            offset_row: 0,
            table_height: 0,
            active_filter: 0,
            input: Inputter::default(),
            last_input: InputResult::default(),
            select: SelectState {
                choices: Vec::new(),
                curser_row: 0,
            },
            popup_message: String::new(),
            status_message: "Started roster!".to_string(),
        }
    }

    // -------------------- Accessors for the UI ---------------------- //

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn pipeline(&self) -> &FilterPipeline {
        &self.pipeline
    }

    pub fn visible_rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn curser(&self) -> (usize, usize) {
        (self.curser_row, self.offset_row)
    }

    pub fn active_filter(&self) -> usize {
        self.active_filter
    }

    pub fn cmdinput(&self) -> &InputResult {
        &self.last_input
    }

    pub fn select_state(&self) -> &SelectState {
        &self.select
    }

    pub fn popup_message(&self) -> &str {
        &self.popup_message
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::FILTER | Modus::SELECT)
    }

    // -------------------- Update loop ---------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), RosterError> {
        self.apply_pending(Instant::now());

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_selection_down(1),
                    Message::MoveUp => self.move_selection_up(1),
                    Message::MovePageUp => self.move_selection_up(self.table_height.max(1)),
                    Message::MovePageDown => self.move_selection_down(self.table_height.max(1)),
                    Message::MoveBeginning => self.move_selection_beginning(),
                    Message::MoveEnd => self.move_selection_end(),
                    Message::EditFilter => self.enter_filter_mode(),
                    Message::NextFilter => self.next_filter(),
                    Message::ClearFilters => self.clear_filters(),
                    Message::CopyRow => self.copy_row(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::FILTER => match msg {
                    Message::RawKey(key) => self.filter_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::SELECT => match msg {
                    Message::RawKey(key) => self.select_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => self.close_popup(),
                },
            }
        }

        Ok(())
    }

    /// Commits a text edit whose quiet period has elapsed and recomputes
    /// the visible rows. Split out of update() so the debounce behavior is
    /// testable with an injected clock.
    pub fn apply_pending(&mut self, now: Instant) {
        if self.pipeline.poll(now) {
            self.recompute();
        }
    }

    fn recompute(&mut self) {
        self.rows = self.pipeline.filtered_rows(&self.dataset);
        // The view may have shrunk under the cursor.
        if self.rows.is_empty() {
            self.curser_row = 0;
            self.offset_row = 0;
        } else if self.offset_row + self.curser_row >= self.rows.len() {
            self.offset_row = 0;
            self.curser_row = self.rows.len() - 1;
        }
        trace!("Recomputed view: {} visible rows", self.rows.len());
        self.set_status_message(format!(
            "{} of {} rows",
            self.rows.len(),
            self.dataset.len()
        ));
    }

    pub fn quit(&mut self) {
        // A commit firing after teardown must never mutate state.
        self.pipeline.cancel_pending();
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized to {width}x{height}");
        // Filter bar, table header and status line each take one row.
        self.table_height = height.saturating_sub(3);
        if self.curser_row >= self.table_height && self.table_height > 0 {
            self.offset_row += self.curser_row - (self.table_height - 1);
            self.curser_row = self.table_height - 1;
        }
    }

    // -------------------- Filter handling ---------------------- //

    fn active_field(&self) -> Option<(String, FilterKind)> {
        self.pipeline.fields().get(self.active_filter).cloned()
    }

    fn next_filter(&mut self) {
        let nfields = self.pipeline.fields().len();
        if nfields > 0 {
            self.active_filter = (self.active_filter + 1) % nfields;
            if let Some((key, _)) = self.active_field() {
                self.set_status_message(format!("Filter field: {key}"));
            }
        }
    }

    fn enter_filter_mode(&mut self) {
        let Some((key, kind)) = self.active_field() else {
            self.set_status_message("No filterable fields configured");
            return;
        };
        match kind {
            FilterKind::Text => {
                trace!("Entering filter mode for {key}");
                self.previous_modus = self.modus;
                self.modus = Modus::FILTER;
                self.input.clear();
                self.input.set(self.pipeline.raw_text(&key));
                self.last_input = self.input.get();
            }
            FilterKind::MultiSelect => {
                trace!("Entering selection mode for {key}");
                self.previous_modus = self.modus;
                self.modus = Modus::SELECT;
                self.select.choices = distinct_values(&self.dataset, &key);
                self.select.curser_row = 0;
            }
        }
    }

    fn filter_input(&mut self, key: KeyEvent) {
        let Some((field, _)) = self.active_field() else {
            self.modus = Modus::TABLE;
            return;
        };
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::FILTER;
        } else {
            // Mirror every edit into the raw criterion; the commit follows
            // once the input goes quiet.
            self.pipeline
                .set_text_filter(&field, self.last_input.input.clone(), Instant::now());
        }
    }

    fn select_input(&mut self, key: KeyEvent) {
        use ratatui::crossterm::event::KeyCode;
        let Some((field, _)) = self.active_field() else {
            self.modus = Modus::TABLE;
            return;
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.select.curser_row = self.select.curser_row.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.select.curser_row + 1 < self.select.choices.len() {
                    self.select.curser_row += 1;
                }
            }
            KeyCode::Char(' ') => {
                if let Some(value) = self.select.choices.get(self.select.curser_row) {
                    debug!("Toggle selection {field} = {value}");
                    self.pipeline.toggle_selection(&field, value);
                    self.recompute();
                }
            }
            KeyCode::Enter | KeyCode::Esc => {
                self.modus = self.previous_modus;
                self.previous_modus = Modus::SELECT;
            }
            _ => (),
        }
    }

    fn clear_filters(&mut self) {
        self.pipeline.clear();
        self.recompute();
        self.set_status_message("Cleared all filters");
    }

    // -------------------- Popup and clipboard ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = HELP_TEXT.to_string();
    }

    fn close_popup(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.popup_message.clear();
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace("\"", "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn selected_row_csv(&self) -> Option<String> {
        let dataset_idx = *self.rows.get(self.offset_row + self.curser_row)?;
        let row = self.dataset.rows().get(dataset_idx)?;
        let content = self
            .spec
            .columns
            .iter()
            .map(|c| Self::wrap_cell_content(&row.field(&c.accessor_key)))
            .collect::<Vec<String>>();
        Some(content.join(","))
    }

    fn copy_row(&mut self) {
        let Some(row_content) = self.selected_row_csv() else {
            self.set_status_message("No row selected");
            return;
        };
        match Clipboard::new().and_then(|mut cb| cb.set_text(row_content)) {
            Ok(_) => self.set_status_message("Copied row to clipboard"),
            Err(e) => {
                trace!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Clipboard not available");
            }
        }
    }

    // -------------------- Navigation ---------------------- //

    fn move_selection_beginning(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
    }

    fn move_selection_end(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        if self.rows.len() <= self.table_height || self.table_height == 0 {
            self.offset_row = 0;
            self.curser_row = self.rows.len() - 1;
        } else {
            self.offset_row = self.rows.len() - self.table_height;
            self.curser_row = self.table_height - 1;
        }
    }

    fn move_selection_up(&mut self, size: usize) {
        if self.curser_row > 0 {
            self.curser_row = self.curser_row.saturating_sub(size);
        } else {
            self.offset_row = self.offset_row.saturating_sub(size);
        }
    }

    fn move_selection_down(&mut self, size: usize) {
        if self.rows.is_empty() {
            return;
        }
        let last = self.rows.len() - 1;
        if self.curser_row + self.offset_row >= last {
            return;
        }
        let height = self.table_height.max(1);
        if self.curser_row + size < height {
            self.curser_row = std::cmp::min(self.curser_row + size, last - self.offset_row);
        } else {
            // At the bottom of the frame, shift the view down.
            self.offset_row = std::cmp::min(self.offset_row + size, last.saturating_sub(height - 1));
            self.curser_row = std::cmp::min(height - 1, last - self.offset_row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;
    use ratatui::crossterm::event::KeyCode;
    use std::time::Duration;

    fn sample_model() -> Model {
        let dataset = Dataset::new(vec![
            Row {
                name: "Alice Smith".into(),
                role: "Admin".into(),
                ..Row::default()
            },
            Row {
                name: "bob jones".into(),
                role: "User".into(),
                ..Row::default()
            },
            Row {
                name: "Carol Ann".into(),
                role: "Admin".into(),
                ..Row::default()
            },
        ]);
        let mut model = Model::init(
            &RosterConfig::default(),
            dataset,
            TableSpec::default_spec(),
        );
        model.update(Some(Message::Resize(80, 24))).unwrap();
        model
    }

    fn type_char(model: &mut Model, c: char) {
        model
            .update(Some(Message::RawKey(KeyEvent::from(KeyCode::Char(c)))))
            .unwrap();
    }

    #[test]
    fn starts_with_all_rows_visible() {
        let model = sample_model();
        assert_eq!(model.visible_rows(), &[0, 1, 2]);
        assert_eq!(model.status, Status::READY);
    }

    #[test]
    fn quit_sets_status_and_cancels_pending() {
        let mut model = sample_model();
        model.update(Some(Message::EditFilter)).unwrap();
        type_char(&mut model, 'a');
        assert!(model.pipeline().has_pending());
        model.update(Some(Message::Quit)).unwrap();
        // Quit is only handled in TABLE modus; leave filter mode first.
        model
            .update(Some(Message::RawKey(KeyEvent::from(KeyCode::Esc))))
            .unwrap();
        model.update(Some(Message::Quit)).unwrap();
        assert_eq!(model.status, Status::QUITTING);
        assert!(!model.pipeline().has_pending());
    }

    #[test]
    fn typed_filter_applies_after_quiet_period() {
        let mut model = sample_model();
        model.update(Some(Message::EditFilter)).unwrap();
        type_char(&mut model, 'a');
        // Raw criterion updated, nothing committed yet.
        assert_eq!(model.pipeline().raw_text("name"), "a");
        assert_eq!(model.visible_rows(), &[0, 1, 2]);

        model.apply_pending(Instant::now() + Duration::from_millis(500));
        assert_eq!(model.visible_rows(), &[0, 2]);
    }

    #[test]
    fn role_selection_applies_immediately() {
        let mut model = sample_model();
        model.update(Some(Message::NextFilter)).unwrap(); // name -> role
        model.update(Some(Message::EditFilter)).unwrap();
        assert_eq!(model.modus(), Modus::SELECT);
        assert_eq!(model.select_state().choices, vec!["Admin", "User"]);
        // Toggle "Admin".
        type_char(&mut model, ' ');
        assert_eq!(model.visible_rows(), &[0, 2]);
        model
            .update(Some(Message::RawKey(KeyEvent::from(KeyCode::Enter))))
            .unwrap();
        assert_eq!(model.modus(), Modus::TABLE);
    }

    #[test]
    fn clear_filters_restores_full_view() {
        let mut model = sample_model();
        model.update(Some(Message::NextFilter)).unwrap();
        model.update(Some(Message::EditFilter)).unwrap();
        type_char(&mut model, ' ');
        assert_eq!(model.visible_rows().len(), 2);
        model
            .update(Some(Message::RawKey(KeyEvent::from(KeyCode::Esc))))
            .unwrap();
        model.update(Some(Message::ClearFilters)).unwrap();
        assert_eq!(model.visible_rows(), &[0, 1, 2]);
    }

    #[test]
    fn cursor_is_clamped_when_view_shrinks() {
        let mut model = sample_model();
        model.update(Some(Message::MoveEnd)).unwrap();
        assert_eq!(model.curser(), (2, 0));
        model.update(Some(Message::EditFilter)).unwrap();
        type_char(&mut model, 'x');
        type_char(&mut model, 'y');
        type_char(&mut model, 'z');
        model.apply_pending(Instant::now() + Duration::from_millis(500));
        assert!(model.visible_rows().is_empty());
        assert_eq!(model.curser(), (0, 0));
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut model = sample_model();
        model.update(Some(Message::MoveUp)).unwrap();
        assert_eq!(model.curser(), (0, 0));
        for _ in 0..10 {
            model.update(Some(Message::MoveDown)).unwrap();
        }
        let (curser, offset) = model.curser();
        assert_eq!(offset + curser, 2);
        model.update(Some(Message::MoveBeginning)).unwrap();
        assert_eq!(model.curser(), (0, 0));
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut model = sample_model();
        model.update(Some(Message::Help)).unwrap();
        assert_eq!(model.modus(), Modus::POPUP);
        assert!(!model.popup_message().is_empty());
        model.update(Some(Message::Exit)).unwrap();
        assert_eq!(model.modus(), Modus::TABLE);
    }

    #[test]
    fn csv_row_escapes_quotes_and_commas() {
        assert_eq!(Model::wrap_cell_content("plain"), "plain");
        assert_eq!(Model::wrap_cell_content("a b"), "\"a b\"");
        assert_eq!(Model::wrap_cell_content("say \"hi\""), "say \"\"hi\"\"");
    }

    #[test]
    fn empty_dataset_is_not_an_error() {
        let mut model = Model::init(
            &RosterConfig::default(),
            Dataset::default(),
            TableSpec::default_spec(),
        );
        assert!(model.visible_rows().is_empty());
        model.update(Some(Message::MoveDown)).unwrap();
        model.update(Some(Message::MoveEnd)).unwrap();
        assert_eq!(model.curser(), (0, 0));
    }
}
