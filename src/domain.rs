use std::io::Error;

use ratatui::crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum RosterError {
    IoError(Error),
    JsonError(serde_json::Error),
    FileNotFound,
    PermissionDenied,
    InvalidConfig(String),
}

impl From<Error> for RosterError {
    fn from(err: Error) -> Self {
        RosterError::IoError(err)
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        RosterError::JsonError(err)
    }
}

/// Runtime settings shared by the run loop, controller and model.
#[derive(Debug, Clone)]
pub struct RosterConfig {
    /// Timeout for the crossterm event poll. This is also the tick rate at
    /// which pending debounce commits are checked.
    pub event_poll_time: u64,
    /// Quiescence period for text filter input.
    pub debounce_ms: u64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        RosterConfig {
            event_poll_time: 100,
            debounce_ms: 500,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    EditFilter,
    NextFilter,
    ClearFilters,
    RawKey(KeyEvent),
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
}

pub const HELP_TEXT: &str = "roster - filterable user table

  j / Down       move down
  k / Up         move up
  PgUp / PgDn    move page
  g / Home       first row
  G / End        last row
  /              edit active filter
  Tab            next filter field
  c              clear all filters
  y              copy selected row
  ?              show this help
  Esc            close popup / leave filter
  q              quit
";
