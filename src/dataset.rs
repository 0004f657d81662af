use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

/// One roster entry. Every field defaults when the source document omits
/// it, so a sparse record still loads and simply never matches a non-empty
/// criterion on the missing field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Row {
    pub name: String,
    pub username: String,
    pub role: String,
    pub teams: Vec<String>,
    pub status: String,
    pub age: Option<u32>,
}

/// Field keys a column configuration may reference.
pub const ROW_FIELDS: &[&str] = &["name", "username", "role", "teams", "status", "age"];

impl Row {
    /// String rendition of a field, used for filtering and display alike.
    /// Unknown keys render empty, same as an absent value.
    pub fn field(&self, key: &str) -> String {
        match key {
            "name" => self.name.clone(),
            "username" => self.username.clone(),
            "role" => self.role.clone(),
            "teams" => self.teams.join(", "),
            "status" => self.status.clone(),
            "age" => self.age.map(|a| a.to_string()).unwrap_or_default(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(default)]
    users: Vec<Row>,
}

/// The full roster, loaded once and read-only for the session.
#[derive(Debug, Default)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Dataset { rows }
    }

    /// Loads the roster from a JSON document of shape {"users": [...]}.
    /// An unreadable or malformed source degrades to the empty dataset;
    /// the UI then shows no rows instead of failing to start.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not read dataset {}: {e}", path.display());
                return Dataset::default();
            }
        };
        match Self::parse(&raw) {
            Ok(dataset) => {
                info!("Loaded {} rows from {}", dataset.len(), path.display());
                dataset
            }
            Err(e) => {
                warn!("Could not parse dataset {}: {e}", path.display());
                Dataset::default()
            }
        }
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let doc: Document = serde_json::from_str(raw)?;
        debug!("Parsed dataset with {} rows", doc.users.len());
        Ok(Dataset { rows: doc.users })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
