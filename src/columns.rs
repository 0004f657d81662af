use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::dataset::ROW_FIELDS;
use crate::domain::RosterError;

/// How a column can be filtered, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    Text,
    MultiSelect,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub accessor_key: String,
    pub header: String,
    #[serde(default)]
    pub filter_type: Option<FilterKind>,
    #[serde(default)]
    pub show_avatar: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSpec {
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Loads a column configuration and validates it against the row
    /// schema. Unlike the dataset, a broken configuration is a hard error;
    /// it is part of the deployment, not of the user's data.
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RosterError::FileNotFound,
            ErrorKind::PermissionDenied => RosterError::PermissionDenied,
            _ => RosterError::IoError(e),
        })?;
        let spec: TableSpec = serde_json::from_str(&raw)?;
        spec.validate()?;
        info!(
            "Loaded table configuration with {} columns from {}",
            spec.columns.len(),
            path.display()
        );
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), RosterError> {
        if self.columns.is_empty() {
            return Err(RosterError::InvalidConfig(
                "configuration declares no columns".to_string(),
            ));
        }
        for col in &self.columns {
            if !ROW_FIELDS.contains(&col.accessor_key.as_str()) {
                return Err(RosterError::InvalidConfig(format!(
                    "unknown accessor key \"{}\"",
                    col.accessor_key
                )));
            }
        }
        debug!("Table configuration validated");
        Ok(())
    }

    /// Columns that carry a filter, in declaration order. This is what
    /// drives the filter bar and the pipeline's criterion keys.
    pub fn filterable(&self) -> Vec<&ColumnSpec> {
        self.columns
            .iter()
            .filter(|c| c.filter_type.is_some())
            .collect()
    }

    /// The canonical roster layout, used when no configuration file is
    /// given on the command line.
    pub fn default_spec() -> Self {
        TableSpec {
            columns: vec![
                ColumnSpec {
                    accessor_key: "name".to_string(),
                    header: "Name".to_string(),
                    filter_type: Some(FilterKind::Text),
                    show_avatar: true,
                },
                ColumnSpec {
                    accessor_key: "username".to_string(),
                    header: "Username".to_string(),
                    filter_type: None,
                    show_avatar: false,
                },
                ColumnSpec {
                    accessor_key: "role".to_string(),
                    header: "Role".to_string(),
                    filter_type: Some(FilterKind::MultiSelect),
                    show_avatar: false,
                },
                ColumnSpec {
                    accessor_key: "teams".to_string(),
                    header: "Teams".to_string(),
                    filter_type: None,
                    show_avatar: false,
                },
                ColumnSpec {
                    accessor_key: "status".to_string(),
                    header: "Status".to_string(),
                    filter_type: None,
                    show_avatar: false,
                },
                ColumnSpec {
                    accessor_key: "age".to_string(),
                    header: "Age".to_string(),
                    filter_type: None,
                    show_avatar: false,
                },
            ],
        }
    }
}
