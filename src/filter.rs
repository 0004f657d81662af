use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::columns::{FilterKind, TableSpec};
use crate::dataset::Dataset;
use crate::debounce::Debouncer;

/// A text edit waiting out its quiet period before it becomes effective.
#[derive(Debug)]
struct PendingText {
    key: String,
    value: String,
}

/// Owns the per-field filter criteria and derives the visible row set.
///
/// The criterion keys come from the column configuration, not from the row
/// type: whatever fields the configuration marks filterable get a slot
/// here. Text criteria are double-buffered — the raw value updates on
/// every keystroke, the committed value only after the debounce quiet
/// period — while selection criteria apply immediately. One debouncer
/// serves the whole pipeline; a new edit on any field supersedes the
/// pending commit of the previous one.
pub struct FilterPipeline {
    fields: Vec<(String, FilterKind)>,
    text_raw: HashMap<String, String>,
    text_committed: HashMap<String, String>,
    selections: HashMap<String, BTreeSet<String>>,
    debounce: Debouncer<PendingText>,
}

impl FilterPipeline {
    pub fn new(spec: &TableSpec, debounce_delay: Duration) -> Self {
        let mut fields = Vec::new();
        let mut text_raw = HashMap::new();
        let mut text_committed = HashMap::new();
        let mut selections = HashMap::new();
        for col in spec.filterable() {
            let kind = col.filter_type.unwrap_or(FilterKind::Text);
            fields.push((col.accessor_key.clone(), kind));
            match kind {
                FilterKind::Text => {
                    text_raw.insert(col.accessor_key.clone(), String::new());
                    text_committed.insert(col.accessor_key.clone(), String::new());
                }
                FilterKind::MultiSelect => {
                    selections.insert(col.accessor_key.clone(), BTreeSet::new());
                }
            }
        }
        FilterPipeline {
            fields,
            text_raw,
            text_committed,
            selections,
            debounce: Debouncer::new(debounce_delay),
        }
    }

    /// Filterable fields in configuration order.
    pub fn fields(&self) -> &[(String, FilterKind)] {
        &self.fields
    }

    /// Replaces the raw text criterion immediately and schedules the
    /// commit. Scheduling supersedes any pending commit, so of a typing
    /// burst only the final value ever becomes effective.
    pub fn set_text_filter(&mut self, key: &str, text: impl Into<String>, now: Instant) {
        let Some(raw) = self.text_raw.get_mut(key) else {
            trace!("Ignoring text filter for non-text field {key}");
            return;
        };
        let text = text.into();
        *raw = text.clone();
        self.debounce.schedule(PendingText { key: key.to_string(), value: text }, now);
    }

    /// Replaces a selection criterion. Applies on the next recompute, no
    /// debounce.
    pub fn set_selection_filter(&mut self, key: &str, values: BTreeSet<String>) {
        if let Some(selection) = self.selections.get_mut(key) {
            debug!("Selection filter {key} = {values:?}");
            *selection = values;
        } else {
            trace!("Ignoring selection filter for non-selection field {key}");
        }
    }

    pub fn toggle_selection(&mut self, key: &str, value: &str) {
        if let Some(selection) = self.selections.get_mut(key) {
            if !selection.remove(value) {
                selection.insert(value.to_string());
            }
        }
    }

    /// Commits a pending text edit whose quiet period has elapsed.
    /// Returns true when a commit happened and the view needs recomputing.
    pub fn poll(&mut self, now: Instant) -> bool {
        if let Some(pending) = self.debounce.poll(now) {
            debug!("Committing text filter {} = \"{}\"", pending.key, pending.value);
            self.text_committed.insert(pending.key, pending.value);
            return true;
        }
        false
    }

    /// Drops any pending commit; used on teardown and when criteria are
    /// cleared so a stale edit never resurfaces.
    pub fn cancel_pending(&mut self) {
        self.debounce.cancel();
    }

    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Resets every criterion to its permissive default, effective
    /// immediately.
    pub fn clear(&mut self) {
        self.cancel_pending();
        for value in self.text_raw.values_mut() {
            value.clear();
        }
        for value in self.text_committed.values_mut() {
            value.clear();
        }
        for selection in self.selections.values_mut() {
            selection.clear();
        }
    }

    /// The raw (possibly not yet committed) text for a field, as shown in
    /// the filter bar.
    pub fn raw_text(&self, key: &str) -> &str {
        self.text_raw.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn committed_text(&self, key: &str) -> &str {
        self.text_committed
            .get(key)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn selection(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.selections.get(key)
    }

    /// Short rendition of a field's active criterion for the filter bar.
    pub fn describe(&self, key: &str, kind: FilterKind) -> String {
        match kind {
            FilterKind::Text => self.raw_text(key).to_string(),
            FilterKind::MultiSelect => match self.selections.get(key) {
                Some(s) if !s.is_empty() => {
                    s.iter().cloned().collect::<Vec<_>>().join(",")
                }
                _ => String::new(),
            },
        }
    }

    /// Derives the visible row set: indices of rows matching every active
    /// criterion, in dataset order. Pure with respect to the committed
    /// criteria; an empty criterion matches everything.
    pub fn filtered_rows(&self, dataset: &Dataset) -> Vec<usize> {
        dataset
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                self.fields.iter().all(|(key, kind)| match kind {
                    FilterKind::Text => {
                        let needle = self.committed_text(key);
                        needle.is_empty()
                            || row
                                .field(key)
                                .to_lowercase()
                                .contains(&needle.to_lowercase())
                    }
                    FilterKind::MultiSelect => match self.selections.get(key) {
                        Some(selection) if !selection.is_empty() => {
                            selection.contains(&row.field(key))
                        }
                        _ => true,
                    },
                })
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Distinct values of a field across the dataset, in first-occurrence
/// order. Populates the choices of a multi-select filter.
pub fn distinct_values(dataset: &Dataset, key: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut values = Vec::new();
    for row in dataset.rows() {
        let value = row.field(key);
        if seen.insert(value.clone()) {
            values.push(value);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;

    const DELAY: Duration = Duration::from_millis(500);

    fn roster() -> Dataset {
        let admin = |name: &str| Row {
            name: name.to_string(),
            role: "Admin".to_string(),
            ..Row::default()
        };
        let user = |name: &str| Row {
            name: name.to_string(),
            role: "User".to_string(),
            ..Row::default()
        };
        Dataset::new(vec![
            admin("Alice Smith"),
            user("bob jones"),
            admin("Carol Ann"),
        ])
    }

    fn pipeline() -> FilterPipeline {
        FilterPipeline::new(&TableSpec::default_spec(), DELAY)
    }

    fn committed(pipeline: &mut FilterPipeline, key: &str, text: &str) {
        let t0 = Instant::now();
        pipeline.set_text_filter(key, text, t0);
        assert!(pipeline.poll(t0 + DELAY));
    }

    #[test]
    fn empty_criteria_return_everything_in_order() {
        let dataset = roster();
        let pipeline = pipeline();
        assert_eq!(pipeline.filtered_rows(&dataset), vec![0, 1, 2]);
    }

    #[test]
    fn name_filter_matches_case_insensitive_substring() {
        let dataset = roster();
        let mut pipeline = pipeline();
        committed(&mut pipeline, "name", "a");
        // "bob jones" has no "a" in it.
        assert_eq!(pipeline.filtered_rows(&dataset), vec![0, 2]);

        committed(&mut pipeline, "name", "SMITH");
        assert_eq!(pipeline.filtered_rows(&dataset), vec![0]);
    }

    #[test]
    fn role_selection_restricts_to_members() {
        let dataset = roster();
        let mut pipeline = pipeline();
        pipeline.set_selection_filter("role", BTreeSet::from(["Admin".to_string()]));
        assert_eq!(pipeline.filtered_rows(&dataset), vec![0, 2]);
    }

    #[test]
    fn empty_selection_is_no_restriction() {
        let dataset = roster();
        let mut pipeline = pipeline();
        pipeline.set_selection_filter("role", BTreeSet::new());
        assert_eq!(pipeline.filtered_rows(&dataset), vec![0, 1, 2]);
    }

    #[test]
    fn criteria_combine_conjunctively() {
        let dataset = roster();
        let mut pipeline = pipeline();
        committed(&mut pipeline, "name", "a");
        pipeline.set_selection_filter("role", BTreeSet::from(["User".to_string()]));
        assert_eq!(pipeline.filtered_rows(&dataset), Vec::<usize>::new());
    }

    #[test]
    fn no_match_yields_empty_sequence() {
        let dataset = roster();
        let mut pipeline = pipeline();
        committed(&mut pipeline, "name", "xyz");
        assert_eq!(pipeline.filtered_rows(&dataset), Vec::<usize>::new());
    }

    #[test]
    fn filtered_rows_is_idempotent() {
        let dataset = roster();
        let mut pipeline = pipeline();
        committed(&mut pipeline, "name", "a");
        assert_eq!(
            pipeline.filtered_rows(&dataset),
            pipeline.filtered_rows(&dataset)
        );
    }

    #[test]
    fn typing_burst_commits_only_the_last_value() {
        let dataset = roster();
        let mut pipeline = pipeline();
        let t0 = Instant::now();
        pipeline.set_text_filter("name", "a", t0);
        pipeline.set_text_filter("name", "ab", t0 + Duration::from_millis(100));
        pipeline.set_text_filter("name", "abc", t0 + Duration::from_millis(200));

        // Raw state tracks every edit; nothing committed yet.
        assert_eq!(pipeline.raw_text("name"), "abc");
        assert!(!pipeline.poll(t0 + Duration::from_millis(400)));
        assert_eq!(pipeline.committed_text("name"), "");
        assert_eq!(pipeline.filtered_rows(&dataset), vec![0, 1, 2]);

        // Exactly one commit, with the final value.
        assert!(pipeline.poll(t0 + Duration::from_millis(200) + DELAY));
        assert_eq!(pipeline.committed_text("name"), "abc");
        assert!(!pipeline.poll(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn canceled_edit_never_commits() {
        let mut pipeline = pipeline();
        let t0 = Instant::now();
        pipeline.set_text_filter("name", "stale", t0);
        pipeline.cancel_pending();
        assert!(!pipeline.poll(t0 + Duration::from_secs(1)));
        assert_eq!(pipeline.committed_text("name"), "");
    }

    #[test]
    fn clear_resets_all_criteria() {
        let dataset = roster();
        let mut pipeline = pipeline();
        committed(&mut pipeline, "name", "a");
        pipeline.set_selection_filter("role", BTreeSet::from(["Admin".to_string()]));
        pipeline.set_text_filter("name", "pending", Instant::now());
        pipeline.clear();
        assert!(!pipeline.has_pending());
        assert_eq!(pipeline.raw_text("name"), "");
        assert_eq!(pipeline.filtered_rows(&dataset), vec![0, 1, 2]);
    }

    #[test]
    fn missing_field_filters_as_empty_string() {
        let dataset = Dataset::new(vec![Row::default()]);
        let mut pipeline = pipeline();
        committed(&mut pipeline, "name", "a");
        assert_eq!(pipeline.filtered_rows(&dataset), Vec::<usize>::new());
    }

    #[test]
    fn filters_on_unknown_keys_are_ignored() {
        let mut pipeline = pipeline();
        pipeline.set_text_filter("salary", "1", Instant::now());
        pipeline.set_selection_filter("salary", BTreeSet::from(["x".to_string()]));
        assert!(!pipeline.has_pending());
    }

    #[test]
    fn distinct_values_keep_first_occurrence_order() {
        let dataset = roster();
        assert_eq!(distinct_values(&dataset, "role"), vec!["Admin", "User"]);
    }
}
