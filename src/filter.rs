use std::collections::HashMap;

use rayon::prelude::*;
use tracing::trace;

use crate::record::{Record, schema};

/// Which of the two search inputs currently decides the visible rows.
/// Editing one mode makes it authoritative; the other mode's terms are kept but not applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FilterMode {
    #[default]
    Unfiltered,
    Global,
    Column,
}

/// True if any field of the record contains the (lower-cased) term.
/// A record without fields never matches, not even the empty term.
pub fn matches_global(record: &Record, term: &str) -> bool {
    record.values().any(|v| v.search_text().contains(term))
}

/// True if every schema column with a non-empty term has a value containing it.
/// A field missing from the record only fails when its term is non-empty, terms for
/// fields outside the schema (left over from an earlier dataset) are ignored.
pub fn matches_columns(
    record: &Record,
    filters: &HashMap<String, String>,
    schema: &[String],
) -> bool {
    filters
        .iter()
        .filter(|(field, term)| !term.is_empty() && schema.contains(field))
        .all(|(field, term)| {
            record
                .get(field)
                .is_some_and(|v| v.search_text().contains(term.as_str()))
        })
}

/// Indices of the matching records, in dataset order.
pub fn filter_rows<F>(data: &[Record], predicate: F) -> Vec<usize>
where
    F: Fn(&Record) -> bool + Sync,
{
    data.par_iter()
        .enumerate()
        .filter(|(_, record)| predicate(record))
        .map(|(idx, _)| idx)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FilterState {
    search_term: String,
    column_filters: HashMap<String, String>,
    mode: FilterMode,
}

impl FilterState {
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn column_term(&self, field: &str) -> &str {
        self.column_filters
            .get(field)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn set_global(&mut self, term: &str) {
        self.search_term = term.to_lowercase();
        self.mode = FilterMode::Global;
    }

    pub fn set_column(&mut self, field: &str, term: &str) {
        self.column_filters
            .insert(field.to_string(), term.to_lowercase());
        self.mode = FilterMode::Column;
    }

    /// Stops applying any filter but keeps the stored terms.
    pub fn suspend(&mut self) {
        self.mode = FilterMode::Unfiltered;
    }

    pub fn clear(&mut self) {
        self.search_term.clear();
        self.column_filters.clear();
        self.mode = FilterMode::Unfiltered;
    }

    /// Recomputes the filtered view from the full dataset.
    pub fn apply(&self, data: &[Record]) -> Vec<usize> {
        let rows = match self.mode {
            FilterMode::Unfiltered => (0..data.len()).collect(),
            FilterMode::Global => filter_rows(data, |r| matches_global(r, &self.search_term)),
            FilterMode::Column => {
                let fields = schema(data);
                filter_rows(data, |r| matches_columns(r, &self.column_filters, &fields))
            }
        };
        trace!(
            "Filter {:?} kept {}/{} records",
            self.mode,
            rows.len(),
            data.len()
        );
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, seed_dataset};

    fn two_rows() -> Vec<Record> {
        vec![
            Record::new().with("Name", "Ali").with("City", "Tehran"),
            Record::new().with("Name", "Sara").with("City", "Isfahan"),
        ]
    }

    #[test]
    fn global_search_is_any_field_case_insensitive() {
        let data = two_rows();
        let mut state = FilterState::default();
        state.set_global("ALI");
        assert_eq!(state.apply(&data), vec![0]);
        state.set_global("a");
        assert_eq!(state.apply(&data), vec![0, 1]);
        state.set_global("isf");
        assert_eq!(state.apply(&data), vec![1]);
    }

    #[test]
    fn global_search_matches_numbers_as_text() {
        let data = seed_dataset();
        let mut state = FilterState::default();
        state.set_global("29");
        assert_eq!(state.apply(&data), vec![1]);
    }

    #[test]
    fn column_search_requires_every_column() {
        let data = two_rows();
        let mut state = FilterState::default();
        state.set_column("Name", "a");
        state.set_column("City", "isfahan");
        assert_eq!(state.apply(&data), vec![1]);

        state.set_column("Name", "ali");
        assert!(state.apply(&data).is_empty());

        state.set_column("City", "");
        state.set_column("Name", "a");
        assert_eq!(state.apply(&data), vec![0, 1]);
    }

    #[test]
    fn fields_missing_from_first_record_are_not_filterable() {
        let data = vec![
            Record::new().with("Name", "Ali"),
            Record::new().with("Name", "Sara").with("City", "Isfahan"),
        ];
        let mut state = FilterState::default();
        state.set_column("City", "");
        assert_eq!(state.apply(&data), vec![0, 1]);
        state.set_column("City", "is");
        assert_eq!(state.apply(&data), vec![0, 1]);
    }

    #[test]
    fn missing_schema_field_fails_with_term() {
        let data = vec![
            Record::new().with("Name", "Sara").with("City", "Isfahan"),
            Record::new().with("Name", "Ali"),
        ];
        let mut state = FilterState::default();
        state.set_column("City", "");
        assert_eq!(state.apply(&data), vec![0, 1]);
        state.set_column("City", "is");
        assert_eq!(state.apply(&data), vec![0]);
    }

    #[test]
    fn terms_for_unknown_fields_are_ignored() {
        let data = vec![
            Record::new().with("Product", "Tea"),
            Record::new().with("Product", "Bread"),
        ];
        let mut state = FilterState::default();
        state.set_column("City", "shiraz");
        assert_eq!(state.apply(&data), vec![0, 1]);
        state.set_column("Product", "tea");
        assert_eq!(state.apply(&data), vec![0]);
    }

    #[test]
    fn record_without_fields_never_matches_global() {
        let data = vec![Record::new(), Record::new().with("Name", "Ali")];
        let mut state = FilterState::default();
        state.set_global("");
        assert_eq!(state.apply(&data), vec![1]);
    }

    #[test]
    fn modes_override_each_other() {
        let data = two_rows();
        let mut state = FilterState::default();
        state.set_column("City", "tehran");
        assert_eq!(state.apply(&data), vec![0]);
        state.set_global("sara");
        assert_eq!(state.apply(&data), vec![1]);
        assert_eq!(state.column_term("City"), "tehran");
        assert_eq!(state.mode(), FilterMode::Global);
    }

    #[test]
    fn filtering_keeps_dataset_order() {
        let data: Vec<Record> = (0..500i64)
            .map(|i| Record::new().with("n", i).with("parity", if i % 2 == 0 { "even" } else { "odd" }))
            .collect();
        let mut state = FilterState::default();
        state.set_global("even");
        let rows = state.apply(&data);
        assert_eq!(rows.len(), 250);
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn terms_are_stored_lower_case() {
        let mut state = FilterState::default();
        state.set_global("TeHRan");
        state.set_column("City", "SHIRAZ");
        assert_eq!(state.search_term(), "tehran");
        assert_eq!(state.column_term("City"), "shiraz");
        state.clear();
        assert_eq!(state.mode(), FilterMode::Unfiltered);
        assert_eq!(state.column_term("City"), "");
    }
}
