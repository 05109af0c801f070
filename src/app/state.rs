use crate::app::pages::Page;
use crate::data::{SourceKind, Table};
use crate::enrich::limiter::{DEFAULT_INTERVAL_SECS, MIN_INTERVAL_SECS};
use crate::enrich::{EnrichmentOutcome, QuerySpec};
use crate::sheets::SpreadsheetInfo;

/// What the status line is telling the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

impl Status {
    pub fn info(text: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// The whole session, held explicitly: every user action mutates this through
/// `update` and the view re-derives nothing.
#[derive(Debug)]
pub struct State {
    pub page: Page,

    // Inputs
    pub api_key: String,
    pub source: SourceKind,
    pub csv_path: String,
    pub template: String,
    pub interval_text: String,

    // Loaded data
    pub table: Option<Table>,
    pub entity_column: Option<String>,
    pub target_column: Option<String>,

    // Remote spreadsheet session
    pub sheets: Vec<SpreadsheetInfo>,
    pub selected_sheet: Option<SpreadsheetInfo>,
    pub auth_url: Option<String>,

    // Run products
    /// Bumped on every table (re)load; a finished run only lands when its
    /// generation still matches.
    pub generation: u64,
    pub running: bool,
    pub loading: bool,
    pub outcome: Option<EnrichmentOutcome>,
    pub result_table: Option<Table>,

    pub status: Option<Status>,
}

impl State {
    /// Column names of the loaded table, if any.
    pub fn columns(&self) -> Vec<String> {
        self.table
            .as_ref()
            .map(|t| t.headers.clone())
            .unwrap_or_default()
    }

    /// The pacing interval the user asked for, floored at the allowed
    /// minimum. Unparseable input falls back to the default.
    pub fn interval_secs(&self) -> f64 {
        self.interval_text
            .trim()
            .parse::<f64>()
            .unwrap_or(DEFAULT_INTERVAL_SECS)
            .max(MIN_INTERVAL_SECS)
    }

    /// The explicit query descriptor, available once both of its inputs are.
    pub fn query_spec(&self) -> Option<QuerySpec> {
        let target = self.target_column.as_ref()?;
        if !self.template.contains("{}") {
            return None;
        }
        Some(QuerySpec::new(self.template.clone(), target.clone()))
    }

    /// Everything a run needs is in place and nothing is already in flight.
    pub fn can_run(&self) -> bool {
        !self.running
            && !self.api_key.trim().is_empty()
            && self.table.as_ref().is_some_and(|t| !t.is_empty())
            && self.entity_column.is_some()
            && self.query_spec().is_some()
    }

    /// Install a freshly loaded table and drop everything derived from the
    /// previous one.
    pub fn set_table(&mut self, table: Table) {
        self.table = Some(table);
        self.generation += 1;
        self.entity_column = None;
        self.target_column = None;
        self.outcome = None;
        self.result_table = None;
    }
}

impl Default for State {
    fn default() -> Self {
        State {
            page: Page::Dashboard,
            api_key: String::new(),
            source: SourceKind::CsvFile,
            csv_path: String::new(),
            template: String::new(),
            interval_text: format!("{DEFAULT_INTERVAL_SECS}"),
            table: None,
            entity_column: None,
            target_column: None,
            sheets: Vec::new(),
            selected_sheet: None,
            auth_url: None,
            generation: 0,
            running: false,
            loading: false,
            outcome: None,
            result_table: None,
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loaded_state() -> State {
        let mut state = State {
            api_key: "key".into(),
            template: "Find Email for {}".into(),
            ..State::default()
        };
        state.set_table(Table::new(
            vec!["Name".into(), "Email".into()],
            vec![vec!["Alice".into(), "a@x.com".into()]],
        ));
        state.entity_column = Some("Name".into());
        state.target_column = Some("Email".into());
        state
    }

    #[test]
    fn interval_parses_and_floors() {
        let mut state = State::default();
        assert_eq!(state.interval_secs(), DEFAULT_INTERVAL_SECS);

        state.interval_text = "3.5".into();
        assert_eq!(state.interval_secs(), 3.5);

        state.interval_text = "0.2".into();
        assert_eq!(state.interval_secs(), MIN_INTERVAL_SECS);

        state.interval_text = "nonsense".into();
        assert_eq!(state.interval_secs(), DEFAULT_INTERVAL_SECS);
    }

    #[test]
    fn query_spec_needs_placeholder_and_target() {
        let mut state = loaded_state();
        assert_eq!(
            state.query_spec(),
            Some(QuerySpec::new("Find Email for {}", "Email"))
        );

        state.template = "no placeholder here".into();
        assert_eq!(state.query_spec(), None);

        state.template = "Find Email for {}".into();
        state.target_column = None;
        assert_eq!(state.query_spec(), None);
    }

    #[test]
    fn can_run_gates_on_all_inputs() {
        let state = loaded_state();
        assert!(state.can_run());

        let mut no_key = loaded_state();
        no_key.api_key.clear();
        assert!(!no_key.can_run());

        let mut no_entity = loaded_state();
        no_entity.entity_column = None;
        assert!(!no_entity.can_run());

        let mut busy = loaded_state();
        busy.running = true;
        assert!(!busy.can_run());

        let mut empty_table = loaded_state();
        empty_table.set_table(Table::new(vec!["Name".into()], vec![]));
        assert!(!empty_table.can_run());
    }

    #[test]
    fn set_table_clears_derived_selections() {
        let mut state = loaded_state();
        state.set_table(Table::new(vec!["Other".into()], vec![]));
        assert_eq!(state.entity_column, None);
        assert_eq!(state.target_column, None);
        assert!(state.result_table.is_none());
    }

    #[test]
    fn every_table_load_bumps_the_generation() {
        let mut state = State::default();
        assert_eq!(state.generation, 0);
        state.set_table(Table::new(vec!["a".into()], vec![]));
        state.set_table(Table::new(vec!["b".into()], vec![]));
        assert_eq!(state.generation, 2);
    }
}
