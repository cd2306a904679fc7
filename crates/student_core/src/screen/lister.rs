//! Record lister screen: every student, newest first.
//!
//! # Responsibility
//! - Load the full record set with initial-load and pull-to-refresh
//!   semantics.
//! - Decide which of loading / failed / empty / loaded the screen shows.
//!
//! # Invariants
//! - Rows are displayed exactly in the order the store returned them.
//! - A successful load replaces the list wholesale.
//! - A refresh never blanks the current list while in flight.
//! - Only the most recent load may apply its result.

use crate::model::student::Student;
use crate::screen::editor::store_failure_message;
use crate::screen::{Applied, RequestGate, RequestTicket};
use crate::store::{ListOrder, StoreResult, StudentStore};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SCREEN: &str = "lister";

pub const EMPTY_TITLE: &str = "No Students Found";
pub const EMPTY_SUBTITLE: &str = "Add students from the Manage tab to see them here";

/// How a load was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// First load or retry; shows the full-screen loading indicator.
    Initial,
    /// Pull-to-refresh; keeps the current rows on screen.
    Refresh,
}

impl LoadKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListerError {
    Disposed,
}

impl Display for ListerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disposed => write!(f, "lister screen has been closed"),
        }
    }
}

impl Error for ListerError {}

/// Begun load: call `select_all(order)`, then
/// [`RecordLister::finish_load`] with `ticket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLoad {
    pub ticket: RequestTicket,
    pub kind: LoadKind,
    pub order: ListOrder,
}

/// What the lister renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListerView<'a> {
    /// Initial load in flight.
    Loading,
    /// Initial load failed; a retry affordance is offered.
    Failed { message: &'a str },
    /// No rows. `error` is set when a refresh failed.
    Empty {
        refreshing: bool,
        error: Option<&'a str>,
    },
    Loaded {
        students: &'a [Student],
        refreshing: bool,
        error: Option<&'a str>,
    },
}

/// State machine behind the record lister screen.
#[derive(Debug)]
pub struct RecordLister {
    students: Vec<Student>,
    loading: bool,
    refreshing: bool,
    error: Option<String>,
    failed_kind: Option<LoadKind>,
    pending_kind: Option<LoadKind>,
    loaded_once: bool,
    gate: RequestGate,
}

impl Default for RecordLister {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordLister {
    /// A freshly mounted lister shows the loading indicator until its first
    /// load settles.
    pub fn new() -> Self {
        Self {
            students: Vec::new(),
            loading: true,
            refreshing: false,
            error: None,
            failed_kind: None,
            pending_kind: None,
            loaded_once: false,
            gate: RequestGate::default(),
        }
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Header text, e.g. `1 Student` or `12 Students`.
    pub fn count_label(&self) -> String {
        match self.students.len() {
            1 => "1 Student".to_string(),
            count => format!("{count} Students"),
        }
    }

    pub fn view(&self) -> ListerView<'_> {
        if self.loading {
            return ListerView::Loading;
        }
        if let (Some(message), Some(LoadKind::Initial)) = (self.error.as_deref(), self.failed_kind)
        {
            return ListerView::Failed { message };
        }
        if self.students.is_empty() {
            return ListerView::Empty {
                refreshing: self.refreshing,
                error: self.error.as_deref(),
            };
        }
        ListerView::Loaded {
            students: &self.students,
            refreshing: self.refreshing,
            error: self.error.as_deref(),
        }
    }

    /// Starts a load, superseding any load still in flight.
    pub fn begin_load(&mut self, kind: LoadKind) -> Result<PendingLoad, ListerError> {
        if self.gate.is_disposed() {
            return Err(ListerError::Disposed);
        }

        match kind {
            LoadKind::Initial => {
                self.loading = true;
                self.refreshing = false;
            }
            LoadKind::Refresh => self.refreshing = true,
        }
        self.error = None;
        self.failed_kind = None;
        self.pending_kind = Some(kind);

        Ok(PendingLoad {
            ticket: self.gate.begin(),
            kind,
            order: ListOrder::NEWEST_FIRST,
        })
    }

    /// Re-issues the initial load after a failure.
    pub fn begin_retry(&mut self) -> Result<PendingLoad, ListerError> {
        self.begin_load(LoadKind::Initial)
    }

    /// Applies the store's answer to a load.
    pub fn finish_load(
        &mut self,
        ticket: RequestTicket,
        result: StoreResult<Vec<Student>>,
    ) -> Applied {
        if !self.gate.settle(SCREEN, ticket) {
            return Applied::Discarded;
        }
        // A refresh can supersede the first load; until something has loaded
        // its failure still needs the retry affordance.
        let kind = match self.pending_kind.take() {
            Some(LoadKind::Refresh) if self.loaded_once => LoadKind::Refresh,
            _ => LoadKind::Initial,
        };
        self.loading = false;
        self.refreshing = false;

        match result {
            Ok(students) => {
                info!(
                    "event=lister_load module=screen status=ok kind={} rows={}",
                    kind.as_str(),
                    students.len()
                );
                self.students = students;
                self.loaded_once = true;
            }
            Err(err) => {
                warn!(
                    "event=lister_load module=screen status=error kind={} error_code={}",
                    kind.as_str(),
                    err.log_code()
                );
                self.error = Some(store_failure_message(&err));
                self.failed_kind = Some(kind);
            }
        }
        Applied::Applied
    }

    pub fn dispose(&mut self) {
        self.gate.dispose();
        self.pending_kind = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.gate.is_disposed()
    }

    /// Runs a full load against `store`.
    pub async fn load<S>(&mut self, store: &S, kind: LoadKind) -> Result<Applied, ListerError>
    where
        S: StudentStore + ?Sized,
    {
        let pending = self.begin_load(kind)?;
        let result = store.select_all(pending.order).await;
        Ok(self.finish_load(pending.ticket, result))
    }

    /// Runs a retry against `store`.
    pub async fn retry<S>(&mut self, store: &S) -> Result<Applied, ListerError>
    where
        S: StudentStore + ?Sized,
    {
        self.load(store, LoadKind::Initial).await
    }
}

#[cfg(test)]
mod tests {
    use super::{ListerView, LoadKind, RecordLister};
    use crate::model::student::Student;
    use crate::screen::Applied;
    use crate::store::StoreError;
    use chrono::{TimeZone, Utc};

    fn student(id: i64) -> Student {
        Student {
            id,
            registration_no: format!("REG{id:03}"),
            name: format!("Student {id}"),
            marks: 50,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn new_lister_starts_in_loading_view() {
        let lister = RecordLister::new();
        assert_eq!(lister.view(), ListerView::Loading);
    }

    #[test]
    fn refresh_keeps_rows_visible_while_in_flight() {
        let mut lister = RecordLister::new();
        let first = lister.begin_load(LoadKind::Initial).unwrap();
        lister.finish_load(first.ticket, Ok(vec![student(2), student(1)]));

        lister.begin_load(LoadKind::Refresh).unwrap();
        match lister.view() {
            ListerView::Loaded {
                students,
                refreshing,
                ..
            } => {
                assert_eq!(students.len(), 2);
                assert!(refreshing);
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn refresh_failure_keeps_rows_and_shows_error_inline() {
        let mut lister = RecordLister::new();
        let first = lister.begin_load(LoadKind::Initial).unwrap();
        lister.finish_load(first.ticket, Ok(vec![student(1)]));

        let refresh = lister.begin_load(LoadKind::Refresh).unwrap();
        lister.finish_load(
            refresh.ticket,
            Err(StoreError::Transport("offline".to_string())),
        );

        assert_eq!(
            lister.view(),
            ListerView::Loaded {
                students: &[student(1)],
                refreshing: false,
                error: Some("An unexpected error occurred"),
            }
        );
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut lister = RecordLister::new();
        let stale = lister.begin_load(LoadKind::Initial).unwrap();
        let fresh = lister.begin_load(LoadKind::Refresh).unwrap();

        assert_eq!(lister.finish_load(fresh.ticket, Ok(vec![student(3)])), Applied::Applied);
        assert_eq!(
            lister.finish_load(stale.ticket, Ok(Vec::new())),
            Applied::Discarded
        );
        assert_eq!(lister.students().len(), 1);
    }

    #[test]
    fn refresh_failing_before_first_load_offers_retry() {
        let mut lister = RecordLister::new();
        let first = lister.begin_load(LoadKind::Initial).unwrap();
        let refresh = lister.begin_load(LoadKind::Refresh).unwrap();

        lister.finish_load(
            refresh.ticket,
            Err(StoreError::Transport("offline".to_string())),
        );
        assert_eq!(
            lister.view(),
            ListerView::Failed {
                message: "An unexpected error occurred"
            }
        );
        assert_eq!(
            lister.finish_load(first.ticket, Ok(vec![student(1)])),
            Applied::Discarded
        );

        let retry = lister.begin_retry().unwrap();
        lister.finish_load(retry.ticket, Ok(Vec::new()));
        let refresh = lister.begin_load(LoadKind::Refresh).unwrap();
        lister.finish_load(
            refresh.ticket,
            Err(StoreError::Transport("offline".to_string())),
        );
        assert_eq!(
            lister.view(),
            ListerView::Empty {
                refreshing: false,
                error: Some("An unexpected error occurred"),
            }
        );
    }

    #[test]
    fn count_label_uses_singular_for_one() {
        let mut lister = RecordLister::new();
        assert_eq!(lister.count_label(), "0 Students");
        let pending = lister.begin_load(LoadKind::Initial).unwrap();
        lister.finish_load(pending.ticket, Ok(vec![student(1)]));
        assert_eq!(lister.count_label(), "1 Student");
    }
}
