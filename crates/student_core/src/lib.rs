//! Core logic for the student manager app.
//! Screens, store contract and backends live here; UI shells only render
//! snapshots and forward user actions.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod screen;
pub mod store;

pub use config::{ConfigError, RemoteConfig, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::student::{FieldError, NewStudent, Student, StudentId};
pub use screen::editor::{
    DeletePrompt, EditorError, EditorSnapshot, Notice, PendingInsert, PendingKeyed, RecordEditor,
    StudentForm,
};
pub use screen::lister::{ListerError, ListerView, LoadKind, PendingLoad, RecordLister};
pub use screen::{Applied, RequestTicket};
pub use store::{
    open_store, ListOrder, OrderColumn, PostgrestStore, SqliteStudentStore, StoreError,
    StoreResult, StudentStore, UNIQUE_VIOLATION_CODE,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
