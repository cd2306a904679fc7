//! Store contract shared by both screens, plus its backends.
//!
//! # Responsibility
//! - Define the four calls the screens make (`insert`, `select_one`,
//!   `select_all`, `delete_where`).
//! - Classify failures into conflict / structured store error / transport
//!   error so screens can pick the right user-facing message.
//!
//! # Invariants
//! - Every call is attempted exactly once; no backend retries.
//! - A uniqueness violation is always reported as `StoreError::Conflict`
//!   carrying [`UNIQUE_VIOLATION_CODE`], whatever the backend.
//! - Implementations are `Send + Sync` and safe to share between screens.

use crate::config::StoreConfig;
use crate::db::DbError;
use crate::model::student::{NewStudent, Student};
use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod postgrest;
pub mod sqlite;

pub use postgrest::PostgrestStore;
pub use sqlite::SqliteStudentStore;

/// Postgres `unique_violation` SQLSTATE.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of one store call.
#[derive(Debug)]
pub enum StoreError {
    /// The row would violate a uniqueness constraint.
    Conflict { code: String, message: String },
    /// The store answered with a structured error.
    Api {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
    /// The request never produced a structured answer (network, timeout,
    /// unreadable body).
    Transport(String),
    /// Local database failure.
    Db(DbError),
    /// The store returned rows that do not match the student shape.
    InvalidData(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Message supplied by the store itself, if the failure carried one.
    ///
    /// `None` means there is nothing meaningful to show beyond a generic
    /// fallback.
    pub fn store_message(&self) -> Option<String> {
        match self {
            Self::Conflict { message, .. } | Self::Api { message, .. } => Some(message.clone()),
            Self::Db(err) => Some(err.to_string()),
            Self::Transport(_) | Self::InvalidData(_) => None,
        }
    }

    /// Stable short code for log lines.
    pub fn log_code(&self) -> &'static str {
        match self {
            Self::Conflict { .. } => "conflict",
            Self::Api { .. } => "api_error",
            Self::Transport(_) => "transport_error",
            Self::Db(_) => "db_error",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict { code, message } => write!(f, "conflict ({code}): {message}"),
            Self::Api {
                status,
                code,
                message,
            } => {
                write!(f, "store error")?;
                if let Some(status) = status {
                    write!(f, " status={status}")?;
                }
                if let Some(code) = code {
                    write!(f, " code={code}")?;
                }
                write!(f, ": {message}")
            }
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid store data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Column a list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderColumn {
    CreatedAt,
}

impl OrderColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
        }
    }
}

/// Ordering requested by `select_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOrder {
    pub column: OrderColumn,
    pub descending: bool,
}

impl ListOrder {
    /// Most recently created first; the lister's only ordering.
    pub const NEWEST_FIRST: ListOrder = ListOrder {
        column: OrderColumn::CreatedAt,
        descending: true,
    };
}

/// Record store consumed by the editor and lister screens.
///
/// Every method filters on exact `registration_no` equality where a key is
/// involved.
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Creates one row and returns it as stored.
    async fn insert(&self, student: &NewStudent) -> StoreResult<Student>;

    /// Returns the row with this registration number, if any.
    async fn select_one(&self, registration_no: &str) -> StoreResult<Option<Student>>;

    /// Returns every row in the requested order.
    async fn select_all(&self, order: ListOrder) -> StoreResult<Vec<Student>>;

    /// Deletes rows with this registration number; deleting nothing is not
    /// an error.
    async fn delete_where(&self, registration_no: &str) -> StoreResult<()>;
}

/// Builds the backend described by `config`.
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn StudentStore>> {
    info!(
        "event=store_open module=store status=start backend={}",
        config.backend_name()
    );
    let store: Arc<dyn StudentStore> = match config {
        StoreConfig::Remote(remote) => Arc::new(PostgrestStore::new(remote)?),
        StoreConfig::Local { db_path } => Arc::new(SqliteStudentStore::open(db_path)?),
    };
    info!(
        "event=store_open module=store status=ok backend={}",
        config.backend_name()
    );
    Ok(store)
}
