//! Local SQLite backend with the same contract as the hosted store.
//!
//! # Responsibility
//! - Serve the screens without network access (development, CLI `--local`,
//!   tests).
//! - Mirror the hosted table's guarantees: store-assigned `id` and
//!   `created_at`, unique `registration_no`.
//!
//! # Invariants
//! - Unique violations surface as `StoreError::Conflict` with the Postgres
//!   SQLSTATE, so screens cannot tell the backends apart.
//! - `created_at` is stored as RFC 3339 UTC text with microsecond precision,
//!   so text order equals time order; `id` breaks ties.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::student::{NewStudent, Student};
use crate::store::{
    ListOrder, OrderColumn, StoreError, StoreResult, StudentStore, UNIQUE_VIOLATION_CODE,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    registration_no,
    name,
    marks,
    created_at
FROM students";

/// SQLite-backed student store.
pub struct SqliteStudentStore {
    conn: Mutex<Connection>,
}

impl SqliteStudentStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::InvalidData("sqlite connection lock poisoned".to_string()))
    }

    fn insert_row(&self, student: &NewStudent) -> StoreResult<Student> {
        let conn = self.conn()?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        conn.execute(
            "INSERT INTO students (registration_no, name, marks, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                student.registration_no.as_str(),
                student.name.as_str(),
                student.marks,
                created_at,
            ],
        )
        .map_err(map_write_error)?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"),
            [id],
            |row| Ok(parse_student_row(row)),
        )
        .map_err(sqlite_error)?
    }

    fn find_row(&self, registration_no: &str) -> StoreResult<Option<Student>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{STUDENT_SELECT_SQL} WHERE registration_no = ?1;"),
            [registration_no],
            |row| Ok(parse_student_row(row)),
        )
        .optional()
        .map_err(sqlite_error)?
        .transpose()
    }

    fn list_rows(&self, order: ListOrder) -> StoreResult<Vec<Student>> {
        let conn = self.conn()?;
        let direction = if order.descending { "DESC" } else { "ASC" };
        let column = match order.column {
            OrderColumn::CreatedAt => "created_at",
        };
        let sql = format!("{STUDENT_SELECT_SQL} ORDER BY {column} {direction}, id {direction};");

        let mut stmt = conn.prepare(&sql).map_err(sqlite_error)?;
        let mut rows = stmt.query([]).map_err(sqlite_error)?;
        let mut students = Vec::new();
        while let Some(row) = rows.next().map_err(sqlite_error)? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn delete_rows(&self, registration_no: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM students WHERE registration_no = ?1;",
                [registration_no],
            )
            .map_err(sqlite_error)?;
        debug!("event=store_delete module=store backend=sqlite status=ok rows={deleted}");
        Ok(())
    }
}

#[async_trait]
impl StudentStore for SqliteStudentStore {
    async fn insert(&self, student: &NewStudent) -> StoreResult<Student> {
        self.insert_row(student)
    }

    async fn select_one(&self, registration_no: &str) -> StoreResult<Option<Student>> {
        self.find_row(registration_no)
    }

    async fn select_all(&self, order: ListOrder) -> StoreResult<Vec<Student>> {
        self.list_rows(order)
    }

    async fn delete_where(&self, registration_no: &str) -> StoreResult<()> {
        self.delete_rows(registration_no)
    }
}

fn parse_student_row(row: &Row<'_>) -> StoreResult<Student> {
    let created_text: String = row.get("created_at").map_err(sqlite_error)?;
    let created_at = DateTime::parse_from_rfc3339(&created_text)
        .map_err(|_| {
            StoreError::InvalidData(format!(
                "invalid timestamp `{created_text}` in students.created_at"
            ))
        })?
        .with_timezone(&Utc);

    Ok(Student {
        id: row.get("id").map_err(sqlite_error)?,
        registration_no: row.get("registration_no").map_err(sqlite_error)?,
        name: row.get("name").map_err(sqlite_error)?,
        marks: row.get("marks").map_err(sqlite_error)?,
        created_at,
    })
}

fn sqlite_error(err: rusqlite::Error) -> StoreError {
    StoreError::Db(DbError::Sqlite(err))
}

fn map_write_error(err: rusqlite::Error) -> StoreError {
    let unique_violation = matches!(
        &err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    );
    if unique_violation {
        return StoreError::Conflict {
            code: UNIQUE_VIOLATION_CODE.to_string(),
            message: "duplicate key value violates unique constraint \"students_registration_no_key\""
                .to_string(),
        };
    }
    sqlite_error(err)
}
