#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use student_core::{
    ListOrder, NewStudent, SqliteStudentStore, StoreError, StoreResult, Student, StudentStore,
};

/// One call observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Insert(NewStudent),
    SelectOne(String),
    SelectAll(ListOrder),
    DeleteWhere(String),
}

/// In-memory SQLite store that records every call and can be told to fail
/// the next one.
pub struct RecordingStore {
    inner: SqliteStudentStore,
    calls: Mutex<Vec<StoreCall>>,
    next_failure: Mutex<Option<StoreError>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStudentStore::open_in_memory().unwrap(),
            calls: Mutex::new(Vec::new()),
            next_failure: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next(&self, err: StoreError) {
        *self.next_failure.lock().unwrap() = Some(err);
    }

    /// Inserts directly, bypassing the call log.
    pub async fn seed(&self, registration_no: &str, name: &str, marks: i32) -> Student {
        self.inner
            .insert(&NewStudent {
                registration_no: registration_no.to_string(),
                name: name.to_string(),
                marks,
            })
            .await
            .unwrap()
    }

    fn record(&self, call: StoreCall) -> StoreResult<()> {
        self.calls.lock().unwrap().push(call);
        match self.next_failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StudentStore for RecordingStore {
    async fn insert(&self, student: &NewStudent) -> StoreResult<Student> {
        self.record(StoreCall::Insert(student.clone()))?;
        self.inner.insert(student).await
    }

    async fn select_one(&self, registration_no: &str) -> StoreResult<Option<Student>> {
        self.record(StoreCall::SelectOne(registration_no.to_string()))?;
        self.inner.select_one(registration_no).await
    }

    async fn select_all(&self, order: ListOrder) -> StoreResult<Vec<Student>> {
        self.record(StoreCall::SelectAll(order))?;
        self.inner.select_all(order).await
    }

    async fn delete_where(&self, registration_no: &str) -> StoreResult<()> {
        self.record(StoreCall::DeleteWhere(registration_no.to_string()))?;
        self.inner.delete_where(registration_no).await
    }
}
