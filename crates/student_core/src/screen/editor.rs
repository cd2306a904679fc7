//! Record editor screen: insert, view, delete and clear one student.
//!
//! # Responsibility
//! - Own the three raw form fields and the editor's UI state.
//! - Validate input locally before any store call.
//! - Map store outcomes to the messages the screen shows.
//!
//! # Invariants
//! - Validation failures never reach the store.
//! - Delete needs an explicit confirmation step; requesting it alone issues
//!   no store call.
//! - While an action is in flight every other action is rejected as busy.
//! - View of a missing record is a notice, not an error.

use crate::model::student::{require_registration_no, FieldError, NewStudent, Student};
use crate::screen::{Applied, RequestGate, RequestTicket};
use crate::store::{StoreError, StoreResult, StudentStore};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const CONFLICT_MESSAGE: &str = "A student with this registration number already exists";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";
pub const NOT_FOUND_MESSAGE: &str = "No student found with this registration number";
pub const INSERTED_MESSAGE: &str = "Student record inserted successfully";
pub const DELETED_MESSAGE: &str = "Student record deleted successfully";

const SCREEN: &str = "editor";

/// Raw text of the three form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentForm {
    pub registration_no: String,
    pub name: String,
    pub marks: String,
}

/// Non-error message shown by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Confirmation after a completed insert or delete.
    Success(String),
    /// Informational result, e.g. a lookup that matched nothing.
    Info(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) | Self::Info(message) => message,
        }
    }
}

/// Two-choice confirmation shown before a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub title: &'static str,
    pub message: &'static str,
    pub cancel_label: &'static str,
    pub confirm_label: &'static str,
    /// Registration number the delete will target.
    pub registration_no: String,
}

impl DeletePrompt {
    fn for_registration(registration_no: String) -> Self {
        Self {
            title: "Confirm Delete",
            message: "Are you sure you want to delete this student record?",
            cancel_label: "Cancel",
            confirm_label: "Delete",
            registration_no,
        }
    }
}

/// Store-backed editor action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    Insert,
    View,
    Delete,
}

impl EditorAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::View => "view",
            Self::Delete => "delete",
        }
    }
}

/// Why an editor action did not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// Another action is still in flight.
    Busy,
    /// The screen has been disposed.
    Disposed,
    /// Form input failed local validation; the message is now shown.
    Validation(FieldError),
    /// Confirmation was given without a pending delete prompt.
    NoPendingDelete,
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "another action is in progress"),
            Self::Disposed => write!(f, "editor screen has been closed"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NoPendingDelete => write!(f, "no delete is awaiting confirmation"),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FieldError> for EditorError {
    fn from(value: FieldError) -> Self {
        Self::Validation(value)
    }
}

/// Begun insert: send `student` to the store, then call
/// [`RecordEditor::finish_insert`] with `ticket`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInsert {
    pub ticket: RequestTicket,
    pub student: NewStudent,
}

/// Begun lookup or delete, keyed by registration number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingKeyed {
    pub ticket: RequestTicket,
    pub registration_no: String,
}

/// Point-in-time copy of everything the editor renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSnapshot {
    pub form: StudentForm,
    pub loading: bool,
    pub error: Option<String>,
    pub notice: Option<Notice>,
    pub viewed_student: Option<Student>,
    pub delete_prompt: Option<DeletePrompt>,
}

/// State machine behind the record editor screen.
#[derive(Debug, Default)]
pub struct RecordEditor {
    form: StudentForm,
    action: Option<EditorAction>,
    error: Option<String>,
    notice: Option<Notice>,
    viewed_student: Option<Student>,
    delete_prompt: Option<DeletePrompt>,
    gate: RequestGate,
}

impl RecordEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &StudentForm {
        &self.form
    }

    /// `true` while a store call is outstanding; all actions are disabled.
    pub fn is_loading(&self) -> bool {
        self.gate.is_busy()
    }

    /// Action currently in flight, if any.
    pub fn action_in_flight(&self) -> Option<EditorAction> {
        self.action.filter(|_| self.gate.is_busy())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn viewed_student(&self) -> Option<&Student> {
        self.viewed_student.as_ref()
    }

    pub fn delete_prompt(&self) -> Option<&DeletePrompt> {
        self.delete_prompt.as_ref()
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            form: self.form.clone(),
            loading: self.is_loading(),
            error: self.error.clone(),
            notice: self.notice.clone(),
            viewed_student: self.viewed_student.clone(),
            delete_prompt: self.delete_prompt.clone(),
        }
    }

    /// Edits the registration field. A pending delete prompt targeting a
    /// different number is withdrawn.
    pub fn set_registration_no(&mut self, value: impl Into<String>) {
        self.form.registration_no = value.into();
        let still_matches = self
            .delete_prompt
            .as_ref()
            .is_some_and(|prompt| prompt.registration_no == self.form.registration_no.trim());
        if !still_matches {
            self.delete_prompt = None;
        }
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.form.name = value.into();
    }

    pub fn set_marks(&mut self, value: impl Into<String>) {
        self.form.marks = value.into();
    }

    /// Validates the form and starts an insert.
    pub fn begin_insert(&mut self) -> Result<PendingInsert, EditorError> {
        self.ensure_idle()?;
        let student = NewStudent::from_form(
            &self.form.registration_no,
            &self.form.name,
            &self.form.marks,
        )
        .map_err(|err| self.reject(err))?;

        self.error = None;
        self.notice = None;
        let ticket = self.start(EditorAction::Insert);
        Ok(PendingInsert { ticket, student })
    }

    /// Applies the store's answer to an insert.
    pub fn finish_insert(&mut self, ticket: RequestTicket, result: StoreResult<Student>) -> Applied {
        if !self.settle(ticket) {
            return Applied::Discarded;
        }
        match result {
            Ok(student) => {
                info!(
                    "event=editor_insert module=screen status=ok student_id={}",
                    student.id
                );
                self.reset_form();
                self.notice = Some(Notice::Success(INSERTED_MESSAGE.to_string()));
            }
            Err(err) => {
                self.error = Some(insert_failure_message(&err));
                log_failure(EditorAction::Insert, &err);
            }
        }
        Applied::Applied
    }

    /// Starts a lookup of the registration number in the form.
    pub fn begin_view(&mut self) -> Result<PendingKeyed, EditorError> {
        self.ensure_idle()?;
        let registration_no =
            require_registration_no(&self.form.registration_no).map_err(|err| self.reject(err))?;

        self.error = None;
        self.notice = None;
        self.viewed_student = None;
        let ticket = self.start(EditorAction::View);
        Ok(PendingKeyed {
            ticket,
            registration_no,
        })
    }

    /// Applies the store's answer to a lookup.
    pub fn finish_view(
        &mut self,
        ticket: RequestTicket,
        result: StoreResult<Option<Student>>,
    ) -> Applied {
        if !self.settle(ticket) {
            return Applied::Discarded;
        }
        match result {
            Ok(Some(student)) => self.viewed_student = Some(student),
            Ok(None) => self.notice = Some(Notice::Info(NOT_FOUND_MESSAGE.to_string())),
            Err(err) => {
                self.error = Some(store_failure_message(&err));
                log_failure(EditorAction::View, &err);
            }
        }
        Applied::Applied
    }

    /// Asks for delete confirmation. No store call is made.
    pub fn request_delete(&mut self) -> Result<DeletePrompt, EditorError> {
        self.ensure_idle()?;
        let registration_no =
            require_registration_no(&self.form.registration_no).map_err(|err| self.reject(err))?;

        let prompt = DeletePrompt::for_registration(registration_no);
        self.delete_prompt = Some(prompt.clone());
        Ok(prompt)
    }

    /// Dismisses the delete prompt. Returns whether one was showing.
    pub fn cancel_delete(&mut self) -> bool {
        self.delete_prompt.take().is_some()
    }

    /// Confirms the pending delete prompt and starts the delete.
    pub fn begin_confirmed_delete(&mut self) -> Result<PendingKeyed, EditorError> {
        self.ensure_idle()?;
        let prompt = self.delete_prompt.take().ok_or(EditorError::NoPendingDelete)?;

        self.error = None;
        self.notice = None;
        let ticket = self.start(EditorAction::Delete);
        Ok(PendingKeyed {
            ticket,
            registration_no: prompt.registration_no,
        })
    }

    /// Applies the store's answer to a delete.
    pub fn finish_delete(&mut self, ticket: RequestTicket, result: StoreResult<()>) -> Applied {
        if !self.settle(ticket) {
            return Applied::Discarded;
        }
        match result {
            Ok(()) => {
                info!("event=editor_delete module=screen status=ok");
                self.reset_form();
                self.notice = Some(Notice::Success(DELETED_MESSAGE.to_string()));
            }
            Err(err) => {
                self.error = Some(store_failure_message(&err));
                log_failure(EditorAction::Delete, &err);
            }
        }
        Applied::Applied
    }

    /// Resets fields, messages, the result panel and any delete prompt.
    pub fn clear(&mut self) -> Result<(), EditorError> {
        self.ensure_idle()?;
        self.reset_form();
        self.notice = None;
        self.delete_prompt = None;
        Ok(())
    }

    /// Marks the screen as gone; in-flight results will be dropped.
    pub fn dispose(&mut self) {
        self.gate.dispose();
        self.action = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.gate.is_disposed()
    }

    /// Runs a full insert against `store`.
    pub async fn insert<S>(&mut self, store: &S) -> Result<Applied, EditorError>
    where
        S: StudentStore + ?Sized,
    {
        let pending = self.begin_insert()?;
        let result = store.insert(&pending.student).await;
        Ok(self.finish_insert(pending.ticket, result))
    }

    /// Runs a full lookup against `store`.
    pub async fn view<S>(&mut self, store: &S) -> Result<Applied, EditorError>
    where
        S: StudentStore + ?Sized,
    {
        let pending = self.begin_view()?;
        let result = store.select_one(&pending.registration_no).await;
        Ok(self.finish_view(pending.ticket, result))
    }

    /// Confirms the pending prompt and runs the delete against `store`.
    pub async fn confirm_delete<S>(&mut self, store: &S) -> Result<Applied, EditorError>
    where
        S: StudentStore + ?Sized,
    {
        let pending = self.begin_confirmed_delete()?;
        let result = store.delete_where(&pending.registration_no).await;
        Ok(self.finish_delete(pending.ticket, result))
    }

    fn ensure_idle(&self) -> Result<(), EditorError> {
        if self.gate.is_disposed() {
            return Err(EditorError::Disposed);
        }
        if self.gate.is_busy() {
            return Err(EditorError::Busy);
        }
        Ok(())
    }

    fn reject(&mut self, err: FieldError) -> EditorError {
        self.error = Some(err.to_string());
        self.notice = None;
        EditorError::Validation(err)
    }

    fn start(&mut self, action: EditorAction) -> RequestTicket {
        self.action = Some(action);
        self.gate.begin()
    }

    fn settle(&mut self, ticket: RequestTicket) -> bool {
        let settled = self.gate.settle(SCREEN, ticket);
        if settled {
            self.action = None;
        }
        settled
    }

    fn reset_form(&mut self) {
        self.form = StudentForm::default();
        self.viewed_student = None;
        self.error = None;
    }
}

/// Message for a failed insert: conflicts get the fixed duplicate message.
pub fn insert_failure_message(err: &StoreError) -> String {
    if err.is_conflict() {
        CONFLICT_MESSAGE.to_string()
    } else {
        store_failure_message(err)
    }
}

/// Store-provided message, or the generic fallback.
pub fn store_failure_message(err: &StoreError) -> String {
    err.store_message()
        .unwrap_or_else(|| UNEXPECTED_ERROR_MESSAGE.to_string())
}

fn log_failure(action: EditorAction, err: &StoreError) {
    warn!(
        "event=editor_{} module=screen status=error error_code={}",
        action.as_str(),
        err.log_code()
    );
}

#[cfg(test)]
mod tests {
    use super::{
        insert_failure_message, store_failure_message, EditorError, RecordEditor,
        CONFLICT_MESSAGE, UNEXPECTED_ERROR_MESSAGE,
    };
    use crate::model::student::FieldError;
    use crate::screen::Applied;
    use crate::store::{StoreError, UNIQUE_VIOLATION_CODE};

    #[test]
    fn failure_messages_follow_error_class() {
        let conflict = StoreError::Conflict {
            code: UNIQUE_VIOLATION_CODE.to_string(),
            message: "duplicate key value".to_string(),
        };
        assert_eq!(insert_failure_message(&conflict), CONFLICT_MESSAGE);

        let api = StoreError::Api {
            status: Some(400),
            code: Some("22P02".to_string()),
            message: "invalid input syntax for type integer".to_string(),
        };
        assert_eq!(
            insert_failure_message(&api),
            "invalid input syntax for type integer"
        );

        let transport = StoreError::Transport("dns error".to_string());
        assert_eq!(store_failure_message(&transport), UNEXPECTED_ERROR_MESSAGE);
    }

    #[test]
    fn second_action_while_loading_is_busy() {
        let mut editor = RecordEditor::new();
        editor.set_registration_no("REG001");
        let pending = editor.begin_view().unwrap();

        assert!(editor.is_loading());
        assert_eq!(editor.begin_view().unwrap_err(), EditorError::Busy);
        assert_eq!(editor.clear().unwrap_err(), EditorError::Busy);
        assert_eq!(editor.request_delete().unwrap_err(), EditorError::Busy);

        assert_eq!(editor.finish_view(pending.ticket, Ok(None)), Applied::Applied);
        assert!(!editor.is_loading());
    }

    #[test]
    fn result_after_dispose_is_discarded() {
        let mut editor = RecordEditor::new();
        editor.set_registration_no("REG001");
        let pending = editor.begin_view().unwrap();
        editor.dispose();

        assert_eq!(
            editor.finish_view(pending.ticket, Ok(None)),
            Applied::Discarded
        );
        assert!(editor.notice().is_none());
        assert_eq!(editor.begin_view().unwrap_err(), EditorError::Disposed);
    }

    #[test]
    fn editing_registration_withdraws_stale_prompt() {
        let mut editor = RecordEditor::new();
        editor.set_registration_no("REG001");
        editor.request_delete().unwrap();

        editor.set_registration_no("REG001 ");
        assert!(editor.delete_prompt().is_some());

        editor.set_registration_no("REG002");
        assert!(editor.delete_prompt().is_none());
        assert_eq!(
            editor.begin_confirmed_delete().unwrap_err(),
            EditorError::NoPendingDelete
        );
    }

    #[test]
    fn view_without_registration_sets_inline_error() {
        let mut editor = RecordEditor::new();
        let err = editor.begin_view().unwrap_err();
        assert_eq!(err, EditorError::Validation(FieldError::MissingRegistrationNo));
        assert_eq!(editor.error(), Some("Please enter a registration number"));
        assert!(!editor.is_loading());
    }
}
