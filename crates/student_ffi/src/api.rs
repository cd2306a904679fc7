//! FFI screen API for the Flutter shell.
//!
//! # Responsibility
//! - Expose the editor and lister screens as plain snapshot-returning calls.
//! - Own the process-wide store handle and async runtime.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - A screen lock is never held while a store call is in flight, so
//!   snapshots taken meanwhile report `loading = true`.
//! - Results for a disposed or reopened screen are dropped by the core's
//!   ticket check.

use log::warn;
use once_cell::sync::{Lazy, OnceCell};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use student_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, open_store,
    ping as ping_inner, EditorSnapshot, ListerView, LoadKind, Notice, RecordEditor, RecordLister,
    RemoteConfig, StoreConfig, StoreError, StoreResult, Student, StudentStore,
};
use tokio::runtime::{Builder, Runtime};

static RUNTIME: OnceCell<Runtime> = OnceCell::new();
static STORE: Lazy<RwLock<Option<Arc<dyn StudentStore>>>> = Lazy::new(|| RwLock::new(None));
static EDITOR: Lazy<Mutex<RecordEditor>> = Lazy::new(|| Mutex::new(RecordEditor::new()));
static LISTER: Lazy<Mutex<RecordLister>> = Lazy::new(|| Mutex::new(RecordLister::new()));

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: `trace|debug|info|warn|error`, case-insensitive.
/// - `log_dir`: absolute directory for rolling logs.
/// - Returns empty string on success, error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Configures the store from environment variables.
///
/// Returns empty string on success, error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_store_from_env() -> String {
    match StoreConfig::from_env() {
        Ok(config) => install_store(&config),
        Err(err) => err.to_string(),
    }
}

/// Points both screens at a hosted project.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_remote_store(base_url: String, api_key: String) -> String {
    match RemoteConfig::new(&base_url, &api_key) {
        Ok(remote) => install_store(&StoreConfig::Remote(remote)),
        Err(err) => err.to_string(),
    }
}

/// Points both screens at a local SQLite file.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_local_store(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }
    install_store(&StoreConfig::Local {
        db_path: trimmed.into(),
    })
}

/// Student row as rendered by both screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentItem {
    pub id: i64,
    pub registration_no: String,
    pub name: String,
    pub marks: i32,
    /// `YYYY-MM-DD` of insertion.
    pub added_on: String,
}

/// Delete confirmation dialog content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
    pub cancel_label: String,
    pub confirm_label: String,
}

/// Everything the editor screen renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    pub registration_no: String,
    pub name: String,
    pub marks: String,
    /// Disables all action buttons while `true`.
    pub loading: bool,
    pub error: Option<String>,
    /// `success` or `info`; `None` when no notice is showing.
    pub notice_kind: Option<String>,
    pub notice: Option<String>,
    pub viewed_student: Option<StudentItem>,
    pub confirm_prompt: Option<ConfirmPrompt>,
}

/// Everything the lister screen renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListerSnapshot {
    /// `loading|failed|empty|loaded`.
    pub state: String,
    pub items: Vec<StudentItem>,
    pub count_label: String,
    pub refreshing: bool,
    pub error: Option<String>,
    /// Show the retry button.
    pub can_retry: bool,
}

/// Starts a fresh editor screen, dropping any previous one.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_open() -> EditorView {
    let mut editor = lock(&EDITOR);
    editor.dispose();
    *editor = RecordEditor::new();
    render_editor(&editor)
}

/// Replaces the three form fields with the given text.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_update_fields(registration_no: String, name: String, marks: String) -> EditorView {
    let mut editor = lock(&EDITOR);
    editor.set_registration_no(registration_no);
    editor.set_name(name);
    editor.set_marks(marks);
    render_editor(&editor)
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_snapshot() -> EditorView {
    render_editor(&lock(&EDITOR))
}

/// Inserts the form contents as a new student.
pub fn editor_insert() -> EditorView {
    let begun = lock(&EDITOR).begin_insert();
    let pending = match begun {
        Ok(pending) => pending,
        Err(err) => return rejected("insert", err),
    };
    let student = pending.student;
    let result = run_store_call(|store| async move { store.insert(&student).await });
    let mut editor = lock(&EDITOR);
    editor.finish_insert(pending.ticket, result);
    render_editor(&editor)
}

/// Looks up the registration number in the form.
pub fn editor_view() -> EditorView {
    let begun = lock(&EDITOR).begin_view();
    let pending = match begun {
        Ok(pending) => pending,
        Err(err) => return rejected("view", err),
    };
    let registration_no = pending.registration_no;
    let result = run_store_call(|store| async move { store.select_one(&registration_no).await });
    let mut editor = lock(&EDITOR);
    editor.finish_view(pending.ticket, result);
    render_editor(&editor)
}

/// Shows the delete confirmation; no store call is made.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_request_delete() -> EditorView {
    let mut editor = lock(&EDITOR);
    if let Err(err) = editor.request_delete() {
        log_rejection("request_delete", &err);
    }
    render_editor(&editor)
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_cancel_delete() -> EditorView {
    let mut editor = lock(&EDITOR);
    editor.cancel_delete();
    render_editor(&editor)
}

/// Confirms the showing delete prompt and deletes the record.
pub fn editor_confirm_delete() -> EditorView {
    let begun = lock(&EDITOR).begin_confirmed_delete();
    let pending = match begun {
        Ok(pending) => pending,
        Err(err) => return rejected("delete", err),
    };
    let registration_no = pending.registration_no;
    let result = run_store_call(|store| async move { store.delete_where(&registration_no).await });
    let mut editor = lock(&EDITOR);
    editor.finish_delete(pending.ticket, result);
    render_editor(&editor)
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_clear() -> EditorView {
    let mut editor = lock(&EDITOR);
    if let Err(err) = editor.clear() {
        log_rejection("clear", &err);
    }
    render_editor(&editor)
}

/// Marks the editor screen as closed; in-flight results are dropped.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_dispose() {
    lock(&EDITOR).dispose();
}

/// Starts a fresh lister screen in its loading state.
#[flutter_rust_bridge::frb(sync)]
pub fn lister_open() -> ListerSnapshot {
    let mut lister = lock(&LISTER);
    lister.dispose();
    *lister = RecordLister::new();
    render_lister(&lister)
}

/// Loads all students; `is_refresh` selects pull-to-refresh behavior.
pub fn lister_load(is_refresh: bool) -> ListerSnapshot {
    let kind = if is_refresh {
        LoadKind::Refresh
    } else {
        LoadKind::Initial
    };
    let begun = lock(&LISTER).begin_load(kind);
    let pending = match begun {
        Ok(pending) => pending,
        Err(err) => {
            warn!("event=ffi_lister_load module=ffi status=rejected reason={err}");
            return render_lister(&lock(&LISTER));
        }
    };
    let order = pending.order;
    let result = run_store_call(|store| async move { store.select_all(order).await });
    let mut lister = lock(&LISTER);
    lister.finish_load(pending.ticket, result);
    render_lister(&lister)
}

/// Repeats the initial load after a failure.
pub fn lister_retry() -> ListerSnapshot {
    lister_load(false)
}

#[flutter_rust_bridge::frb(sync)]
pub fn lister_snapshot() -> ListerSnapshot {
    render_lister(&lock(&LISTER))
}

#[flutter_rust_bridge::frb(sync)]
pub fn lister_dispose() {
    lock(&LISTER).dispose();
}

fn install_store(config: &StoreConfig) -> String {
    match open_store(config) {
        Ok(store) => {
            *STORE.write().unwrap_or_else(PoisonError::into_inner) = Some(store);
            String::new()
        }
        Err(err) => err.to_string(),
    }
}

fn runtime() -> Result<&'static Runtime, String> {
    RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("student-ffi")
            .enable_all()
            .build()
            .map_err(|err| format!("failed to start async runtime: {err}"))
    })
}

/// Runs one store call to completion on the shared runtime.
fn run_store_call<T, F, Fut>(call: F) -> StoreResult<T>
where
    F: FnOnce(Arc<dyn StudentStore>) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let store = STORE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or_else(|| StoreError::Transport("store is not configured".to_string()))?;
    let runtime = runtime().map_err(StoreError::Transport)?;
    // Why: callers drop the screen lock before this point, so the shell can
    // still read a `loading` snapshot while the request is outstanding.
    runtime.block_on(call(store))
}

fn lock<T>(screen: &'static Lazy<Mutex<T>>) -> MutexGuard<'static, T> {
    screen.lock().unwrap_or_else(PoisonError::into_inner)
}

fn rejected(action: &'static str, err: student_core::EditorError) -> EditorView {
    log_rejection(action, &err);
    render_editor(&lock(&EDITOR))
}

fn log_rejection(action: &'static str, err: &student_core::EditorError) {
    warn!("event=ffi_editor_{action} module=ffi status=rejected reason={err}");
}

fn render_editor(editor: &RecordEditor) -> EditorView {
    let EditorSnapshot {
        form,
        loading,
        error,
        notice,
        viewed_student,
        delete_prompt,
    } = editor.snapshot();

    let (notice_kind, notice) = match notice {
        Some(Notice::Success(message)) => (Some("success".to_string()), Some(message)),
        Some(Notice::Info(message)) => (Some("info".to_string()), Some(message)),
        None => (None, None),
    };

    EditorView {
        registration_no: form.registration_no,
        name: form.name,
        marks: form.marks,
        loading,
        error,
        notice_kind,
        notice,
        viewed_student: viewed_student.as_ref().map(to_item),
        confirm_prompt: delete_prompt.map(|prompt| ConfirmPrompt {
            title: prompt.title.to_string(),
            message: prompt.message.to_string(),
            cancel_label: prompt.cancel_label.to_string(),
            confirm_label: prompt.confirm_label.to_string(),
        }),
    }
}

fn render_lister(lister: &RecordLister) -> ListerSnapshot {
    let count_label = lister.count_label();
    let (state, items, refreshing, error, can_retry) = match lister.view() {
        ListerView::Loading => ("loading", Vec::new(), false, None, false),
        ListerView::Failed { message } => {
            ("failed", Vec::new(), false, Some(message.to_string()), true)
        }
        ListerView::Empty { refreshing, error } => (
            "empty",
            Vec::new(),
            refreshing,
            error.map(str::to_string),
            false,
        ),
        ListerView::Loaded {
            students,
            refreshing,
            error,
        } => (
            "loaded",
            students.iter().map(to_item).collect(),
            refreshing,
            error.map(str::to_string),
            false,
        ),
    };

    ListerSnapshot {
        state: state.to_string(),
        items,
        count_label,
        refreshing,
        error,
        can_retry,
    }
}

fn to_item(student: &Student) -> StudentItem {
    StudentItem {
        id: student.id,
        registration_no: student.registration_no.clone(),
        name: student.name.clone(),
        marks: student.marks,
        added_on: student.added_on(),
    }
}
