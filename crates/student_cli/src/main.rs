//! Command-line shell over the student screens.
//!
//! # Responsibility
//! - Drive the record editor and record lister from terminal commands.
//! - Render screen snapshots as plain text.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use student_core::screen::lister::{EMPTY_SUBTITLE, EMPTY_TITLE};
use student_core::{
    core_version, default_log_level, init_logging, open_store, ping, EditorError, EditorSnapshot,
    ListerView, LoadKind, Notice, RecordEditor, RecordLister, RemoteConfig, StoreConfig, Student,
    StudentStore,
};

#[derive(Parser)]
#[command(name = "students", version, about = "Manage student records")]
struct Cli {
    /// Use a local SQLite database instead of the hosted store.
    #[arg(long, global = true, env = "STUDENT_MANAGER_DB_PATH")]
    local: Option<PathBuf>,

    #[arg(long, global = true, env = "SUPABASE_URL")]
    url: Option<String>,

    #[arg(long, global = true, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true, env = "STUDENT_MANAGER_TABLE")]
    table: Option<String>,

    /// Request timeout for the hosted store, in seconds.
    #[arg(long, global = true, env = "STUDENT_MANAGER_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert a new student.
    Insert {
        registration_no: String,
        name: String,
        marks: String,
    },
    /// Show one student by registration number.
    View { registration_no: String },
    /// Delete a student by registration number.
    Delete {
        registration_no: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// List all students, newest first.
    List,
    /// Check core linkage.
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(default_log_level(), log_dir).map_err(|err| anyhow!(err))?;
    }

    // Why: ping must work without any store settings, so it runs before
    // the backend is resolved.
    if matches!(cli.command, Command::Ping) {
        println!("student_core ping={}", ping());
        println!("student_core version={}", core_version());
        return Ok(());
    }

    let store = open_store(&store_config(&cli)?).context("failed to open student store")?;

    match cli.command {
        Command::Insert {
            registration_no,
            name,
            marks,
        } => insert(store, registration_no, name, marks).await,
        Command::View { registration_no } => view(store, registration_no).await,
        Command::Delete {
            registration_no,
            yes,
        } => delete(store, registration_no, yes).await,
        Command::List => list(store).await,
        Command::Ping => Ok(()),
    }
}

fn store_config(cli: &Cli) -> Result<StoreConfig> {
    if let Some(db_path) = cli.local.clone() {
        return Ok(StoreConfig::Local { db_path });
    }

    let url = cli
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("pass --local <path> or --url (SUPABASE_URL)"))?;
    let api_key = cli
        .api_key
        .as_deref()
        .ok_or_else(|| anyhow!("pass --api-key (SUPABASE_ANON_KEY)"))?;

    let mut remote = RemoteConfig::new(url, api_key)?;
    if let Some(table) = cli.table.as_deref() {
        remote = remote.with_table(table)?;
    }
    if let Some(secs) = cli.timeout_secs {
        remote = remote.with_timeout(Duration::from_secs(secs))?;
    }
    Ok(StoreConfig::Remote(remote))
}

async fn insert(
    store: Arc<dyn StudentStore>,
    registration_no: String,
    name: String,
    marks: String,
) -> Result<()> {
    let mut editor = RecordEditor::new();
    editor.set_registration_no(registration_no);
    editor.set_name(name);
    editor.set_marks(marks);
    started(editor.insert(store.as_ref()).await, &editor)?;
    render_editor(editor.snapshot())
}

async fn view(store: Arc<dyn StudentStore>, registration_no: String) -> Result<()> {
    let mut editor = RecordEditor::new();
    editor.set_registration_no(registration_no);
    started(editor.view(store.as_ref()).await, &editor)?;
    render_editor(editor.snapshot())
}

async fn delete(store: Arc<dyn StudentStore>, registration_no: String, yes: bool) -> Result<()> {
    let mut editor = RecordEditor::new();
    editor.set_registration_no(registration_no);
    let prompt = match editor.request_delete() {
        Ok(prompt) => prompt,
        Err(err) => return started::<()>(Err(err), &editor),
    };

    if !yes {
        println!("{}", prompt.title);
        let confirmed = Confirm::new()
            .with_prompt(prompt.message)
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !confirmed {
            editor.cancel_delete();
            println!("{}", prompt.cancel_label);
            return Ok(());
        }
    }

    started(editor.confirm_delete(store.as_ref()).await, &editor)?;
    render_editor(editor.snapshot())
}

async fn list(store: Arc<dyn StudentStore>) -> Result<()> {
    let mut lister = RecordLister::new();
    lister.load(store.as_ref(), LoadKind::Initial).await?;

    match lister.view() {
        ListerView::Loading => bail!("load did not settle"),
        ListerView::Failed { message } => bail!("{message}"),
        ListerView::Empty { error, .. } => {
            if let Some(message) = error {
                bail!("{message}");
            }
            println!("{}", EMPTY_TITLE);
            println!("{}", EMPTY_SUBTITLE);
        }
        ListerView::Loaded { students, .. } => {
            println!("{}", lister.count_label());
            for student in students {
                print_student(student);
            }
        }
    }
    Ok(())
}

/// Turns an action that never reached the store into an error, using the
/// inline message the screen now shows when there is one.
fn started<T>(begun: std::result::Result<T, EditorError>, editor: &RecordEditor) -> Result<()> {
    match begun {
        Ok(_) => Ok(()),
        Err(EditorError::Validation(_)) => {
            bail!("{}", editor.error().unwrap_or("invalid input"))
        }
        Err(err) => Err(err.into()),
    }
}

fn render_editor(snapshot: EditorSnapshot) -> Result<()> {
    if let Some(error) = snapshot.error {
        bail!("{error}");
    }
    match snapshot.notice {
        Some(Notice::Success(message)) | Some(Notice::Info(message)) => println!("{message}"),
        None => {}
    }
    if let Some(student) = snapshot.viewed_student.as_ref() {
        print_student(student);
    }
    Ok(())
}

fn print_student(student: &Student) {
    println!(
        "{}\t{}\t{}\tAdded: {}",
        student.registration_no,
        student.name,
        student.marks,
        student.added_on()
    );
}
