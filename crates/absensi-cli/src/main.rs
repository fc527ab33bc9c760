//! absensi - daily attendance, rosters and reports from the terminal.
//!
//! Every command runs against the configured document store project and
//! reads through the local cache. Attendance edits live in the local draft
//! until they are saved, so `attendance set` can be repeated across
//! invocations before a single `attendance save`.

mod commands;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use absensi_core::config::Config;
use absensi_core::models::{AttendanceStatus, Role, YearMonth};

/// Log file prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "absensi.log";

#[derive(Parser)]
#[command(name = "absensi", version, about = "School attendance and roster management")]
pub struct Cli {
    /// Ignore fresh cache entries and read from the store
    #[arg(long, global = true)]
    pub refresh: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with an identity token from the sign-in provider
    Login {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Document store project id
        #[arg(long)]
        project: Option<String>,
    },
    Logout,
    Whoami,
    /// Update your display name and NIP
    Profile {
        name: String,
        #[arg(long)]
        nip: Option<String>,
    },
    #[command(subcommand)]
    Classes(ClassCommand),
    #[command(subcommand)]
    Students(StudentCommand),
    #[command(subcommand)]
    Attendance(AttendanceCommand),
    #[command(subcommand)]
    Report(ReportCommand),
    #[command(subcommand)]
    Users(UserCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand)]
pub enum ClassCommand {
    List,
    Create {
        id: String,
        /// Special class whose roster comes from memberships
        #[arg(long)]
        special: bool,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum StudentCommand {
    List {
        class: String,
        /// Include inactive students
        #[arg(long)]
        all: bool,
    },
    /// Import students from a CSV file with nama, nis, kelas columns
    Import {
        file: PathBuf,
    },
    /// Move students to another class
    Promote {
        #[arg(long)]
        to: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Deactivate {
        id: String,
    },
    Activate {
        id: String,
    },
    AddMember {
        class: String,
        student: String,
    },
    RemoveMember {
        class: String,
        student: String,
    },
}

#[derive(Args, Clone)]
pub struct SheetArgs {
    /// Class id (defaults to the last class used)
    #[arg(long, short)]
    pub class: Option<String>,
    /// Date as YYYY-MM-DD (defaults to today)
    #[arg(long, short)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub enum AttendanceCommand {
    Show {
        #[command(flatten)]
        sheet: SheetArgs,
    },
    Set {
        #[command(flatten)]
        sheet: SheetArgs,
        student: String,
        /// hadir, sakit, izin, alpa (or h, s, i, a)
        status: AttendanceStatus,
        #[arg(long)]
        note: Option<String>,
    },
    Save {
        #[command(flatten)]
        sheet: SheetArgs,
    },
    Lock {
        #[command(flatten)]
        sheet: SheetArgs,
    },
    Unlock {
        #[command(flatten)]
        sheet: SheetArgs,
    },
    /// Write the daily report workbook of a locked sheet
    Export {
        #[command(flatten)]
        sheet: SheetArgs,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Throw away unsaved edits
    Discard,
}

#[derive(Subcommand)]
pub enum ReportCommand {
    Monthly {
        class: String,
        month: YearMonth,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    List,
    Verify { uid: String },
    Unverify { uid: String },
    Promote { uid: String },
    Demote { uid: String },
    SetRole { uid: String, role: Role },
    Delete { uid: String },
    /// Print the user list whenever it changes
    Watch,
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        principal: Option<String>,
        #[arg(long)]
        nip: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CacheCommand {
    Status,
    Clear,
}

/// Initialize the tracing subscriber for logging
///
/// `RUST_LOG` controls the filter (default `warn`). Logs go to stderr and,
/// when a log directory is available, to a daily rolling file.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

/// Environment overrides for the stored configuration.
fn apply_env(config: &mut Config) {
    if let Ok(project) = std::env::var("ABSENSI_PROJECT_ID") {
        config.project_id = Some(project);
    }
    if let Ok(url) = std::env::var("ABSENSI_BASE_URL") {
        config.base_url = Some(url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (mut config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    apply_env(&mut config);

    let log_dir = config.cache_dir().ok();
    if let Some(dir) = &log_dir {
        let _ = std::fs::create_dir_all(dir);
    }
    let _guard = init_tracing(log_dir.as_deref());
    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!("absensi starting");

    let result = commands::run(cli, config).await;
    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
