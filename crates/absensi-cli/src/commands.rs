//! Command handlers. Each one connects, resolves the caller through the auth
//! guard, then drives a single core service.

use std::fs::File;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use tracing::warn;

use absensi_core::access::{authorize, Action};
use absensi_core::attendance::AttendanceSession;
use absensi_core::auth::{CredentialStore, Session, SessionData};
use absensi_core::config::Config;
use absensi_core::models::{Actor, SchoolSettings, StudentPatch, User};
use absensi_core::profile::{avatar_url, display_name};
use absensi_core::report::{xlsx, MonthlyReport};
use absensi_core::roster::parse_import_csv;
use absensi_core::store::FirestoreClient;
use absensi_core::users::UserListUpdate;
use absensi_core::utils::truncate_string;
use absensi_core::App;

use crate::{
    AttendanceCommand, CacheCommand, ClassCommand, Cli, Command, ReportCommand, SettingsCommand,
    SheetArgs, StudentCommand, UserCommand,
};

/// Column width for names in tables
const NAME_WIDTH: usize = 28;

/// A connected app plus what the command line and config resolved to.
struct Ctx {
    app: App<FirestoreClient>,
    session: Session,
    config: Config,
    refresh: bool,
}

impl Ctx {
    fn connect(config: Config, refresh: bool) -> Result<Self> {
        let token = std::env::var("ABSENSI_TOKEN").ok();
        let (app, session) = App::connect(&config, token)?;
        if session.data.as_ref().is_some_and(SessionData::needs_refresh) {
            warn!("Identity token expires soon, run `absensi login` again to refresh it");
        }
        Ok(Self {
            app,
            session,
            config,
            refresh,
        })
    }

    fn uid(&self) -> Result<String> {
        self.session
            .uid()
            .map(str::to_string)
            .or_else(|| self.config.last_uid.clone())
            .context("Not signed in. Run `absensi login` first")
    }

    async fn actor(&self) -> Result<Actor> {
        let uid = self.uid()?;
        self.app
            .actor(&uid)
            .await
            .context("Could not confirm your account")
    }

    /// Resolve the target sheet, defaulting to today and the last class.
    fn sheet_target(&self, args: &SheetArgs) -> Result<(NaiveDate, String)> {
        let class = args
            .class
            .clone()
            .or_else(|| self.config.last_class.clone())
            .context("No class given. Pass --class")?;
        let date = args.date.unwrap_or_else(|| Local::now().date_naive());
        Ok((date, class.trim().to_uppercase()))
    }

    fn remember_class(&mut self, class: &str) {
        if self.config.last_class.as_deref() != Some(class) {
            self.config.last_class = Some(class.to_string());
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
        }
    }

    async fn open(&mut self, actor: &Actor, args: &SheetArgs) -> Result<AttendanceSession> {
        let (date, class) = self.sheet_target(args)?;
        let session = self.app.attendance.open(actor, date, &class).await?;
        self.remember_class(&class);
        Ok(session)
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Login {
            uid,
            email,
            name,
            project,
        } => login(config, uid, email, name, project).await,
        Command::Logout => logout(config),
        Command::Whoami => whoami(&Ctx::connect(config, cli.refresh)?).await,
        Command::Profile { name, nip } => {
            let ctx = Ctx::connect(config, cli.refresh)?;
            let uid = ctx.uid()?;
            ctx.app
                .profile
                .update_profile(&uid, &name, nip.as_deref())
                .await?;
            println!("Profile updated.");
            Ok(())
        }
        Command::Classes(cmd) => classes(&Ctx::connect(config, cli.refresh)?, cmd).await,
        Command::Students(cmd) => students(&Ctx::connect(config, cli.refresh)?, cmd).await,
        Command::Attendance(cmd) => attendance(&mut Ctx::connect(config, cli.refresh)?, cmd).await,
        Command::Report(cmd) => report(&Ctx::connect(config, cli.refresh)?, cmd).await,
        Command::Users(cmd) => users(&Ctx::connect(config, cli.refresh)?, cmd).await,
        Command::Settings(cmd) => settings(&Ctx::connect(config, cli.refresh)?, cmd).await,
        Command::Cache(cmd) => cache(&Ctx::connect(config, cli.refresh)?, cmd),
    }
}

// ============================================================================
// Session
// ============================================================================

async fn login(
    mut config: Config,
    uid: String,
    email: Option<String>,
    name: Option<String>,
    project: Option<String>,
) -> Result<()> {
    if let Some(project) = project {
        config.project_id = Some(project);
    }
    if config.project_id.is_none() {
        bail!("No project configured. Pass --project or set ABSENSI_PROJECT_ID");
    }

    let token = match std::env::var("ABSENSI_TOKEN") {
        Ok(token) => token,
        Err(_) => rpassword::prompt_password("Identity token: ").context("Failed to read token")?,
    };
    let token = token.trim().to_string();
    if token.is_empty() {
        bail!("Identity token is empty");
    }

    if let Err(e) = CredentialStore::store_token(&uid, &token) {
        warn!(error = %e, "Keychain unavailable, token kept in session file only");
    }
    config.last_uid = Some(uid.clone());
    config.save().context("Failed to save config")?;

    let (app, mut session) = App::connect(&config, Some(token.clone()))?;
    session.update(SessionData::new(token, uid.clone(), email.clone()));
    session.save().context("Failed to save session")?;

    let user = app
        .profile
        .register(&uid, name.as_deref(), email.as_deref(), None)
        .await?;
    println!("Signed in as {} ({})", display_name(&user), user.role);
    if !user.verified && !user.role.is_privileged() {
        println!("Your account is waiting for verification by an administrator.");
    }
    Ok(())
}

fn logout(mut config: Config) -> Result<()> {
    let (app, mut session) = App::connect(&config, None)?;
    let uid = session
        .uid()
        .map(str::to_string)
        .or_else(|| config.last_uid.clone());

    if let Some(uid) = &uid {
        app.profile.sign_out(uid);
        if let Err(e) = CredentialStore::delete(uid) {
            warn!(error = %e, "Failed to remove keychain entry");
        }
    }
    session.clear().context("Failed to remove session file")?;
    config.last_uid = None;
    config.save().context("Failed to save config")?;
    println!("Signed out.");
    Ok(())
}

async fn whoami(ctx: &Ctx) -> Result<()> {
    let uid = ctx.uid()?;
    let user = ctx.app.profile.current_profile(&uid, ctx.refresh).await?;
    println!("{}", display_name(&user));
    println!("  uid:      {}", user.uid);
    println!("  email:    {}", user.email.as_deref().unwrap_or("-"));
    println!("  role:     {}", user.role);
    println!("  verified: {}", if user.verified { "yes" } else { "no" });
    println!("  avatar:   {}", avatar_url(&user));
    if let Some(data) = &ctx.session.data {
        let note = if data.needs_refresh() { " (refresh soon)" } else { "" };
        println!("  session:  {} min left{}", data.minutes_until_expiry(), note);
    }
    let keychain = if CredentialStore::has_token(&uid) { "token stored" } else { "no token" };
    println!("  keychain: {}", keychain);
    Ok(())
}

// ============================================================================
// Roster
// ============================================================================

async fn classes(ctx: &Ctx, cmd: ClassCommand) -> Result<()> {
    let roster = &ctx.app.roster;
    match cmd {
        ClassCommand::List => {
            for class in roster.list_classes(ctx.refresh).await? {
                let kind = if class.special { "special" } else { "regular" };
                println!("{:<12} {}", class.id, kind);
            }
        }
        ClassCommand::Create { id, special } => {
            let actor = ctx.actor().await?;
            let class = roster.create_class(&actor, &id, special).await?;
            println!("Class {} created.", class.id);
        }
        ClassCommand::Delete { id } => {
            let actor = ctx.actor().await?;
            roster.delete_class(&actor, &id).await?;
            println!("Class {} deleted.", id);
        }
    }
    Ok(())
}

async fn set_active(ctx: &Ctx, actor: &Actor, id: &str, active: bool) -> Result<()> {
    let patch = StudentPatch {
        active: Some(active),
        ..StudentPatch::default()
    };
    let student = ctx.app.roster.update_student(actor, id, patch).await?;
    println!("{} is now {}.", student.name, student.status);
    Ok(())
}

async fn students(ctx: &Ctx, cmd: StudentCommand) -> Result<()> {
    let actor = ctx.actor().await?;
    let roster = &ctx.app.roster;
    match cmd {
        StudentCommand::List { class, all } => {
            let students = roster.students_by_class(&class.trim().to_uppercase()).await?;
            for s in students.iter().filter(|s| all || s.is_active()) {
                println!(
                    "{:<22} {:<12} {:<width$} {}",
                    s.id,
                    s.nis,
                    truncate_string(&s.name, NAME_WIDTH),
                    s.status,
                    width = NAME_WIDTH
                );
            }
        }
        StudentCommand::Import { file } => {
            let reader = File::open(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let drafts = parse_import_csv(reader)?;
            let count = roster.import_students(&actor, drafts).await?;
            println!("Imported {} students.", count);
        }
        StudentCommand::Promote { to, ids } => {
            let count = roster.promote_students(&actor, &ids, &to).await?;
            println!("Moved {} students to {}.", count, to.trim().to_uppercase());
        }
        StudentCommand::Delete { ids } => {
            let count = roster.delete_students(&actor, &ids).await?;
            println!("Deleted {} students.", count);
        }
        StudentCommand::Deactivate { id } => set_active(ctx, &actor, &id, false).await?,
        StudentCommand::Activate { id } => set_active(ctx, &actor, &id, true).await?,
        StudentCommand::AddMember { class, student } => {
            roster.add_member(&actor, &class, &student).await?;
            println!("Added {} to {}.", student, class);
        }
        StudentCommand::RemoveMember { class, student } => {
            roster.remove_member(&actor, &class, &student).await?;
            println!("Removed {} from {}.", student, class);
        }
    }
    Ok(())
}

// ============================================================================
// Attendance
// ============================================================================

fn print_sheet(session: &AttendanceSession) {
    let Some(sheet) = &session.sheet else {
        println!("No sheet open.");
        return;
    };
    println!(
        "{} {}  [{}]  {}",
        sheet.class_id,
        sheet.date,
        session.state(),
        sheet.counts().summary()
    );
    for (i, (id, entry)) in sheet.sorted_entries().into_iter().enumerate() {
        println!(
            "{:>3}. {:<22} {:<12} {:<width$} {:<6} {}",
            i + 1,
            id,
            entry.student_number,
            truncate_string(&entry.name, NAME_WIDTH),
            entry.status,
            entry.note,
            width = NAME_WIDTH
        );
    }
}

async fn attendance(ctx: &mut Ctx, cmd: AttendanceCommand) -> Result<()> {
    let actor = ctx.actor().await?;
    match cmd {
        AttendanceCommand::Show { sheet } => {
            let session = ctx.open(&actor, &sheet).await?;
            print_sheet(&session);
        }
        AttendanceCommand::Set {
            sheet,
            student,
            status,
            note,
        } => {
            let session = ctx.open(&actor, &sheet).await?;
            let session =
                ctx.app
                    .attendance
                    .set_status(&actor, &session, &student, status, note.as_deref())?;
            print_sheet(&session);
            println!("Unsaved. Run `absensi attendance save` to store it.");
        }
        AttendanceCommand::Save { sheet } => {
            let session = ctx.open(&actor, &sheet).await?;
            let session = ctx.app.attendance.save(&actor, &session).await?;
            println!("Saved. [{}]", session.state());
        }
        AttendanceCommand::Lock { sheet } => {
            let session = ctx.open(&actor, &sheet).await?;
            let session = ctx.app.attendance.lock(&actor, &session).await?;
            println!("Locked. [{}]", session.state());
        }
        AttendanceCommand::Unlock { sheet } => {
            let session = ctx.open(&actor, &sheet).await?;
            let session = ctx.app.attendance.unlock(&actor, &session).await?;
            println!("Unlocked. [{}]", session.state());
        }
        AttendanceCommand::Export { sheet, out } => {
            let session = ctx.open(&actor, &sheet).await?;
            let settings = ctx.app.profile.school_settings(ctx.refresh).await?;
            let report = ctx.app.attendance.daily_report(&actor, &session, &settings)?;
            let path = xlsx::save_daily(&report, &out)?;
            println!("{}", report.summary());
            println!("Written to {}", path.display());
        }
        AttendanceCommand::Discard => {
            ctx.app.attendance.discard_draft();
            println!("Draft discarded.");
        }
    }
    Ok(())
}

async fn report(ctx: &Ctx, cmd: ReportCommand) -> Result<()> {
    let actor = ctx.actor().await?;
    match cmd {
        ReportCommand::Monthly { class, month, out } => {
            let grid = ctx
                .app
                .attendance
                .monthly_report(&actor, &class, month, ctx.refresh)
                .await?;
            let settings = ctx.app.profile.school_settings(ctx.refresh).await?;
            let report = MonthlyReport::new(grid, &settings);
            let path = xlsx::save_monthly(&report, &out)?;
            println!(
                "{} students, {} days. Written to {}",
                report.grid.rows.len(),
                report.grid.days,
                path.display()
            );
        }
    }
    Ok(())
}

// ============================================================================
// Users and settings
// ============================================================================

fn print_users(users: &[User]) {
    for u in users {
        println!(
            "{:<30} {:<width$} {:<12} {}",
            u.uid,
            truncate_string(&display_name(u), NAME_WIDTH),
            u.role,
            if u.verified { "verified" } else { "pending" },
            width = NAME_WIDTH
        );
    }
}

async fn users(ctx: &Ctx, cmd: UserCommand) -> Result<()> {
    let actor = ctx.actor().await?;
    let users = &ctx.app.users;
    match cmd {
        UserCommand::List => {
            authorize(&actor, Action::VerifyUser)?;
            print_users(&users.list_users(ctx.refresh).await?);
        }
        UserCommand::Verify { uid } => {
            let user = users.set_verified(&actor, &uid, true).await?;
            println!("{} verified.", display_name(&user));
        }
        UserCommand::Unverify { uid } => {
            let user = users.set_verified(&actor, &uid, false).await?;
            println!("{} unverified.", display_name(&user));
        }
        UserCommand::Promote { uid } => {
            let user = users.promote(&actor, &uid).await?;
            println!("{} is now {}.", display_name(&user), user.role);
        }
        UserCommand::Demote { uid } => {
            let user = users.demote(&actor, &uid).await?;
            println!("{} is now {}.", display_name(&user), user.role);
        }
        UserCommand::SetRole { uid, role } => {
            let user = users.set_role(&actor, &uid, role).await?;
            println!("{} is now {}.", display_name(&user), user.role);
        }
        UserCommand::Delete { uid } => {
            users.delete_user(&actor, &uid).await?;
            println!("User {} deleted.", uid);
        }
        UserCommand::Watch => {
            authorize(&actor, Action::VerifyUser)?;
            let mut subscription = users.subscribe(ctx.config.user_poll_interval());
            while let Some(UserListUpdate { users, from_cache }) = subscription.recv().await {
                let source = if from_cache { "cached" } else { "live" };
                println!("--- {} users ({}) ---", users.len(), source);
                print_users(&users);
            }
        }
    }
    Ok(())
}

async fn settings(ctx: &Ctx, cmd: SettingsCommand) -> Result<()> {
    let current = ctx.app.profile.school_settings(ctx.refresh).await?;
    match cmd {
        SettingsCommand::Show => {
            println!("Principal: {}", current.principal_name.as_deref().unwrap_or("-"));
            println!("NIP:       {}", current.principal_nip.as_deref().unwrap_or("-"));
        }
        SettingsCommand::Set { principal, nip } => {
            let actor = ctx.actor().await?;
            let updated = SchoolSettings {
                principal_name: principal.or(current.principal_name),
                principal_nip: nip.or(current.principal_nip),
            };
            ctx.app.profile.update_settings(&actor, &updated).await?;
            println!("Settings updated.");
        }
    }
    Ok(())
}

fn cache(ctx: &Ctx, cmd: CacheCommand) -> Result<()> {
    let cache = &ctx.app.cache;
    match cmd {
        CacheCommand::Status => {
            for ns in cache.status() {
                println!(
                    "{:<16} {:>4} entries  {}",
                    ns.name,
                    ns.entries,
                    ns.newest.as_deref().unwrap_or("-")
                );
            }
            println!(
                "{:<16} {}",
                "draft",
                if cache.has_draft() { "unsaved edits" } else { "none" }
            );
        }
        CacheCommand::Clear => {
            cache.clear_all();
            println!("Local cache cleared.");
        }
    }
    Ok(())
}
