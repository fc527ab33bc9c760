//! Cache namespaces: what each stores, under which prefix, for how long.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Actor, AttendanceSheet, RosterMember, SchoolClass, SchoolSettings, User};

const MINUTE: u64 = 60;

/// A typed cache namespace.
pub trait CacheKind {
    type Value: Serialize + DeserializeOwned;

    /// Human-readable name for the cache report.
    const NAME: &'static str;
    const PREFIX: &'static str;
    /// Default lifetime. `None` means entries never expire on their own.
    const TTL: Option<Duration>;
}

/// Key used by namespaces that hold a single collection-wide entry.
pub const ALL: &str = "all";

pub struct ClassList;
impl CacheKind for ClassList {
    type Value = Vec<SchoolClass>;
    const NAME: &'static str = "classes";
    const PREFIX: &'static str = "kelas_";
    const TTL: Option<Duration> = Some(Duration::from_secs(60 * MINUTE));
}

/// Active roster per class id.
pub struct ClassRoster;
impl CacheKind for ClassRoster {
    type Value = Vec<RosterMember>;
    const NAME: &'static str = "rosters";
    const PREFIX: &'static str = "roster_";
    const TTL: Option<Duration> = Some(Duration::from_secs(15 * MINUTE));
}

/// Whether a NIS is already registered.
pub struct NisCheck;
impl CacheKind for NisCheck {
    type Value = bool;
    const NAME: &'static str = "nis checks";
    const PREFIX: &'static str = "nis_";
    const TTL: Option<Duration> = Some(Duration::from_secs(5 * MINUTE));
}

pub struct UserList;
impl CacheKind for UserList {
    type Value = Vec<User>;
    const NAME: &'static str = "users";
    const PREFIX: &'static str = "users_";
    const TTL: Option<Duration> = Some(Duration::from_secs(5 * MINUTE));
}

pub struct ProfileCache;
impl CacheKind for ProfileCache {
    type Value = User;
    const NAME: &'static str = "profiles";
    const PREFIX: &'static str = "profile_";
    const TTL: Option<Duration> = Some(Duration::from_secs(10 * MINUTE));
}

/// Resolved caller identity for the auth guard.
pub struct LoginSession;
impl CacheKind for LoginSession {
    type Value = Actor;
    const NAME: &'static str = "login sessions";
    const PREFIX: &'static str = "login_session_";
    const TTL: Option<Duration> = Some(Duration::from_secs(24 * 60 * MINUTE));
}

pub struct SettingsCache;
impl CacheKind for SettingsCache {
    type Value = SchoolSettings;
    const NAME: &'static str = "settings";
    const PREFIX: &'static str = "settings_";
    const TTL: Option<Duration> = Some(Duration::from_secs(60 * MINUTE));
}

/// Saved sheets by document id. Locked sheets are never served from here.
pub struct SheetCache;
impl CacheKind for SheetCache {
    type Value = AttendanceSheet;
    const NAME: &'static str = "sheets";
    const PREFIX: &'static str = "rekap_";
    const TTL: Option<Duration> = None;
}

/// All sheets of a class in a month, keyed `{class}_{YYYY-MM}`.
pub struct MonthlyCache;
impl CacheKind for MonthlyCache {
    type Value = Vec<AttendanceSheet>;
    const NAME: &'static str = "monthly";
    const PREFIX: &'static str = "monthly_";
    const TTL: Option<Duration> = Some(Duration::from_secs(10 * MINUTE));
}

pub fn monthly_key(class_id: &str, month: &crate::models::YearMonth) -> String {
    format!("{}_{}", class_id, month)
}
