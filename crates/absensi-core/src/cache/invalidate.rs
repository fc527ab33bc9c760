//! Which cached entries each kind of write makes stale.
//!
//! Services describe what they changed with a `Mutation`; the table in
//! `Mutation::invalidations` is the single place that maps writes to keys.

use chrono::NaiveDate;

use super::kinds::{
    monthly_key, CacheKind, ClassList, ClassRoster, LoginSession, MonthlyCache, NisCheck,
    ProfileCache, SettingsCache, SheetCache, UserList,
};
use crate::models::{AttendanceSheet, YearMonth};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    ClassCreated,
    ClassDeleted { class_id: String },
    StudentsImported { classes: Vec<String>, nis: Vec<String> },
    StudentUpdated { classes: Vec<String> },
    StudentsDeleted,
    StudentsMoved { to: String },
    MembershipChanged { class_id: String },
    SheetSaved { date: NaiveDate, class_id: String },
    SheetLocked { date: NaiveDate, class_id: String },
    SheetUnlocked { date: NaiveDate, class_id: String },
    UserChanged { uid: String },
    SettingsChanged,
}

/// A cache key or a whole namespace to drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Key(String),
    Prefix(&'static str),
}

impl Invalidation {
    fn key<K: CacheKind>(key: &str) -> Self {
        Invalidation::Key(format!("{}{}", K::PREFIX, key))
    }

    fn all<K: CacheKind>() -> Self {
        Invalidation::Prefix(K::PREFIX)
    }
}

impl Mutation {
    pub fn invalidations(&self) -> Vec<Invalidation> {
        match self {
            Mutation::ClassCreated => vec![Invalidation::all::<ClassList>()],
            Mutation::ClassDeleted { class_id } => vec![
                Invalidation::all::<ClassList>(),
                Invalidation::key::<ClassRoster>(class_id),
            ],
            Mutation::StudentsImported { classes, nis } => classes
                .iter()
                .map(|c| Invalidation::key::<ClassRoster>(c))
                .chain(nis.iter().map(|n| Invalidation::key::<NisCheck>(n)))
                .collect(),
            Mutation::StudentUpdated { classes } => classes
                .iter()
                .map(|c| Invalidation::key::<ClassRoster>(c))
                .chain(std::iter::once(Invalidation::all::<NisCheck>()))
                .collect(),
            Mutation::StudentsDeleted => vec![
                Invalidation::all::<ClassRoster>(),
                Invalidation::all::<NisCheck>(),
            ],
            // Source classes are unknown without reading every student first
            Mutation::StudentsMoved { to } => vec![
                Invalidation::all::<ClassRoster>(),
                Invalidation::key::<ClassRoster>(to),
            ],
            Mutation::MembershipChanged { class_id } => {
                vec![Invalidation::key::<ClassRoster>(class_id)]
            }
            Mutation::SheetSaved { date, class_id } => vec![Self::month(date, class_id)],
            Mutation::SheetLocked { date, class_id } | Mutation::SheetUnlocked { date, class_id } => {
                vec![
                    Invalidation::key::<SheetCache>(&AttendanceSheet::id_for(*date, class_id)),
                    Self::month(date, class_id),
                ]
            }
            Mutation::UserChanged { uid } => vec![
                Invalidation::all::<UserList>(),
                Invalidation::key::<ProfileCache>(uid),
                Invalidation::key::<LoginSession>(uid),
            ],
            Mutation::SettingsChanged => vec![Invalidation::all::<SettingsCache>()],
        }
    }

    fn month(date: &NaiveDate, class_id: &str) -> Invalidation {
        Invalidation::key::<MonthlyCache>(&monthly_key(class_id, &YearMonth::of(*date)))
    }
}
