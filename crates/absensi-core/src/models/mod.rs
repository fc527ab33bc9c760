//! Data models for school attendance entities.
//!
//! This module contains all the data structures used to represent
//! the school's data, including:
//!
//! - `AttendanceSheet`, `AttendanceEntry`, `AttendanceStatus`: daily records
//! - `SchoolClass`, `Student`, `RosterMember`, `ClassMembership`: rosters
//! - `User`, `Role`, `Actor`: accounts and the role ladder
//! - `SchoolSettings`, `YearMonth`: report signatories and periods
//!
//! Serde field names follow the persisted document format.

pub mod attendance;
pub mod roster;
pub mod school;
pub mod user;

pub use attendance::{
    normalize_note, AttendanceEntry, AttendanceSheet, AttendanceStatus, StatusCounts, NO_NOTE,
};
pub use roster::{
    sort_roster, ClassMembership, NewStudent, RosterMember, SchoolClass, Student, StudentPatch,
};
pub use school::{SchoolSettings, YearMonth};
pub use user::{Actor, Role, User};
