//! Attendance sheet state machine.
//!
//! ```text
//!   UNSET --seeded/resumed--> DRAFT --committed--> SAVED --locked--> LOCKED
//!                               ^                    |                  |
//!                               +----apply_status----+                  |
//!                                                  SAVED <--unlocked----+
//! ```
//!
//! Every function here is pure: it takes the current session and returns the
//! next one, or the reason the transition is refused. The service layer does
//! the IO around them.

use chrono::{DateTime, Utc};

use crate::error::PolicyError;
use crate::models::{normalize_note, AttendanceSheet, AttendanceStatus, NO_NOTE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetState {
    Unset,
    Draft,
    Saved,
    Locked,
}

impl std::fmt::Display for SheetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SheetState::Unset => "unset",
            SheetState::Draft => "draft",
            SheetState::Saved => "saved",
            SheetState::Locked => "locked",
        })
    }
}

/// The sheet being worked on, plus whether it differs from the stored copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceSession {
    pub sheet: Option<AttendanceSheet>,
    /// Edited since the last successful save.
    pub dirty: bool,
    /// A copy exists in the remote store.
    pub persisted: bool,
}

impl AttendanceSession {
    pub fn state(&self) -> SheetState {
        match &self.sheet {
            None => SheetState::Unset,
            Some(sheet) if sheet.is_locked => SheetState::Locked,
            Some(_) if self.dirty || !self.persisted => SheetState::Draft,
            Some(_) => SheetState::Saved,
        }
    }

    fn sheet(&self) -> Result<&AttendanceSheet, PolicyError> {
        self.sheet.as_ref().ok_or(PolicyError::NoSheetOpen)
    }

    fn editable(&self) -> Result<&AttendanceSheet, PolicyError> {
        let sheet = self.sheet()?;
        if sheet.is_locked {
            return Err(PolicyError::SheetLocked(sheet.doc_id()));
        }
        Ok(sheet)
    }
}

/// A brand new sheet seeded from the roster.
pub fn seeded(sheet: AttendanceSheet) -> AttendanceSession {
    AttendanceSession {
        sheet: Some(sheet),
        dirty: true,
        persisted: false,
    }
}

/// A sheet read back from the store or the sheet cache.
pub fn loaded(sheet: AttendanceSheet) -> AttendanceSession {
    AttendanceSession {
        sheet: Some(sheet),
        dirty: false,
        persisted: true,
    }
}

/// A local draft picked up again after a restart.
pub fn resumed(draft: AttendanceSheet) -> AttendanceSession {
    let persisted = draft.created_at.is_some();
    AttendanceSession {
        sheet: Some(draft),
        dirty: true,
        persisted,
    }
}

pub fn apply_status(
    session: AttendanceSession,
    student_id: &str,
    status: AttendanceStatus,
    note: Option<&str>,
) -> Result<AttendanceSession, PolicyError> {
    let sheet = session.editable()?;
    let entry = sheet
        .students
        .get(student_id)
        .ok_or_else(|| PolicyError::UnknownStudent(student_id.to_string()))?;

    let note = if status.takes_note() {
        normalize_note(note)
    } else {
        NO_NOTE.to_string()
    };
    if entry.status == status && entry.note == note {
        return Ok(session);
    }

    let mut session = session;
    if let Some(entry) = session
        .sheet
        .as_mut()
        .and_then(|s| s.students.get_mut(student_id))
    {
        entry.status = status;
        entry.note = note;
    }
    session.dirty = true;
    Ok(session)
}

/// The sheet to write on save, with its timestamps stamped.
pub fn prepare_save(
    session: &AttendanceSession,
    now: DateTime<Utc>,
) -> Result<AttendanceSheet, PolicyError> {
    let mut sheet = session.editable()?.clone();
    if sheet.created_at.is_none() {
        sheet.created_at = Some(now);
    }
    sheet.updated_at = Some(now);
    Ok(sheet)
}

pub fn committed(saved: AttendanceSheet) -> AttendanceSession {
    loaded(saved)
}

pub fn check_lock(session: &AttendanceSession) -> Result<&AttendanceSheet, PolicyError> {
    let sheet = session.sheet()?;
    if sheet.is_locked {
        return Err(PolicyError::AlreadyLocked(sheet.doc_id()));
    }
    if session.dirty || !session.persisted {
        return Err(PolicyError::UnsavedChanges);
    }
    Ok(sheet)
}

pub fn locked(session: AttendanceSession, at: DateTime<Utc>) -> AttendanceSession {
    let mut session = session;
    if let Some(sheet) = session.sheet.as_mut() {
        sheet.is_locked = true;
        sheet.locked_at = Some(at);
    }
    session
}

pub fn check_unlock(session: &AttendanceSession) -> Result<&AttendanceSheet, PolicyError> {
    let sheet = session.sheet()?;
    if !sheet.is_locked {
        return Err(PolicyError::NotLocked(sheet.doc_id()));
    }
    Ok(sheet)
}

pub fn unlocked(session: AttendanceSession) -> AttendanceSession {
    let mut session = session;
    if let Some(sheet) = session.sheet.as_mut() {
        sheet.is_locked = false;
    }
    session.dirty = false;
    session.persisted = true;
    session
}

pub fn check_export(session: &AttendanceSession) -> Result<&AttendanceSheet, PolicyError> {
    let sheet = session.sheet()?;
    if !sheet.is_locked {
        return Err(PolicyError::ExportRequiresLock);
    }
    Ok(sheet)
}
