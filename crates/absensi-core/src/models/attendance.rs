use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::RosterMember;

/// Placeholder used for an absent note, both on screen and in storage.
pub const NO_NOTE: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AttendanceStatus {
    Hadir,
    Sakit,
    Izin,
    Alpa,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Hadir,
        AttendanceStatus::Sakit,
        AttendanceStatus::Izin,
        AttendanceStatus::Alpa,
    ];

    /// Single-letter code used in the monthly grid.
    pub fn code(&self) -> char {
        match self {
            AttendanceStatus::Hadir => 'H',
            AttendanceStatus::Sakit => 'S',
            AttendanceStatus::Izin => 'I',
            AttendanceStatus::Alpa => 'A',
        }
    }

    /// Whether a free-text note is kept for this status.
    pub fn takes_note(&self) -> bool {
        !matches!(self, AttendanceStatus::Hadir)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Hadir => "Hadir",
            AttendanceStatus::Sakit => "Sakit",
            AttendanceStatus::Izin => "Izin",
            AttendanceStatus::Alpa => "Alpa",
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    /// Accepts the full name or the single-letter code, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "hadir" | "h" => Ok(AttendanceStatus::Hadir),
            "sakit" | "s" => Ok(AttendanceStatus::Sakit),
            "izin" | "i" => Ok(AttendanceStatus::Izin),
            "alpa" | "a" => Ok(AttendanceStatus::Alpa),
            _ => Err(format!("unknown attendance status: {}", s)),
        }
    }
}

/// Normalize a note: blank becomes "-".
pub fn normalize_note(note: Option<&str>) -> String {
    match note.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => NO_NOTE.to_string(),
    }
}

fn default_note() -> String {
    NO_NOTE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AttendanceEntry {
    #[serde(rename = "nama")]
    pub name: String,
    #[serde(rename = "nis", default)]
    pub student_number: String,
    pub status: AttendanceStatus,
    #[serde(rename = "keterangan", default = "default_note")]
    pub note: String,
}

impl AttendanceEntry {
    pub fn present(member: &RosterMember) -> Self {
        Self {
            name: member.name.clone(),
            student_number: member.nis.clone(),
            status: AttendanceStatus::Hadir,
            note: NO_NOTE.to_string(),
        }
    }
}

/// Per-status totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub hadir: u32,
    pub sakit: u32,
    pub izin: u32,
    pub alpa: u32,
}

impl StatusCounts {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Hadir => self.hadir += 1,
            AttendanceStatus::Sakit => self.sakit += 1,
            AttendanceStatus::Izin => self.izin += 1,
            AttendanceStatus::Alpa => self.alpa += 1,
        }
    }

    pub fn get(&self, status: AttendanceStatus) -> u32 {
        match status {
            AttendanceStatus::Hadir => self.hadir,
            AttendanceStatus::Sakit => self.sakit,
            AttendanceStatus::Izin => self.izin,
            AttendanceStatus::Alpa => self.alpa,
        }
    }

    pub fn total(&self) -> u32 {
        self.hadir + self.sakit + self.izin + self.alpa
    }

    pub fn summary(&self) -> String {
        format!(
            "H={} | S={} | I={} | A={}",
            self.hadir, self.sakit, self.izin, self.alpa
        )
    }
}

/// One attendance record for a class on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSheet {
    #[serde(rename = "tanggal")]
    pub date: NaiveDate,
    #[serde(rename = "kelas")]
    pub class_id: String,
    #[serde(rename = "siswa", default)]
    pub students: BTreeMap<String, AttendanceEntry>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
}

impl AttendanceSheet {
    /// Document id of the sheet for a class on a date.
    pub fn id_for(date: NaiveDate, class_id: &str) -> String {
        format!("{}_{}", date.format("%Y-%m-%d"), class_id)
    }

    /// A fresh sheet with every roster member marked present.
    pub fn seed(date: NaiveDate, class_id: &str, roster: &[RosterMember]) -> Self {
        let students = roster
            .iter()
            .map(|m| (m.id.clone(), AttendanceEntry::present(m)))
            .collect();
        Self {
            date,
            class_id: class_id.to_string(),
            students,
            is_locked: false,
            created_at: None,
            updated_at: None,
            locked_at: None,
        }
    }

    pub fn doc_id(&self) -> String {
        Self::id_for(self.date, &self.class_id)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.students.values() {
            counts.add(entry.status);
        }
        counts
    }

    /// Entries ordered by student name, ties broken by id.
    pub fn sorted_entries(&self) -> Vec<(&String, &AttendanceEntry)> {
        let mut entries: Vec<_> = self.students.iter().collect();
        entries.sort_by(|a, b| {
            a.1.name
                .to_lowercase()
                .cmp(&b.1.name.to_lowercase())
                .then_with(|| a.0.cmp(b.0))
        });
        entries
    }
}
