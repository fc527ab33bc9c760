//! Monthly calendar grid built from daily sheets.

use std::collections::HashMap;

use chrono::Datelike;

use crate::models::{
    sort_roster, AttendanceEntry, AttendanceSheet, RosterMember, StatusCounts, YearMonth, NO_NOTE,
};

/// Cell value for a day with no saved sheet.
pub const EMPTY_CELL: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRow {
    pub student_id: String,
    pub name: String,
    pub nis: String,
    /// One cell per day of the month, `cells[0]` is day 1.
    pub cells: Vec<String>,
    pub totals: StatusCounts,
    /// "Tgl d:Status(note)" for every absence that carries a note.
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyGrid {
    pub class_id: String,
    pub month: YearMonth,
    pub days: u32,
    pub rows: Vec<MonthlyRow>,
}

/// Build the grid for `roster` from whatever sheets exist in `month`.
///
/// Students found in sheets but missing from the roster are ignored, as are
/// sheets dated outside the month.
pub fn aggregate(
    class_id: &str,
    roster: &[RosterMember],
    sheets: &[AttendanceSheet],
    month: YearMonth,
) -> MonthlyGrid {
    let days = month.days();

    let mut by_student: HashMap<&str, HashMap<u32, &AttendanceEntry>> = HashMap::new();
    for sheet in sheets.iter().filter(|s| month.contains(s.date)) {
        let day = sheet.date.day();
        for (id, entry) in &sheet.students {
            by_student.entry(id.as_str()).or_default().insert(day, entry);
        }
    }

    let mut members = roster.to_vec();
    sort_roster(&mut members);

    let rows = members
        .into_iter()
        .map(|member| {
            let history = by_student.get(member.id.as_str());
            let mut cells = Vec::with_capacity(days as usize);
            let mut totals = StatusCounts::default();
            let mut notes = Vec::new();

            for day in 1..=days {
                match history.and_then(|h| h.get(&day)) {
                    Some(entry) => {
                        cells.push(entry.status.code().to_string());
                        totals.add(entry.status);
                        if entry.status.takes_note() && entry.note != NO_NOTE && !entry.note.is_empty() {
                            notes.push(format!("Tgl {}:{}({})", day, entry.status, entry.note));
                        }
                    }
                    None => cells.push(EMPTY_CELL.to_string()),
                }
            }

            MonthlyRow {
                student_id: member.id,
                name: member.name,
                nis: member.nis,
                cells,
                totals,
                notes,
            }
        })
        .collect();

    MonthlyGrid {
        class_id: class_id.to_string(),
        month,
        days,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::NaiveDate;

    fn roster() -> Vec<RosterMember> {
        vec![
            RosterMember {
                id: "S2".into(),
                name: "Budi".into(),
                nis: "1002".into(),
            },
            RosterMember {
                id: "S1".into(),
                name: "Ana".into(),
                nis: "1001".into(),
            },
        ]
    }

    fn sheet(day: u32, edits: &[(&str, AttendanceStatus, &str)]) -> AttendanceSheet {
        let date = NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
        let mut sheet = AttendanceSheet::seed(date, "XA", &roster());
        for (id, status, note) in edits {
            let entry = sheet.students.get_mut(*id).unwrap();
            entry.status = *status;
            entry.note = note.to_string();
        }
        sheet
    }

    #[test]
    fn test_empty_month_is_all_dashes() {
        let month: YearMonth = "2024-02".parse().unwrap();
        let grid = aggregate("XA", &roster(), &[], month);
        assert_eq!(grid.days, 29);
        assert_eq!(grid.rows.len(), 2);
        for row in &grid.rows {
            assert_eq!(row.cells.len(), 29);
            assert!(row.cells.iter().all(|c| c == "-"));
            assert_eq!(row.totals, StatusCounts::default());
            assert!(row.notes.is_empty());
        }
    }

    #[test]
    fn test_codes_totals_and_notes() {
        let month: YearMonth = "2024-02".parse().unwrap();
        let sheets = vec![
            sheet(1, &[("S1", AttendanceStatus::Sakit, "Demam")]),
            sheet(2, &[("S1", AttendanceStatus::Alpa, "-")]),
            sheet(5, &[("S2", AttendanceStatus::Izin, "Lomba")]),
        ];
        let grid = aggregate("XA", &roster(), &sheets, month);

        let ana = &grid.rows[0];
        assert_eq!(ana.name, "Ana");
        assert_eq!(&ana.cells[..6], &["S", "A", "-", "-", "H", "-"]);
        assert_eq!(ana.totals.sakit, 1);
        assert_eq!(ana.totals.alpa, 1);
        assert_eq!(ana.totals.hadir, 1);
        assert_eq!(ana.notes, vec!["Tgl 1:Sakit(Demam)"]);

        let budi = &grid.rows[1];
        assert_eq!(budi.totals.hadir, 2);
        assert_eq!(budi.totals.izin, 1);
        assert_eq!(budi.notes, vec!["Tgl 5:Izin(Lomba)"]);
    }

    #[test]
    fn test_unknown_students_and_foreign_dates_are_ignored() {
        let month: YearMonth = "2024-02".parse().unwrap();
        let mut stray = sheet(3, &[]);
        stray.students.insert(
            "S9".into(),
            AttendanceEntry {
                name: "Zed".into(),
                student_number: "9".into(),
                status: AttendanceStatus::Alpa,
                note: "-".into(),
            },
        );
        let mut march = sheet(4, &[]);
        march.date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let grid = aggregate("XA", &roster(), &[stray, march], month);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0].totals.total(), 1);
        assert_eq!(grid.rows[0].cells[3], "-");
    }
}
