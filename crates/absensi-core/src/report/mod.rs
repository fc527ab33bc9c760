//! Printable report documents.
//!
//! The structs here hold everything a report shows, already ordered and
//! formatted. `xlsx` turns them into workbooks.

pub mod xlsx;

use chrono::NaiveDate;

use crate::attendance::monthly::MonthlyGrid;
use crate::models::{AttendanceSheet, SchoolSettings, StatusCounts, YearMonth, NO_NOTE};

pub const DAILY_TITLE: &str = "LAPORAN ABSENSI HARIAN";
pub const MONTHLY_TITLE: &str = "REKAP ABSENSI BULANAN";
pub const MONTHLY_LEGEND: &str = "Ket: [H]adir, [S]akit, [I]zin, [A]lpa, [-]Kosong";
pub const DAILY_HEADERS: [&str; 5] = ["No", "NIS", "Nama Siswa", "Status", "Keterangan"];

/// Closing signature block shared by both reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signatory {
    pub acknowledgement: &'static str,
    pub role: &'static str,
    pub principal_name: Option<String>,
    pub principal_nip: Option<String>,
}

impl Signatory {
    pub fn from_settings(settings: &SchoolSettings) -> Self {
        Self {
            acknowledgement: "Mengetahui,",
            role: "Wali Kelas / Guru Piket",
            principal_name: non_blank(settings.principal_name.as_deref()),
            principal_nip: non_blank(settings.principal_nip.as_deref()),
        }
    }

    /// The block as printed lines, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.acknowledgement.to_string(), self.role.to_string()];
        if let Some(name) = &self.principal_name {
            lines.push(String::new());
            lines.push(name.clone());
        }
        if let Some(nip) = &self.principal_nip {
            lines.push(format!("NIP. {}", nip));
        }
        lines
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRow {
    pub no: usize,
    pub nis: String,
    pub name: String,
    pub status: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    pub class_id: String,
    pub date: NaiveDate,
    pub counts: StatusCounts,
    pub rows: Vec<DailyRow>,
    pub signatory: Signatory,
}

impl DailyReport {
    pub fn new(sheet: &AttendanceSheet, settings: &SchoolSettings) -> Self {
        let rows = sheet
            .sorted_entries()
            .into_iter()
            .enumerate()
            .map(|(i, (_, entry))| DailyRow {
                no: i + 1,
                nis: dash_if_blank(&entry.student_number),
                name: entry.name.clone(),
                status: entry.status.to_string(),
                note: dash_if_blank(&entry.note),
            })
            .collect();
        Self {
            class_id: sheet.class_id.clone(),
            date: sheet.date,
            counts: sheet.counts(),
            rows,
            signatory: Signatory::from_settings(settings),
        }
    }

    pub fn summary(&self) -> String {
        format!("Ringkasan: {}", self.counts.summary())
    }

    pub fn file_name(&self) -> String {
        format!("Absensi_{}_{}.xlsx", self.class_id, self.date.format("%Y-%m-%d"))
    }
}

fn dash_if_blank(value: &str) -> String {
    if value.trim().is_empty() {
        NO_NOTE.to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyReport {
    pub grid: MonthlyGrid,
    pub signatory: Signatory,
}

impl MonthlyReport {
    pub fn new(grid: MonthlyGrid, settings: &SchoolSettings) -> Self {
        Self {
            grid,
            signatory: Signatory::from_settings(settings),
        }
    }

    pub fn class_id(&self) -> &str {
        &self.grid.class_id
    }

    pub fn month(&self) -> YearMonth {
        self.grid.month
    }

    /// Column headers: No, Nama, one per day, the four totals, then notes.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec!["No".to_string(), "Nama".to_string()];
        headers.extend((1..=self.grid.days).map(|d| d.to_string()));
        headers.extend(["H", "S", "I", "A", "Catatan"].map(String::from));
        headers
    }

    pub fn file_name(&self) -> String {
        format!("Rekap_Bulanan_{}_{}.xlsx", self.grid.class_id, self.grid.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::monthly::aggregate;
    use crate::models::{AttendanceStatus, RosterMember};

    fn roster() -> Vec<RosterMember> {
        vec![
            RosterMember {
                id: "S2".into(),
                name: "Budi".into(),
                nis: "".into(),
            },
            RosterMember {
                id: "S1".into(),
                name: "Ana".into(),
                nis: "1001".into(),
            },
        ]
    }

    fn settings() -> SchoolSettings {
        SchoolSettings {
            principal_name: Some("Drs. Sutrisno".into()),
            principal_nip: Some("196501011990031001".into()),
        }
    }

    #[test]
    fn test_daily_report_rows_and_summary() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut sheet = AttendanceSheet::seed(date, "XA", &roster());
        if let Some(e) = sheet.students.get_mut("S1") {
            e.status = AttendanceStatus::Sakit;
            e.note = "Demam".into();
        }

        let report = DailyReport::new(&sheet, &settings());
        assert_eq!(report.summary(), "Ringkasan: H=1 | S=1 | I=0 | A=0");
        assert_eq!(report.file_name(), "Absensi_XA_2024-03-01.xlsx");
        assert_eq!(
            report.rows[0],
            DailyRow {
                no: 1,
                nis: "1001".into(),
                name: "Ana".into(),
                status: "Sakit".into(),
                note: "Demam".into(),
            }
        );
        assert_eq!(report.rows[1].nis, "-");
    }

    #[test]
    fn test_signatory_lines() {
        let full = Signatory::from_settings(&settings());
        assert_eq!(
            full.lines(),
            vec![
                "Mengetahui,",
                "Wali Kelas / Guru Piket",
                "",
                "Drs. Sutrisno",
                "NIP. 196501011990031001"
            ]
        );

        let blank = Signatory::from_settings(&SchoolSettings {
            principal_name: Some("  ".into()),
            principal_nip: None,
        });
        assert_eq!(blank.lines(), vec!["Mengetahui,", "Wali Kelas / Guru Piket"]);
    }

    #[test]
    fn test_monthly_headers_and_file_name() {
        let month: YearMonth = "2024-02".parse().unwrap();
        let report = MonthlyReport::new(aggregate("XA", &roster(), &[], month), &settings());
        let headers = report.headers();
        assert_eq!(headers.len(), 2 + 29 + 5);
        assert_eq!(headers[2], "1");
        assert_eq!(headers[30], "29");
        assert_eq!(headers.last().map(String::as_str), Some("Catatan"));
        assert_eq!(report.file_name(), "Rekap_Bulanan_XA_2024-02.xlsx");
    }
}
