//! Workbook rendering for attendance reports.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::info;

use super::{DailyReport, MonthlyReport, Signatory, DAILY_HEADERS, DAILY_TITLE, MONTHLY_LEGEND, MONTHLY_TITLE};
use crate::error::ReportError;

struct ReportFormats {
    title: Format,
    header: Format,
    cell: Format,
    left_text: Format,
    bold_cell: Format,
    plain: Format,
}

impl ReportFormats {
    fn new() -> Self {
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            header: Format::new()
                .set_bold()
                .set_border(FormatBorder::Thin)
                .set_background_color(0xF0F0F0)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            cell: Format::new()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            left_text: Format::new()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap(),
            bold_cell: Format::new()
                .set_bold()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            plain: Format::new().set_align(FormatAlign::Left),
        }
    }
}

fn write_signatory(
    ws: &mut Worksheet,
    start_row: u32,
    col: u16,
    signatory: &Signatory,
    fmt: &ReportFormats,
) -> Result<u32, XlsxError> {
    let mut row = start_row;
    for line in signatory.lines() {
        ws.write_string_with_format(row, col, line, &fmt.plain)?;
        row += 1;
    }
    Ok(row)
}

fn write_daily_sheet(ws: &mut Worksheet, report: &DailyReport, fmt: &ReportFormats) -> Result<(), XlsxError> {
    ws.set_name("Harian")?;
    ws.merge_range(0, 0, 0, 4, DAILY_TITLE, &fmt.title)?;
    ws.write_string_with_format(2, 0, format!("Kelas: {}", report.class_id), &fmt.plain)?;
    ws.write_string_with_format(3, 0, format!("Tanggal: {}", report.date.format("%Y-%m-%d")), &fmt.plain)?;
    ws.write_string_with_format(4, 0, report.summary(), &fmt.plain)?;

    let header_row = 6;
    for (col, title) in DAILY_HEADERS.iter().enumerate() {
        ws.write_string_with_format(header_row, col as u16, *title, &fmt.header)?;
    }

    let mut row = header_row + 1;
    for r in &report.rows {
        ws.write_number_with_format(row, 0, r.no as f64, &fmt.cell)?;
        ws.write_string_with_format(row, 1, &r.nis, &fmt.left_text)?;
        ws.write_string_with_format(row, 2, &r.name, &fmt.left_text)?;
        ws.write_string_with_format(row, 3, &r.status, &fmt.bold_cell)?;
        ws.write_string_with_format(row, 4, &r.note, &fmt.left_text)?;
        row += 1;
    }

    for (col, width) in [6.0, 14.0, 32.0, 10.0, 30.0].iter().enumerate() {
        ws.set_column_width(col as u16, *width)?;
    }

    write_signatory(ws, row + 2, 3, &report.signatory, fmt)?;
    Ok(())
}

fn write_monthly_sheet(ws: &mut Worksheet, report: &MonthlyReport, fmt: &ReportFormats) -> Result<(), XlsxError> {
    let grid = &report.grid;
    let headers = report.headers();
    let last_col = (headers.len() - 1) as u16;

    ws.set_name("Rekap")?;
    ws.set_landscape();
    ws.merge_range(0, 0, 0, last_col, MONTHLY_TITLE, &fmt.title)?;
    ws.write_string_with_format(
        2,
        0,
        format!("Kelas: {} | Periode: {}", grid.class_id, grid.month),
        &fmt.plain,
    )?;
    ws.write_string_with_format(3, 0, MONTHLY_LEGEND, &fmt.plain)?;

    let header_row = 5;
    for (col, title) in headers.iter().enumerate() {
        ws.write_string_with_format(header_row, col as u16, title, &fmt.header)?;
    }

    let mut row = header_row + 1;
    for (i, r) in grid.rows.iter().enumerate() {
        ws.write_number_with_format(row, 0, (i + 1) as f64, &fmt.cell)?;
        ws.write_string_with_format(row, 1, &r.name, &fmt.left_text)?;

        let mut col: u16 = 2;
        for cell in &r.cells {
            let format = if matches!(cell.as_str(), "S" | "I" | "A") {
                &fmt.bold_cell
            } else {
                &fmt.cell
            };
            ws.write_string_with_format(row, col, cell, format)?;
            col += 1;
        }
        for total in [r.totals.hadir, r.totals.sakit, r.totals.izin, r.totals.alpa] {
            ws.write_number_with_format(row, col, total, &fmt.cell)?;
            col += 1;
        }
        ws.write_string_with_format(row, col, r.notes.join(", "), &fmt.left_text)?;
        row += 1;
    }

    ws.set_column_width(0, 5)?;
    ws.set_column_width(1, 28)?;
    for col in 2..(2 + grid.days as u16 + 4) {
        ws.set_column_width(col, 3.5)?;
    }
    ws.set_column_width(last_col, 40)?;

    write_signatory(ws, row + 2, last_col, &report.signatory, fmt)?;
    Ok(())
}

/// Render the daily report into an in-memory workbook file.
pub fn daily_to_buffer(report: &DailyReport) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    write_daily_sheet(workbook.add_worksheet(), report, &ReportFormats::new())?;
    Ok(workbook.save_to_buffer()?)
}

pub fn monthly_to_buffer(report: &MonthlyReport) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    write_monthly_sheet(workbook.add_worksheet(), report, &ReportFormats::new())?;
    Ok(workbook.save_to_buffer()?)
}

/// Write the daily report into `dir` under its standard file name.
pub fn save_daily(report: &DailyReport, dir: &Path) -> Result<PathBuf, ReportError> {
    let path = dir.join(report.file_name());
    std::fs::write(&path, daily_to_buffer(report)?)?;
    info!(path = %path.display(), "Daily report written");
    Ok(path)
}

pub fn save_monthly(report: &MonthlyReport, dir: &Path) -> Result<PathBuf, ReportError> {
    let path = dir.join(report.file_name());
    std::fs::write(&path, monthly_to_buffer(report)?)?;
    info!(path = %path.display(), "Monthly report written");
    Ok(path)
}
