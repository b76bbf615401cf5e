// Spreadsheet export of a filtered view

use chrono::{DateTime, Local, TimeZone, Utc};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::filter::FilterState;
use crate::locale;
use crate::record::AbsenceRecord;

/// Column headers, in output order
pub const HEADERS: [&str; 7] = ["No", "Nama Siswa", "Kelas", "Jenis", "Alasan", "Tanggal", "Waktu Input"];

/// Column widths in character units, matching `HEADERS`
pub const COLUMN_WIDTHS: [f64; 7] = [4.0, 30.0, 10.0, 15.0, 30.0, 25.0, 15.0];

const MAX_SHEET_NAME_CHARS: usize = 31;
const ALL_CLASSES_SHEET: &str = "Semua Kelas";

/// Errors that can occur while exporting
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No data to export")]
    NoData,

    #[error("Spreadsheet encoding failed: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One spreadsheet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub no: usize,
    pub student_name: String,
    pub class_name: String,
    pub absence_type: String,
    pub reason: String,
    pub date: String,
    pub input_time: String,
}

impl ExportRow {
    /// Text cells after `No`, in column order
    pub fn text_cells(&self) -> [&str; 6] {
        [
            self.student_name.as_str(),
            self.class_name.as_str(),
            self.absence_type.as_str(),
            self.reason.as_str(),
            self.date.as_str(),
            self.input_time.as_str(),
        ]
    }
}

/// Build the rows for `view`, rendering dates and times in `tz`
pub fn export_rows<Tz: TimeZone>(view: &[&AbsenceRecord], tz: &Tz) -> Vec<ExportRow> {
    view.iter()
        .enumerate()
        .map(|(i, record)| ExportRow {
            no: i + 1,
            student_name: record.student_name.clone(),
            class_name: record.class_name.clone(),
            absence_type: record.absence_type.label().to_string(),
            reason: record.reason.clone(),
            date: locale::long_date(record.date.with_timezone(tz).date_naive()),
            input_time: DateTime::<Utc>::from_timestamp_millis(record.timestamp)
                .map(|created| locale::time_of_day(created.with_timezone(tz).time()))
                .unwrap_or_default(),
        })
        .collect()
}

/// `Kelas {class}` or `Semua Kelas`, made safe for use as a worksheet name
///
/// Excel forbids `[]:*?/\`, more than 31 characters, and a leading or
/// trailing apostrophe.
pub fn sheet_name(filters: &FilterState) -> String {
    if filters.class_name.is_empty() {
        return ALL_CLASSES_SHEET.to_string();
    }

    let name: String = format!("Kelas {}", filters.class_name)
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(MAX_SHEET_NAME_CHARS)
        .collect();

    // The "Kelas" prefix rules out a leading apostrophe
    name.trim_end_matches('\'').to_string()
}

/// `Rekap_Absensi_{class or Semua}_{month or All}.xlsx`
pub fn file_name(filters: &FilterState) -> String {
    let class_part = if filters.class_name.is_empty() { "Semua" } else { &filters.class_name };
    let month_part = if filters.month.is_empty() { "All" } else { &filters.month };
    let name = format!("Rekap_Absensi_{}_{}.xlsx", class_part, month_part);
    name.replace(['/', '\\'], "_")
}

/// Encode `view` as an xlsx workbook. An empty view is rejected.
pub fn encode_xlsx<Tz: TimeZone>(
    view: &[&AbsenceRecord],
    filters: &FilterState,
    tz: &Tz,
) -> Result<Vec<u8>, ExportError> {
    if view.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    let bold = Format::new().set_bold();

    worksheet.set_name(sheet_name(filters).as_str())?;

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, row) in export_rows(view, tz).iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_number(r, 0, row.no as f64)?;
        for (offset, cell) in row.text_cells().iter().enumerate() {
            worksheet.write_string(r, (offset + 1) as u16, *cell)?;
        }
    }

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Encode `view` and write it into `dir` under `file_name(filters)`, using local time
pub fn write_export(dir: &Path, view: &[&AbsenceRecord], filters: &FilterState) -> Result<PathBuf, ExportError> {
    write_export_in(dir, view, filters, &Local)
}

/// Encode `view` with dates in `tz` and write it into `dir`
pub fn write_export_in<Tz: TimeZone>(
    dir: &Path,
    view: &[&AbsenceRecord],
    filters: &FilterState,
    tz: &Tz,
) -> Result<PathBuf, ExportError> {
    let bytes = encode_xlsx(view, filters, tz)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(file_name(filters));
    fs::write(&path, &bytes)?;

    info!(path = ?path, rows = view.len(), bytes = bytes.len(), "Exported absence records");
    Ok(path)
}
