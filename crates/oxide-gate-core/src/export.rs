//! Member export formatting.
//!
//! Maps remote participants onto spreadsheet rows and writes them either as
//! XLSX (feature `xlsx`) or as a semicolon-delimited, fully quoted CSV with a
//! UTF-8 signature.

use crate::phone::normalize_phone;
use crate::remote::Participant;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Column headers, in output order
pub const HEADERS: [&str; 6] = [
    "TelegramID",
    "Status",
    "Username",
    "FullName",
    "Phone",
    "JoinedDate",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors that can occur while writing an export file
#[derive(Error, Debug)]
pub enum ExportError {
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Spreadsheet engine failure
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
}

/// Output format of an export file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Excel workbook
    Xlsx,
    /// Semicolon-delimited CSV
    Csv,
}

impl ExportFormat {
    /// File extension
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

/// One exported member
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRow {
    /// Numeric user id
    pub id: i64,
    /// `Admin` or `User`
    pub status: &'static str,
    /// `@username` or empty
    pub username: String,
    /// First and last name
    pub full_name: String,
    /// Normalized phone or empty
    pub phone: String,
    /// `YYYY-MM-DD` or empty
    pub joined: String,
}

impl MemberRow {
    /// Cell values in header order
    #[must_use]
    pub fn cells(&self) -> [String; 6] {
        [
            self.id.to_string(),
            self.status.to_string(),
            self.username.clone(),
            self.full_name.clone(),
            self.phone.clone(),
            self.joined.clone(),
        ]
    }
}

impl From<&Participant> for MemberRow {
    fn from(p: &Participant) -> Self {
        let username = match p.username.as_deref() {
            Some(name) if !name.is_empty() && name.starts_with('@') => name.to_string(),
            Some(name) if !name.is_empty() => format!("@{name}"),
            _ => String::new(),
        };
        let full_name = format!(
            "{} {}",
            p.first_name,
            p.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string();
        let phone = p
            .phone
            .as_deref()
            .filter(|phone| !phone.is_empty())
            .map(normalize_phone)
            .unwrap_or_default();

        Self {
            id: p.id,
            status: if p.is_admin { "Admin" } else { "User" },
            username,
            full_name,
            phone,
            joined: p
                .joined_at
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

/// File name of an export: `chat_members_<chat>_<unix ts>.<ext>`
#[must_use]
pub fn export_file_name(chat_id: i64, timestamp: i64, format: ExportFormat) -> String {
    format!("chat_members_{chat_id}_{timestamp}.{}", format.extension())
}

/// Render rows as CSV: `;` delimiter, every field quoted, UTF-8 signature.
#[must_use]
pub fn render_csv(rows: &[MemberRow]) -> Vec<u8> {
    fn quote(field: &str) -> String {
        format!("\"{}\"", field.replace('"', "\"\""))
    }
    fn line<'a>(fields: impl Iterator<Item = &'a str>) -> String {
        let mut out = fields.map(quote).collect::<Vec<_>>().join(";");
        out.push_str("\r\n");
        out
    }

    let mut out = UTF8_BOM.to_vec();
    out.extend_from_slice(line(HEADERS.iter().copied()).as_bytes());
    for row in rows {
        let cells = row.cells();
        out.extend_from_slice(line(cells.iter().map(String::as_str)).as_bytes());
    }
    out
}

/// Write a CSV export into `dir`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn write_csv(dir: &Path, file_name: &str, rows: &[MemberRow]) -> Result<PathBuf, ExportError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, render_csv(rows)).await?;
    Ok(path)
}

/// Column width used by the spreadsheet: `min(max(8, 1.1 * len + 2), 80)`
#[must_use]
pub fn column_width(longest: usize) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let scaled = (longest as f64 * 1.1) as u32 + 2;
    scaled.clamp(8, 80)
}

/// Write an XLSX export into `dir`.
///
/// # Errors
///
/// Returns an error if the workbook cannot be built or saved.
#[cfg(feature = "xlsx")]
pub async fn write_xlsx(dir: &Path, file_name: &str, rows: &[MemberRow]) -> Result<PathBuf, ExportError> {
    use rust_xlsxwriter::Workbook;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    let rows = rows.to_vec();
    let target = path.clone();

    tokio::task::spawn_blocking(move || -> Result<(), rust_xlsxwriter::XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Members")?;

        let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();
        for (col, header) in (0u16..).zip(HEADERS.iter()) {
            sheet.write_string(0, col, *header)?;
        }
        for (row_idx, row) in (1u32..).zip(rows.iter()) {
            sheet.write_number(row_idx, 0, row.id as f64)?;
            for (col, value) in (0u16..).zip(row.cells().iter()).skip(1) {
                sheet.write_string(row_idx, col, value.as_str())?;
            }
            for (width, value) in widths.iter_mut().zip(row.cells().iter()) {
                *width = (*width).max(value.chars().count());
            }
        }
        for (col, width) in (0u16..).zip(widths) {
            sheet.set_column_width(col, column_width(width))?;
        }

        workbook.save(&target)
    })
    .await
    .map_err(|e| ExportError::Spreadsheet(e.to_string()))?
    .map_err(|e| ExportError::Spreadsheet(e.to_string()))?;

    Ok(path)
}
