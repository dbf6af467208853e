use crate::error::{AppError, Result};
use std::io;
use std::iter;

/// Cell values of a single sheet. The first fetched row names the columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetValues {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SheetValues {
    /// Split raw rows into header and data. Returns `None` when there are no rows.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        let header = rows.remove(0);
        Some(Self { header, rows })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Write the header followed by every data row as comma-separated values.
    ///
    /// Rows shorter than the header are padded with empty cells; longer rows
    /// are written as-is.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        writer.write_record(&self.header)?;

        let width = self.header.len();
        for row in &self.rows {
            let padding = iter::repeat_n("", width.saturating_sub(row.len()));
            writer.write_record(row.iter().map(String::as_str).chain(padding))?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| AppError::Other(e.into()))
    }
}
