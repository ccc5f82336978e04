// src/converters/workbook.rs
use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};

use crate::extractors::TestCaseMap;
use crate::utils::error::ConvertError;

use super::{base_name, NormalizedCase, OverwritePolicy, TEST_CASE_FIELDS};

// xlsx sheet names are limited to 31 characters.
const MAX_SHEET_NAME: usize = 31;
// Column width cap, in character widths.
const MAX_COLUMN_WIDTH: usize = 50;

/// Writes all destinations into one workbook, one sheet per destination.
pub struct ExcelConverter {
    output_dir: PathBuf,
}

impl ExcelConverter {
    /// Creates the converter, making sure the output directory exists.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self, ConvertError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    /// Converts all test cases to a single workbook with one sheet per
    /// non-empty destination. Returns the workbook path, or `None` when
    /// there is nothing to write, the overwrite was declined, or the write
    /// failed (logged, never raised to the caller).
    pub fn convert(
        &self,
        test_cases: &TestCaseMap,
        policy: &mut OverwritePolicy,
    ) -> Option<PathBuf> {
        if test_cases.iter().all(|(_, cases)| cases.is_empty()) {
            tracing::warn!("No test cases to convert to Excel");
            return None;
        }

        let excel_path = self.output_dir.join("test_cases.xlsx");
        if excel_path.exists() && !policy.allows(&excel_path) {
            tracing::info!("Skipping Excel file creation");
            return None;
        }

        match write_workbook(&excel_path, test_cases) {
            Ok(()) => {
                tracing::info!("Created Excel file: {}", excel_path.display());
                Some(excel_path)
            }
            Err(err) => {
                tracing::error!(
                    "Error creating Excel file {}: {}",
                    excel_path.display(),
                    err
                );
                None
            }
        }
    }
}

fn write_workbook(path: &Path, test_cases: &TestCaseMap) -> Result<(), ConvertError> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xDDDDDD))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    let data_format = Format::new().set_text_wrap();

    for (name, cases) in test_cases.iter() {
        if cases.is_empty() {
            continue;
        }

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(name))?;

        // Track the widest cell per column while writing.
        let mut widths = TEST_CASE_FIELDS.map(|field| field.chars().count());

        for (col, field) in TEST_CASE_FIELDS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *field, &header_format)?;
        }

        for (row, case) in cases.iter().enumerate() {
            let normalized = NormalizedCase::from_record(case);
            for (col, value) in normalized.values().iter().enumerate() {
                worksheet.write_string_with_format(
                    row as u32 + 1,
                    col as u16,
                    *value,
                    &data_format,
                )?;
                widths[col] = widths[col].max(value.chars().count());
            }
        }

        for (col, width) in widths.iter().enumerate() {
            let adjusted = (width + 2).min(MAX_COLUMN_WIDTH);
            worksheet.set_column_width(col as u16, adjusted as f64)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Sheet name for a destination: its base name truncated to the xlsx limit.
fn sheet_name(name: &str) -> String {
    base_name(name).chars().take(MAX_SHEET_NAME).collect()
}
