// src/converters/tabular.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::extractors::{Record, TestCaseMap};
use crate::utils::error::ConvertError;

use super::{base_name, NormalizedCase, OverwritePolicy};

/// Writes one CSV file per destination into the output directory.
pub struct CsvConverter {
    output_dir: PathBuf,
}

impl CsvConverter {
    /// Creates the converter, making sure the output directory exists.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self, ConvertError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    /// Converts every destination with at least one record to a CSV file.
    /// Returns the destinations actually written with their output paths.
    /// A failure on one file is logged and does not stop the others.
    pub fn convert(
        &self,
        test_cases: &TestCaseMap,
        policy: &mut OverwritePolicy,
    ) -> Vec<(String, PathBuf)> {
        let mut written = Vec::new();

        for (name, cases) in test_cases.iter() {
            if cases.is_empty() {
                tracing::warn!("No test cases to convert for {}", name);
                continue;
            }

            let output_path = self.output_dir.join(format!("{}.csv", base_name(name)));
            if output_path.exists() && !policy.allows(&output_path) {
                tracing::info!("Skipping {}", output_path.display());
                continue;
            }

            match write_csv(&output_path, cases) {
                Ok(()) => {
                    tracing::info!("Created CSV file: {}", output_path.display());
                    written.push((name.to_string(), output_path));
                }
                Err(err) => {
                    tracing::error!(
                        "Error creating CSV file {}: {}",
                        output_path.display(),
                        err
                    );
                }
            }
        }

        written
    }
}

/// Header row comes from the serde renames on [`NormalizedCase`], one data
/// row per record in encounter order.
fn write_csv(path: &Path, cases: &[Record]) -> Result<(), ConvertError> {
    let mut writer = csv::Writer::from_path(path)?;
    for case in cases {
        writer.serialize(NormalizedCase::from_record(case))?;
    }
    writer.flush()?;
    Ok(())
}
