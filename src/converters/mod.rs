// src/converters/mod.rs
pub mod tabular;
pub mod workbook;

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::extractors::Record;

// Re-export the converters for convenience
pub use tabular::CsvConverter;
pub use workbook::ExcelConverter;

/// Canonical test-case columns, in output order.
pub const TEST_CASE_FIELDS: [&str; 15] = [
    "ID",
    "Name",
    "Description",
    "Pre-conditions",
    "Test Steps",
    "Expected Result",
    "Actual Result",
    "Test Data",
    "Priority",
    "Severity",
    "Status",
    "Environment",
    "Tested By",
    "Date",
    "Comments/Notes",
];

/// A record re-projected onto the canonical columns. Unknown input fields
/// are dropped; missing ones come out as empty strings. The serde renames
/// double as the CSV header row, so they must stay in lockstep with
/// [`TEST_CASE_FIELDS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedCase {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Pre-conditions")]
    pub pre_conditions: String,
    #[serde(rename = "Test Steps")]
    pub test_steps: String,
    #[serde(rename = "Expected Result")]
    pub expected_result: String,
    #[serde(rename = "Actual Result")]
    pub actual_result: String,
    #[serde(rename = "Test Data")]
    pub test_data: String,
    #[serde(rename = "Priority")]
    pub priority: String,
    #[serde(rename = "Severity")]
    pub severity: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Environment")]
    pub environment: String,
    #[serde(rename = "Tested By")]
    pub tested_by: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Comments/Notes")]
    pub comments: String,
}

impl NormalizedCase {
    /// Re-projects a raw record onto the canonical columns. An exact key
    /// match wins over a case-insensitive one; absent fields become empty.
    pub fn from_record(record: &Record) -> Self {
        let field = |name: &str| -> String {
            record
                .get(name)
                .or_else(|| record.get_ignore_case(name))
                .unwrap_or_default()
                .to_string()
        };

        Self {
            id: field("ID"),
            name: field("Name"),
            description: field("Description"),
            pre_conditions: field("Pre-conditions"),
            test_steps: field("Test Steps"),
            expected_result: field("Expected Result"),
            actual_result: field("Actual Result"),
            test_data: field("Test Data"),
            priority: field("Priority"),
            severity: field("Severity"),
            status: field("Status"),
            environment: field("Environment"),
            tested_by: field("Tested By"),
            date: field("Date"),
            comments: field("Comments/Notes"),
        }
    }

    /// Column values in canonical order.
    pub fn values(&self) -> [&str; 15] {
        [
            self.id.as_str(),
            self.name.as_str(),
            self.description.as_str(),
            self.pre_conditions.as_str(),
            self.test_steps.as_str(),
            self.expected_result.as_str(),
            self.actual_result.as_str(),
            self.test_data.as_str(),
            self.priority.as_str(),
            self.severity.as_str(),
            self.status.as_str(),
            self.environment.as_str(),
            self.tested_by.as_str(),
            self.date.as_str(),
            self.comments.as_str(),
        ]
    }
}

/// Decides what happens when an output file already exists.
pub enum OverwritePolicy {
    /// Overwrite without asking.
    Force,
    /// Leave existing files untouched.
    Skip,
    /// Defer to a confirmation callback, one file at a time.
    Ask(Box<dyn FnMut(&Path) -> bool>),
}

impl OverwritePolicy {
    /// Whether `path` may be overwritten. Only consulted for paths that
    /// already exist.
    pub fn allows(&mut self, path: &Path) -> bool {
        match self {
            OverwritePolicy::Force => true,
            OverwritePolicy::Skip => false,
            OverwritePolicy::Ask(confirm) => confirm(path),
        }
    }

    /// Interactive policy reading y/n confirmations from stdin.
    pub fn ask_via_stdin() -> Self {
        OverwritePolicy::Ask(Box::new(|path| {
            print!("File {} already exists. Overwrite? (y/n): ", path.display());
            let _ = io::stdout().flush();
            let mut answer = String::new();
            if io::stdin().read_line(&mut answer).is_err() {
                return false;
            }
            answer.trim().eq_ignore_ascii_case("y")
        }))
    }
}

/// Base name of a destination: its file stem, extension stripped.
pub(crate) fn base_name(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        let mut record = Record::new();
        for (key, value) in pairs {
            record.push(*key, *value);
        }
        record
    }

    #[test]
    fn exact_keys_reconcile() {
        let case = NormalizedCase::from_record(&record(&[("ID", "TC001"), ("Name", "Login")]));
        assert_eq!(case.id, "TC001");
        assert_eq!(case.name, "Login");
    }

    #[test]
    fn case_insensitive_keys_reconcile() {
        let case = NormalizedCase::from_record(&record(&[
            ("id", "TC001"),
            ("NAME", "Login"),
            ("test steps", "Open the page"),
        ]));
        assert_eq!(case.id, "TC001");
        assert_eq!(case.name, "Login");
        assert_eq!(case.test_steps, "Open the page");
    }

    #[test]
    fn exact_match_wins_over_case_insensitive() {
        let case = NormalizedCase::from_record(&record(&[("Id", "loose"), ("ID", "exact")]));
        assert_eq!(case.id, "exact");
    }

    #[test]
    fn missing_fields_become_empty() {
        let case = NormalizedCase::from_record(&record(&[("ID", "TC001")]));
        assert_eq!(case.name, "");
        assert_eq!(case.comments, "");
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let case = NormalizedCase::from_record(&record(&[
            ("ID", "TC001"),
            ("Completely Unknown", "value"),
        ]));
        assert!(!case.values().contains(&"value"));
    }

    #[test]
    fn reprojection_is_idempotent() {
        let case = NormalizedCase::from_record(&record(&[
            ("id", "TC001"),
            ("Name", "Login"),
            ("Extra", "dropped"),
        ]));

        let mut reprojected = Record::new();
        for (field, value) in TEST_CASE_FIELDS.iter().zip(case.values()) {
            reprojected.push(*field, value);
        }
        assert_eq!(NormalizedCase::from_record(&reprojected), case);
    }

    #[test]
    fn base_name_strips_extension_and_directories() {
        assert_eq!(base_name("a.md"), "a");
        assert_eq!(base_name("dir/nested.yaml"), "nested");
        assert_eq!(base_name("no_extension"), "no_extension");
    }

    #[test]
    fn ask_policy_consults_callback() {
        let mut deny = OverwritePolicy::Ask(Box::new(|_| false));
        assert!(!deny.allows(Path::new("out.csv")));

        let mut grant = OverwritePolicy::Ask(Box::new(|_| true));
        assert!(grant.allows(Path::new("out.csv")));

        assert!(OverwritePolicy::Force.allows(Path::new("out.csv")));
        assert!(!OverwritePolicy::Skip.allows(Path::new("out.csv")));
    }
}
