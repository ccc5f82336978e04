// src/extractors/section.rs

// --- Imports ---
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;

use crate::utils::error::ExtractError;

// --- Regex Patterns (Lazy Static) ---

// Marker line that opens a test-case section, e.g. `### TestCases (login.md)`.
// The capture group holds the destination name.
static SECTION_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^### TestCases\s+\(([^)]+)\)")
        .expect("Failed to compile SECTION_MARKER_RE")
});

// Any level-3 heading line. Section bodies end at the next heading so prose
// under a following heading never leaks into a YAML body.
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^###").expect("Failed to compile HEADING_RE"));

// --- Data Structures ---

/// One test case as extracted: field names verbatim from the source, values
/// flattened to text. Pair order follows the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field. Keys are kept verbatim; no renaming happens here.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// Value for an exactly matching key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value for the first key matching case-insensitively.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Extraction output: destination name to the records filed under it, in
/// document encounter order. Keys are unique; inserting an existing key
/// replaces its records in place, so a duplicate section keeps its original
/// position but the later parse wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCaseMap {
    entries: Vec<(String, Vec<Record>)>,
}

impl TestCaseMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, records: Vec<Record>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = records,
            None => self.entries.push((name, records)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Record]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, records)| records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.entries
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// --- Main Extractor Structure ---

/// Scans documents for `### TestCases (...)` sections and parses each body
/// as a YAML list of records.
pub struct SectionExtractor {
    verbose: bool,
}

impl SectionExtractor {
    /// `verbose` controls whether parse diagnostics include the underlying
    /// cause and a remediation hint, or just a pointer to `--verbose`.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Reads a markdown file and extracts every test-case section.
    pub fn parse_file(&self, path: &Path) -> Result<TestCaseMap, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(self.parse_content(&content, &path.display().to_string()))
    }

    /// Extracts every marked section from markdown content.
    ///
    /// Two-phase scan: first locate every marker match, then slice each body
    /// between the end of its marker and the next level-3 heading line (or
    /// end of document). Boundary positions are explicit, so marker-with-no-
    /// body and marker-at-end-of-document fall out naturally.
    pub fn parse_content(&self, content: &str, source: &str) -> TestCaseMap {
        let mut test_cases = TestCaseMap::new();

        let markers: Vec<(&str, usize)> = SECTION_MARKER_RE
            .captures_iter(content)
            .map(|cap| {
                let name = cap.get(1).map_or("", |m| m.as_str()).trim();
                let body_start = cap.get(0).map_or(content.len(), |m| m.end());
                (name, body_start)
            })
            .collect();

        for (name, body_start) in markers {
            if name.is_empty() {
                tracing::warn!("Skipping section with empty destination name in {}", source);
                continue;
            }

            let body_end = HEADING_RE
                .find_at(content, body_start)
                .map_or(content.len(), |m| m.start());
            let body = content[body_start..body_end].trim();

            if body.is_empty() {
                tracing::warn!("No test cases found in section for {} in {}", name, source);
                continue;
            }

            let value: Value = match serde_yaml::from_str(body) {
                Ok(value) => value,
                Err(err) => {
                    if self.verbose {
                        tracing::error!(
                            "YAML parse error in section for {} in {}: {}",
                            name,
                            source,
                            err
                        );
                        tracing::debug!("Problematic YAML content:\n{}", body);
                        tracing::info!("Suggestion: Check for proper indentation and YAML syntax.");
                    } else {
                        tracing::error!(
                            "YAML parse error in section for {}. Use --verbose for details.",
                            name
                        );
                    }
                    continue;
                }
            };

            if value.is_null() {
                tracing::warn!("No test cases found in section for {} in {}", name, source);
                continue;
            }

            let Some(items) = value.as_sequence() else {
                if self.verbose {
                    tracing::error!("YAML content in section for {} is not a list", name);
                    tracing::error!("Content should start with '- ' for each test case item");
                } else {
                    tracing::error!(
                        "YAML parse error: Expected list format in section for {}",
                        name
                    );
                }
                continue;
            };

            if items.is_empty() {
                tracing::warn!("No test cases found in section for {} in {}", name, source);
                continue;
            }

            let records = records_from_sequence(items, name);
            tracing::info!(
                "Successfully parsed {} test cases from section for {}",
                records.len(),
                name
            );
            test_cases.insert(name, records);
        }

        if test_cases.is_empty() {
            tracing::warn!("No test case sections found in {}", source);
        }

        test_cases
    }

    /// Parses a YAML file whose top level maps destination names directly to
    /// record lists. A top level that fails to parse or is not a mapping is a
    /// hard failure for the whole file: logged, empty mapping returned.
    pub fn parse_yaml_file(&self, path: &Path) -> Result<TestCaseMap, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;

        let value: Value = match serde_yaml::from_str(&content) {
            Ok(value) => value,
            Err(err) => {
                if self.verbose {
                    tracing::error!("YAML parse error in file {}: {}", path.display(), err);
                    tracing::info!("Suggestion: Check for proper indentation and YAML syntax.");
                } else {
                    tracing::error!(
                        "YAML parse error in file {}. Use --verbose for details.",
                        path.display()
                    );
                }
                return Ok(TestCaseMap::new());
            }
        };

        let Some(top) = value.as_mapping() else {
            tracing::error!(
                "YAML file {} should contain a mapping from file names to test cases",
                path.display()
            );
            return Ok(TestCaseMap::new());
        };

        let mut test_cases = TestCaseMap::new();
        for (key, value) in top {
            let Some(name) = scalar_to_string(key) else {
                tracing::warn!("Skipping non-scalar destination name in {}", path.display());
                continue;
            };
            let Some(items) = value.as_sequence() else {
                tracing::error!("Test cases for {} should be a list", name);
                continue;
            };
            let records = records_from_sequence(items, &name);
            test_cases.insert(name, records);
        }

        tracing::info!(
            "Successfully parsed YAML file {} with {} test case sections",
            path.display(),
            test_cases.len()
        );
        Ok(test_cases)
    }
}

// --- Value Flattening Helpers ---

/// Builds records from a YAML sequence, keeping only mapping-shaped items.
fn records_from_sequence(items: &[Value], name: &str) -> Vec<Record> {
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item.as_mapping() {
            Some(mapping) => records.push(record_from_mapping(mapping)),
            None => {
                tracing::warn!("Skipping non-mapping test case entry for {}", name);
            }
        }
    }
    records
}

fn record_from_mapping(mapping: &serde_yaml::Mapping) -> Record {
    let mut record = Record::new();
    for (key, value) in mapping {
        match scalar_to_string(key) {
            Some(key) => record.push(key, value_to_string(value)),
            None => {
                tracing::warn!("Skipping non-scalar field name in test case entry");
            }
        }
    }
    record
}

/// String form of a scalar YAML value. Non-scalars have no usable string
/// form as a key or destination name.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Flattens any YAML value to cell text. Block scalars keep their newlines;
/// nested structure is re-rendered as YAML text.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_MARKDOWN: &str = "\
# Test Document

This is a sample document with test cases.

### TestCases (sample_file.md)
- ID: TC001
  Name: Sample Test Case
  Description: This is a sample test case
  Test Steps: |
    1. Step one
    2. Step two
  Expected Result: Expected output
  Priority: High

- ID: TC002
  Name: Another Test Case
  Description: This is another test case
  Test Steps: Do something
  Expected Result: Another expected output
  Priority: Medium

### TestCases (another_file.md)
- ID: TC101
  Name: Test for another file
  Description: Testing another file
  Test Steps: Steps for another file
  Expected Result: Output for another file
";

    fn extractor() -> SectionExtractor {
        SectionExtractor::new(true)
    }

    #[test]
    fn parses_all_sections_with_lengths() {
        let result = extractor().parse_content(SAMPLE_MARKDOWN, "test_source.md");

        assert_eq!(result.len(), 2);
        assert_eq!(result.get("sample_file.md").unwrap().len(), 2);
        assert_eq!(result.get("another_file.md").unwrap().len(), 1);

        let first = &result.get("sample_file.md").unwrap()[0];
        assert_eq!(first.get("ID"), Some("TC001"));
        assert_eq!(first.get("Name"), Some("Sample Test Case"));
        let second = &result.get("sample_file.md").unwrap()[1];
        assert_eq!(second.get("ID"), Some("TC002"));
        assert_eq!(
            result.get("another_file.md").unwrap()[0].get("ID"),
            Some("TC101")
        );
    }

    #[test]
    fn minimal_section_scenario() {
        let result =
            extractor().parse_content("### TestCases (a.md)\n- ID: T1\n  Name: X", "doc");

        assert_eq!(result.len(), 1);
        let records = result.get("a.md").expect("destination a.md missing");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("ID"), Some("T1"));
        assert_eq!(records[0].get("Name"), Some("X"));
    }

    #[test]
    fn preserves_encounter_order() {
        let content = "\
### TestCases (c.md)
- ID: T1
### TestCases (a.md)
- ID: T2
### TestCases (b.md)
- ID: T3
";
        let result = extractor().parse_content(content, "doc");
        let names: Vec<&str> = result.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["c.md", "a.md", "b.md"]);
    }

    #[test]
    fn block_scalar_values_stay_multiline() {
        let result = extractor().parse_content(SAMPLE_MARKDOWN, "doc");
        let steps = result.get("sample_file.md").unwrap()[0]
            .get("Test Steps")
            .expect("Test Steps missing");
        assert_eq!(steps, "1. Step one\n2. Step two\n");
    }

    #[test]
    fn malformed_section_is_skipped_and_siblings_survive() {
        let content = "\
### TestCases (bad.md)
- ID: TC001
  Test Steps:
  - wrong indentation
    Expected Result: will not parse
### TestCases (good.md)
- ID: TC002
";
        let result = extractor().parse_content(content, "doc");
        assert_eq!(result.len(), 1);
        assert!(
            result.get("bad.md").is_none(),
            "malformed section should be dropped"
        );
        assert_eq!(result.get("good.md").unwrap()[0].get("ID"), Some("TC002"));
    }

    #[test]
    fn non_list_section_is_skipped() {
        let content = "### TestCases (scalar.md)\nID: TC001\nName: not a list\n";
        let result = extractor().parse_content(content, "doc");
        assert!(result.is_empty());
    }

    #[test]
    fn empty_section_contributes_nothing() {
        let result = extractor().parse_content("### TestCases (empty.md)\n", "doc");
        assert!(result.is_empty());
    }

    #[test]
    fn marker_at_end_of_document() {
        let result = extractor().parse_content("Some prose.\n\n### TestCases (tail.md)", "doc");
        assert!(result.is_empty());
    }

    #[test]
    fn empty_destination_name_contributes_nothing() {
        let result = extractor().parse_content("### TestCases (  )\n- ID: T1\n", "doc");
        assert!(result.is_empty());
    }

    #[test]
    fn no_sections_yields_empty_mapping() {
        let result =
            extractor().parse_content("# Just a document\n\nNo markers here.\n", "doc");
        assert!(result.is_empty());
    }

    #[test]
    fn duplicate_destination_last_section_wins() {
        let content = "\
### TestCases (dup.md)
- ID: FIRST
### TestCases (other.md)
- ID: MIDDLE
### TestCases (dup.md)
- ID: SECOND
";
        let result = extractor().parse_content(content, "doc");

        assert_eq!(result.len(), 2);
        let records = result.get("dup.md").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("ID"), Some("SECOND"));
        // The duplicate keeps its first-encounter position.
        let names: Vec<&str> = result.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["dup.md", "other.md"]);
    }

    #[test]
    fn body_ends_at_next_heading() {
        let content = "\
### TestCases (a.md)
- ID: T1

### Summary
This prose would not parse as YAML.
";
        let result = extractor().parse_content(content, "doc");
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("a.md").unwrap()[0].get("ID"), Some("T1"));
    }

    #[test]
    fn non_mapping_list_items_are_skipped() {
        let content = "\
### TestCases (mixed.md)
- ID: T1
- just a string
- ID: T2
";
        let result = extractor().parse_content(content, "doc");
        let records = result.get("mixed.md").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("ID"), Some("T1"));
        assert_eq!(records[1].get("ID"), Some("T2"));
    }

    #[test]
    fn numeric_and_bool_values_are_flattened() {
        let content = "### TestCases (typed.md)\n- ID: 42\n  Automated: true\n";
        let result = extractor().parse_content(content, "doc");
        let record = &result.get("typed.md").unwrap()[0];
        assert_eq!(record.get("ID"), Some("42"));
        assert_eq!(record.get("Automated"), Some("true"));
    }

    #[test]
    fn parse_file_reports_missing_input() {
        let err = extractor()
            .parse_file(Path::new("definitely_not_here.md"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound(_)));
    }

    #[test]
    fn parse_file_roundtrip_through_disk() {
        let mut file = tempfile::Builder::new()
            .suffix(".md")
            .tempfile()
            .expect("temp file");
        file.write_all(SAMPLE_MARKDOWN.as_bytes())
            .expect("write sample");

        let result = extractor()
            .parse_file(file.path())
            .expect("parse_file failed");
        assert_eq!(result.len(), 2);
        assert_eq!(result.get("sample_file.md").unwrap().len(), 2);
    }

    const SAMPLE_YAML: &str = "\
sample_file.md:
  - ID: TC001
    Name: Sample Test Case
    Test Steps: |
      1. Step one
      2. Step two
  - ID: TC002
    Name: Another Test Case

another_file.md:
  - ID: TC101
    Name: Test for another file
";

    fn write_yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp file");
        file.write_all(content.as_bytes()).expect("write yaml");
        file
    }

    #[test]
    fn parse_yaml_file_direct_mode() {
        let file = write_yaml(SAMPLE_YAML);
        let result = extractor()
            .parse_yaml_file(file.path())
            .expect("parse failed");

        assert_eq!(result.len(), 2);
        assert_eq!(result.get("sample_file.md").unwrap().len(), 2);
        assert_eq!(
            result.get("sample_file.md").unwrap()[0].get("ID"),
            Some("TC001")
        );
        assert_eq!(
            result.get("another_file.md").unwrap()[0].get("ID"),
            Some("TC101")
        );
    }

    #[test]
    fn yaml_top_level_not_mapping_yields_empty() {
        let file = write_yaml("- a\n- b\n");
        let result = extractor()
            .parse_yaml_file(file.path())
            .expect("parse failed");
        assert!(result.is_empty());
    }

    #[test]
    fn yaml_non_list_entry_skipped_siblings_kept() {
        let file = write_yaml("bad.md: just a string\ngood.md:\n  - ID: TC001\n");
        let result = extractor()
            .parse_yaml_file(file.path())
            .expect("parse failed");

        assert_eq!(result.len(), 1);
        assert!(result.get("bad.md").is_none());
        assert_eq!(result.get("good.md").unwrap()[0].get("ID"), Some("TC001"));
    }

    #[test]
    fn yaml_parse_error_yields_empty() {
        let file = write_yaml("a.md:\n- ID: T1\n   broken: [\n");
        let result = extractor()
            .parse_yaml_file(file.path())
            .expect("parse failed");
        assert!(result.is_empty());
    }
}
