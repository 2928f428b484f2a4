//! Coverage Ingestion
//!
//! Turns per-test coverage records into spectra traces. Records usually come
//! from a coverage tool run once per test; LCOV reports can be read directly
//! with [`parse_lcov`], which keys nodes by `(file, line)`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::error::{Result, SpectraError};
use crate::spectra::{NodeKey, Spectra};

/// Line-granularity node key: (source file, 1-based line number).
pub type LineKey = (PathBuf, usize);

/// Coverage of a single test execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCoverage<K: NodeKey> {
    pub test_name: String,
    pub passed: bool,
    /// Nodes executed: node -> execution count
    pub executed: HashMap<K, u64>,
}

impl<K: NodeKey> TestCoverage<K> {
    pub fn new(test_name: impl Into<String>, passed: bool) -> Self {
        Self {
            test_name: test_name.into(),
            passed,
            executed: HashMap::new(),
        }
    }

    /// Record `hits` executions of `node`.
    pub fn with_hits(mut self, node: K, hits: u64) -> Self {
        self.executed.insert(node, hits);
        self
    }
}

impl TestCoverage<LineKey> {
    /// Coverage of one test from its LCOV report.
    pub fn from_lcov(test_name: impl Into<String>, passed: bool, content: &str) -> Self {
        Self {
            test_name: test_name.into(),
            passed,
            executed: parse_lcov(content).into_iter().collect(),
        }
    }

    /// Coverage of one test from an LCOV file on disk.
    pub fn from_lcov_file(
        test_name: impl Into<String>,
        passed: bool,
        path: &Path,
    ) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read LCOV report {}", path.display()))?;
        Ok(Self::from_lcov(test_name, passed, &content))
    }
}

impl<K: NodeKey> Spectra<K> {
    /// Add one trace per test.
    ///
    /// Nodes listed with zero hits are registered without being involved.
    /// Fails with [`SpectraError::DuplicateTrace`] before touching the
    /// spectra if any test name is already taken or repeated in `coverage`.
    pub fn add_coverage(&mut self, coverage: &[TestCoverage<K>]) -> Result<()> {
        let mut seen = HashSet::new();
        for test in coverage {
            if self.trace(&test.test_name).is_some() || !seen.insert(test.test_name.as_str()) {
                return Err(SpectraError::DuplicateTrace(test.test_name.clone()));
            }
        }

        for test in coverage {
            let mut trace = self.add_trace(test.test_name.clone(), test.passed)?;
            for (node, &hits) in &test.executed {
                trace.set_hits(node.clone(), hits);
            }
        }
        debug!(
            "Ingested coverage of {} test(s); spectra now has {} node(s)",
            coverage.len(),
            self.node_count()
        );
        Ok(())
    }

    /// Build a spectra from per-test coverage.
    pub fn from_coverage(coverage: &[TestCoverage<K>]) -> Result<Self> {
        let mut spectra = Self::new();
        spectra.add_coverage(coverage)?;
        Ok(spectra)
    }
}

/// Parse an LCOV report into `(file, line) -> hits`.
///
/// Only `SF:`, `DA:` and `end_of_record` lines are interpreted; malformed
/// `DA:` entries and entries outside a source file block are skipped.
pub fn parse_lcov(content: &str) -> BTreeMap<LineKey, u64> {
    let mut lines = BTreeMap::new();
    let mut current_file: Option<PathBuf> = None;

    for line in content.lines() {
        let line = line.trim();
        if let Some(file) = line.strip_prefix("SF:") {
            current_file = Some(PathBuf::from(file.trim()));
        } else if let Some(da) = line.strip_prefix("DA:") {
            let Some(ref file) = current_file else {
                continue;
            };
            let mut parts = da.split(',');
            if let (Some(line_num), Some(hits)) = (parts.next(), parts.next()) {
                if let (Ok(line_num), Ok(hits)) =
                    (line_num.trim().parse::<usize>(), hits.trim().parse::<u64>())
                {
                    *lines.entry((file.clone(), line_num)).or_insert(0) += hits;
                }
            }
        } else if line == "end_of_record" {
            current_file = None;
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectra::SpectraSource;

    const LCOV: &str = r#"TN:
SF:src/lib.rs
DA:1,10
DA:2,5
DA:3,0
end_of_record
SF:src/main.rs
DA:1,1
DA:x,1
end_of_record
DA:9,9
"#;

    fn line(file: &str, n: usize) -> LineKey {
        (PathBuf::from(file), n)
    }

    #[test]
    fn test_parse_lcov_basic() {
        let lines = parse_lcov(LCOV);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines.get(&line("src/lib.rs", 1)), Some(&10));
        assert_eq!(lines.get(&line("src/lib.rs", 3)), Some(&0));
        assert_eq!(lines.get(&line("src/main.rs", 1)), Some(&1));
    }

    #[test]
    fn test_parse_lcov_empty() {
        assert!(parse_lcov("").is_empty());
    }

    #[test]
    fn test_parse_lcov_merges_repeated_records() {
        let content = "SF:a.rs\nDA:4,2\nend_of_record\nSF:a.rs\nDA:4,3\nend_of_record\n";
        assert_eq!(parse_lcov(content).get(&line("a.rs", 4)), Some(&5));
    }

    #[test]
    fn test_add_coverage_builds_traces() {
        let coverage = vec![
            TestCoverage::from_lcov("test_pass", true, LCOV),
            TestCoverage::new("test_fail", false).with_hits(line("src/lib.rs", 3), 2),
        ];
        let spectra = Spectra::from_coverage(&coverage).unwrap();

        assert_eq!(spectra.trace_count(), 2);
        assert_eq!(spectra.failing_trace_count(), 1);
        assert_eq!(spectra.node_count(), 4);

        let pass = spectra.trace("test_pass").unwrap();
        assert_eq!(pass.hits(&line("src/lib.rs", 1)), 10);
        assert!(!pass.is_involved(&line("src/lib.rs", 3)));
        assert!(spectra.is_involved("test_fail", &line("src/lib.rs", 3)));
    }

    #[test]
    fn test_add_coverage_rejects_duplicates_without_side_effects() {
        let mut spectra = Spectra::from_coverage(&[TestCoverage::new("t1", true)
            .with_hits("a".to_string(), 1)])
        .unwrap();
        let version = spectra.version();

        let batch = vec![
            TestCoverage::new("t2", false).with_hits("b".to_string(), 1),
            TestCoverage::new("t1", false),
        ];
        let err = spectra.add_coverage(&batch).unwrap_err();
        assert_eq!(err, SpectraError::DuplicateTrace("t1".to_string()));
        assert_eq!(spectra.trace_count(), 1);
        assert!(!spectra.has_node(&"b".to_string()));
        assert_eq!(spectra.version(), version);

        let repeated = vec![TestCoverage::new("t3", true), TestCoverage::new("t3", false)];
        assert!(spectra.add_coverage(&repeated).is_err());
        assert!(spectra.trace("t3").is_none());
    }

    #[test]
    fn test_from_lcov_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lcov.info");
        std::fs::write(&path, LCOV).unwrap();

        let coverage = TestCoverage::from_lcov_file("t", true, &path).unwrap();
        assert_eq!(coverage.executed.len(), 4);

        assert!(TestCoverage::from_lcov_file("t", true, &dir.path().join("missing")).is_err());
    }
}
