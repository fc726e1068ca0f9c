use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::junit::{CaseStatus, Result, TestCase, TestReport};

/// GitHub names the Markdown file for the run's summary page through this
/// variable.
pub(crate) const STEP_SUMMARY_ENV: &str = "GITHUB_STEP_SUMMARY";

/// Renders the full Markdown step summary. The same text goes to the
/// console and, appended, to the step-summary file.
pub(crate) fn render(report: &TestReport) -> String {
    let totals = report.totals();
    let mut out = String::new();

    out.push_str("## CTest Results\n\n");
    out.push_str(&format!(
        "{}/{} ({} Skipped, {} Disabled)\n\n",
        totals.passed,
        totals.ran(),
        totals.skipped,
        totals.disabled
    ));

    let success_rate = match totals.success_rate() {
        Some(rate) => format!("{:.2}%", rate * 100.0),
        None => "N/A".to_string(),
    };
    let rows = [
        ("Total Tests", totals.total.to_string()),
        ("Passed", totals.passed.to_string()),
        ("Failures", totals.failed.to_string()),
        ("Errors", totals.errors.to_string()),
        ("Skipped", totals.skipped.to_string()),
        ("Disabled", totals.disabled.to_string()),
        ("Success Rate", success_rate),
    ];
    out.push_str(&markdown_table(&rows, "Metric", "Value"));
    out.push('\n');

    out.push_str("\n### Results by Suite\n\n");
    out.push_str(&suites_table(report));
    out.push('\n');

    let failed: Vec<&TestCase> = report
        .cases()
        .filter(|case| {
            matches!(
                case.status,
                CaseStatus::Fail { .. } | CaseStatus::Error { .. }
            )
        })
        .collect();
    let skipped: Vec<&TestCase> = report
        .cases()
        .filter(|case| matches!(case.status, CaseStatus::Skip { .. } | CaseStatus::Disabled))
        .collect();

    if !failed.is_empty() {
        out.push_str("\n<details>\n");
        out.push_str("<summary>:boom: <strong>Failed Tests</strong> (Click to expand)</summary>\n\n");
        for case in &failed {
            out.push_str(&format!("* {}\n", case_line(case)));
        }
        out.push_str("\n</details>\n");
    }

    if !skipped.is_empty() {
        out.push_str("\n<details>\n");
        out.push_str(
            "<summary>:warning: <strong>Skipped Tests</strong> (Click to expand)</summary>\n\n",
        );
        for case in &skipped {
            out.push_str(&format!("* {}\n", case_line(case)));
        }
        out.push_str("\n</details>\n");
    }

    out
}

pub(crate) fn append_to_file(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{content}")?;
    Ok(())
}

fn case_line(case: &TestCase) -> String {
    match case.status.reason() {
        Some(reason) => format!("{} - {} ({})", case.name, case.status.label(), reason),
        None => format!("{} - {}", case.name, case.status.label()),
    }
}

fn markdown_table(rows: &[(&str, String)], header0: &str, header1: &str) -> String {
    let n0 = rows
        .iter()
        .map(|(key, _)| key.len())
        .chain(std::iter::once(header0.len()))
        .max()
        .unwrap_or_default();
    let n1 = rows
        .iter()
        .map(|(_, value)| value.len())
        .chain(std::iter::once(header1.len()))
        .max()
        .unwrap_or_default();

    let mut lines = vec![
        format!("| {:<w0$} | {:<w1$} |", header0, header1, w0 = n0, w1 = n1),
        format!("| {} | {} |", "-".repeat(n0), "-".repeat(n1)),
    ];
    for (key, value) in rows {
        lines.push(format!("| {:<w0$} | {:<w1$} |", key, value, w0 = n0, w1 = n1));
    }
    lines.join("\n")
}

fn suites_table(report: &TestReport) -> String {
    let mut lines = vec![
        "| Suite | Tests | Passed | Failures | Errors | Skipped | Disabled |".to_string(),
        "| ----- | ----- | ------ | -------- | ------ | ------- | -------- |".to_string(),
    ];
    for suite in &report.suites {
        let counts = suite.counts();
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} | {} |",
            suite.name,
            counts.total,
            counts.passed,
            counts.failed,
            counts.errors,
            counts.skipped,
            counts.disabled
        ));
    }
    let totals = report.totals();
    lines.push(format!(
        "| **Total** | {} | {} | {} | {} | {} | {} |",
        totals.total, totals.passed, totals.failed, totals.errors, totals.skipped, totals.disabled
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::junit::TestSuite;

    fn case(name: &str, status: CaseStatus) -> TestCase {
        TestCase {
            name: name.to_string(),
            classname: None,
            time: None,
            status,
            system_out: None,
        }
    }

    fn sample_report() -> TestReport {
        TestReport {
            suites: vec![TestSuite {
                name: "Linux-c++".to_string(),
                cases: vec![
                    case("FakeFixture.test_numerical", CaseStatus::Pass),
                    case(
                        "FakeFixture.test_failure",
                        CaseStatus::Fail {
                            message: Some("Value of: false".to_string()),
                            output: None,
                        },
                    ),
                    case(
                        "FakeFixture.test_not_run",
                        CaseStatus::Skip {
                            reason: Some("Not available".to_string()),
                        },
                    ),
                    case("FakeFixture.DISABLED_test", CaseStatus::Disabled),
                ],
            }],
        }
    }

    #[test]
    fn renders_headline_and_metric_table() {
        let summary = render(&sample_report());

        assert!(summary.starts_with("## CTest Results\n\n1/2 (1 Skipped, 1 Disabled)\n"));
        assert!(summary.contains("| Metric       | Value  |"));
        assert!(summary.contains("| Total Tests  | 4      |"));
        assert!(summary.contains("| Success Rate | 50.00% |"));
    }

    #[test]
    fn renders_suite_rows_and_totals() {
        let summary = render(&sample_report());
        assert!(summary.contains("| Linux-c++ | 4 | 1 | 1 | 0 | 1 | 1 |"));
        assert!(summary.contains("| **Total** | 4 | 1 | 1 | 0 | 1 | 1 |"));
    }

    #[test]
    fn lists_failed_and_skipped_cases() {
        let summary = render(&sample_report());
        assert!(summary
            .contains("* FakeFixture.test_failure - Failed (Value of: false)"));
        assert!(summary.contains("* FakeFixture.test_not_run - Skipped (Not available)"));
        assert!(summary.contains("* FakeFixture.DISABLED_test - Disabled"));
    }

    #[test]
    fn omits_details_sections_when_everything_passed() {
        let report = TestReport {
            suites: vec![TestSuite {
                name: "s".to_string(),
                cases: vec![case("a", CaseStatus::Pass)],
            }],
        };
        let summary = render(&report);
        assert!(!summary.contains("<details>"));
        assert!(summary.contains("1/1 (0 Skipped, 0 Disabled)"));
    }

    #[test]
    fn success_rate_not_available_when_nothing_ran() {
        let report = TestReport {
            suites: vec![TestSuite {
                name: "s".to_string(),
                cases: vec![case("a", CaseStatus::Disabled)],
            }],
        };
        let summary = render(&report);
        assert!(summary.contains("| Success Rate | N/A   |"));
    }

    #[test]
    fn table_columns_pad_to_longest_entry() {
        let table = markdown_table(
            &[("Total Tests", "16".to_string()), ("Passed", "9".to_string())],
            "Metric",
            "Value",
        );
        assert_eq!(
            table,
            "| Metric      | Value |\n\
             | ----------- | ----- |\n\
             | Total Tests | 16    |\n\
             | Passed      | 9     |"
        );
    }

    #[test]
    fn append_accumulates_across_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");

        append_to_file(&path, "first").unwrap();
        append_to_file(&path, "second").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
