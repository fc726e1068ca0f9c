use std::fmt::{Display, Formatter};

use itertools::Itertools;
use regex::Regex;

use crate::junit::{CaseStatus, Result, TestCase};

// GoogleTest brackets every case's output with these markers.
const RUN_MARKER: &str = "[ RUN      ]";
const FAILED_MARKER: &str = "[  FAILED  ]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    Warning,
    Error,
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Warning => f.write_str("warning"),
            Level::Error => f.write_str("error"),
        }
    }
}

/// One inline message for the hosting CI system, rendered as a GitHub
/// Actions workflow command.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Annotation {
    pub(crate) level: Level,
    pub(crate) title: String,
    pub(crate) file: Option<String>,
    pub(crate) line: Option<u32>,
    pub(crate) reason: Option<String>,
    pub(crate) message: Vec<String>,
}

impl Display for Annotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "::{} ", self.level)?;
        if let Some(file) = &self.file {
            write!(f, "file={},", escape_property(file))?;
            if let Some(line) = self.line {
                write!(f, "line={line},")?;
            }
        }
        let title = match &self.reason {
            Some(reason) => format!("{} ({})", self.title, reason),
            None => self.title.clone(),
        };
        write!(f, "title={}", escape_property(&title))?;
        write!(
            f,
            "::{}",
            self.message.iter().map(|line| escape_data(line)).join("%0A")
        )
    }
}

/// Turns classified cases into annotations. With a source root the failure
/// output is scanned for `<root>/<path>:<line>` references so annotations
/// land on the offending source line.
pub(crate) struct AnnotationBuilder {
    location: Option<Regex>,
}

impl AnnotationBuilder {
    pub(crate) fn new(source_root: Option<&str>) -> Result<Self> {
        let location = match source_root {
            Some(root) => Some(Regex::new(&format!(
                r".*?{}/(?P<rel_path>[^\s:]+):(?P<line_num>\d+)",
                regex::escape(root)
            ))?),
            None => None,
        };
        Ok(Self { location })
    }

    pub(crate) fn annotations_for(&self, case: &TestCase) -> Vec<Annotation> {
        match &case.status {
            CaseStatus::Fail { .. } | CaseStatus::Error { .. } => self.failure_annotations(case),
            CaseStatus::Skip { reason } => vec![Annotation {
                level: Level::Warning,
                title: case.name.clone(),
                file: None,
                line: None,
                reason: reason.clone(),
                message: vec![],
            }],
            CaseStatus::Pass | CaseStatus::Disabled => vec![],
        }
    }

    fn failure_annotations(&self, case: &TestCase) -> Vec<Annotation> {
        let reason = case.status.reason().map(str::to_string);

        if let (Some(location), Some(output)) = (&self.location, case.system_out.as_deref()) {
            let located = scan_failure_output(location, &strip_ansi(output), case, &reason);
            if !located.is_empty() {
                return located;
            }
        }

        let message = match &case.status {
            CaseStatus::Fail {
                output: Some(output),
                ..
            }
            | CaseStatus::Error {
                output: Some(output),
                ..
            } => strip_ansi(output).lines().map(str::to_string).collect(),
            _ => vec![],
        };

        vec![Annotation {
            level: Level::Error,
            title: case.name.clone(),
            file: None,
            line: None,
            reason,
            message,
        }]
    }
}

/// Walks the lines between the RUN and FAILED markers. Every source
/// location opens a fresh annotation that accumulates the lines after it.
fn scan_failure_output(
    location: &Regex,
    output: &str,
    case: &TestCase,
    reason: &Option<String>,
) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    let mut current: Option<Annotation> = None;
    let mut in_block = false;

    for line in output.lines() {
        if line.contains(RUN_MARKER) {
            in_block = true;
            continue;
        }
        if in_block && line.contains(FAILED_MARKER) {
            break;
        }
        if !in_block {
            continue;
        }

        if let Some(captures) = location.captures(line) {
            if let Some(done) = current.take() {
                annotations.push(done);
            }
            current = Some(Annotation {
                level: Level::Error,
                title: case.name.clone(),
                file: captures.name("rel_path").map(|m| m.as_str().to_string()),
                line: captures
                    .name("line_num")
                    .and_then(|m| m.as_str().parse().ok()),
                reason: reason.clone(),
                message: vec![],
            });
        } else if let Some(open) = current.as_mut() {
            open.message.push(line.to_string());
        }
    }

    if let Some(done) = current {
        annotations.push(done);
    }
    annotations
}

pub(crate) fn strip_ansi(text: &str) -> String {
    strip_ansi_escapes::strip(text)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_else(|_| text.to_string())
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::junit::CaseStatus;

    fn failing_case(name: &str, message: Option<&str>, system_out: Option<&str>) -> TestCase {
        TestCase {
            name: name.to_string(),
            classname: None,
            time: None,
            status: CaseStatus::Fail {
                message: message.map(str::to_string),
                output: None,
            },
            system_out: system_out.map(str::to_string),
        }
    }

    #[test]
    fn renders_error_command() {
        let annotation = Annotation {
            level: Level::Error,
            title: "FakeFixture.test_failure".to_string(),
            file: None,
            line: None,
            reason: None,
            message: vec![],
        };
        assert_eq!(
            annotation.to_string(),
            "::error title=FakeFixture.test_failure::"
        );
    }

    #[test]
    fn renders_reason_inside_title() {
        let annotation = Annotation {
            level: Level::Warning,
            title: "FakeFixture.test_skipped".to_string(),
            file: None,
            line: None,
            reason: Some("Disabled".to_string()),
            message: vec![],
        };
        assert_eq!(
            annotation.to_string(),
            "::warning title=FakeFixture.test_skipped (Disabled)::"
        );
    }

    #[test]
    fn renders_file_and_line_properties() {
        let annotation = Annotation {
            level: Level::Error,
            title: "t".to_string(),
            file: Some("src/fixture.cc".to_string()),
            line: Some(17),
            reason: None,
            message: vec!["Value of: false".to_string(), "Expected: true".to_string()],
        };
        assert_eq!(
            annotation.to_string(),
            "::error file=src/fixture.cc,line=17,title=t::Value of: false%0AExpected: true"
        );
    }

    #[test]
    fn escapes_workflow_command_characters() {
        let annotation = Annotation {
            level: Level::Error,
            title: "suite: a,b".to_string(),
            file: None,
            line: None,
            reason: None,
            message: vec!["50% done\nhalf".to_string()],
        };
        assert_eq!(
            annotation.to_string(),
            "::error title=suite%3A a%2Cb::50%25 done%0Ahalf"
        );
    }

    #[test]
    fn failure_without_source_root_stays_file_agnostic() {
        let builder = AnnotationBuilder::new(None).unwrap();
        let case = failing_case(
            "FakeFixture.test_failure",
            Some("Value of: false"),
            Some("/home/user/project/src/fixture.cc:17: Failure"),
        );

        let annotations = builder.annotations_for(&case);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].file, None);
        assert_eq!(
            annotations[0].reason.as_deref(),
            Some("Value of: false")
        );
    }

    #[test]
    fn scans_failure_output_for_source_locations() {
        let output = indoc! {"
            Test project /home/user/build
            [ RUN      ] FakeFixture.test_failure
            /home/user/project/src/fixture.cc:17: Failure
            Value of: false
              Actual: false
            Expected: true
            /home/user/project/src/helper.cc:40: Failure
            Expected equality of these values
            [  FAILED  ] FakeFixture.test_failure (0 ms)
            this line is past the block
        "};
        let builder = AnnotationBuilder::new(Some("project")).unwrap();
        let case = failing_case("FakeFixture.test_failure", Some("boom"), Some(output));

        let annotations = builder.annotations_for(&case);
        assert_eq!(annotations.len(), 2);

        assert_eq!(annotations[0].file.as_deref(), Some("src/fixture.cc"));
        assert_eq!(annotations[0].line, Some(17));
        assert_eq!(
            annotations[0].message,
            vec!["Value of: false", "  Actual: false", "Expected: true"]
        );

        assert_eq!(annotations[1].file.as_deref(), Some("src/helper.cc"));
        assert_eq!(annotations[1].line, Some(40));
        assert_eq!(annotations[1].message, vec!["Expected equality of these values"]);
    }

    #[test]
    fn falls_back_when_output_has_no_location() {
        let output = indoc! {"
            [ RUN      ] FakeFixture.test_failure
            something went wrong without a file reference
            [  FAILED  ] FakeFixture.test_failure (0 ms)
        "};
        let builder = AnnotationBuilder::new(Some("project")).unwrap();
        let case = failing_case("FakeFixture.test_failure", Some("boom"), Some(output));

        let annotations = builder.annotations_for(&case);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].file, None);
        assert_eq!(annotations[0].reason.as_deref(), Some("boom"));
    }

    #[test]
    fn strips_ansi_sequences_from_scanned_output() {
        let output = "[ RUN      ] t\n\x1b[31m/home/user/project/src/red.cc:3: Failure\x1b[0m\n\x1b[1mbold line\x1b[0m\n[  FAILED  ] t";
        let builder = AnnotationBuilder::new(Some("project")).unwrap();
        let case = failing_case("t", None, Some(output));

        let annotations = builder.annotations_for(&case);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].file.as_deref(), Some("src/red.cc"));
        assert_eq!(annotations[0].message, vec!["bold line"]);
    }

    #[test]
    fn skipped_case_becomes_warning() {
        let builder = AnnotationBuilder::new(None).unwrap();
        let case = TestCase {
            name: "FakeFixture.test_not_run".to_string(),
            classname: None,
            time: None,
            status: CaseStatus::Skip {
                reason: Some("Not available".to_string()),
            },
            system_out: None,
        };

        let annotations = builder.annotations_for(&case);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].level, Level::Warning);
        assert_eq!(annotations[0].reason.as_deref(), Some("Not available"));
    }

    #[test]
    fn passed_and_disabled_cases_produce_nothing() {
        let builder = AnnotationBuilder::new(None).unwrap();
        for status in [CaseStatus::Pass, CaseStatus::Disabled] {
            let case = TestCase {
                name: "t".to_string(),
                classname: None,
                time: None,
                status,
                system_out: None,
            };
            assert!(builder.annotations_for(&case).is_empty());
        }
    }
}
