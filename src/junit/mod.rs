pub mod errors;
pub mod parser;

use serde::Serialize;

use self::errors::Error;

pub type Result<R> = std::result::Result<R, Error>;

/// A single test case parsed from the document. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub name: String,
    pub classname: Option<String>,
    pub time: Option<f64>,
    pub status: CaseStatus,
    pub system_out: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CaseStatus {
    Pass,
    Fail {
        message: Option<String>,
        output: Option<String>,
    },
    Error {
        message: Option<String>,
        output: Option<String>,
    },
    Skip {
        reason: Option<String>,
    },
    Disabled,
}

impl CaseStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CaseStatus::Pass => "Passed",
            CaseStatus::Fail { .. } => "Failed",
            CaseStatus::Error { .. } => "Error",
            CaseStatus::Skip { .. } => "Skipped",
            CaseStatus::Disabled => "Disabled",
        }
    }

    /// The failure or skip reason reported by the document, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            CaseStatus::Fail { message, .. } | CaseStatus::Error { message, .. } => {
                message.as_deref()
            }
            CaseStatus::Skip { reason } => reason.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSuite {
    pub name: String,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn counts(&self) -> Counts {
        self.cases.iter().fold(Counts::default(), |mut counts, case| {
            counts.add(&case.status);
            counts
        })
    }
}

/// Aggregate counts, always derived from the cases themselves rather than
/// the count attributes the document declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub disabled: usize,
}

impl Counts {
    pub fn add(&mut self, status: &CaseStatus) {
        self.total += 1;
        match status {
            CaseStatus::Pass => self.passed += 1,
            CaseStatus::Fail { .. } => self.failed += 1,
            CaseStatus::Error { .. } => self.errors += 1,
            CaseStatus::Skip { .. } => self.skipped += 1,
            CaseStatus::Disabled => self.disabled += 1,
        }
    }

    pub fn merge(&mut self, other: &Counts) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.errors += other.errors;
        self.skipped += other.skipped;
        self.disabled += other.disabled;
    }

    /// Cases that actually ran, disabled and skipped ones excluded.
    pub fn ran(&self) -> usize {
        self.total - self.skipped - self.disabled
    }

    pub fn success_rate(&self) -> Option<f64> {
        match self.ran() {
            0 => None,
            ran => Some(self.passed as f64 / ran as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestReport {
    pub suites: Vec<TestSuite>,
}

impl TestReport {
    pub fn totals(&self) -> Counts {
        self.suites.iter().fold(Counts::default(), |mut totals, suite| {
            totals.merge(&suite.counts());
            totals
        })
    }

    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.suites.iter().flat_map(|suite| suite.cases.iter())
    }
}
