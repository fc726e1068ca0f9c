use std::io::{Read, Write};
use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches};
use colored::*;

use crate::commands::{
    APP_NAME, APP_VERSION, INCLUDE_SKIPPED_WARNINGS, PRINT_JSON, SOURCE_ROOT, SUCCESS_STATUS_CODE,
    XML_FILE,
};
use crate::junit::{parser, CaseStatus, Result};
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;

mod annotations;
mod step_summary;

use annotations::AnnotationBuilder;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Report {}

#[allow(clippy::new_without_default)]
impl Report {
    pub fn new() -> Self {
        Report {}
    }

    pub fn command(&self) -> clap::Command {
        clap::Command::new(APP_NAME)
            .version(APP_VERSION)
            .about(
                r#"Parses a JUnit XML report produced by `ctest --output-junit`, prints a
step summary (also appended to the file named by GITHUB_STEP_SUMMARY when set)
and emits one GitHub annotation per failing, and optionally skipped, test case."#,
            )
            .arg(
                Arg::new(XML_FILE)
                    .help("The JUnit xml filepath. Run `ctest --output-junit ctest.xml`. Pass - to read from stdin")
                    .action(ArgAction::Set)
                    .required(true),
            )
            .arg(
                Arg::new(INCLUDE_SKIPPED_WARNINGS.0)
                    .long(INCLUDE_SKIPPED_WARNINGS.0)
                    .short(INCLUDE_SKIPPED_WARNINGS.1)
                    .action(ArgAction::SetTrue)
                    .help("Also emit a warning annotation for every skipped test case"),
            )
            .arg(
                Arg::new(SOURCE_ROOT.0)
                    .long(SOURCE_ROOT.0)
                    .short(SOURCE_ROOT.1)
                    .action(ArgAction::Set)
                    .required(false)
                    .help("Scan failure output for `<source-root>/<path>:<line>` references and anchor the annotations to them"),
            )
            .arg(
                Arg::new(PRINT_JSON.0)
                    .long(PRINT_JSON.0)
                    .short(PRINT_JSON.1)
                    .action(ArgAction::SetTrue)
                    .help("Print the parsed report in JSON format instead of the summary and annotations"),
            )
    }

    pub fn execute(
        &self,
        app: &ArgMatches,
        writer: &mut Writer,
        reader: &mut Reader,
    ) -> Result<i32> {
        // required argument, presence enforced by clap
        let path = app.get_one::<String>(XML_FILE).unwrap();
        let include_skipped = app.get_flag(INCLUDE_SKIPPED_WARNINGS.0);
        let source_root = app.get_one::<String>(SOURCE_ROOT.0);
        let print_json = app.get_flag(PRINT_JSON.0);

        let report = if path == "-" {
            let mut content = String::new();
            reader.read_to_string(&mut content)?;
            parser::parse_junit_str(&content)?
        } else {
            parser::parse_junit_file(Path::new(path))?
        };

        if print_json {
            serde_json::to_writer_pretty(&mut *writer, &report)?;
            writeln!(writer)?;
            return Ok(SUCCESS_STATUS_CODE);
        }

        let summary = step_summary::render(&report);
        banner(writer, "Step Summary")?;
        writeln!(writer, "{summary}")?;
        if let Some(file) = std::env::var_os(step_summary::STEP_SUMMARY_ENV) {
            step_summary::append_to_file(Path::new(&file), &summary)?;
        }

        banner(writer, "Annotations")?;
        let builder = AnnotationBuilder::new(source_root.map(String::as_str))?;
        for case in report.cases() {
            let annotate = match &case.status {
                CaseStatus::Fail { .. } | CaseStatus::Error { .. } => true,
                CaseStatus::Skip { .. } => include_skipped,
                CaseStatus::Pass | CaseStatus::Disabled => false,
            };
            if !annotate {
                continue;
            }
            for annotation in builder.annotations_for(case) {
                writeln!(writer, "{annotation}")?;
            }
        }

        let totals = report.totals();
        let verdict = match totals.failed + totals.errors {
            0 => format!("{}/{} passed", totals.passed, totals.ran())
                .green()
                .bold(),
            broken => format!("{} of {} failed", broken, totals.ran()).red().bold(),
        };
        writeln!(writer, "\n{verdict}")?;

        Ok(SUCCESS_STATUS_CODE)
    }
}

fn banner(writer: &mut Writer, title: &str) -> Result<()> {
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer, "{}", format!("{title:^80}").bold())?;
    writeln!(writer, "{}", "=".repeat(80))?;
    Ok(())
}
