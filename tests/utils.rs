use std::path::PathBuf;

use ctest_report::commands::report::Report;
use ctest_report::commands::{APP_NAME, ERROR_STATUS_CODE};
use ctest_report::utils::reader::Reader;
use ctest_report::utils::writer::Writer;

#[non_exhaustive]
pub struct StatusCode;

#[allow(dead_code)]
impl StatusCode {
    pub const SUCCESS: i32 = 0;
    pub const PARSING_ERROR: i32 = ERROR_STATUS_CODE;
}

pub fn get_full_path_for_resource_file(path: &str) -> String {
    let mut resource = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    resource.push(path);
    resource.display().to_string()
}

pub trait CommandTestRunner {
    fn build_args(&self) -> Vec<String>;

    fn run(&self, writer: &mut Writer, reader: &mut Reader) -> i32 {
        let report = Report::new();

        let command_options = self
            .build_args()
            .iter()
            .fold(vec![String::from(APP_NAME)], |mut res, arg| {
                res.push(arg.to_string());
                res
            });

        let app = report.command().get_matches_from(command_options);

        match report.execute(&app, writer, reader) {
            Ok(code) => code,
            Err(_) => ERROR_STATUS_CODE,
        }
    }
}
