use std::process::exit;

use ctest_report::commands::report::Report;
use ctest_report::commands::ERROR_STATUS_CODE;
use ctest_report::utils::reader::{ReadBuffer, Reader};
use ctest_report::utils::writer::{WriteBuffer::Stderr, WriteBuffer::Stdout, Writer};

fn main() {
    let report = Report::new();
    let app = report.command().get_matches();

    let mut output_writer = Writer::new(Stdout(std::io::stdout()), Stderr(std::io::stderr()));
    let mut reader = Reader::new(ReadBuffer::Stdin(std::io::stdin()));

    match report.execute(&app, &mut output_writer, &mut reader) {
        Err(e) => {
            output_writer
                .write_err(format!("Error occurred {e}"))
                .expect("failed to write to stderr");

            exit(ERROR_STATUS_CODE);
        }
        Ok(code) => exit(code),
    }
}
