pub mod report;

//
// Constants
//
// Application metadata
pub const APP_NAME: &str = "ctest-report";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
// Arguments
pub const XML_FILE: &str = "xml-file";
pub const INCLUDE_SKIPPED_WARNINGS: (&str, char) = ("include-skipped-warnings", 'i');
pub const SOURCE_ROOT: (&str, char) = ("source-root", 's');
pub const PRINT_JSON: (&str, char) = ("print-json", 'p');
// Exit codes
pub const SUCCESS_STATUS_CODE: i32 = 0;
pub const ERROR_STATUS_CODE: i32 = 5;
