use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error when reading {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed XML document {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("Malformed XML attribute {0}")]
    XmlAttrError(#[from] quick_xml::events::attributes::AttrError),
    #[error("Parser Error when parsing `{0}`")]
    ParseError(String),
    #[error("Error serializing report to JSON {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Regex expression parse error for source root {0}")]
    RegexError(#[from] regex::Error),
    #[error("Formatting error when writing {0}")]
    FormatError(#[from] std::fmt::Error),
    #[error("The path `{0}` does not exist")]
    FileNotFoundError(String),
}
