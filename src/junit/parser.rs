use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use lazy_static::lazy_static;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use crate::junit::errors::Error;
use crate::junit::{CaseStatus, Result, TestCase, TestReport, TestSuite};

// CTest substitutes the ESC control character in captured output with this
// literal marker before writing it into the XML document.
const ESC_PLACEHOLDER: &str = "[NON-XML-CHAR-0x1B]";

lazy_static! {
    // GoogleTest reports DISABLED_ tests as passed and only mentions them in
    // the captured output.
    static ref DISABLED_NOTICE: Regex = Regex::new(r"YOU HAVE \d+ DISABLED TEST").unwrap();
}

pub fn parse_junit_file(path: &Path) -> Result<TestReport> {
    if !path.is_file() {
        return Err(Error::FileNotFoundError(path.display().to_string()));
    }

    parse_junit(BufReader::new(File::open(path)?))
}

pub fn parse_junit_str(content: &str) -> Result<TestReport> {
    parse_junit(content.as_bytes())
}

pub fn parse_junit<R: BufRead>(input: R) -> Result<TestReport> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut suites: Vec<TestSuite> = Vec::new();
    let mut current_suite: Option<TestSuite> = None;
    let mut current_case: Option<CaseBuilder> = None;
    let mut saw_root = false;
    let mut unknown_depth = 0_usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) => {
                if unknown_depth > 0 {
                    unknown_depth += 1;
                } else {
                    match tag.local_name().as_ref() {
                        b"testsuites" if !saw_root => saw_root = true,
                        b"testsuite" if current_suite.is_none() => {
                            saw_root = true;
                            current_suite = Some(TestSuite {
                                name: attr_value(&tag, b"name")?.unwrap_or_default(),
                                cases: Vec::new(),
                            });
                        }
                        b"testsuite" | b"testsuites" => {
                            return Err(Error::ParseError(format!(
                                "unexpected nested <{}> element",
                                String::from_utf8_lossy(tag.local_name().as_ref())
                            )));
                        }
                        b"testcase" => {
                            if current_suite.is_none() {
                                return Err(Error::ParseError(
                                    "found <testcase> outside of a <testsuite>".to_string(),
                                ));
                            }
                            current_case = Some(CaseBuilder::from_start(&tag)?);
                        }
                        b"failure" if current_case.is_some() => {
                            let message = attr_value(&tag, b"message")?;
                            current_case.as_mut().unwrap().open_child(Child::Failure, message);
                        }
                        b"error" if current_case.is_some() => {
                            let message = attr_value(&tag, b"message")?;
                            current_case.as_mut().unwrap().open_child(Child::Error, message);
                        }
                        b"skipped" if current_case.is_some() => {
                            let message = attr_value(&tag, b"message")?;
                            current_case.as_mut().unwrap().open_child(Child::Skipped, message);
                        }
                        b"system-out" if current_case.is_some() => {
                            current_case.as_mut().unwrap().open_child(Child::SystemOut, None);
                        }
                        _ => unknown_depth += 1,
                    }
                }
            }

            Event::Empty(tag) => {
                if unknown_depth == 0 {
                    match tag.local_name().as_ref() {
                        b"testsuites" if !saw_root => saw_root = true,
                        b"testsuite" if current_suite.is_none() => {
                            saw_root = true;
                            suites.push(TestSuite {
                                name: attr_value(&tag, b"name")?.unwrap_or_default(),
                                cases: Vec::new(),
                            });
                        }
                        b"testcase" => {
                            match current_suite.as_mut() {
                                Some(suite) => {
                                    suite.cases.push(CaseBuilder::from_start(&tag)?.build())
                                }
                                None => {
                                    return Err(Error::ParseError(
                                        "found <testcase> outside of a <testsuite>".to_string(),
                                    ))
                                }
                            };
                        }
                        b"failure" if current_case.is_some() => {
                            let message = attr_value(&tag, b"message")?;
                            let case = current_case.as_mut().unwrap();
                            case.open_child(Child::Failure, message);
                            case.close_child();
                        }
                        b"error" if current_case.is_some() => {
                            let message = attr_value(&tag, b"message")?;
                            let case = current_case.as_mut().unwrap();
                            case.open_child(Child::Error, message);
                            case.close_child();
                        }
                        b"skipped" if current_case.is_some() => {
                            let message = attr_value(&tag, b"message")?;
                            let case = current_case.as_mut().unwrap();
                            case.open_child(Child::Skipped, message);
                            case.close_child();
                        }
                        _ => {}
                    }
                }
            }

            Event::Text(text) => {
                if unknown_depth == 0 {
                    if let Some(case) = current_case.as_mut() {
                        case.append_text(&text.unescape()?);
                    }
                }
            }

            Event::CData(data) => {
                if unknown_depth == 0 {
                    if let Some(case) = current_case.as_mut() {
                        case.append_text(&String::from_utf8_lossy(&data));
                    }
                }
            }

            Event::End(tag) => {
                if unknown_depth > 0 {
                    unknown_depth -= 1;
                } else {
                    match tag.local_name().as_ref() {
                        b"testcase" => {
                            let case = current_case.take().ok_or_else(|| {
                                Error::ParseError("unexpected </testcase>".to_string())
                            })?;
                            // a <testcase> start is only accepted inside a suite
                            current_suite.as_mut().unwrap().cases.push(case.build());
                        }
                        b"testsuite" => {
                            let suite = current_suite.take().ok_or_else(|| {
                                Error::ParseError("unexpected </testsuite>".to_string())
                            })?;
                            suites.push(suite);
                        }
                        b"failure" | b"error" | b"skipped" | b"system-out" => {
                            if let Some(case) = current_case.as_mut() {
                                case.close_child();
                            }
                        }
                        _ => {}
                    }
                }
            }

            Event::Eof => break,

            _ => {}
        }

        buf.clear();
    }

    if current_suite.is_some() || current_case.is_some() {
        return Err(Error::ParseError("unexpected end of document".to_string()));
    }
    if !saw_root {
        return Err(Error::ParseError(
            "document contains no <testsuite> element".to_string(),
        ));
    }

    Ok(TestReport { suites })
}

fn attr_value(tag: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in tag.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[derive(Clone, Copy, PartialEq)]
enum Child {
    Failure,
    Error,
    Skipped,
    SystemOut,
}

#[derive(Default)]
struct ChildText {
    message: Option<String>,
    text: String,
}

struct CaseBuilder {
    name: String,
    classname: Option<String>,
    time: Option<f64>,
    status_attr: Option<String>,
    failure: Option<ChildText>,
    error: Option<ChildText>,
    skipped: Option<ChildText>,
    system_out: String,
    active: Option<Child>,
}

impl CaseBuilder {
    fn from_start(tag: &BytesStart<'_>) -> Result<CaseBuilder> {
        let mut name = None;
        let mut classname = None;
        let mut time = None;
        let mut status_attr = None;

        for attr in tag.attributes() {
            let attr = attr?;
            match attr.key.as_ref() {
                b"name" => name = Some(attr.unescape_value()?.into_owned()),
                b"classname" => classname = Some(attr.unescape_value()?.into_owned()),
                b"time" => time = attr.unescape_value()?.parse::<f64>().ok(),
                b"status" => status_attr = Some(attr.unescape_value()?.into_owned()),
                _ => {}
            }
        }

        Ok(CaseBuilder {
            name: name.ok_or_else(|| {
                Error::ParseError("<testcase> is missing the name attribute".to_string())
            })?,
            classname,
            time,
            status_attr,
            failure: None,
            error: None,
            skipped: None,
            system_out: String::new(),
            active: None,
        })
    }

    fn open_child(&mut self, child: Child, message: Option<String>) {
        let slot = match child {
            Child::Failure => Some(&mut self.failure),
            Child::Error => Some(&mut self.error),
            Child::Skipped => Some(&mut self.skipped),
            Child::SystemOut => None,
        };
        if let Some(slot) = slot {
            slot.get_or_insert_with(ChildText::default).message = message;
        }
        self.active = Some(child);
    }

    fn close_child(&mut self) {
        self.active = None;
    }

    fn append_text(&mut self, text: &str) {
        let target = match self.active {
            Some(Child::SystemOut) => &mut self.system_out,
            Some(Child::Failure) => &mut self.failure.get_or_insert_with(ChildText::default).text,
            Some(Child::Error) => &mut self.error.get_or_insert_with(ChildText::default).text,
            Some(Child::Skipped) => &mut self.skipped.get_or_insert_with(ChildText::default).text,
            None => return,
        };
        target.push_str(text);
    }

    fn build(self) -> TestCase {
        let system_out = restore_control_chars(&self.system_out);

        // explicit child elements win over the CTest status attribute
        let status = if let Some(failure) = self.failure {
            CaseStatus::Fail {
                message: failure.message,
                output: restore_control_chars(&failure.text),
            }
        } else if let Some(error) = self.error {
            CaseStatus::Error {
                message: error.message,
                output: restore_control_chars(&error.text),
            }
        } else if let Some(skipped) = self.skipped {
            CaseStatus::Skip {
                reason: skipped.message,
            }
        } else {
            match self.status_attr.as_deref() {
                Some("fail") => CaseStatus::Fail {
                    message: None,
                    output: None,
                },
                Some("notrun") => CaseStatus::Skip { reason: None },
                Some("disabled") => CaseStatus::Disabled,
                _ => CaseStatus::Pass,
            }
        };

        let status = match status {
            CaseStatus::Pass if is_disabled(&self.name, system_out.as_deref()) => {
                CaseStatus::Disabled
            }
            other => other,
        };

        TestCase {
            name: self.name,
            classname: self.classname,
            time: self.time,
            status,
            system_out,
        }
    }
}

fn restore_control_chars(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.replace(ESC_PLACEHOLDER, "\x1b"))
}

fn is_disabled(name: &str, system_out: Option<&str>) -> bool {
    name.starts_with("DISABLED_")
        || name.contains(".DISABLED_")
        || system_out.map_or(false, |out| DISABLED_NOTICE.is_match(out))
}
