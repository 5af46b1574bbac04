//! Exported chat transcript parsing.
//!
//! A transcript line that starts a message looks like
//! `05/01/26, 10:30 - Juan Perez: Hola`. Lines that do not match continue the
//! previous message. Anything before the first matching line is dropped.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::normalize::normalize_date;
use crate::error::Result;
use crate::models::ParsedMessage;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2}/\d{1,2}/\d{2}(?:\d{2})?),?\s(\d{1,2}:\d{2})\s-\s([^:]+):\s(.*)$")
            .expect("transcript line pattern is valid")
    })
}

/// Read a transcript file. A UTF-8 BOM is skipped and undecodable bytes are
/// dropped rather than rejected.
pub fn read_transcript(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes.as_slice());
    Ok(String::from_utf8_lossy(bytes).replace('\u{FFFD}', ""))
}

/// Borrowed view over transcript text. Each call to [`Transcript::messages`]
/// starts a fresh pass.
#[derive(Debug, Clone, Copy)]
pub struct Transcript<'a> {
    text: &'a str,
}

impl<'a> Transcript<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    pub fn messages(&self) -> Messages<'a> {
        Messages {
            lines: self.text.lines(),
            current: None,
        }
    }
}

/// Lazy iterator over the messages of a transcript, in input order.
pub struct Messages<'a> {
    lines: std::str::Lines<'a>,
    current: Option<ParsedMessage>,
}

impl Iterator for Messages<'_> {
    type Item = ParsedMessage;

    fn next(&mut self) -> Option<ParsedMessage> {
        for raw in self.lines.by_ref() {
            let line = raw.trim();
            match parse_message_start(line) {
                Some(started) => {
                    if let Some(finished) = self.current.replace(started) {
                        return Some(finished);
                    }
                }
                None => {
                    if let Some(current) = self.current.as_mut() {
                        current.text.push('\n');
                        current.text.push_str(line);
                    }
                }
            }
        }
        self.current.take()
    }
}

fn parse_message_start(line: &str) -> Option<ParsedMessage> {
    let caps = line_pattern().captures(line)?;
    let date = normalize_date(&caps[1])?;
    Some(ParsedMessage {
        date,
        time: caps[2].to_string(),
        author_raw: caps[3].trim().to_string(),
        text: caps[4].trim().to_string(),
    })
}
