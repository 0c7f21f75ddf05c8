//! Line patterns
//!
//! A pattern is literal text with `%` flags:
//!
//! | flag | expands to |
//! |------|------------|
//! | `%Y` `%m` `%d` | year, month, day |
//! | `%H` `%M` `%S` | hour, minute, second |
//! | `%e` | milliseconds |
//! | `%l` `%L` | level name, level letter |
//! | `%v` | message, prefixed with `[file:line] [function]` when the record has a location |
//! | `%n` | logger name |
//! | `%t` `%P` | thread, process id |
//! | `%s` `%#` `%!` | source file name, line, function |
//! | `%^` `%$` | start and end of the level-coloured range |
//! | `%%` | a literal `%` |

use std::fmt::Write;
use std::str::FromStr;

use chrono::{Datelike, Timelike};

use crate::error::LogError;
use crate::level::LogLevel;
use crate::record::LogRecord;

pub const DEFAULT_CONSOLE_PATTERN: &str = "[%Y-%m-%d %H:%M:%S.%e] [%^%l%$] %v";
pub const DEFAULT_FILE_PATTERN: &str = "[%Y-%m-%d %H:%M:%S.%e] [%l] %v";

const COLOR_RESET: &str = "\x1b[m";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millis,
    Level,
    ShortLevel,
    Message,
    Logger,
    Thread,
    Process,
    SourceFile,
    SourceLine,
    Function,
    ColorStart,
    ColorEnd,
}

/// A parsed line pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, LogError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            let Some(flag) = chars.next() else {
                return Err(LogError::InvalidPattern(format!(
                    "dangling '%' at end of {:?}",
                    source
                )));
            };
            if flag == '%' {
                literal.push('%');
                continue;
            }
            let token = match flag {
                'Y' => Token::Year,
                'm' => Token::Month,
                'd' => Token::Day,
                'H' => Token::Hour,
                'M' => Token::Minute,
                'S' => Token::Second,
                'e' => Token::Millis,
                'l' => Token::Level,
                'L' => Token::ShortLevel,
                'v' => Token::Message,
                'n' => Token::Logger,
                't' => Token::Thread,
                'P' => Token::Process,
                's' => Token::SourceFile,
                '#' => Token::SourceLine,
                '!' => Token::Function,
                '^' => Token::ColorStart,
                '$' => Token::ColorEnd,
                other => {
                    return Err(LogError::InvalidPattern(format!(
                        "unknown flag '%{}' in {:?}",
                        other, source
                    )))
                }
            };
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(token);
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            tokens,
        })
    }

    /// The text this pattern was parsed from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Append `record` rendered with this pattern to `out`, without a newline
    pub fn format(&self, record: &LogRecord, color: bool, out: &mut String) {
        let time = &record.time;
        let mut colored = false;
        for token in &self.tokens {
            // Writing into a String cannot fail
            let _ = match token {
                Token::Literal(text) => {
                    out.push_str(text);
                    Ok(())
                }
                Token::Year => write!(out, "{:04}", time.year()),
                Token::Month => write!(out, "{:02}", time.month()),
                Token::Day => write!(out, "{:02}", time.day()),
                Token::Hour => write!(out, "{:02}", time.hour()),
                Token::Minute => write!(out, "{:02}", time.minute()),
                Token::Second => write!(out, "{:02}", time.second()),
                Token::Millis => write!(out, "{:03}", time.timestamp_subsec_millis() % 1000),
                Token::Level => {
                    out.push_str(record.level.as_str());
                    Ok(())
                }
                Token::ShortLevel => {
                    out.push(record.level.short());
                    Ok(())
                }
                Token::Message => {
                    if let Some(loc) = &record.location {
                        let _ = write!(out, "[{}:{}] [{}] ", loc.file_name(), loc.line, loc.function);
                    }
                    out.push_str(&record.message);
                    Ok(())
                }
                Token::Logger => {
                    out.push_str(&record.target);
                    Ok(())
                }
                Token::Thread => {
                    out.push_str(&record.thread);
                    Ok(())
                }
                Token::Process => write!(out, "{}", std::process::id()),
                Token::SourceFile => {
                    if let Some(loc) = &record.location {
                        out.push_str(loc.file_name());
                    }
                    Ok(())
                }
                Token::SourceLine => match &record.location {
                    Some(loc) => write!(out, "{}", loc.line),
                    None => Ok(()),
                },
                Token::Function => {
                    if let Some(loc) = &record.location {
                        out.push_str(&loc.function);
                    }
                    Ok(())
                }
                Token::ColorStart => {
                    if color {
                        out.push_str(level_color(record.level));
                        colored = true;
                    }
                    Ok(())
                }
                Token::ColorEnd => {
                    if colored {
                        out.push_str(COLOR_RESET);
                        colored = false;
                    }
                    Ok(())
                }
            };
        }
        if colored {
            out.push_str(COLOR_RESET);
        }
    }
}

impl FromStr for Pattern {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

fn level_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "\x1b[37m",
        LogLevel::Debug => "\x1b[36m",
        LogLevel::Info => "\x1b[32m",
        LogLevel::Warn => "\x1b[33m\x1b[1m",
        LogLevel::Error => "\x1b[31m\x1b[1m",
        LogLevel::Critical => "\x1b[1m\x1b[41m",
        LogLevel::Off => "",
    }
}
