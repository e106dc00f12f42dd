// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Log record and level.

use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use jiff::Timestamp;

use crate::Error;
use crate::kv::Attr;
use crate::str::Str;

/// The payload of a log message.
#[derive(Clone, Debug)]
pub struct Record {
    // the observed time; `None` omits the time from the output
    time: Option<Timestamp>,

    level: Level,
    source: Option<Source>,

    // the payload
    message: Str,

    // structural logging
    attrs: Vec<Attr>,
}

impl Record {
    /// Returns a new builder.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// The observed time.
    pub fn time(&self) -> Option<Timestamp> {
        self.time
    }

    /// The severity of the message.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The call site of the message.
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// The message body.
    pub fn message(&self) -> &str {
        self.message.get()
    }

    /// The attributes, in the order they were added.
    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    /// The number of attributes.
    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }

    /// Append one attribute.
    pub fn add(&mut self, attr: Attr) {
        self.attrs.push(attr);
    }

    /// Create a builder initialized with the current record's values.
    pub fn to_builder(&self) -> RecordBuilder {
        RecordBuilder {
            record: self.clone(),
        }
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                time: Some(Timestamp::now()),
                level: Level::Info,
                source: None,
                message: Str::default(),
                attrs: vec![],
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`time`](Record::time).
    pub fn time(mut self, time: Option<Timestamp>) -> Self {
        self.record.time = time;
        self
    }

    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`source`](Record::source).
    pub fn source(mut self, source: Option<Source>) -> Self {
        self.record.source = source;
        self
    }

    /// Set [`message`](Record::message).
    pub fn message(mut self, message: impl Into<Str>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Set [`attrs`](Record::attrs).
    pub fn attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.record.attrs = attrs.into_iter().collect();
        self
    }

    /// Invoke the builder and return a `Record`.
    pub fn build(self) -> Record {
        self.record
    }
}

/// The source location of a log call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    file: Str,
    line: u32,
}

impl Source {
    /// Create a source location.
    pub fn new(file: impl Into<Str>, line: u32) -> Self {
        Source {
            file: file.into(),
            line,
        }
    }

    /// The source file.
    pub fn file(&self) -> &str {
        self.file.get()
    }

    /// The line number.
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl From<&'static Location<'static>> for Source {
    fn from(location: &'static Location<'static>) -> Self {
        Source::new(location.file(), location.line())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// An enum representing the severity thresholds of a record.
///
/// Levels are ordered from the least to the most severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Designates lower priority information.
    Debug,
    /// Designates useful information.
    Info,
    /// Designates hazardous situations.
    Warn,
    /// Designates very serious errors.
    Error,
}

impl Level {
    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for (name, level) in [
            ("debug", Level::Debug),
            ("info", Level::Info),
            ("warn", Level::Warn),
            ("error", Level::Error),
        ] {
            if s.eq_ignore_ascii_case(name) {
                return Ok(level);
            }
        }

        Err(Error::new(format!("malformed level: {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert!("fatal".parse::<Level>().is_err());
    }

    #[test]
    fn test_record_add() {
        let mut record = Record::builder()
            .message("hello")
            .attrs([Attr::int("a", 1)])
            .build();
        record.add(Attr::int("b", 2));

        let keys: Vec<&str> = record.attrs().iter().map(|a| a.key().get()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(record.message(), "hello");
        assert_eq!(record.level(), Level::Info);
    }
}
