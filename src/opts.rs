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

use std::fmt;
use std::str::FromStr;

use crate::Error;
use crate::record::Level;

/// Options for [`Tlog::new`](crate::Tlog::new).
///
/// With the `serde` feature, the options can be read from a configuration file:
///
/// ```toml
/// level = "debug"
/// format = "text"
/// path = "stdout,/var/log/app.log"
/// stacktrace_level = "error"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Opts {
    /// The minimum severity of emitted records.
    pub level: LogLevel,
    /// The output encoding.
    pub format: Format,
    /// Comma-separated destinations: `stdout`, `stderr` or file paths. Empty means `stderr`.
    pub path: String,
    /// The minimum severity of records that carry a stack trace.
    ///
    /// `None` attaches stack traces to every record when `level` is [`LogLevel::Trace`], and to
    /// errors only otherwise.
    pub stacktrace_level: Option<LogLevel>,
}

/// A configured severity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LogLevel {
    /// Unset; behaves as [`LogLevel::Info`].
    #[default]
    Default,
    /// Filtered and rendered as [`Level::Debug`], with a stack trace on every record.
    Trace,
    /// [`Level::Debug`].
    Debug,
    /// [`Level::Info`].
    Info,
    /// [`Level::Warn`].
    Warn,
    /// [`Level::Error`].
    Error,
}

impl LogLevel {
    const NAMES: [(&'static str, LogLevel); 6] = [
        ("default", LogLevel::Default),
        ("trace", LogLevel::Trace),
        ("debug", LogLevel::Debug),
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("error", LogLevel::Error),
    ];

    /// The record level this severity filters at.
    pub fn threshold(self) -> Level {
        match self {
            LogLevel::Default | LogLevel::Info => Level::Info,
            LogLevel::Trace | LogLevel::Debug => Level::Debug,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    /// The stack-trace threshold used when none is configured.
    ///
    /// [`LogLevel::Trace`] attaches a stack trace to every record; every other severity attaches
    /// one to errors only.
    pub fn default_stacktrace_threshold(self) -> Level {
        match self {
            LogLevel::Trace => Level::Debug,
            _ => Level::Error,
        }
    }

    /// Return the lowercase name of the severity.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Default => "default",
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<LogLevel, Self::Err> {
        LogLevel::NAMES
            .iter()
            .find(|(name, _)| s.eq_ignore_ascii_case(name))
            .map(|(_, level)| *level)
            .ok_or_else(|| Error::new(format!("malformed log level: {s:?}")))
    }
}

/// The output encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Format {
    /// Unset; behaves as [`Format::Text`].
    #[default]
    Default,
    /// One line of `key=value` pairs per record.
    Text,
    /// One JSON object per record. Requires the `json` feature.
    Json,
}

impl Format {
    /// Return the lowercase name of the format.
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Default => "default",
            Format::Text => "text",
            Format::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Format, Self::Err> {
        for format in [Format::Default, Format::Text, Format::Json] {
            if s.eq_ignore_ascii_case(format.as_str()) {
                return Ok(format);
            }
        }
        Err(Error::new(format!("malformed format: {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_mapping() {
        assert_eq!(LogLevel::Default.threshold(), Level::Info);
        assert_eq!(LogLevel::Trace.threshold(), Level::Debug);
        assert_eq!(LogLevel::Debug.threshold(), Level::Debug);
        assert_eq!(LogLevel::Info.threshold(), Level::Info);
        assert_eq!(LogLevel::Warn.threshold(), Level::Warn);
        assert_eq!(LogLevel::Error.threshold(), Level::Error);

        assert_eq!(LogLevel::Trace.default_stacktrace_threshold(), Level::Debug);
        assert_eq!(LogLevel::Debug.default_stacktrace_threshold(), Level::Error);
        assert_eq!(LogLevel::Default.default_stacktrace_threshold(), Level::Error);
    }

    #[test]
    fn test_parse_and_display() {
        for (name, level) in LogLevel::NAMES {
            assert_eq!(name.to_uppercase().parse::<LogLevel>().unwrap(), level);
            assert_eq!(level.to_string(), name);
        }
        assert!("verbose".parse::<LogLevel>().is_err());

        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!(Format::Text.to_string(), "text");
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_default_opts() {
        let opts = Opts::default();
        assert_eq!(opts.level, LogLevel::Default);
        assert_eq!(opts.format, Format::Default);
        assert!(opts.path.is_empty());
        assert_eq!(opts.stacktrace_level, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize() {
        let opts: Opts = serde_json::from_str(
            r#"{"level":"debug","format":"text","path":"stdout","stacktrace_level":"error"}"#,
        )
        .unwrap();
        assert_eq!(opts.level, LogLevel::Debug);
        assert_eq!(opts.format, Format::Text);
        assert_eq!(opts.path, "stdout");
        assert_eq!(opts.stacktrace_level, Some(LogLevel::Error));

        let opts: Opts = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, Opts::default());
    }
}
