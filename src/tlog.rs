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

use std::sync::Arc;

use jiff::tz::TimeZone;

use crate::Error;
use crate::Logger;
use crate::append::Outputs;
use crate::handler::Handler;
use crate::handler::HandlerOptions;
use crate::handler::StacktraceHandler;
use crate::handler::TIME_KEY;
use crate::handler::TextHandler;
use crate::kv::Attr;
use crate::kv::Value;
use crate::opts::Format;
use crate::opts::LogLevel;
use crate::opts::Opts;
use crate::str::Str;

const DEFAULT_PATH: &str = "stderr";

/// A ready-to-use logger writing to the destinations named in [`Opts`].
///
/// Text records look like:
///
/// ```text
/// 2025-03-31T21:04:28+08:00 ERROR src/main.rs:26 "connection lost" peer=10.0.0.7 stacktrace="app::serve\n\tsrc/main.rs:26\n..."
/// ```
///
/// # Examples
///
/// ```
/// use tlog::LogLevel;
/// use tlog::Opts;
/// use tlog::Tlog;
///
/// let tlog = Tlog::new(Opts {
///     level: LogLevel::Warn,
///     ..Opts::default()
/// })
/// .unwrap();
///
/// tlog.logger().warn("disk almost full");
/// tlog.close().unwrap();
/// ```
#[derive(Debug)]
pub struct Tlog {
    outputs: Arc<Outputs>,
    logger: Logger,
}

impl Tlog {
    /// Open the destinations and build the handler chain.
    ///
    /// # Errors
    ///
    /// Returns an error if a destination cannot be opened, or if `opts.format` is
    /// [`Format::Json`] without the `json` feature.
    pub fn new(opts: Opts) -> Result<Tlog, Error> {
        if opts.format == Format::Json && !cfg!(feature = "json") {
            return Err(Error::new("json format is not enabled"));
        }

        let level = opts.level.threshold();
        let stacktrace_level = match opts.stacktrace_level {
            None | Some(LogLevel::Default) => opts.level.default_stacktrace_threshold(),
            Some(stacktrace_level) => stacktrace_level.threshold(),
        };

        let path = if opts.path.is_empty() {
            DEFAULT_PATH
        } else {
            opts.path.as_str()
        };
        let outputs = Outputs::open(path)
            .map_err(|err| Error::new("failed to create outputs").with_source(err))?;
        let outputs = Arc::new(outputs);

        let options = HandlerOptions::default()
            .level(level)
            .add_source(true)
            .replace_attr(replace_time);
        let handler: Arc<dyn Handler> = match opts.format {
            #[cfg(feature = "json")]
            Format::Json => Arc::new(crate::handler::JsonHandler::new(outputs.clone(), options)),
            _ => Arc::new(TextHandler::new(
                outputs.clone(),
                options.omit_builtin_keys(true),
            )),
        };
        let handler = StacktraceHandler::new(handler, stacktrace_level);

        Ok(Tlog {
            outputs,
            logger: Logger::new(Arc::new(handler)),
        })
    }

    /// The logger; clone it to hand it around.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Close every file destination. Standard streams stay open.
    ///
    /// # Errors
    ///
    /// Returns one error carrying every close failure.
    pub fn close(&self) -> Result<(), Error> {
        self.outputs.close()
    }
}

/// Render the record time as RFC 3339 without fractional seconds in the system timezone.
fn replace_time(groups: &[Str], attr: Attr) -> Attr {
    if !groups.is_empty() || attr.key().get() != TIME_KEY {
        return attr;
    }
    match attr.value() {
        Value::Time(ts) => {
            let ts = *ts;
            let offset = TimeZone::system().to_offset(ts);
            attr.with_value(format!("{:.0}", ts.display_with_offset(offset)))
        }
        _ => attr,
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;

    #[test]
    fn test_replace_time() {
        let ts = Timestamp::from_second(1_700_000_000).unwrap();
        let attr = replace_time(&[], Attr::time(TIME_KEY, ts));

        let text = attr.value().as_str().unwrap().to_string();
        assert!(!text.contains('.'), "{text}");
        assert!(!text.ends_with('Z'), "{text}");
        let parsed: Timestamp = text.parse().unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_replace_time_skips_other_attrs() {
        let ts = Timestamp::from_second(1_700_000_000).unwrap();

        let attr = replace_time(&[Str::new("g")], Attr::time(TIME_KEY, ts));
        assert!(matches!(attr.value(), Value::Time(_)));

        let attr = replace_time(&[], Attr::time("deadline", ts));
        assert!(matches!(attr.value(), Value::Time(_)));
    }

    #[test]
    fn test_stacktrace_threshold() {
        let threshold = |level, stacktrace_level| {
            let tlog = Tlog::new(Opts {
                level,
                stacktrace_level,
                ..Opts::default()
            })
            .unwrap();
            format!("{:?}", tlog.logger().handler())
        };

        assert!(threshold(LogLevel::Trace, None).ends_with("level: DEBUG }"));
        assert!(threshold(LogLevel::Debug, None).ends_with("level: ERROR }"));
        assert!(threshold(LogLevel::Info, Some(LogLevel::Default)).ends_with("level: ERROR }"));
        assert!(threshold(LogLevel::Error, Some(LogLevel::Warn)).ends_with("level: WARN }"));
    }

    #[test]
    fn test_bad_path() {
        let err = Tlog::new(Opts {
            path: "/not/exist/a.log".to_string(),
            ..Opts::default()
        })
        .unwrap_err();
        assert!(err.to_string().starts_with("failed to create outputs"), "{err}");
        assert!(err.to_string().contains("/not/exist/a.log"), "{err}");
    }

    #[cfg(not(feature = "json"))]
    #[test]
    fn test_json_disabled() {
        let err = Tlog::new(Opts {
            format: Format::Json,
            ..Opts::default()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "json format is not enabled");
    }
}
