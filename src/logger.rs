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

use std::hint::black_box;
use std::panic::Location;
use std::sync::Arc;

use crate::handler::Handler;
use crate::kv::Attr;
use crate::record::Level;
use crate::record::Record;
use crate::stacktrace;
use crate::stacktrace::Frame;
use crate::str::Str;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// The front end of the library: turns log calls into records and hands them to a handler.
///
/// Loggers are cheap to clone and safe to share across threads. Every log method records the
/// caller's `file:line` as the record source.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tlog::Level;
/// use tlog::Logger;
/// use tlog::append::Testing;
/// use tlog::handler::HandlerOptions;
/// use tlog::handler::TextHandler;
/// use tlog::kv::Attr;
///
/// let testing = Testing::default();
/// let handler = TextHandler::new(Arc::new(testing.clone()), HandlerOptions::default());
/// let logger = Logger::new(Arc::new(handler)).with([Attr::string("service", "api")]);
///
/// logger.info("started");
/// logger.log(Level::Warn, "slow request", [Attr::int("millis", 1200)]);
///
/// assert_eq!(testing.lines().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Logger {
    handler: Arc<dyn Handler>,
    trap: Arc<dyn Trap>,
}

impl Logger {
    /// Create a logger that sends records to `handler`.
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Logger {
            handler,
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Set the trap for errors the handler returns.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Trap) -> Self {
        self.trap = Arc::new(trap);
        self
    }

    /// The handler records are sent to.
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// A logger whose records all carry `attrs`.
    pub fn with(&self, attrs: impl IntoIterator<Item = Attr>) -> Logger {
        let attrs: Vec<Attr> = attrs.into_iter().collect();
        if attrs.is_empty() {
            return self.clone();
        }
        Logger {
            handler: self.handler.with_attrs(attrs),
            trap: self.trap.clone(),
        }
    }

    /// A logger whose later attributes are qualified by the group `name`.
    pub fn with_group(&self, name: impl Into<Str>) -> Logger {
        let name = name.into();
        if name.is_empty() {
            return self.clone();
        }
        Logger {
            handler: self.handler.with_group(name),
            trap: self.trap.clone(),
        }
    }

    /// Whether records at `level` would be handled.
    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    /// Log a message at [`Level::Debug`].
    #[track_caller]
    #[inline(always)]
    pub fn debug(&self, message: impl Into<Str>) {
        self.emit(Level::Debug, message.into(), vec![], Location::caller());
        black_box(());
    }

    /// Log a message at [`Level::Info`].
    #[track_caller]
    #[inline(always)]
    pub fn info(&self, message: impl Into<Str>) {
        self.emit(Level::Info, message.into(), vec![], Location::caller());
        black_box(());
    }

    /// Log a message at [`Level::Warn`].
    #[track_caller]
    #[inline(always)]
    pub fn warn(&self, message: impl Into<Str>) {
        self.emit(Level::Warn, message.into(), vec![], Location::caller());
        black_box(());
    }

    /// Log a message at [`Level::Error`].
    #[track_caller]
    #[inline(always)]
    pub fn error(&self, message: impl Into<Str>) {
        self.emit(Level::Error, message.into(), vec![], Location::caller());
        black_box(());
    }

    /// Log a message with attributes at any level.
    #[track_caller]
    #[inline(always)]
    pub fn log(
        &self,
        level: Level,
        message: impl Into<Str>,
        attrs: impl IntoIterator<Item = Attr>,
    ) {
        let attrs = attrs.into_iter().collect();
        self.emit(level, message.into(), attrs, Location::caller());
        black_box(());
    }

    // The frame captured stacks are cut at. Every public log method is inlined into its caller
    // and follows this call with `black_box`, so the caller's frame is never tail-called away.
    #[inline(never)]
    fn emit(
        &self,
        level: Level,
        message: Str,
        attrs: Vec<Attr>,
        location: &'static Location<'static>,
    ) {
        if !self.handler.enabled(level) {
            return;
        }

        let record = Record::builder()
            .level(level)
            .source(Some(location.into()))
            .message(message)
            .attrs(attrs)
            .build();
        if let Err(err) = self.handler.handle(record) {
            self.trap.trap(&err);
        }
    }
}

const LOGGER_PATH: &str = concat!(module_path!(), "::Logger");

/// The call stack of the code that called into a [`Logger`], innermost first.
///
/// Returns `None` unless a record sent by a [`Logger`] is being handled on this thread.
pub(crate) fn caller_frames() -> Option<Vec<Frame>> {
    let entry = Logger::emit
        as fn(&Logger, Level, Str, Vec<Attr>, &'static Location<'static>)
        as usize;
    let mut frames = stacktrace::capture_below(entry, is_emit_frame)?;
    // the public log methods, when they resolve as inlined frames
    let facade = frames
        .iter()
        .take_while(|f| is_logger_frame(f.function()))
        .count();
    frames.drain(..facade);
    Some(frames)
}

fn is_emit_frame(function: &str) -> bool {
    is_logger_frame(function) && function.ends_with("::emit")
}

// Matches both `tlog::logger::Logger::info` and `<tlog::logger::Logger>::info::<&str>`.
fn is_logger_frame(function: &str) -> bool {
    function.trim_start_matches('<').starts_with(LOGGER_PATH)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::Error;
    use crate::append::Append;
    use crate::append::Testing;
    use crate::handler::HandlerOptions;
    use crate::handler::TextHandler;

    #[derive(Debug)]
    struct Failing;

    impl Append for Failing {
        fn append(&self, _: &[u8]) -> Result<(), Error> {
            Err(Error::new("disk on fire"))
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Collect(Arc<Mutex<Vec<String>>>);

    #[derive(Debug, Default, Clone)]
    struct Stacks(Arc<Mutex<Vec<Option<Vec<Frame>>>>>);

    impl Handler for Stacks {
        fn enabled(&self, _: Level) -> bool {
            true
        }

        fn handle(&self, _: Record) -> Result<(), Error> {
            self.0.lock().unwrap().push(caller_frames());
            Ok(())
        }

        fn with_attrs(&self, _: Vec<Attr>) -> Arc<dyn Handler> {
            Arc::new(self.clone())
        }

        fn with_group(&self, _: Str) -> Arc<dyn Handler> {
            Arc::new(self.clone())
        }
    }

    // Each log call is in tail position.
    #[inline(never)]
    fn log_everything(logger: &Logger) {
        logger.debug("d");
        logger.info("i");
        logger.warn("w");
        logger.log(Level::Error, "l", Vec::<Attr>::new());
        logger.error("e");
    }

    impl Trap for Collect {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    fn logger(testing: &Testing, level: Level) -> Logger {
        let handler = TextHandler::new(
            Arc::new(testing.clone()),
            HandlerOptions::default().level(level).add_source(true),
        );
        Logger::new(Arc::new(handler))
    }

    #[test]
    fn test_level_filtering() {
        let testing = Testing::default();
        let logger = logger(&testing, Level::Warn);

        logger.debug("d");
        logger.info("i");
        logger.warn("w");
        logger.error("e");

        let lines = testing.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("level=WARN"));
        assert!(lines[1].contains("level=ERROR"));
        assert!(!logger.enabled(Level::Info));
    }

    #[test]
    fn test_source_is_caller() {
        let testing = Testing::default();
        let logger = logger(&testing, Level::Info);

        let line = line!() + 1;
        logger.info("here");
        logger.log(Level::Info, "there", [Attr::int("n", 1)]);

        let lines = testing.lines();
        let expected = format!("source={}:{line} ", file!());
        assert!(lines[0].contains(&expected), "{lines:?}");
        let expected = format!("source={}:{} ", file!(), line + 1);
        assert!(lines[1].contains(&expected), "{lines:?}");
        assert!(lines[1].ends_with(" n=1"), "{lines:?}");
    }

    #[test]
    fn test_with_and_group() {
        let testing = Testing::default();
        let logger = logger(&testing, Level::Info)
            .with([Attr::string("svc", "api")])
            .with_group("req")
            .with_group("");

        logger.log(Level::Info, "m", [Attr::int("id", 3)]);
        assert!(testing.contents().ends_with(" svc=api req.id=3\n"));
    }

    #[test]
    fn test_errors_go_to_trap() {
        let collect = Collect::default();
        let handler = TextHandler::new(Arc::new(Failing), HandlerOptions::default());
        let logger = Logger::new(Arc::new(handler)).trap(collect.clone());

        logger.info("lost");
        logger.debug("filtered");

        let errors = collect.0.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0], "disk on fire");
    }

    #[test]
    fn test_caller_frames_start_at_caller() {
        let stacks = Stacks::default();
        let logger = Logger::new(Arc::new(stacks.clone()));
        log_everything(&logger);
        log_everything(&logger.with_group("g"));
        assert!(caller_frames().is_none());

        let stacks = stacks.0.lock().unwrap();
        assert_eq!(stacks.len(), 10);
        for frames in stacks.iter() {
            let frames = frames.as_ref().unwrap();
            assert!(frames[0].function().ends_with("tests::log_everything"), "{frames:?}");
            assert!(frames[1].function().contains("test_caller_frames_start_at_caller"));
            assert!(frames.iter().all(|f| !is_logger_frame(f.function())));
        }
    }

    #[test]
    fn test_logger_frame_names() {
        assert!(is_logger_frame("tlog::logger::Logger::info"));
        assert!(is_logger_frame("<tlog::logger::Logger>::log::<[tlog::kv::Attr; 1]>"));
        assert!(is_emit_frame("tlog::logger::Logger::emit"));
        assert!(is_emit_frame("<tlog::logger::Logger>::emit"));
        assert!(!is_emit_frame("tlog::logger::Logger::error"));
        assert!(!is_logger_frame("app::Logger::info"));
        assert!(!is_logger_frame("tlog::logger::tests::log_everything"));
    }
}
