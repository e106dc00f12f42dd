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

use crate::Error;
use crate::handler::Handler;
use crate::kv::Attr;
use crate::logger;
use crate::record::Level;
use crate::record::Record;
use crate::stacktrace;
use crate::str::Str;

/// Key of the attribute that carries the captured call stack.
pub const STACKTRACE_KEY: &str = "stacktrace";

// `StacktraceHandler::handle`, for records that did not come from a `Logger`.
const HANDLE_FRAMES: usize = 1;

/// A handler that attaches the caller's stack trace to severe records.
///
/// Records at or above `level` get a `stacktrace` attribute before they reach the inner handler.
/// The trace starts at the function that called the [`Logger`](crate::Logger) method; frames of
/// the logging machinery are skipped. A record handed to `handle` directly gets the stack of the
/// code that called `handle`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tlog::Level;
/// use tlog::append::Testing;
/// use tlog::handler::HandlerOptions;
/// use tlog::handler::StacktraceHandler;
/// use tlog::handler::TextHandler;
///
/// let text = TextHandler::new(Arc::new(Testing::default()), HandlerOptions::default());
/// let handler = StacktraceHandler::new(Arc::new(text), Level::Error);
/// ```
#[derive(Debug)]
pub struct StacktraceHandler {
    inner: Arc<dyn Handler>,
    level: Level,
}

impl StacktraceHandler {
    /// Wrap `inner`, capturing stacks for records at or above `level`.
    pub fn new(inner: Arc<dyn Handler>, level: Level) -> Self {
        StacktraceHandler { inner, level }
    }
}

impl Handler for StacktraceHandler {
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    #[inline(never)]
    fn handle(&self, mut record: Record) -> Result<(), Error> {
        if record.level() >= self.level {
            let stack = match logger::caller_frames() {
                Some(frames) => stacktrace::render(&frames),
                None => stacktrace::get(HANDLE_FRAMES),
            };
            record.add(Attr::string(STACKTRACE_KEY, stack));
        }
        self.inner.handle(record)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        Arc::new(StacktraceHandler {
            inner: self.inner.with_attrs(attrs),
            level: self.level,
        })
    }

    fn with_group(&self, name: Str) -> Arc<dyn Handler> {
        Arc::new(StacktraceHandler {
            inner: self.inner.with_group(name),
            level: self.level,
        })
    }
}
