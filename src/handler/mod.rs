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

//! Handlers that filter, decorate and encode log records.
//!
//! A handler either encodes records and hands the bytes to an [`Append`](crate::append::Append)
//! ([`TextHandler`], [`JsonHandler`]), or wraps another handler and delegates to it
//! ([`StacktraceHandler`]).

use std::fmt;
use std::sync::Arc;

use jiff::tz::TimeZone;

use crate::Error;
use crate::buffer::BufferPool;
use crate::kv::Attr;
use crate::record::Level;
use crate::record::Record;
use crate::str::Str;

#[cfg(feature = "json")]
mod json;
mod stacktrace;
mod text;

#[cfg(feature = "json")]
pub use self::json::JsonHandler;
pub use self::stacktrace::STACKTRACE_KEY;
pub use self::stacktrace::StacktraceHandler;
pub use self::text::TextHandler;

/// Key of the built-in time attribute.
pub const TIME_KEY: &str = "time";
/// Key of the built-in level attribute.
pub const LEVEL_KEY: &str = "level";
/// Key of the built-in source location attribute.
pub const SOURCE_KEY: &str = "source";
/// Key of the built-in message attribute.
pub const MESSAGE_KEY: &str = "msg";

/// A handler of log records.
pub trait Handler: fmt::Debug + Send + Sync + 'static {
    /// Whether records at `level` are handled at all.
    fn enabled(&self, level: Level) -> bool;

    /// Handle a record that passed [`enabled`](Handler::enabled).
    fn handle(&self, record: Record) -> Result<(), Error>;

    /// A handler that includes `attrs` in every record, ahead of the record's own attributes.
    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler>;

    /// A handler that qualifies every later attribute key with the group `name`.
    ///
    /// An empty name returns an equivalent handler.
    fn with_group(&self, name: Str) -> Arc<dyn Handler>;
}

/// A rule applied to every non-group attribute before it is encoded.
///
/// The first argument is the path of open groups; it is empty for the built-in attributes.
/// Returning an attribute with an empty key and a non-group value drops the attribute.
pub type ReplaceAttr = Arc<dyn Fn(&[Str], Attr) -> Attr + Send + Sync>;

/// Options shared by the encoding handlers.
#[derive(Clone)]
pub struct HandlerOptions {
    level: Level,
    add_source: bool,
    replace_attr: Option<ReplaceAttr>,
    omit_builtin_keys: bool,
    timezone: TimeZone,
    pool: Arc<BufferPool>,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            level: Level::Info,
            add_source: false,
            replace_attr: None,
            omit_builtin_keys: false,
            timezone: TimeZone::system(),
            pool: BufferPool::global(),
        }
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("level", &self.level)
            .field("add_source", &self.add_source)
            .field("replace_attr", &self.replace_attr.as_ref().map(|_| ".."))
            .field("omit_builtin_keys", &self.omit_builtin_keys)
            .field("timezone", &self.timezone)
            .field("pool", &self.pool)
            .finish()
    }
}

impl HandlerOptions {
    /// Set the minimum level of handled records. Default to [`Level::Info`].
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Whether to add the `file:line` of the call site. Default to `false`.
    pub fn add_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    /// Set a rule that rewrites attributes before they are encoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use tlog::handler::HandlerOptions;
    /// use tlog::kv::Attr;
    ///
    /// // drop every attribute named "password"
    /// let options = HandlerOptions::default().replace_attr(|_, attr: Attr| {
    ///     if attr.key().get() == "password" {
    ///         Attr::string("", "")
    ///     } else {
    ///         attr
    ///     }
    /// });
    /// ```
    pub fn replace_attr<F>(mut self, replace_attr: F) -> Self
    where
        F: Fn(&[Str], Attr) -> Attr + Send + Sync + 'static,
    {
        self.replace_attr = Some(Arc::new(replace_attr));
        self
    }

    /// Write the time, level, source and message values without their `key=` prefix.
    ///
    /// Only the text handler honors this option.
    pub fn omit_builtin_keys(mut self, omit_builtin_keys: bool) -> Self {
        self.omit_builtin_keys = omit_builtin_keys;
        self
    }

    /// Set the timezone used to render time values. Default to the system timezone.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    /// Set the pool the encoder borrows buffers from. Default to [`BufferPool::global`].
    pub fn pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    pub(crate) fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    pub(crate) fn replace(&self, groups: &[Str], attr: Attr) -> Attr {
        match &self.replace_attr {
            Some(replace) if attr.value().as_group().is_none() => replace(groups, attr),
            _ => attr,
        }
    }
}
