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

use std::io::Write;
use std::sync::Arc;

use jiff::Timestamp;

use crate::Error;
use crate::append::Append;
use crate::handler::Handler;
use crate::handler::HandlerOptions;
use crate::handler::LEVEL_KEY;
use crate::handler::MESSAGE_KEY;
use crate::handler::SOURCE_KEY;
use crate::handler::TIME_KEY;
use crate::kv::Attr;
use crate::kv::Value;
use crate::record::Level;
use crate::record::Record;
use crate::str::Str;

/// A handler that writes records as single lines of space-separated `key=value` pairs.
///
/// Output format:
///
/// ```text
/// time=2025-03-31T21:04:28.986+08:00 level=INFO msg="request served" req.method=GET req.status=200
/// ```
///
/// Keys inside groups are qualified by the group path joined with `.`. Keys and string values
/// are quoted when they are empty or contain spaces, `=`, `"`, or control characters.
///
/// With [`HandlerOptions::omit_builtin_keys`], the time, level and source values are written bare
/// and the message is always quoted:
///
/// ```text
/// 2025-03-31T21:04:28.986+08:00 INFO src/main.rs:12 "request served" req.method=GET
/// ```
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tlog::append::Testing;
/// use tlog::handler::HandlerOptions;
/// use tlog::handler::TextHandler;
///
/// let handler = TextHandler::new(Arc::new(Testing::default()), HandlerOptions::default());
/// ```
#[derive(Debug, Clone)]
pub struct TextHandler {
    options: HandlerOptions,
    append: Arc<dyn Append>,
    // attributes from `with_attrs`, already encoded
    preformatted: Arc<[u8]>,
    // key prefix of the groups that `preformatted` has opened
    group_prefix: String,
    // every group from `with_group`, outermost first
    groups: Vec<Str>,
    // how many of `groups` are part of `group_prefix`
    open_groups: usize,
}

impl TextHandler {
    /// Create a text handler writing to `append`.
    pub fn new(append: Arc<dyn Append>, options: HandlerOptions) -> Self {
        TextHandler {
            options,
            append,
            preformatted: Arc::default(),
            group_prefix: String::new(),
            groups: vec![],
            open_groups: 0,
        }
    }

    fn append_builtins(&self, state: &mut State<'_>, record: &Record) {
        if let Some(time) = record.time() {
            state.append_builtin(Attr::time(TIME_KEY, time), false);
        }
        state.append_builtin(Attr::string(LEVEL_KEY, record.level().as_str()), false);
        if self.options.add_source {
            let source = match record.source() {
                Some(source) => source.to_string(),
                None => ":0".to_string(),
            };
            state.append_builtin(Attr::string(SOURCE_KEY, source), false);
        }
        let message = Str::new_shared(record.message());
        state.append_builtin(Attr::string(MESSAGE_KEY, message), true);
    }
}

impl Handler for TextHandler {
    fn enabled(&self, level: Level) -> bool {
        self.options.enabled(level)
    }

    fn handle(&self, record: Record) -> Result<(), Error> {
        let mut buf = self.options.pool.acquire();
        let mut state = State::new(&self.options, &mut buf);

        self.append_builtins(&mut state, &record);

        if !self.preformatted.is_empty() {
            state.buf.extend_from_slice(state.sep.as_bytes());
            state.buf.extend_from_slice(&self.preformatted);
            state.sep = " ";
        }

        if record.num_attrs() > 0 {
            state.prefix.push_str(&self.group_prefix);
            state.groups.extend_from_slice(&self.groups[..self.open_groups]);

            let pos = state.buf.len();
            for group in &self.groups[self.open_groups..] {
                state.open_group(group);
            }
            let mut empty = true;
            for attr in record.attrs() {
                if state.append_attr(attr.clone()) {
                    empty = false;
                }
            }
            if empty {
                state.buf.truncate(pos);
            }
        }

        state.buf.push(b'\n');
        self.append.append(buf.as_slice())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        let mut handler = self.clone();
        if attrs
            .iter()
            .all(|a| a.is_elided() || a.value().is_empty_group())
        {
            return Arc::new(handler);
        }

        let mut buf = self.preformatted.to_vec();
        let mut state = State::new(&self.options, &mut buf);
        if !state.buf.is_empty() {
            state.sep = " ";
        }
        state.prefix.push_str(&self.group_prefix);
        state.groups.extend_from_slice(&self.groups[..self.open_groups]);

        let pos = state.buf.len();
        for group in &self.groups[self.open_groups..] {
            state.open_group(group);
        }
        if state.append_attrs(&attrs) {
            handler.group_prefix = std::mem::take(&mut state.prefix);
            handler.open_groups = self.groups.len();
        } else {
            state.buf.truncate(pos);
        }

        handler.preformatted = Arc::from(buf);
        Arc::new(handler)
    }

    fn with_group(&self, name: Str) -> Arc<dyn Handler> {
        let mut handler = self.clone();
        if !name.is_empty() {
            handler.groups.push(name);
        }
        Arc::new(handler)
    }
}

/// The encoding state of one record or one `with_attrs` call.
struct State<'a> {
    options: &'a HandlerOptions,
    buf: &'a mut Vec<u8>,
    sep: &'static str,
    // `group.` for every open group
    prefix: String,
    // open groups, passed to the replace rule
    groups: Vec<Str>,
}

impl<'a> State<'a> {
    fn new(options: &'a HandlerOptions, buf: &'a mut Vec<u8>) -> Self {
        State {
            options,
            buf,
            sep: "",
            prefix: String::new(),
            groups: vec![],
        }
    }

    fn append_builtin(&mut self, attr: Attr, always_quote: bool) {
        if !self.options.omit_builtin_keys {
            self.append_attr(attr);
            return;
        }

        let attr = self.options.replace(&[], attr);
        if attr.is_elided() {
            return;
        }
        self.buf.extend_from_slice(self.sep.as_bytes());
        match attr.value() {
            Value::String(s) if always_quote => append_quoted(self.buf, s),
            value => self.append_value(value),
        }
        self.sep = " ";
    }

    fn append_attrs(&mut self, attrs: &[Attr]) -> bool {
        let mut appended = false;
        for attr in attrs {
            if self.append_attr(attr.clone()) {
                appended = true;
            }
        }
        appended
    }

    /// Append one attribute and report whether anything was written.
    fn append_attr(&mut self, attr: Attr) -> bool {
        let attr = self.options.replace(&self.groups, attr);
        if attr.is_elided() {
            return false;
        }

        let (key, value) = attr.into_parts();
        match value {
            Value::Group(attrs) => {
                let pos = self.buf.len();
                if !key.is_empty() {
                    self.open_group(&key);
                }
                let appended = self.append_attrs(&attrs);
                if !key.is_empty() {
                    self.close_group(&key);
                }
                if !appended {
                    self.buf.truncate(pos);
                }
                appended
            }
            value => {
                self.append_key(&key);
                self.append_value(&value);
                true
            }
        }
    }

    fn open_group(&mut self, name: &Str) {
        self.prefix.push_str(name);
        self.prefix.push('.');
        self.groups.push(name.clone());
    }

    fn close_group(&mut self, name: &Str) {
        let len = self.prefix.len() - name.len() - 1;
        self.prefix.truncate(len);
        self.groups.pop();
    }

    fn append_key(&mut self, key: &str) {
        self.buf.extend_from_slice(self.sep.as_bytes());
        if self.prefix.is_empty() {
            append_string(self.buf, key);
        } else {
            let mut qualified = String::with_capacity(self.prefix.len() + key.len());
            qualified.push_str(&self.prefix);
            qualified.push_str(key);
            append_string(self.buf, &qualified);
        }
        self.buf.push(b'=');
        self.sep = " ";
    }

    fn append_value(&mut self, value: &Value) {
        match value {
            Value::String(s) => append_string(self.buf, s),
            Value::Time(ts) => append_time(self.buf, *ts, self.options),
            value => {
                let pos = self.buf.len();
                value.append_to(self.buf);
                if std::str::from_utf8(&self.buf[pos..]).map_or(true, needs_quoting) {
                    let text = String::from_utf8_lossy(&self.buf[pos..]).into_owned();
                    self.buf.truncate(pos);
                    append_quoted(self.buf, &text);
                }
            }
        }
    }
}

fn append_time(buf: &mut Vec<u8>, ts: Timestamp, options: &HandlerOptions) {
    let offset = options.timezone.to_offset(ts);
    let _ = write!(buf, "{:.3}", ts.display_with_offset(offset));
}

fn append_string(buf: &mut Vec<u8>, s: &str) {
    if needs_quoting(s) {
        append_quoted(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Whether `s` must be quoted to stay a single token.
pub(crate) fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    s.chars().any(|c| match c {
        ' ' | '=' | '"' => true,
        c if c.is_ascii() => c.is_ascii_control(),
        c => c.is_whitespace() || c.is_control() || c == char::REPLACEMENT_CHARACTER,
    })
}

pub(crate) fn append_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for c in s.chars() {
        match c {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            c if c.is_control() => {
                let _ = write!(buf, "\\u{{{:x}}}", c as u32);
            }
            c => {
                let mut utf8 = [0; 4];
                buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    buf.push(b'"');
}
