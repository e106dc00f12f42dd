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

use serde_json::Map;
use serde_json::Number;

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

type Object = Map<String, serde_json::Value>;

/// A handler that writes records as single-line JSON objects.
///
/// Output format:
///
/// ```json
/// {"time":"2025-03-31T21:04:28.986032+08:00","level":"INFO","msg":"request served","req":{"method":"GET","status":200}}
/// ```
///
/// Groups become nested objects. Durations are written as integer nanoseconds and non-finite
/// floats as strings. When a key repeats within one object, the last value wins.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tlog::append::Testing;
/// use tlog::handler::HandlerOptions;
/// use tlog::handler::JsonHandler;
///
/// let handler = JsonHandler::new(Arc::new(Testing::default()), HandlerOptions::default());
/// ```
#[derive(Debug, Clone)]
pub struct JsonHandler {
    options: HandlerOptions,
    append: Arc<dyn Append>,
    segments: Vec<Segment>,
    groups: Vec<Str>,
}

// Attributes from one `with_attrs` call and the groups open at that time.
#[derive(Debug, Clone)]
struct Segment {
    depth: usize,
    attrs: Arc<[Attr]>,
}

impl JsonHandler {
    /// Create a JSON handler writing to `append`.
    pub fn new(append: Arc<dyn Append>, options: HandlerOptions) -> Self {
        JsonHandler {
            options,
            append,
            segments: vec![],
            groups: vec![],
        }
    }

    fn append_builtin(&self, object: &mut Object, attr: Attr) {
        self.append_attr(object, &mut vec![], attr);
    }

    fn append_attrs(&self, object: &mut Object, groups: &mut Vec<Str>, attrs: &[Attr]) {
        for attr in attrs {
            self.append_attr(object, groups, attr.clone());
        }
    }

    fn append_attr(&self, object: &mut Object, groups: &mut Vec<Str>, attr: Attr) {
        let attr = self.options.replace(groups, attr);
        if attr.is_elided() {
            return;
        }

        let (key, value) = attr.into_parts();
        match value {
            Value::Group(attrs) if key.is_empty() => self.append_attrs(object, groups, &attrs),
            Value::Group(attrs) => {
                groups.push(key.clone());
                let mut inner = Object::new();
                self.append_attrs(&mut inner, groups, &attrs);
                groups.pop();
                if !inner.is_empty() {
                    object.insert(key.into(), serde_json::Value::Object(inner));
                }
            }
            value => {
                object.insert(key.into(), self.to_json(&value));
            }
        }
    }

    /// Encode the attributes inside the first `depth` handler groups and merge them into `root`.
    fn merge_attrs(&self, root: &mut Object, depth: usize, attrs: &[Attr]) {
        let mut groups = self.groups[..depth].to_vec();
        let mut object = Object::new();
        self.append_attrs(&mut object, &mut groups, attrs);
        if object.is_empty() {
            return;
        }

        let mut target = root;
        for group in &self.groups[..depth] {
            let slot = target
                .entry(group.get())
                .or_insert(serde_json::Value::Null);
            if !slot.is_object() {
                *slot = serde_json::Value::Object(Object::new());
            }
            let serde_json::Value::Object(inner) = slot else {
                return;
            };
            target = inner;
        }
        target.extend(object);
    }

    fn to_json(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::String(s) => s.get().into(),
            Value::Int(n) => (*n).into(),
            Value::Uint(n) => (*n).into(),
            Value::Float(n) => match Number::from_f64(*n) {
                Some(n) => serde_json::Value::Number(n),
                None => Value::Float(*n).to_string().into(),
            },
            Value::Bool(b) => (*b).into(),
            Value::Duration(d) => u64::try_from(d.as_nanos()).unwrap_or(u64::MAX).into(),
            Value::Time(ts) => {
                let offset = self.options.timezone.to_offset(*ts);
                ts.display_with_offset(offset).to_string().into()
            }
            Value::Group(attrs) => {
                let mut object = Object::new();
                self.append_attrs(&mut object, &mut vec![], attrs);
                serde_json::Value::Object(object)
            }
            Value::Any(v) => v.to_string().into(),
        }
    }
}

impl Handler for JsonHandler {
    fn enabled(&self, level: Level) -> bool {
        self.options.enabled(level)
    }

    fn handle(&self, record: Record) -> Result<(), Error> {
        let mut root = Object::new();

        if let Some(time) = record.time() {
            self.append_builtin(&mut root, Attr::time(TIME_KEY, time));
        }
        self.append_builtin(&mut root, Attr::string(LEVEL_KEY, record.level().as_str()));
        if self.options.add_source {
            let source = match record.source() {
                Some(source) => Attr::group(
                    SOURCE_KEY,
                    [
                        Attr::string("file", Str::new_shared(source.file())),
                        Attr::uint("line", u64::from(source.line())),
                    ],
                ),
                None => Attr::group(SOURCE_KEY, [Attr::string("file", ""), Attr::uint("line", 0)]),
            };
            self.append_builtin(&mut root, source);
        }
        let message = Str::new_shared(record.message());
        self.append_builtin(&mut root, Attr::string(MESSAGE_KEY, message));

        for segment in &self.segments {
            self.merge_attrs(&mut root, segment.depth, &segment.attrs);
        }
        if record.num_attrs() > 0 {
            self.merge_attrs(&mut root, self.groups.len(), record.attrs());
        }

        let mut buf = self.options.pool.acquire();
        serde_json::to_writer(&mut *buf, &root)
            .map_err(|err| Error::new("failed to encode record").with_source(err))?;
        buf.push(b'\n');
        self.append.append(buf.as_slice())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        let mut handler = self.clone();
        if !attrs.is_empty() {
            handler.segments.push(Segment {
                depth: self.groups.len(),
                attrs: attrs.into(),
            });
        }
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

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use insta::assert_snapshot;
    use jiff::Timestamp;
    use jiff::tz::TimeZone;

    use super::*;
    use crate::append::Testing;
    use crate::record::Source;

    fn handler(testing: &Testing) -> JsonHandler {
        JsonHandler::new(
            Arc::new(testing.clone()),
            HandlerOptions::default().timezone(TimeZone::UTC),
        )
    }

    fn record(attrs: Vec<Attr>) -> Record {
        Record::builder()
            .time(None)
            .message("m")
            .attrs(attrs)
            .build()
    }

    #[test]
    fn test_builtins() {
        let testing = Testing::default();
        let handler = JsonHandler::new(
            Arc::new(testing.clone()),
            HandlerOptions::default()
                .add_source(true)
                .timezone(TimeZone::UTC),
        );
        let record = Record::builder()
            .time(Some(Timestamp::from_second(1_700_000_000).unwrap()))
            .level(Level::Error)
            .source(Some(Source::new("src/main.rs", 12)))
            .message("failed")
            .build();
        handler.handle(record).unwrap();

        assert_snapshot!(
            testing.contents().trim_end(),
            @r#"{"time":"2023-11-14T22:13:20+00:00","level":"ERROR","source":{"file":"src/main.rs","line":12},"msg":"failed"}"#
        );
    }

    #[test]
    fn test_values() {
        let testing = Testing::default();
        handler(&testing)
            .handle(record(vec![
                Attr::int("i", -1),
                Attr::float("f", 1.5),
                Attr::float("nan", f64::NAN),
                Attr::float("inf", f64::NEG_INFINITY),
                Attr::duration("d", Duration::from_millis(2)),
                Attr::bool("b", true),
                Attr::any("any", "x y"),
            ]))
            .unwrap();

        assert_snapshot!(
            testing.contents().trim_end(),
            @r#"{"level":"INFO","msg":"m","i":-1,"f":1.5,"nan":"NaN","inf":"-Inf","d":2000000,"b":true,"any":"x y"}"#
        );
    }

    #[test]
    fn test_groups() {
        let testing = Testing::default();
        let handler = handler(&testing)
            .with_attrs(vec![Attr::string("app", "tlog")])
            .with_group(Str::new("req"))
            .with_attrs(vec![Attr::int("id", 7)])
            .with_group(Str::new("resp"));

        handler
            .handle(record(vec![
                Attr::int("status", 200),
                Attr::group("empty", Vec::<Attr>::new()),
                Attr::group("", [Attr::bool("inlined", true)]),
            ]))
            .unwrap();
        handler.handle(record(vec![])).unwrap();

        let lines = testing.lines();
        assert_eq!(
            lines[0],
            r#"{"level":"INFO","msg":"m","app":"tlog","req":{"id":7,"resp":{"status":200,"inlined":true}}}"#
        );
        assert_eq!(
            lines[1],
            r#"{"level":"INFO","msg":"m","app":"tlog","req":{"id":7}}"#
        );
    }

    #[test]
    fn test_duplicate_keys_keep_last() {
        let testing = Testing::default();
        handler(&testing)
            .handle(record(vec![Attr::int("a", 1), Attr::int("a", 2)]))
            .unwrap();
        assert_eq!(testing.contents(), "{\"level\":\"INFO\",\"msg\":\"m\",\"a\":2}\n");
    }
}
