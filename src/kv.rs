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

//! Key-value attributes attached to log records.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::str::Str;

/// A key-value pair attached to a record, a handler or a group.
///
/// An empty key on a group value inlines the group's members into the enclosing level. An empty
/// key on any other value elides the attribute.
#[derive(Clone, Debug)]
pub struct Attr {
    key: Str,
    value: Value,
}

impl Attr {
    /// Create an attribute from a key and anything convertible into a [`Value`].
    pub fn new(key: impl Into<Str>, value: impl Into<Value>) -> Self {
        Attr {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A string attribute.
    pub fn string(key: impl Into<Str>, value: impl Into<Str>) -> Self {
        Attr::new(key, Value::String(value.into()))
    }

    /// A signed integer attribute.
    pub fn int(key: impl Into<Str>, value: i64) -> Self {
        Attr::new(key, Value::Int(value))
    }

    /// An unsigned integer attribute.
    pub fn uint(key: impl Into<Str>, value: u64) -> Self {
        Attr::new(key, Value::Uint(value))
    }

    /// A floating point attribute.
    pub fn float(key: impl Into<Str>, value: f64) -> Self {
        Attr::new(key, Value::Float(value))
    }

    /// A boolean attribute.
    pub fn bool(key: impl Into<Str>, value: bool) -> Self {
        Attr::new(key, Value::Bool(value))
    }

    /// A duration attribute.
    pub fn duration(key: impl Into<Str>, value: Duration) -> Self {
        Attr::new(key, Value::Duration(value))
    }

    /// A timestamp attribute.
    pub fn time(key: impl Into<Str>, value: Timestamp) -> Self {
        Attr::new(key, Value::Time(value))
    }

    /// A group attribute. Use an empty key to inline the members into the enclosing level.
    pub fn group(key: impl Into<Str>, attrs: impl IntoIterator<Item = Attr>) -> Self {
        Attr::new(key, Value::group(attrs))
    }

    /// An attribute rendered through the value's [`fmt::Display`] implementation.
    pub fn any<T>(key: impl Into<Str>, value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Attr::new(key, Value::from_display(value))
    }

    /// The attribute key.
    pub fn key(&self) -> &Str {
        &self.key
    }

    /// The attribute value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Split the attribute into its key and value.
    pub fn into_parts(self) -> (Str, Value) {
        (self.key, self.value)
    }

    /// Replace the value, keeping the key.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Whether the attribute produces no output: an empty key on a non-group value.
    pub(crate) fn is_elided(&self) -> bool {
        self.key.is_empty() && !matches!(self.value, Value::Group(_))
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// The value of an [`Attr`].
///
/// The set of kinds is closed, so every consumer can dispatch on it exhaustively.
#[derive(Clone)]
pub enum Value {
    /// A string.
    String(Str),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    Uint(u64),
    /// A floating point number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// A duration.
    Duration(Duration),
    /// A point in time.
    Time(Timestamp),
    /// An ordered, immutable group of attributes.
    Group(Arc<[Attr]>),
    /// An opaque value rendered through [`fmt::Display`].
    Any(Arc<dyn fmt::Display + Send + Sync>),
}

impl Value {
    /// Create a group value.
    pub fn group(attrs: impl IntoIterator<Item = Attr>) -> Self {
        Value::Group(attrs.into_iter().collect())
    }

    /// Create an opaque value from a [`fmt::Display`] implementation.
    pub fn from_display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Value::Any(Arc::new(value))
    }

    /// Create an opaque value from a [`fmt::Debug`] implementation.
    pub fn from_debug<T>(value: T) -> Self
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        Value::Any(Arc::new(DebugAsDisplay(value)))
    }

    /// The name of the value kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Int(_) => "Int",
            Value::Uint(_) => "Uint",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Bool",
            Value::Duration(_) => "Duration",
            Value::Time(_) => "Time",
            Value::Group(_) => "Group",
            Value::Any(_) => "Any",
        }
    }

    /// The group members, if this is a group.
    pub fn as_group(&self) -> Option<&[Attr]> {
        match self {
            Value::Group(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// The string, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.get()),
            _ => None,
        }
    }

    /// Whether this is a group that renders nothing.
    ///
    /// A group is empty if it has no members, or if every member is elided or is itself an empty
    /// group.
    pub fn is_empty_group(&self) -> bool {
        match self {
            Value::Group(attrs) => attrs
                .iter()
                .all(|a| a.is_elided() || a.value.is_empty_group()),
            _ => false,
        }
    }

    /// Append the textual form of this value to `dst`.
    ///
    /// Strings are appended verbatim. Quoting is the encoder's concern.
    pub fn append_to(&self, dst: &mut Vec<u8>) {
        match self {
            Value::String(s) => dst.extend_from_slice(s.as_bytes()),
            Value::Int(n) => {
                let _ = write!(dst, "{n}");
            }
            Value::Uint(n) => {
                let _ = write!(dst, "{n}");
            }
            Value::Float(n) => append_float(dst, *n),
            Value::Bool(b) => dst.extend_from_slice(if *b { b"true" } else { b"false" }),
            Value::Duration(d) => append_duration(dst, *d),
            Value::Time(ts) => {
                let _ = write!(dst, "{}", ts.to_zoned(TimeZone::UTC));
            }
            Value::Group(attrs) => {
                let _ = write!(dst, "{}", GroupDisplay(attrs));
            }
            Value::Any(v) => {
                let _ = write!(dst, "{v}");
            }
        }
    }
}

// Decimal exponents outside `MIN_PLAIN_EXP..MAX_PLAIN_EXP` switch a float to exponent form.
const MIN_PLAIN_EXP: i32 = -4;
const MAX_PLAIN_EXP: i32 = 6;

/// Shortest round-tripping digits: `0.0001`, `123456`, `1.234567e+06`, `1e-05`, `+Inf`.
fn append_float(dst: &mut Vec<u8>, n: f64) {
    if n.is_nan() {
        dst.extend_from_slice(b"NaN");
        return;
    }
    if n.is_infinite() {
        dst.extend_from_slice(if n > 0.0 { b"+Inf" } else { b"-Inf" });
        return;
    }

    let sci = format!("{n:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or_default();
    if (MIN_PLAIN_EXP..MAX_PLAIN_EXP).contains(&exp) {
        let _ = write!(dst, "{n}");
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        let _ = write!(dst, "{mantissa}e{sign}{:02}", exp.unsigned_abs());
    }
}

/// Unit-suffixed durations: `250ms`, `1.3s`, `1m30.5s`, `1h30m0s`.
fn append_duration(dst: &mut Vec<u8>, d: Duration) {
    if d.is_zero() {
        dst.extend_from_slice(b"0s");
        return;
    }
    let secs = d.as_secs();
    if secs < 60 {
        let _ = write!(dst, "{d:?}");
        return;
    }

    let (hours, minutes, secs) = (secs / 3600, secs / 60 % 60, secs % 60);
    if hours > 0 {
        let _ = write!(dst, "{hours}h");
    }
    let _ = write!(dst, "{minutes}m{secs}");
    let nanos = d.subsec_nanos();
    if nanos > 0 {
        let frac = format!("{nanos:09}");
        let _ = write!(dst, ".{}", frac.trim_end_matches('0'));
    }
    dst.push(b's');
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.append_to(&mut buf);
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Group(attrs) => f.debug_tuple("Group").field(attrs).finish(),
            other => write!(f, "{}({other})", other.kind()),
        }
    }
}

struct GroupDisplay<'a>(&'a [Attr]);

impl fmt::Display for GroupDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, attr) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{attr}")?;
        }
        f.write_str("]")
    }
}

struct DebugAsDisplay<T>(T);

impl<T: fmt::Debug> fmt::Display for DebugAsDisplay<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl From<Str> for Value {
    fn from(value: Str) -> Self {
        Value::String(value)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::String(Str::new(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Str::new_shared(value))
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty, $($source:ty),*) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(value as $target)
                }
            }
        )*
    };
}

impl_from_int!(Int, i64, i8, i16, i32, i64, isize);
impl_from_int!(Uint, u64, u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Value::Duration(value)
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::Time(value)
    }
}

impl From<Vec<Attr>> for Value {
    fn from(value: Vec<Attr>) -> Self {
        Value::Group(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: impl Into<Value>) -> String {
        let mut buf = b"prefix:".to_vec();
        value.into().append_to(&mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_render_appends() {
        assert_eq!(render("a b"), "prefix:a b");
        assert_eq!(render(-42i64), "prefix:-42");
        assert_eq!(render(42u64), "prefix:42");
        assert_eq!(render(1.5f64), "prefix:1.5");
        assert_eq!(render(0.1f64 + 0.2f64), "prefix:0.30000000000000004");
        assert_eq!(render(true), "prefix:true");
        assert_eq!(render(Duration::from_millis(1300)), "prefix:1.3s");
        assert_eq!(render(Duration::from_micros(1500)), "prefix:1.5ms");
    }

    #[test]
    fn test_render_float() {
        assert_eq!(render(0.0f64), "prefix:0");
        assert_eq!(render(0.0001f64), "prefix:0.0001");
        assert_eq!(render(0.00001f64), "prefix:1e-05");
        assert_eq!(render(-2.5e-7f64), "prefix:-2.5e-07");
        assert_eq!(render(123456f64), "prefix:123456");
        assert_eq!(render(1234567f64), "prefix:1.234567e+06");
        assert_eq!(render(1e21f64), "prefix:1e+21");
        assert_eq!(render(1e300f64), "prefix:1e+300");
        assert_eq!(render(f64::NAN), "prefix:NaN");
        assert_eq!(render(f64::INFINITY), "prefix:+Inf");
        assert_eq!(render(f64::NEG_INFINITY), "prefix:-Inf");
    }

    #[test]
    fn test_render_duration() {
        assert_eq!(render(Duration::ZERO), "prefix:0s");
        assert_eq!(render(Duration::from_nanos(100)), "prefix:100ns");
        assert_eq!(render(Duration::from_secs(59)), "prefix:59s");
        assert_eq!(render(Duration::from_millis(90_500)), "prefix:1m30.5s");
        assert_eq!(render(Duration::from_secs(5400)), "prefix:1h30m0s");
        assert_eq!(render(Duration::new(3600, 1)), "prefix:1h0m0.000000001s");
    }

    #[test]
    fn test_render_time() {
        let ts = Timestamp::from_second(1_700_000_000).unwrap();
        assert_eq!(render(ts), "prefix:2023-11-14T22:13:20+00:00[UTC]");
    }

    #[test]
    fn test_render_group_fallback() {
        let group = Value::group([Attr::int("a", 1), Attr::string("b", "x")]);
        assert_eq!(render(group), "prefix:[a=1 b=x]");
    }

    #[test]
    fn test_render_any() {
        #[derive(Debug)]
        struct Point {
            x: i32,
        }

        assert_eq!(render(Value::from_debug(Point { x: 3 })), "prefix:Point { x: 3 }");
        assert_eq!(render(Value::from_display(7u8)), "prefix:7");
    }

    #[test]
    fn test_empty_group() {
        assert!(Value::group(Vec::<Attr>::new()).is_empty_group());
        assert!(Value::group([Attr::group("g", Vec::new())]).is_empty_group());
        assert!(Value::group([Attr::string("", "elided")]).is_empty_group());
        assert!(!Value::group([Attr::int("a", 1)]).is_empty_group());
        assert!(!Value::Int(0).is_empty_group());
    }
}
