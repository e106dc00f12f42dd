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

//! The [`Str`] type.
//!
//! Attribute keys, group names and messages are usually `'static` literals, but child loggers
//! clone them into every handler they derive. A [`Str`] holds either a `'static` string or a
//! shared `Arc<str>`, so cloning never copies the underlying bytes.

use std::borrow::Borrow;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash;
use std::ops::Deref;
use std::sync::Arc;

/// A string value that is cheap to clone.
#[derive(Clone)]
pub enum Str {
    /// A `'static` string.
    Static(&'static str),
    /// A reference-counted string.
    Shared(Arc<str>),
}

impl Str {
    /// Create a new string from a value borrowed for `'static`.
    pub const fn new(s: &'static str) -> Self {
        Str::Static(s)
    }

    /// Create a string from a shared value.
    pub fn new_shared(s: impl Into<Arc<str>>) -> Self {
        Str::Shared(s.into())
    }

    /// Get a reference to the underlying value.
    pub fn get(&self) -> &str {
        match self {
            Str::Static(s) => s,
            Str::Shared(s) => s,
        }
    }

    /// Try to get a reference to the underlying static value.
    pub const fn get_static(&self) -> Option<&'static str> {
        match self {
            Str::Static(s) => Some(*s),
            Str::Shared(_) => None,
        }
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }
}

impl Default for Str {
    fn default() -> Self {
        Str::Static("")
    }
}

impl Deref for Str {
    type Target = str;

    fn deref(&self) -> &str {
        self.get()
    }
}

impl fmt::Debug for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.get(), f)
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.get(), f)
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl Eq for Str {}

impl PartialEq<str> for Str {
    fn eq(&self, other: &str) -> bool {
        self.get() == other
    }
}

impl PartialEq<&str> for Str {
    fn eq(&self, other: &&str) -> bool {
        self.get() == *other
    }
}

impl PartialOrd for Str {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Str {
    fn cmp(&self, other: &Self) -> Ordering {
        self.get().cmp(other.get())
    }
}

impl hash::Hash for Str {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.get().hash(state)
    }
}

impl Borrow<str> for Str {
    fn borrow(&self) -> &str {
        self.get()
    }
}

impl AsRef<str> for Str {
    fn as_ref(&self) -> &str {
        self.get()
    }
}

impl From<&'static str> for Str {
    fn from(value: &'static str) -> Self {
        Str::new(value)
    }
}

impl From<String> for Str {
    fn from(value: String) -> Self {
        Str::new_shared(value)
    }
}

impl From<Arc<str>> for Str {
    fn from(value: Arc<str>) -> Self {
        Str::Shared(value)
    }
}

impl From<Cow<'static, str>> for Str {
    fn from(value: Cow<'static, str>) -> Self {
        match value {
            Cow::Borrowed(s) => Str::new(s),
            Cow::Owned(s) => Str::new_shared(s),
        }
    }
}

impl From<Str> for String {
    fn from(value: Str) -> String {
        value.get().to_owned()
    }
}
