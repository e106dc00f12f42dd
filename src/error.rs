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
use std::io;

/// An error raised while opening, writing or closing log destinations.
///
/// An error carries a message, a list of context pairs and any number of sources. Opening
/// destinations attaches the offending path as context; closing destinations attaches one source
/// per failed close so that no failure is swallowed.
///
/// `Display` renders everything on one line, `message, context: { k: v }, sources: [..]`, which
/// is what a [`Trap`](crate::Trap) writes. `{:?}` spreads the same parts over several lines and
/// `{:#?}` prints the struct.
pub struct Error {
    message: String,
    context: Vec<(&'static str, String)>,
    sources: Vec<anyhow::Error>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;

        for (i, (key, value)) in self.context.iter().enumerate() {
            let open = if i == 0 { ", context: { " } else { ", " };
            write!(f, "{open}{key}: {value}")?;
        }
        if !self.context.is_empty() {
            f.write_str(" }")?;
        }

        for (i, source) in self.sources.iter().enumerate() {
            let open = if i == 0 { ", sources: [" } else { ", " };
            write!(f, "{open}{source:#}")?;
        }
        if !self.sources.is_empty() {
            f.write_str("]")?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("Error")
                .field("message", &self.message)
                .field("context", &self.context)
                .field("sources", &self.sources)
                .finish();
        }

        writeln!(f, "{}", self.message)?;
        if !self.context.is_empty() {
            writeln!(f, "\nContext:")?;
            for (key, value) in &self.context {
                writeln!(f, "   {key}: {value}")?;
            }
        }
        if !self.sources.is_empty() {
            writeln!(f, "\nSources:")?;
            for source in &self.sources {
                writeln!(f, "   {source:#}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.sources.first().map(|v| v.as_ref())
    }
}

impl Error {
    /// An error with `message` and no context or sources.
    pub fn new(message: impl Into<String>) -> Self {
        Error {
            message: message.into(),
            context: vec![],
            sources: vec![],
        }
    }

    /// Attach a `key: value` pair, such as the destination path that failed.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Attach an underlying cause. Sources are kept in the order they were added.
    pub fn with_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        self.sources.push(src.into());
        self
    }

    /// The error message, without context or sources.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Every attached cause, in order.
    pub fn sources(&self) -> impl ExactSizeIterator<Item = &(dyn std::error::Error + 'static)> {
        self.sources.iter().map(|v| v.as_ref())
    }

    /// Look up a context value by key.
    pub fn context(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Wrap a failed file or stream operation.
    pub fn from_io_error(err: io::Error) -> Error {
        Error::new("failed to perform io").with_source(err)
    }
}
