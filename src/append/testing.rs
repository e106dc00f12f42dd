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
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::Error;
use crate::append::Append;

/// An appender that keeps every record in memory, so that tests can inspect what was logged.
///
/// Clones share the same storage.
///
/// # Examples
///
/// ```
/// use tlog::append::Append;
/// use tlog::append::Testing;
///
/// let testing = Testing::default();
/// testing.append(b"hello\n").unwrap();
/// assert_eq!(testing.contents(), "hello\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Testing {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl Testing {
    /// Everything appended so far, as text.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Everything appended so far, one entry per line.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Discard everything appended so far.
    pub fn clear(&self) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Append for Testing {
    fn append(&self, bytes: &[u8]) -> Result<(), Error> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        Ok(())
    }
}
