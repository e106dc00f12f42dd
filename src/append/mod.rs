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

//! Destinations for encoded log records.

use std::fmt;

use crate::Error;

mod outputs;
mod testing;

pub use self::outputs::Outputs;
pub use self::testing::Testing;

/// A sink that receives the encoded bytes of log records.
///
/// Each call carries exactly one complete record, trailing newline included.
pub trait Append: fmt::Debug + Send + Sync + 'static {
    /// Write one encoded record to the target.
    fn append(&self, bytes: &[u8]) -> Result<(), Error>;

    /// Flush any buffered records.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
