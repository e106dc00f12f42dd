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

//! Reusable byte buffers for encoding records.

use std::fmt;
use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;
use std::sync::LazyLock;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

const DEFAULT_INITIAL_CAPACITY: usize = 1024;
const DEFAULT_MAX_CAPACITY: usize = 16 << 10;
const DEFAULT_RETAINED_BUFFERS: usize = 256;

static GLOBAL: LazyLock<Arc<BufferPool>> = LazyLock::new(|| Arc::new(BufferPool::new()));

/// A pool of reusable byte buffers.
///
/// Buffers are handed out empty with a pre-sized capacity, and returned to the pool when the
/// [`Buffer`] guard drops. A buffer that grew beyond the pool's maximum capacity is dropped
/// instead of retained, so one oversized record does not inflate the steady-state memory.
///
/// Acquire and release never block: the retained buffers live in a bounded lock-free queue.
///
/// # Examples
///
/// ```
/// use tlog::buffer::BufferPool;
///
/// let pool = BufferPool::new();
/// let mut buf = pool.acquire();
/// buf.extend_from_slice(b"hello");
/// assert_eq!(buf.as_slice(), b"hello");
/// ```
pub struct BufferPool {
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
    initial_capacity: usize,
    max_capacity: usize,
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("retained", &self.receiver.len())
            .field("initial_capacity", &self.initial_capacity)
            .field("max_capacity", &self.max_capacity)
            .finish()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    /// Create a pool with 1 KiB initial and 16 KiB maximum buffer capacity.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY)
    }

    /// Create a pool with the given initial and maximum buffer capacity.
    pub fn with_limits(initial_capacity: usize, max_capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(DEFAULT_RETAINED_BUFFERS);
        Self {
            sender,
            receiver,
            initial_capacity,
            max_capacity,
        }
    }

    /// The process-wide pool.
    pub fn global() -> Arc<BufferPool> {
        GLOBAL.clone()
    }

    /// Borrow an empty buffer from the pool.
    pub fn acquire(&self) -> Buffer<'_> {
        let bytes = self
            .receiver
            .try_recv()
            .unwrap_or_else(|_| Vec::with_capacity(self.initial_capacity));
        Buffer { bytes, pool: self }
    }

    /// The number of buffers currently retained.
    pub fn retained(&self) -> usize {
        self.receiver.len()
    }

    fn release(&self, mut bytes: Vec<u8>) {
        // To reduce peak allocation, return only smaller buffers to the pool.
        if bytes.capacity() > self.max_capacity {
            return;
        }
        bytes.clear();
        // a full pool drops the buffer
        let _ = self.sender.try_send(bytes);
    }
}

/// A byte buffer borrowed from a [`BufferPool`].
///
/// The buffer returns to its pool when dropped, including on early returns and unwinding.
pub struct Buffer<'a> {
    bytes: Vec<u8>,
    pool: &'a BufferPool,
}

impl Buffer<'_> {
    /// The buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Reslice the buffer to the given length. Has no effect if `len` is greater than the
    /// current length.
    pub fn set_len(&mut self, len: usize) {
        self.bytes.truncate(len);
    }
}

impl fmt::Debug for Buffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("bytes", &String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}

impl Deref for Buffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.bytes
    }
}

impl DerefMut for Buffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }
}

impl Drop for Buffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.bytes));
    }
}
