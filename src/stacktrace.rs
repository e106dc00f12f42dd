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

//! Call stack capture.
//!
//! [`capture`] walks the active call stack and resolves every frame into a function name, file
//! and line. Inlined calls resolve to one [`Frame`] each, innermost first. [`get`] renders the
//! frames as text:
//!
//! ```text
//! my_crate::handler::serve
//! 	src/handler.rs:42
//! my_crate::main
//! 	src/main.rs:7
//! ```

use std::fmt;
use std::fmt::Write;

const DEFAULT_PROGRAM_COUNTERS: usize = 64;
const PCS_EXTEND_FACTOR: usize = 2;

// Frames of `get` itself, on top of the frames `capture` strips.
const GET_NESTING_LEVEL: usize = 1;

/// One resolved stack frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    function: String,
    file: String,
    line: u32,
}

impl Frame {
    /// The demangled function name, without the symbol hash. Empty if unknown.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// The source file. Empty if unknown.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The line number. Zero if unknown.
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\t{}:{}", self.function, self.file, self.line)
    }
}

/// Capture the call stack of the caller.
///
/// With `skip == 0` the first frame is the function that called `capture`. Each increment of
/// `skip` drops one more caller frame. Frames belonging to the capture mechanism are never
/// returned.
///
/// Callers that tail-call `capture` or one of their callers do not appear in the stack, so a
/// `skip` count only holds for frames that cannot be optimized away.
#[inline(never)]
pub fn capture(skip: usize) -> Vec<Frame> {
    let entry = capture as fn(usize) -> Vec<Frame> as usize;
    let frames = capture_below(entry, is_capture_frame).unwrap_or_default();
    frames.into_iter().skip(skip).collect()
}

/// Capture the frames below the innermost call of the function starting at address `entry`.
///
/// The first frame is the caller of that function. `is_entry` recognizes the function by its
/// demangled name when the unwinder cannot report function start addresses. Returns `None` if
/// the function is not on the stack.
#[inline(never)]
pub(crate) fn capture_below(entry: usize, is_entry: fn(&str) -> bool) -> Option<Vec<Frame>> {
    let mut raw = Vec::with_capacity(DEFAULT_PROGRAM_COUNTERS);
    let mut start = None;
    backtrace::trace(|frame| {
        if raw.len() == raw.capacity() {
            raw.reserve(raw.len() * (PCS_EXTEND_FACTOR - 1));
        }
        raw.push(frame.clone());
        if start.is_none() && frame.symbol_address() as usize == entry {
            start = Some(raw.len());
        }
        true
    });

    if let Some(start) = start {
        return Some(resolve(&raw[start..]));
    }
    let frames = resolve(&raw);
    let start = frames.iter().position(|f| is_entry(&f.function))? + 1;
    Some(frames[start..].to_vec())
}

/// Render frames as `function\n\tfile:line` entries separated by `\n`.
pub fn render(frames: &[Frame]) -> String {
    let mut text = String::new();
    for (i, frame) in frames.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        // SAFETY: write to a string always succeeds
        write!(&mut text, "{frame}").unwrap();
    }
    text
}

/// Capture and render the call stack of the caller, skipping `skip` caller frames.
///
/// With `skip == 0` the first frame is the function that called `get`.
#[inline(never)]
pub fn get(skip: usize) -> String {
    render(&capture(skip + GET_NESTING_LEVEL))
}

fn resolve(raw: &[backtrace::Frame]) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(raw.len());
    for frame in raw {
        let mut resolved = false;
        backtrace::resolve_frame(frame, |symbol| {
            resolved = true;
            frames.push(Frame {
                function: symbol
                    .name()
                    .map(|name| format!("{name:#}"))
                    .unwrap_or_default(),
                file: symbol
                    .filename()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default(),
                line: symbol.lineno().unwrap_or_default(),
            });
        });
        if !resolved {
            frames.push(Frame::default());
        }
    }
    frames
}

fn is_capture_frame(function: &str) -> bool {
    function.ends_with("stacktrace::capture")
}

#[cfg(test)]
mod tests {
    use std::hint::black_box;

    use super::*;

    #[inline(never)]
    fn nested() -> String {
        // skip `nested`, keep `wrapper`
        black_box(get(1))
    }

    #[inline(never)]
    fn wrapper() -> String {
        black_box(nested())
    }

    #[inline(never)]
    fn direct() -> Vec<Frame> {
        black_box(capture(0))
    }

    #[inline(never)]
    fn outer() -> Option<Vec<Frame>> {
        black_box(inner())
    }

    #[inline(never)]
    fn inner() -> Option<Vec<Frame>> {
        let entry = outer as fn() -> Option<Vec<Frame>> as usize;
        black_box(capture_below(entry, |f| f.ends_with("tests::outer")))
    }

    #[test]
    fn test_capture_starts_at_caller() {
        let frames = direct();
        assert!(frames[0].function().ends_with("direct"), "{frames:?}");
        assert!(frames[0].file().ends_with("stacktrace.rs"), "{frames:?}");
        assert!(frames[0].line() > 0);
        assert!(frames.iter().all(|f| !f.function().starts_with("backtrace::")));
        assert!(frames.iter().all(|f| !is_capture_frame(f.function())));
    }

    #[test]
    fn test_get_skips_frames() {
        let stack = wrapper();
        let first = stack.lines().next().unwrap();

        assert!(first.ends_with("tests::wrapper"), "{stack}");
        assert!(!stack.contains("tests::nested"), "{stack}");
        assert!(!stack.contains("stacktrace::get"), "{stack}");
        assert!(stack.contains("test_get_skips_frames"), "{stack}");
    }

    #[test]
    fn test_capture_below_entry() {
        let frames = outer().unwrap();
        assert!(frames[0].function().contains("test_capture_below_entry"), "{frames:?}");
        assert!(frames.iter().all(|f| !f.function().ends_with("tests::inner")));

        let entry = outer as fn() -> Option<Vec<Frame>> as usize;
        assert!(capture_below(entry, |f| f.ends_with("tests::outer")).is_none());
    }

    #[test]
    fn test_render_format() {
        let frames = vec![
            Frame {
                function: "a::f".to_string(),
                file: "src/a.rs".to_string(),
                line: 3,
            },
            Frame {
                function: "a::main".to_string(),
                file: "src/main.rs".to_string(),
                line: 10,
            },
        ];
        assert_eq!(render(&frames), "a::f\n\tsrc/a.rs:3\na::main\n\tsrc/main.rs:10");
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_capture_from_threads() {
        let handles: Vec<_> = (0..4).map(|_| std::thread::spawn(direct)).collect();
        for handle in handles {
            let frames = handle.join().unwrap();
            assert!(frames[0].function().ends_with("direct"));
        }
    }
}
