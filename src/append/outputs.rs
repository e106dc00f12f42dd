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

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::Error;
use crate::append::Append;

const STDOUT: &str = "stdout";
const STDERR: &str = "stderr";

#[cfg(unix)]
const DEFAULT_FILE_MODE: u32 = 0o666;

/// A writer that fans every write out to several destinations.
///
/// Destinations are named by a comma-separated list: `stdout`, `stderr` or a file path. Files are
/// opened for appending and created if absent. The standard streams are never closed.
///
/// # Examples
///
/// ```
/// use tlog::append::Outputs;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("app.log");
/// let outputs = Outputs::open(&format!("stderr, {}", path.display())).unwrap();
///
/// outputs.write(b"hello\n").unwrap();
/// outputs.close().unwrap();
///
/// assert_eq!(std::fs::read_to_string(path).unwrap(), "hello\n");
/// ```
#[derive(Debug)]
pub struct Outputs {
    destinations: Mutex<Vec<Destination>>,
}

#[derive(Debug)]
enum Destination {
    Stdout,
    Stderr,
    File { path: String, file: Option<File> },
}

impl Destination {
    fn open(path: &str) -> Result<Destination, Error> {
        match path {
            STDOUT => Ok(Destination::Stdout),
            STDERR => Ok(Destination::Stderr),
            "" => Err(Error::new("empty path")),
            path => {
                let mut options = OpenOptions::new();
                options.write(true).append(true).create(true);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt;
                    options.mode(DEFAULT_FILE_MODE);
                }
                let file = options.open(path).map_err(Error::from_io_error)?;
                Ok(Destination::File {
                    path: path.to_string(),
                    file: Some(file),
                })
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            Destination::Stdout => STDOUT,
            Destination::Stderr => STDERR,
            Destination::File { path, .. } => path,
        }
    }

    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Destination::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(bytes)?;
                stdout.flush()
            }
            Destination::Stderr => io::stderr().lock().write_all(bytes),
            Destination::File { file: Some(file), .. } => {
                let mut file = file;
                file.write_all(bytes)
            }
            Destination::File { file: None, .. } => {
                Err(io::Error::other("file already closed"))
            }
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self {
            Destination::Stdout | Destination::Stderr => Ok(()),
            Destination::File { file, .. } => match file.take() {
                Some(file) => close_file(file),
                None => Ok(()),
            },
        }
    }
}

impl Outputs {
    /// Open every destination named in the comma-separated `paths`.
    ///
    /// Each element is trimmed of surrounding whitespace. Opening is all-or-nothing: if any
    /// destination fails to open, every file opened so far is closed and the error names the
    /// offending path.
    ///
    /// # Errors
    ///
    /// Returns an error if `paths` is empty, if an element is empty, or if a file cannot be opened.
    pub fn open(paths: &str) -> Result<Outputs, Error> {
        if paths.is_empty() {
            return Err(Error::new("empty paths"));
        }

        let mut destinations = Vec::new();
        for path in paths.split(',').map(str::trim) {
            match Destination::open(path) {
                Ok(destination) => destinations.push(destination),
                Err(err) => {
                    let _ = close_all(&mut destinations);
                    return Err(Error::new("failed to open path")
                        .with_context("path", format!("{path:?}"))
                        .with_source(err));
                }
            }
        }

        Ok(Outputs {
            destinations: Mutex::new(destinations),
        })
    }

    /// The names of the destinations, in the order they were given.
    pub fn paths(&self) -> Vec<String> {
        self.destinations()
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    /// Write `bytes` to every destination, in order.
    ///
    /// All destinations are written under one lock, so the bytes of concurrent calls never
    /// interleave. The first failing destination aborts the call; destinations before it have
    /// already received the bytes and those after it are not attempted.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first destination that failed.
    pub fn write(&self, bytes: &[u8]) -> Result<usize, Error> {
        let destinations = self.destinations();
        for destination in destinations.iter() {
            destination.write_all(bytes).map_err(|err| {
                Error::new("failed to write to path")
                    .with_context("path", destination.name())
                    .with_source(err)
            })?;
        }
        Ok(bytes.len())
    }

    /// Close every file destination. The standard streams stay open.
    ///
    /// Every file is attempted even if an earlier one fails. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns one error carrying every close failure as a source.
    pub fn close(&self) -> Result<(), Error> {
        close_all(&mut self.destinations())
    }

    fn destinations(&self) -> MutexGuard<'_, Vec<Destination>> {
        self.destinations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Append for Outputs {
    fn append(&self, bytes: &[u8]) -> Result<(), Error> {
        self.write(bytes).map(|_| ())
    }

    fn flush(&self) -> Result<(), Error> {
        let destinations = self.destinations();
        for destination in destinations.iter() {
            if let Destination::Stdout = destination {
                io::stdout().flush().map_err(Error::from_io_error)?;
            }
        }
        Ok(())
    }
}

impl Write for &Outputs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Outputs::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Append::flush(*self).map_err(io::Error::other)
    }
}

fn close_all(destinations: &mut [Destination]) -> Result<(), Error> {
    let mut errors = vec![];
    for destination in destinations.iter_mut() {
        if let Err(err) = destination.close() {
            errors.push((destination.name().to_string(), err));
        }
    }

    if errors.is_empty() {
        return Ok(());
    }

    let mut error = Error::new("failed to close outputs");
    for (path, err) in errors {
        error = error.with_source(Error::from_io_error(err).with_context("path", path));
    }
    Err(error)
}

#[cfg(unix)]
fn close_file(file: File) -> io::Result<()> {
    use std::os::fd::IntoRawFd;

    let fd = file.into_raw_fd();
    // SAFETY: `into_raw_fd` released ownership of `fd`, so it is closed exactly once here.
    if unsafe { libc::close(fd) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn close_file(file: File) -> io::Result<()> {
    drop(file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;

    fn generate_random_string() -> String {
        let mut rng = rand::rng();
        let len = rng.random_range(50..=100);
        std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(len)
            .collect()
    }

    #[test]
    fn test_empty_paths() {
        let err = Outputs::open("").unwrap_err();
        assert_eq!(err.to_string(), "empty paths");
    }

    #[test]
    fn test_empty_element() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.log");
        let err = Outputs::open(&format!("{},", file.display())).unwrap_err();
        assert!(err.to_string().contains("empty path"), "{err}");
        assert_eq!(err.context("path"), Some("\"\""));
    }

    #[test]
    fn test_bad_path() {
        let err = Outputs::open("/not/exist/a.log").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/not/exist/a.log"), "{message}");
        assert!(message.contains("No such file or directory"), "{message}");
    }

    #[test]
    fn test_trimmed_elements() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        let outputs = Outputs::open(&format!(" {} ,\tstderr ,{}", a.display(), b.display()))
            .unwrap();

        assert_eq!(
            outputs.paths(),
            [
                a.display().to_string(),
                STDERR.to_string(),
                b.display().to_string()
            ]
        );
    }

    #[test]
    fn test_write_fans_out() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        let outputs = Outputs::open(&format!("{},{}", a.display(), b.display())).unwrap();

        let payload = generate_random_string();
        assert_eq!(outputs.write(payload.as_bytes()).unwrap(), payload.len());
        outputs.close().unwrap();

        assert_eq!(fs::read_to_string(&a).unwrap(), payload);
        assert_eq!(fs::read_to_string(&b).unwrap(), payload);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        fs::write(&a, "first\n").unwrap();

        let outputs = Outputs::open(&a.display().to_string()).unwrap();
        outputs.write(b"second\n").unwrap();
        outputs.close().unwrap();

        assert_eq!(fs::read_to_string(&a).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_close_twice_and_write_after_close() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let outputs = Outputs::open(&a.display().to_string()).unwrap();

        outputs.close().unwrap();
        outputs.close().unwrap();

        let err = outputs.write(b"late").unwrap_err();
        assert!(err.to_string().contains("file already closed"), "{err}");
    }

    #[test]
    fn test_failed_open_keeps_earlier_files_closed() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let spec = format!("{},stdout,/not/exist/b.log", a.display());

        assert!(Outputs::open(&spec).is_err());
        // the earlier file was created, but nothing was written through it
        assert_eq!(fs::read_to_string(&a).unwrap(), "");
    }

    #[test]
    fn test_io_write() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let outputs = Outputs::open(&a.display().to_string()).unwrap();

        writeln!(&outputs, "via io::Write").unwrap();
        outputs.close().unwrap();

        assert_eq!(fs::read_to_string(&a).unwrap(), "via io::Write\n");
    }
}
