//! Per-unit build output capture
//!
//! While a unit builds, everything written to its [`UnitOutput`] (directly,
//! or by child processes given [`UnitOutput::stdio`]) is copied both to the
//! console and to `<log_dir>/<unit>.log`.
//!
//! Each scope owns a private pipe rather than redirecting the process-wide
//! stdout, so concurrent scopes would not interfere. The executor still runs
//! one scope at a time, which keeps the console readable.

use std::fs::File;
use std::io::{self, PipeReader, PipeWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::thread::{self, JoinHandle};

use crate::config::defaults;

/// Write end of a unit's output capture
#[derive(Debug)]
pub struct UnitOutput {
    unit: String,
    writer: PipeWriter,
}

impl UnitOutput {
    /// Unit being captured
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// A handle for a child process's stdout or stderr
    ///
    /// Each call yields an independent handle; stdout and stderr of the
    /// same child may both be attached and end up interleaved.
    pub fn stdio(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.writer.try_clone()?))
    }
}

impl Write for UnitOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Background copy from the pipe to console and log
///
/// Dropping a `Drain` waits for the copy to finish, so the log is complete
/// on every exit path, unwinding included.
struct Drain {
    handle: Option<JoinHandle<io::Result<()>>>,
}

impl Drain {
    fn spawn(unit: &str, mut reader: PipeReader, mut log: File, echo: bool) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("tee-{unit}"))
            .spawn(move || {
                let mut buf = [0u8; 8192];
                let mut log_error = None;
                loop {
                    let n = match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => n,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e),
                    };
                    if echo {
                        let mut stdout = io::stdout().lock();
                        if let Err(e) = stdout.write_all(&buf[..n]).and_then(|()| stdout.flush()) {
                            tracing::debug!("console echo failed: {e}");
                        }
                    }
                    if log_error.is_none() {
                        if let Err(e) = log.write_all(&buf[..n]) {
                            log_error = Some(e);
                        }
                    }
                }
                match log_error {
                    Some(e) => Err(e),
                    None => log.flush(),
                }
            })?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the copy to finish; every write end must be closed first
    fn finish(mut self) -> io::Result<()> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("output copy thread panicked"))),
            None => Ok(()),
        }
    }
}

impl Drop for Drain {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Creates one output capture scope per unit
#[derive(Debug, Clone)]
pub struct OutputMultiplexer {
    log_dir: PathBuf,
    echo: bool,
}

impl OutputMultiplexer {
    /// Capture into `log_dir`, echoing to stdout
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            echo: true,
        }
    }

    /// Enable or disable the console copy
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Log directory
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the log file for `unit`
    pub fn log_path(&self, unit: &str) -> PathBuf {
        self.log_dir
            .join(format!("{unit}.{}", defaults::UNIT_LOG_EXTENSION))
    }

    /// Run `f` with its output captured for `unit`
    ///
    /// The unit's log file is truncated first. When this returns, the copy
    /// has fully drained and the log is flushed. An `Err` means the capture
    /// itself failed (log not creatable or not writable); the value `f`
    /// returned is then lost.
    pub fn scope<T, F>(&self, unit: &str, f: F) -> io::Result<T>
    where
        F: FnOnce(&mut UnitOutput) -> T,
    {
        let log = File::create(self.log_path(unit))?;
        let (reader, writer) = io::pipe()?;
        let drain = Drain::spawn(unit, reader, log, self.echo)?;

        // Declared after `drain`: dropped first when unwinding, which closes
        // the pipe before the drain is joined.
        let mut output = UnitOutput {
            unit: unit.to_string(),
            writer,
        };
        let value = f(&mut output);

        drop(output);
        drain.finish()?;
        Ok(value)
    }
}
