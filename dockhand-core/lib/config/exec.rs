//! Per-operation execution configuration and the output sink.

use std::{
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex},
};

use dockhand_utils::DEFAULT_STOP_TIMEOUT_SECS;
use getset::{CopyGetters, Getters};
use typed_builder::TypedBuilder;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A shared writer/error-writer pair that exec, logs and inspect write to.
///
/// The pair is passed explicitly with each operation instead of living in
/// process-global state, so concurrent callers cannot observe each other's
/// redirection. Operations write *through* the sink and never replace it;
/// cloning shares the underlying writers, which makes referential identity
/// observable via [`OutputSink::same_as`].
#[derive(Clone)]
pub struct OutputSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
    err: Arc<Mutex<Box<dyn Write + Send>>>,
}

/// Reads back what a capturing [`OutputSink`] has collected.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    buf: Arc<Mutex<Vec<u8>>>,
}

/// A `Write` over a shared byte buffer; both sides of a capturing sink point
/// at the same buffer so the capture is the combined stream.
#[derive(Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

/// Execution configuration for a single lifecycle operation.
#[derive(Debug, Clone, TypedBuilder, Getters, CopyGetters)]
pub struct ExecConfig {
    /// Attach standard input and stream output for the session duration.
    #[builder(default)]
    #[getset(get_copy = "pub with_prefix")]
    interactive: bool,

    /// Publish every exposed port on a runtime-chosen host port.
    #[builder(default)]
    #[getset(get_copy = "pub with_prefix")]
    publish_all_ports: bool,

    /// Command arguments for exec sessions.
    #[builder(default)]
    #[getset(get = "pub with_prefix")]
    args: Vec<String>,

    /// Graceful-stop timeout in seconds.
    #[builder(default = DEFAULT_STOP_TIMEOUT_SECS)]
    #[getset(get_copy = "pub with_prefix")]
    stop_timeout: u32,

    /// Where captured output is written.
    #[builder(default)]
    #[getset(get = "pub with_prefix")]
    sink: OutputSink,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl OutputSink {
    /// A sink over the process stdout/stderr.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// A sink over caller-supplied writers.
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
            err: Arc::new(Mutex::new(Box::new(err))),
        }
    }

    /// A sink that captures everything written to either side, and a handle
    /// to read the combined capture back.
    pub fn capture() -> (Self, CaptureHandle) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Self::new(SharedBuf(buf.clone()), SharedBuf(buf.clone()));
        (sink, CaptureHandle { buf })
    }

    /// Writes to the standard-output side.
    pub fn write_out(&self, bytes: &[u8]) -> io::Result<()> {
        let mut out = lock_writer(&self.out)?;
        out.write_all(bytes)?;
        out.flush()
    }

    /// Writes to the error side.
    pub fn write_err(&self, bytes: &[u8]) -> io::Result<()> {
        let mut err = lock_writer(&self.err)?;
        err.write_all(bytes)?;
        err.flush()
    }

    /// Whether `other` shares this sink's underlying writer pair.
    pub fn same_as(&self, other: &OutputSink) -> bool {
        Arc::ptr_eq(&self.out, &other.out) && Arc::ptr_eq(&self.err, &other.err)
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::stdio()
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

impl CaptureHandle {
    /// The captured bytes so far, as lossy UTF-8.
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut buf = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Locks one side of the sink, mapping poisoning to an I/O error.
fn lock_writer(
    writer: &Arc<Mutex<Box<dyn Write + Send>>>,
) -> io::Result<std::sync::MutexGuard<'_, Box<dyn Write + Send>>> {
    writer
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "output sink lock poisoned"))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_combines_both_sides() {
        let (sink, capture) = OutputSink::capture();
        sink.write_out(b"out ").unwrap();
        sink.write_err(b"err").unwrap();
        assert_eq!(capture.contents(), "out err");
    }

    #[test]
    fn test_clones_share_identity() {
        let (sink, _capture) = OutputSink::capture();
        let clone = sink.clone();
        assert!(sink.same_as(&clone));

        let (other, _) = OutputSink::capture();
        assert!(!sink.same_as(&other));
    }

    #[test]
    fn test_exec_config_defaults() {
        let config = ExecConfig::default();
        assert!(!config.get_interactive());
        assert!(!config.get_publish_all_ports());
        assert!(config.get_args().is_empty());
        assert_eq!(config.get_stop_timeout(), DEFAULT_STOP_TIMEOUT_SECS);
    }
}
