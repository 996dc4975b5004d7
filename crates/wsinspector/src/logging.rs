use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "wsinspector.log";

/// Where file log lines go: memory until the output directory is known good
enum SinkState {
    Pending(Vec<u8>),
    Open(File),
}

/// Handle to the log file layer.
///
/// Lines are buffered until [`LogFile::open`] is called, so a run that fails
/// before its inputs load never creates the output directory.
#[derive(Clone)]
pub struct LogFile {
    state: Arc<Mutex<SinkState>>,
}

impl LogFile {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState::Pending(Vec::new()))),
        }
    }

    fn lock(&self) -> std::io::Result<std::sync::MutexGuard<'_, SinkState>> {
        self.state
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))
    }

    /// Create `{checks_dir}/wsinspector.log` (truncated) and flush buffered lines into it
    pub fn open(&self, checks_dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(checks_dir)?;
        let path = checks_dir.join(LOG_FILE_NAME);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        let mut state = self.lock()?;
        if let SinkState::Pending(buffered) = &*state {
            file.write_all(buffered)?;
        }
        *state = SinkState::Open(file);
        Ok(path)
    }
}

pub struct LogWriter {
    sink: LogFile,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut *self.sink.lock()? {
            SinkState::Pending(buffered) => {
                buffered.extend_from_slice(buf);
                Ok(buf.len())
            }
            SinkState::Open(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut *self.sink.lock()? {
            SinkState::Pending(_) => Ok(()),
            SinkState::Open(file) => file.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter { sink: self.clone() }
    }
}

/// Default filter directive for both crates at `level`
#[must_use]
pub fn filter_directive(level: &str) -> String {
    format!("wsinspector={level},wsinspector_core={level}")
}

/// Initialize logging to stderr and to a deferred log file.
///
/// `RUST_LOG` takes precedence over `level`. Call [`LogFile::open`] on the
/// returned handle once the output directory may be created.
pub fn init_logging(level: &str) -> color_eyre::Result<LogFile> {
    let log_file = LogFile::new();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(log_file.clone())
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .try_init()?;

    tracing::debug!("logging initialized");
    Ok(log_file)
}
