use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

pub const MAX_LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Where console log lines go. The terminal chat owns stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stdout,
    Stderr,
}

impl Console {
    fn make_writer(self) -> BoxMakeWriter {
        match self {
            Console::Stdout => BoxMakeWriter::new(io::stdout),
            Console::Stderr => BoxMakeWriter::new(io::stderr),
        }
    }
}

/// `RUST_LOG` wins over `log_level` when set.
pub fn init_logging(log_level: Level, log_file: Option<&str>, console: Console) {
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(log_level).into())
            .from_env_lossy()
    };
    let console_layer = tracing_subscriber::fmt::layer().with_writer(console.make_writer());

    if let Some(path) = log_file {
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(rotating_file_writer(PathBuf::from(path), MAX_LOG_FILE_BYTES));
        tracing_subscriber::registry()
            .with(console_layer.with_filter(filter()))
            .with(file_layer.with_filter(filter()))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(console_layer.with_filter(filter()))
            .init();
    }
}

fn rotating_file_writer(path: PathBuf, max_len: u64) -> impl Fn() -> RotatingFile {
    let lock = Arc::new(Mutex::new(()));
    move || RotatingFile { path: path.clone(), max_len, lock: lock.clone() }
}

/// Appends to `path`; once a write would push it past `max_len` the file is
/// moved to `<path>.1` and a fresh one started. Keeps one generation.
struct RotatingFile {
    path: PathBuf,
    max_len: u64,
    lock: Arc<Mutex<()>>,
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".1");
    PathBuf::from(name)
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if current > 0 && current + buf.len() as u64 > self.max_len {
            std::fs::rename(&self.path, rotated_path(&self.path))?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
