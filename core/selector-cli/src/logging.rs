//! Log setup for selector-cli.
//!
//! Lines go to `<dir>/selector-cli.<date>.log`, rotated daily with seven files
//! kept, where `<dir>` is `--log-dir` or `~/.selector`. An unusable directory
//! sends them to stderr instead. `RUST_LOG` replaces the default filter.

use fs_err as fs;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "selector_cli=debug,selector_core=info";
const FILE_PREFIX: &str = "selector-cli";
const KEPT_FILES: usize = 7;

enum Sink {
    File(RollingFileAppender),
    Stderr,
}

impl Sink {
    fn open(log_dir: Option<PathBuf>) -> Self {
        let Some(dir) = log_dir.or_else(selector_core::config::get_selector_dir) else {
            return Sink::Stderr;
        };
        if fs::create_dir_all(&dir).is_err() {
            return Sink::Stderr;
        }

        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(FILE_PREFIX)
            .filename_suffix("log")
            .max_log_files(KEPT_FILES)
            .build(&dir)
            .map(Sink::File)
            .unwrap_or(Sink::Stderr)
    }
}

/// Installs the global subscriber. The returned guard flushes buffered file
/// output on drop, so `main` holds it until exit.
pub fn init(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (writer, ansi, guard) = match Sink::open(log_dir) {
        Sink::File(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), false, Some(guard))
        }
        Sink::Stderr => (BoxMakeWriter::new(io::stderr), true, None),
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_ansi(ansi);

    if tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_err()
    {
        eprintln!("selector-cli: a log subscriber is already installed");
    }
    guard
}
