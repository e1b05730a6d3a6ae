use std::{fs::File, path::Path};
use tracing::level_filters::LevelFilter as Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Value of `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "UPPER")]
pub enum LevelFilter {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LevelFilter> for Level {
    fn from(level: LevelFilter) -> Self {
        match level {
            LevelFilter::Off => Level::OFF,
            LevelFilter::Error => Level::ERROR,
            LevelFilter::Warn => Level::WARN,
            LevelFilter::Info => Level::INFO,
            LevelFilter::Debug => Level::DEBUG,
            LevelFilter::Trace => Level::TRACE,
        }
    }
}

fn stderr_filter(level: Option<LevelFilter>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::builder()
            .with_default_directive(Level::from(level).into())
            .parse_lossy(""),
        None => EnvFilter::builder()
            .with_default_directive(Level::WARN.into())
            .from_env_lossy(),
    }
}

/// Log to stderr, and as JSON lines to `log_path` if one is given.
///
/// `level` takes precedence over `RUST_LOG`. The returned guard flushes the
/// log file when dropped and has to live until the command is done.
pub fn setup_logging(
    log_path: Option<&Path>,
    level: Option<LevelFilter>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr = tracing_subscriber::fmt::layer()
        .compact()
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter(level));

    let (file, guard) = match log_path {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
                .lossy(false)
                .finish(File::create(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(stderr).with(file).init();

    if let Some(path) = log_path {
        tracing::info!("Logging to {}", path.display());
    }
    Ok(guard)
}
