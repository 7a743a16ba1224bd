use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives that replace the
/// `--log-level` default, e.g. `scsiprims_device=trace,warn`.
pub const LOG_ENV: &str = "SCSIPRIMS_LOG";

/// Log targets of this project's crates. `--log-level` applies to these;
/// every other target is held at `warn`.
const TARGETS: [&str; 5] = [
    "scsiprims",
    "scsiprims_codec",
    "scsiprims_commands",
    "scsiprims_device",
    "scsiprims_transport",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Filter directives for `level`: project targets at `level`, everything
/// else at `warn` or quieter.
pub fn directives(level: LogLevel) -> String {
    let fallback = if level == LogLevel::Error { "error" } else { "warn" };
    let mut out = String::from(fallback);
    for target in TARGETS {
        out.push(',');
        out.push_str(target);
        out.push('=');
        out.push_str(level.directive());
    }
    out
}

/// Directives from [`LOG_ENV`] when set and valid, the level default
/// otherwise.
fn build_filter(level: LogLevel, env: Option<&str>) -> EnvFilter {
    env.filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(directives(level)))
}

/// Route library events to stderr so stdout carries only command output.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let env = std::env::var(LOG_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level, env.as_deref()))
        .with_ansi(false)
        .with_target(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
