/// Arguments controlling how logs are filtered and formatted.
#[derive(Debug, clap::Args)]
pub struct LogArgs {
    /// The log verbosity. Ignored if RUST_LOG is set, which accepts full
    /// tracing filter directives.
    #[clap(
        long = "log.level",
        value_enum,
        default_value = "warn",
        env = "BULKLOAD_LOG_LEVEL",
        global = true
    )]
    pub level: LogLevel,

    /// The format of logs written to stderr.
    #[clap(
        long = "log.format",
        value_enum,
        default_value = "text",
        env = "BULKLOAD_LOG_FORMAT",
        global = true
    )]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Initialize the global tracing subscriber, which writes to stderr so that
/// stdout carries only the report.
pub fn init_logging(args: &LogArgs) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    match args.format {
        LogFormat::Json => builder
            .json()
            // Keep the message and fields at the top level of each object.
            .flatten_event(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(false)
            .init(),
        LogFormat::Text => builder.with_target(false).init(),
    }
}
