//! Console and log-file output for `dots` runs.
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

/// `$XDG_CACHE_HOME/dots/<command>.log` (or `~/.cache/dots/...`), creating
/// the directory.  `None` when no cache location is known or writable.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let cache = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".cache"))
        })?;
    let dir = cache.join("dots");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// `msg` with terminal escape sequences removed.
fn without_escapes(msg: &str) -> String {
    let mut pieces = msg.split('\x1b');
    let mut out = pieces.next().unwrap_or_default().to_string();
    for piece in pieces {
        let mut chars = piece.chars();
        if chars.next() == Some('[') {
            let body = chars.as_str();
            let end = body
                .find(|c: char| ('@'..='~').contains(&c))
                .map_or(body.len(), |i| i + 1);
            out.push_str(body.get(end..).unwrap_or_default());
        } else {
            out.push_str(chars.as_str());
        }
    }
    out
}

/// The `message` field of an event.
#[derive(Default)]
struct MessageField {
    message: String,
}

impl tracing::field::Visit for MessageField {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// Writes every bundle run to `<cache>/dots/<command>.log`, one timestamped
/// line per event, without colour.  Debug lines are kept even when the
/// console is not verbose.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log for `command` and start it with a version banner.
    /// `None` when the file cannot be written; the run then logs to the
    /// console only.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("DOTS_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "==========================================\n\
             dots {version} {}\n\
             ==========================================\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut field = MessageField::default();
        event.record(&mut field);
        let msg = without_escapes(&field.message);
        let ts = chrono::Utc::now().format("%H:%M:%S");

        let line = match (level, target) {
            (tracing::Level::INFO, "dots::stage") => format!("[{ts}] ==> {msg}"),
            (tracing::Level::INFO, "dots::dry_run") => format!("[{ts}]     [dry run] {msg}"),
            (tracing::Level::ERROR, _) => format!("[{ts}]     [error] {msg}"),
            (tracing::Level::WARN, _) => format!("[{ts}]     [warn] {msg}"),
            (tracing::Level::DEBUG, _) => format!("[{ts}]     [debug] {msg}"),
            _ => format!("[{ts}]     {msg}"),
        };

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// Bundle stages as `==>` headers, item lines indented beneath them.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut field = MessageField::default();
        event.record(&mut field);
        let msg = &field.message;

        match level {
            tracing::Level::ERROR => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            tracing::Level::INFO if target == "dots::stage" => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO if target == "dots::dry_run" => {
                writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}")
            }
            tracing::Level::INFO => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Install the process-wide subscriber for one `dots` command.
///
/// `verbose` lowers the console to debug.  Under `json` every console line
/// goes to stderr and stdout is left to the run report.  Call once from
/// `main`.
pub fn init_subscriber(verbose: bool, json: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let console_layer = if json {
        fmt::layer()
            .event_format(ConsoleFormatter)
            .with_writer(std::io::stderr)
            .with_filter(console_level)
            .boxed()
    } else {
        let make_writer = std::io::stderr
            .with_max_level(tracing::Level::WARN)
            .and(std::io::stdout.with_min_level(tracing::Level::INFO));
        fmt::layer()
            .event_format(ConsoleFormatter)
            .with_writer(make_writer)
            .with_filter(console_level)
            .boxed()
    };

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
