//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use super::types::LogFormat;
use super::utils::{format_utc_datetime, format_utc_rfc3339, format_utc_time, log_file_path, strip_ansi};

/// Event target for stage headers.
pub(super) const TARGET_STAGE: &str = "provision::stage";
/// Event target for success messages.
pub(super) const TARGET_SUCCESS: &str = "provision::success";
/// Event target for dry-run previews.
pub(super) const TARGET_DRY_RUN: &str = "provision::dry_run";
/// Event target for transient progress messages.
pub(super) const TARGET_PROGRESS: &str = "provision::progress";

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
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

/// Render one line for the persistent log file (timestamped, no ANSI).
fn format_file_line(level: tracing::Level, target: &str, msg: &str, ts: &str) -> String {
    let msg = strip_ansi(msg);
    match (level, target) {
        (tracing::Level::INFO, TARGET_STAGE) => format!("[{ts}] ==> {msg}"),
        (tracing::Level::INFO, TARGET_SUCCESS) => format!("[{ts}]     [ok] {msg}"),
        (tracing::Level::INFO, TARGET_DRY_RUN) => format!("[{ts}]     [dry run] {msg}"),
        (tracing::Level::INFO, TARGET_PROGRESS) => format!("[{ts}]     [progress] {msg}"),
        (tracing::Level::ERROR, _) => format!("[{ts}]     [error] {msg}"),
        (tracing::Level::WARN, _) => format!("[{ts}]     [warn] {msg}"),
        (tracing::Level::DEBUG, _) => format!("[{ts}]     [debug] {msg}"),
        _ => format!("[{ts}]     {msg}"),
    }
}

/// Render one JSON line for `LOG_FORMAT=json` console output.
fn format_json_line(level: tracing::Level, target: &str, msg: &str, ts: &str) -> String {
    let level_name = match (level, target) {
        (tracing::Level::INFO, TARGET_STAGE) => "stage",
        (tracing::Level::INFO, TARGET_SUCCESS) => "success",
        (tracing::Level::INFO, TARGET_DRY_RUN) => "dry_run",
        (tracing::Level::INFO, TARGET_PROGRESS) => "progress",
        (tracing::Level::ERROR, _) => "error",
        (tracing::Level::WARN, _) => "warning",
        (tracing::Level::DEBUG, _) => "debug",
        _ => "info",
    };
    serde_json::json!({
        "timestamp": ts,
        "level": level_name,
        "message": strip_ansi(msg),
    })
    .to_string()
}

/// A [`tracing_subscriber::Layer`] that appends all events to the persistent
/// log file with timestamps and ANSI codes stripped.
///
/// Created by [`init_subscriber`] so that file output goes through the same
/// tracing pipeline as console output. Always captures events at `DEBUG`
/// level and above regardless of the console verbosity setting.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open (or create) the log file for `command`, write a run header, and
    /// return a new `FileLayer` ready to receive events.
    ///
    /// Returns `None` if the cache directory cannot be created or the file
    /// cannot be opened.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("PROVISION_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "==========================================\n\
             Provision {version} {}\n\
             ==========================================\n",
            format_utc_datetime(),
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
        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let line = format_file_line(
            *metadata.level(),
            metadata.target(),
            &extractor.message,
            &format_utc_time(),
        );

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits provision-style
/// console output, in either text or JSON form.
struct ProvisionFormatter {
    format: LogFormat,
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ProvisionFormatter
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

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = &extractor.message;

        if self.format == LogFormat::Json {
            let line = format_json_line(level, target, msg, &format_utc_rfc3339());
            return writeln!(writer, "{line}");
        }

        match level {
            tracing::Level::ERROR => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            tracing::Level::INFO if target == TARGET_STAGE => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO if target == TARGET_SUCCESS => {
                writeln!(writer, "  \x1b[32m✓\x1b[0m {msg}")
            }
            tracing::Level::INFO if target == TARGET_DRY_RUN => {
                writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}")
            }
            tracing::Level::INFO if target == TARGET_PROGRESS => {
                writeln!(writer, "  \x1b[2m▹ {msg}\x1b[0m")
            }
            tracing::Level::INFO => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Sets up a console subscriber that formats events to match the provision
/// output style (text or JSON per `LOG_FORMAT`) and a file subscriber that
/// writes all events (including `debug`) to
/// `$XDG_CACHE_HOME/provision/<command>.log`.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(verbose: bool, command: &str, format: LogFormat) {
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

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ProvisionFormatter { format })
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_line_for_stage_uses_arrow() {
        let line = format_file_line(tracing::Level::INFO, TARGET_STAGE, "Linking", "12:00:00");
        assert_eq!(line, "[12:00:00] ==> Linking");
    }

    #[test]
    fn file_line_for_error_is_tagged() {
        let line = format_file_line(tracing::Level::ERROR, "provision", "boom", "12:00:00");
        assert!(line.contains("[error] boom"));
    }

    #[test]
    fn file_line_strips_ansi() {
        let line = format_file_line(
            tracing::Level::INFO,
            "provision",
            "\x1b[32mgreen\x1b[0m",
            "12:00:00",
        );
        assert!(!line.contains('\x1b'));
        assert!(line.contains("green"));
    }

    #[test]
    fn json_line_is_valid_json_with_fields() {
        let line = format_json_line(
            tracing::Level::WARN,
            "provision",
            "low disk",
            "2026-01-01T00:00:00Z",
        );
        let value: serde_json::Value = serde_json::from_str(&line).expect("valid JSON");
        assert_eq!(value["level"], "warning");
        assert_eq!(value["message"], "low disk");
        assert_eq!(value["timestamp"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn json_line_maps_success_target() {
        let line = format_json_line(
            tracing::Level::INFO,
            TARGET_SUCCESS,
            "installed",
            "2026-01-01T00:00:00Z",
        );
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "success");
    }

    #[test]
    fn json_line_escapes_message_content() {
        let line = format_json_line(
            tracing::Level::INFO,
            "provision",
            "quote \" and backslash \\",
            "2026-01-01T00:00:00Z",
        );
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["message"], "quote \" and backslash \\");
    }
}
