//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Render every event as one line:
//!   `[timestamp][correlation-id][LEVEL][message key=value ...]`
//! - Configure log level at startup
//!
//! # Design Decisions
//! - Uses tracing crate; call sites attach `correlation_id` as a field
//! - Embedded `\n` / `\r` are escaped so request and response dumps never
//!   split a log entry
//! - The fmt layer renders an event into one buffer and hands it to stdout
//!   in a single write, so concurrent tasks never interleave partial lines

use std::fmt::{self, Write as _};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::observability::tracing::CORRELATION_FIELD;

/// Install the global subscriber writing single-line records to stdout.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &ObservabilityConfig) {
    let default_filter = if config.verbose {
        "debug,hyper=info,hyper_util=info".to_string()
    } else {
        config.log_level.clone()
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(TeeFormat)
                .with_writer(std::io::stdout),
        )
        .init();
}

/// Event formatter producing the tee proxy's line format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeeFormat;

impl<S, N> FormatEvent<S, N> for TeeFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = LineFields::default();
        event.record(&mut fields);

        let line = format_line(
            &Utc::now(),
            &fields.correlation_id,
            event.metadata().level(),
            &fields.message(),
        );
        writeln!(writer, "{}", line)
    }
}

/// Render one log record. The message is escaped, the rest is not.
pub fn format_line(timestamp: &DateTime<Utc>, id: &str, level: &Level, message: &str) -> String {
    format!(
        "[{}][{}][{}][{}]",
        timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        id,
        level,
        escape_line_breaks(message)
    )
}

/// Replace CR and LF with their two-character escapes.
pub fn escape_line_breaks(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    for c in message.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Default)]
struct LineFields {
    correlation_id: String,
    message: String,
    extra: String,
}

impl LineFields {
    fn message(&self) -> String {
        if self.extra.is_empty() {
            self.message.clone()
        } else if self.message.is_empty() {
            self.extra.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.extra)
        }
    }
}

impl Visit for LineFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            CORRELATION_FIELD => self.correlation_id = value.to_string(),
            name => {
                let _ = write!(self.extra, " {}={}", name, value);
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            CORRELATION_FIELD => self.correlation_id = format!("{:?}", value),
            name => {
                let _ = write!(self.extra, " {}={:?}", name, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_line_layout() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let line = format_line(&ts, "abc-123", &Level::WARN, "retrying");
        assert_eq!(
            line,
            "[2024-05-01T12:30:00.000000000Z][abc-123][WARN][retrying]"
        );
    }

    #[test]
    fn test_dumps_stay_on_one_line() {
        let ts = Utc::now();
        let dump = "GET /foo HTTP/1.1\r\nHost: example.com\r\n\r\nbody\nmore";
        let line = format_line(&ts, "id", &Level::INFO, dump);

        assert!(!line.contains('\n'));
        assert!(!line.contains('\r'));
        assert!(line.ends_with(
            "[id][INFO][GET /foo HTTP/1.1\\r\\nHost: example.com\\r\\n\\r\\nbody\\nmore]"
        ));
    }

    #[test]
    fn test_escape_leaves_other_text_alone() {
        assert_eq!(escape_line_breaks("tab\tand \\n literal"), "tab\tand \\n literal");
    }

    #[test]
    fn test_message_with_extra_fields() {
        let fields = LineFields {
            correlation_id: "id".into(),
            message: "Shadow response".into(),
            extra: " attempt=2 status=503".into(),
        };
        assert_eq!(fields.message(), "Shadow response attempt=2 status=503");

        let bare = LineFields {
            extra: " status=200".into(),
            ..Default::default()
        };
        assert_eq!(bare.message(), "status=200");
    }
}
