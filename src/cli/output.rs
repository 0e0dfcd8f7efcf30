//! Log output for dcgoss.
//!
//! Messages print as `LEVEL: message`, with the level colored unless color
//! is disabled. INFO and DEBUG go to stdout; WARN and ERROR go to stderr so
//! CI logs keep failures visible when stdout is redirected.

use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const RESET: &str = "\x1b[0m";

/// ANSI color for a level
pub fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "\x1b[0;90m",
        Level::DEBUG => "\x1b[0;35m",
        Level::INFO => "\x1b[0;36m",
        Level::WARN => "\x1b[0;33m",
        Level::ERROR => "\x1b[0;31m",
    }
}

/// `LEVEL: message` event formatter
#[derive(Debug, Clone, Copy)]
pub struct LevelPrefixFormat {
    color: bool,
}

impl LevelPrefixFormat {
    pub fn new(color: bool) -> Self {
        LevelPrefixFormat { color }
    }
}

impl<S, N> FormatEvent<S, N> for LevelPrefixFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = event.metadata().level();
        if self.color {
            write!(writer, "{}{}{}: ", level_color(level), level, RESET)?;
        } else {
            write!(writer, "{}: ", level)?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Filter used when RUST_LOG is not set
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "dcgoss=debug"
    } else {
        "dcgoss=info"
    }
}

/// Install the global subscriber
pub fn init_logging(debug: bool, color: bool) {
    let filter = if debug {
        EnvFilter::new(default_filter(true))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(false)))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(LevelPrefixFormat::new(color))
        .with_writer(
            std::io::stderr
                .with_max_level(Level::WARN)
                .or_else(std::io::stdout),
        )
        .init();
}
