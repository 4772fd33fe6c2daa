use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Single-line diagnostic formatter: `LEVEL hh:mm:ss.mmm message`.
///
/// Diagnostics share a terminal with the JSONL stream, so the format
/// stays plain and greppable. The event target is appended only at
/// debug level and below.
pub struct EventFormatter;

impl<S, N> FormatEvent<S, N> for EventFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();
        let timestamp = Local::now().format("%H:%M:%S%.3f");

        write!(writer, "{:>5} {} ", level, timestamp)?;
        if matches!(level, Level::DEBUG | Level::TRACE) {
            write!(writer, "{}: ", metadata.target())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
