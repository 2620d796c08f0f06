use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::fields::{Fields, Value, DIAGNOSTICS_TARGET};
use crate::keys;
use crate::level::Severity;
use crate::logger::Logger;
use crate::system;

/// `tracing_subscriber` layer that turns ordinary `tracing` events into
/// enriched JSON records written by a [`Logger`].
///
/// Everything happens synchronously on the thread that emitted the event.
/// The record is named after the `event` field if there is one, else the
/// message, else the target. `TRACE` maps to `DEBUG`; there is no fatal
/// level, so the bridge never terminates the process.
pub struct EventLogLayer {
    logger: Logger,
    /// Total events seen by the layer.
    pub total_events: Arc<AtomicU64>,
    /// Events handed to the logger.
    pub forwarded_events: Arc<AtomicU64>,
}

impl EventLogLayer {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            total_events: Arc::new(AtomicU64::new(0)),
            forwarded_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

fn severity_for(level: &Level) -> Severity {
    if *level == Level::ERROR {
        Severity::Error
    } else if *level == Level::WARN {
        Severity::Warn
    } else if *level == Level::INFO {
        Severity::Info
    } else {
        Severity::Debug
    }
}

/// `file:line:function` of a `tracing` call site. Without a file or line
/// the module path stands in for the function.
fn event_location(file: Option<&'static str>, line: Option<u32>, module_path: Option<&str>) -> String {
    match (file, line) {
        (Some(file), Some(line)) => system::location(file, line),
        _ => format!("{}:0:{}", keys::UNKNOWN, module_path.unwrap_or(keys::UNKNOWN)),
    }
}

impl<S> Layer<S> for EventLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        // The crate's own diagnostics must never loop back into a logger.
        if meta.target() == DIAGNOSTICS_TARGET {
            return;
        }

        let mut fields = Fields::new();
        let mut message: Option<String> = None;
        let mut name: Option<String> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            event: &mut name,
        };
        event.record(&mut visitor);

        let event_name = match (name, &message) {
            (Some(name), _) => name,
            (None, Some(message)) => message.clone(),
            (None, None) => meta.target().to_string(),
        };
        if let Some(message) = message {
            fields.insert(keys::MESSAGE, message);
        }
        fields.insert("target", meta.target());

        let loc = event_location(meta.file(), meta.line(), meta.module_path());

        self.logger.emit(
            self.logger.request_scoped_fields(),
            &event_name,
            None,
            severity_for(meta.level()),
            &[fields],
            loc,
        );
        self.forwarded_events.fetch_add(1, Ordering::Relaxed);
    }
}

/// Collects the fields of a `tracing` event, pulling out `message` and
/// `event` separately.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut Option<String>,
    pub event: &'a mut Option<String>,
}

impl FieldVisitor<'_> {
    fn record(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name(), value);
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => *self.message = Some(value.to_string()),
            "event" => *self.event = Some(value.to_string()),
            _ => self.record(field, Value::from(value)),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => *self.message = Some(format!("{:?}", value)),
            "event" => *self.event = Some(format!("{:?}", value)),
            _ => self.record(field, Value::from(format!("{:?}", value))),
        }
    }
}
