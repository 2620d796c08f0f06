mod common;

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

use service_event_log::fields::DIAGNOSTICS_TARGET;
use service_event_log::{fields, FieldWriter, Fields, Logger, Severity, Value, Writer, WriterConfig};

use common::{memory_writer, parse, rs_fields};

/// Counts events on the crate's diagnostics target.
struct DiagnosticsCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for DiagnosticsCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() == DIAGNOSTICS_TARGET {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Output whose every write fails.
struct BrokenOutput;

impl Write for BrokenOutput {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }
}

fn broken_writer() -> FieldWriter {
    FieldWriter::new(WriterConfig {
        output: Box::new(BrokenOutput),
        omit_empty: false,
        use_colours: false,
        level: "DEBUG".to_string(),
    })
}

fn counting<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = Registry::default().with(DiagnosticsCounter(Arc::clone(&count)));
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, count.load(Ordering::Relaxed))
}

#[test]
fn failed_writes_go_to_diagnostics_not_the_caller() {
    let writer = broken_writer();

    let (json, diagnostics) = counting(|| writer.write_fields(Severity::Error, fields! { "e" => "x" }, &[]));

    assert_eq!(json, r#"{"e":"x"}"#);
    assert_eq!(diagnostics, 1);
}

#[test]
fn suppressed_events_never_touch_the_output() {
    let writer = FieldWriter::new(WriterConfig {
        output: Box::new(BrokenOutput),
        omit_empty: false,
        use_colours: false,
        level: "ERROR".to_string(),
    });

    let (json, diagnostics) = counting(|| writer.write_fields(Severity::Info, fields! { "e" => "x" }, &[]));

    assert_eq!(json, r#"{"e":"x"}"#);
    assert_eq!(diagnostics, 0);
}

#[test]
fn serialization_anomalies_go_to_diagnostics() {
    let (writer, output) = memory_writer("DEBUG", false);
    let properties = fields! { "callbacks" => Value::List(vec![Value::unsupported("fn")]) };

    let (json, diagnostics) = counting(|| writer.write_fields(Severity::Info, fields! { "e" => "x" }, &[properties]));

    assert_eq!(json, "{}");
    assert_eq!(output.contents(), "{}\n");
    assert_eq!(diagnostics, 1);
}

#[test]
fn each_anomaly_is_reported_once() {
    let writer = broken_writer();
    let bad = fields! { "list" => Value::List(vec![Value::unsupported("fn")]) };

    let ((written, rendered), diagnostics) = counting(|| {
        let written = writer.write_fields(Severity::Warn, fields! { "e" => "x" }, &[]);
        (written, bad.to_json(false))
    });

    assert_eq!(written, r#"{"e":"x"}"#);
    assert_eq!(rendered, "{}");
    assert_eq!(diagnostics, 2);
}

#[test]
fn logger_survives_a_broken_output() {
    let logger = Logger::with_writer(rs_fields(), Arc::new(broken_writer()), Fields::new());

    let (json, diagnostics) = counting(|| logger.error("write_lost", &io::Error::other("upstream"), &[]));

    let record = parse(&json);
    assert_eq!(record["event"], "write_lost");
    assert_eq!(record["exception"]["error"], "upstream");
    assert_eq!(diagnostics, 1);
}

#[test]
fn property_sets_nest_under_properties() {
    let (writer, output) = memory_writer("DEBUG", false);

    writer.write_fields(
        Severity::Info,
        fields! { "event" => "e" },
        &[fields! { "a" => 1 }, fields! { "a" => 2, "b" => 3 }],
    );
    writer.write_fields(Severity::Info, fields! { "event" => "bare" }, &[]);

    let lines = output.lines();
    assert_eq!(lines[0], r#"{"event":"e","properties":{"a":2,"b":3}}"#);
    assert_eq!(lines[1], r#"{"event":"bare"}"#);
}

#[test]
fn warn_threshold_gates_output() {
    let (writer, output) = memory_writer("WARN", false);

    for severity in Severity::ALL {
        writer.write_fields(severity, fields! { "severity" => severity.as_str() }, &[]);
    }

    let written: Vec<_> = output.lines().iter().map(|l| parse(l)["severity"].clone()).collect();
    assert_eq!(written, ["WARN", "ERROR", "FATAL", "AUDIT"]);
}
