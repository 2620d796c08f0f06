use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, OnceLock};

use crate::context::{RequestScope, RequestScopedFields};
use crate::error::{abort_on_fatal, FatalHandler, FatalLogged};
use crate::fields::{to_snake_case, Fields};
use crate::level::Severity;
use crate::segment::Segment;
use crate::sink::Writer;
use crate::system::{self, SystemValues};
use crate::writer::FieldWriter;

/// Process-wide writer to standard output, configured from the
/// environment on first use.
pub fn default_writer() -> Arc<dyn Writer> {
    static WRITER: OnceLock<Arc<dyn Writer>> = OnceLock::new();
    Arc::clone(WRITER.get_or_init(|| Arc::new(FieldWriter::from_env())))
}

fn default_logger() -> &'static Logger {
    static LOGGER: OnceLock<Logger> = OnceLock::new();
    LOGGER.get_or_init(|| Logger::new(RequestScopedFields::default(), Fields::new()))
}

/// Entry point for emitting events.
///
/// A logger is bound at construction to the identifiers of one request,
/// a set of scope fields merged under every event, and a shared
/// [`Writer`]. It is immutable afterwards and cheap to share.
#[derive(Clone)]
pub struct Logger {
    rs_fields: RequestScopedFields,
    fields: Fields,
    sys_values: SystemValues,
    writer: Arc<dyn Writer>,
    on_fatal: FatalHandler,
}

impl Logger {
    /// Logger writing through the process-wide default writer.
    pub fn new(rs_fields: RequestScopedFields, fields: Fields) -> Self {
        Self::with_writer(rs_fields, default_writer(), fields)
    }

    /// Logger bound to a caller-supplied writer, e.g. stderr or a file.
    pub fn with_writer(rs_fields: RequestScopedFields, writer: Arc<dyn Writer>, fields: Fields) -> Self {
        Logger {
            rs_fields,
            fields,
            sys_values: SystemValues::new(),
            writer,
            on_fatal: abort_on_fatal,
        }
    }

    /// Logger for whatever request `scope` belongs to.
    pub fn from_scope(scope: &impl RequestScope, writer: Arc<dyn Writer>, fields: Fields) -> Self {
        Self::with_writer(scope.request_scoped_fields(), writer, fields)
    }

    /// Replace what happens after a fatal event was written.
    pub fn with_fatal_handler(mut self, handler: FatalHandler) -> Self {
        self.on_fatal = handler;
        self
    }

    pub fn request_scoped_fields(&self) -> &RequestScopedFields {
        &self.rs_fields
    }

    pub fn scope_fields(&self) -> &Fields {
        &self.fields
    }

    /// Detailed tracing that is normally switched off.
    #[track_caller]
    pub fn debug(&self, event: &str, fields: &[Fields]) -> String {
        self.write(&self.rs_fields, event, None, Severity::Debug, fields)
    }

    /// Normal operating behaviour.
    #[track_caller]
    pub fn info(&self, event: &str, fields: &[Fields]) -> String {
        self.write(&self.rs_fields, event, None, Severity::Info, fields)
    }

    /// Unusual but recoverable behaviour.
    #[track_caller]
    pub fn warn(&self, event: &str, fields: &[Fields]) -> String {
        self.write(&self.rs_fields, event, None, Severity::Warn, fields)
    }

    /// A failure, with an `exception` block describing `err`.
    #[track_caller]
    pub fn error(&self, event: &str, err: &(dyn Error + 'static), fields: &[Fields]) -> String {
        self.write(&self.rs_fields, event, Some(err), Severity::Error, fields)
    }

    /// Write a fatal event, then hand it to the fatal handler.
    ///
    /// The handler runs unconditionally once the write attempt is over;
    /// the default one aborts the process.
    #[track_caller]
    pub fn fatal(&self, event: &str, err: &(dyn Error + 'static), fields: &[Fields]) -> ! {
        let record = self.write(&self.rs_fields, event, Some(err), Severity::Fatal, fields);
        (self.on_fatal)(FatalLogged { record })
    }

    /// Events that feed the audit log. Never filtered by level.
    #[track_caller]
    pub fn audit(&self, event: &str, fields: &[Fields]) -> String {
        self.write(&self.rs_fields, event, None, Severity::Audit, fields)
    }

    /// Start a fluent event: `logger.event("name").fields(f).info("msg")`.
    pub fn event(&self, event: &str) -> Segment<'_> {
        Segment::new(self, event)
    }

    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.writer.is_enabled(severity)
    }

    #[track_caller]
    fn write(
        &self,
        rs_fields: &RequestScopedFields,
        event: &str,
        err: Option<&(dyn Error + 'static)>,
        severity: Severity,
        fields: &[Fields],
    ) -> String {
        let caller = Location::caller();
        let loc = system::location(caller.file(), caller.line());
        self.emit(rs_fields, event, err, severity, fields, loc)
    }

    /// Enrich and write one event whose call site is already known.
    pub(crate) fn emit(
        &self,
        rs_fields: &RequestScopedFields,
        event: &str,
        err: Option<&(dyn Error + 'static)>,
        severity: Severity,
        fields: &[Fields],
        loc: String,
    ) -> String {
        let event = to_snake_case(event);
        let properties = self.fields.merge(fields);

        let mut system = self
            .sys_values
            .system_values(rs_fields, &properties, &event, severity, loc);
        if let Some(err) = err {
            system = self.sys_values.error_values(err, system);
        }

        self.writer
            .write_fields(severity, system, std::slice::from_ref(&properties))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("rs_fields", &self.rs_fields)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Log through the default writer for the request described by `rs_fields`.
#[track_caller]
pub fn debug(rs_fields: &RequestScopedFields, event: &str, fields: &[Fields]) -> String {
    default_logger().write(rs_fields, event, None, Severity::Debug, fields)
}

#[track_caller]
pub fn info(rs_fields: &RequestScopedFields, event: &str, fields: &[Fields]) -> String {
    default_logger().write(rs_fields, event, None, Severity::Info, fields)
}

#[track_caller]
pub fn warn(rs_fields: &RequestScopedFields, event: &str, fields: &[Fields]) -> String {
    default_logger().write(rs_fields, event, None, Severity::Warn, fields)
}

#[track_caller]
pub fn error(rs_fields: &RequestScopedFields, event: &str, err: &(dyn Error + 'static), fields: &[Fields]) -> String {
    default_logger().write(rs_fields, event, Some(err), Severity::Error, fields)
}

/// Write a fatal event through the default writer, then abort.
#[track_caller]
pub fn fatal(rs_fields: &RequestScopedFields, event: &str, err: &(dyn Error + 'static), fields: &[Fields]) -> ! {
    let logger = default_logger();
    let record = logger.write(rs_fields, event, Some(err), Severity::Fatal, fields);
    (logger.on_fatal)(FatalLogged { record })
}

#[track_caller]
pub fn audit(rs_fields: &RequestScopedFields, event: &str, fields: &[Fields]) -> String {
    default_logger().write(rs_fields, event, None, Severity::Audit, fields)
}
