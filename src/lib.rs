//! Structured event logging for services.
//!
//! Callers emit named events with key/value [`Fields`]; each event is
//! enriched with request-scoped identifiers, deployment environment, host
//! and call site (plus an `exception` block for failures), serialized to a
//! single JSON line and written if its [`Severity`] passes the writer's
//! threshold.
//!
//! ```no_run
//! use service_event_log::{fields, Logger, RequestScopedFields};
//!
//! let rs = RequestScopedFields { trace_id: "1-2-3".into(), ..Default::default() };
//! let logger = Logger::new(rs, fields! { "component" => "billing" });
//!
//! logger.info("invoice_sent", &[fields! { "invoice_id" => 42 }]);
//! logger.event("invoice_paid").fields(fields! { "amount" => 9.5 }).audit("paid in full");
//! ```

pub mod context;
pub mod env;
pub mod error;
pub mod fields;
pub mod gc;
pub mod keys;
pub mod level;
pub mod logger;
pub mod segment;
pub mod sink;
pub mod stack;
pub mod system;
pub mod writer;

pub mod init;
pub mod layer;
pub mod noop_writer;

pub use context::{RequestScope, RequestScopedFields};
pub use error::{FatalHandler, FatalLogged, InitError, SeverityParseError, ValidationError};
pub use fields::{Fields, Value};
pub use level::Severity;
pub use logger::{audit, debug, error, fatal, info, warn, Logger};
pub use segment::Segment;
pub use sink::Writer;
pub use stack::{register_stack_tracer, StackFrame, StackTracer, TracedError};
pub use writer::{FieldWriter, MemoryOutput, WriterConfig};
