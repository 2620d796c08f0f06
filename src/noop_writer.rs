use crate::fields::Fields;
use crate::level::Severity;
use crate::sink::{render_record, Writer};

/// A writer that serializes records but never outputs them.
///
/// Useful for measuring the overhead of enrichment and serialization
/// without any I/O, and for code that only needs the returned line.
#[derive(Clone, Debug, Default)]
pub struct NoopWriter {
    pub omit_empty: bool,
}

impl Writer for NoopWriter {
    fn write_fields(&self, _severity: Severity, system: Fields, properties: &[Fields]) -> String {
        render_record(system, properties, self.omit_empty)
    }

    fn is_enabled(&self, _severity: Severity) -> bool {
        false
    }
}
