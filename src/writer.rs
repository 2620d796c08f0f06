use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::env;
use crate::fields::{Fields, DIAGNOSTICS_TARGET};
use crate::level::{self, Severity};
use crate::sink::{render_record, Writer};

/// Options for a [`FieldWriter`].
///
/// **Fields**
/// - `output`: where lines go; standard output by default.
/// - `omit_empty`: drop empty string values from records.
/// - `use_colours`: colour each line by severity. Console decoration
///   only; the JSON is unchanged.
/// - `level`: minimum severity name; unknown names mean `DEBUG`.
///
/// [`Default`] reads `LOG_OMITEMPTY`, `LOG_COLOURS` and `LOG_LEVEL`.
pub struct WriterConfig {
    pub output: Box<dyn Write + Send>,
    pub omit_empty: bool,
    pub use_colours: bool,
    pub level: String,
}

impl WriterConfig {
    pub fn from_env() -> Self {
        WriterConfig {
            output: Box::new(io::stdout()),
            omit_empty: env::get_bool(env::LOG_OMIT_EMPTY_ENV, false),
            use_colours: env::get_bool(env::LOG_COLOURS_ENV, false),
            level: env::get_string(env::LOG_LEVEL_ENV, level::DEBUG_SEV),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl fmt::Debug for WriterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterConfig")
            .field("omit_empty", &self.omit_empty)
            .field("use_colours", &self.use_colours)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Synchronous JSON line writer.
///
/// Merging, key normalization and serialization happen on the calling
/// thread without any lock; only the physical write is serialized, so
/// concurrent lines never interleave.
pub struct FieldWriter {
    output: Mutex<Box<dyn Write + Send>>,
    omit_empty: bool,
    use_colours: bool,
    level: Severity,
}

impl FieldWriter {
    pub fn new(config: WriterConfig) -> Self {
        FieldWriter {
            output: Mutex::new(config.output),
            omit_empty: config.omit_empty,
            use_colours: config.use_colours,
            level: Severity::from_name(&config.level),
        }
    }

    /// Writer configured entirely from the environment.
    pub fn from_env() -> Self {
        Self::new(WriterConfig::from_env())
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    fn write(&self, severity: Severity, json: &str) {
        let line = add_new_line_if_missing(json);
        let line = if self.use_colours {
            Cow::Owned(colourise(severity, &line))
        } else {
            line
        };

        let result = {
            let mut output = self.output.lock();
            output.write_all(line.as_bytes()).and_then(|_| output.flush())
        };

        if let Err(err) = result {
            tracing::warn!(target: DIAGNOSTICS_TARGET, error = %err, "failed to write log line");
        }
    }
}

impl Writer for FieldWriter {
    fn write_fields(&self, severity: Severity, system: Fields, properties: &[Fields]) -> String {
        let json = render_record(system, properties, self.omit_empty);

        if self.is_enabled(severity) {
            self.write(severity, &json);
        }
        json
    }

    fn is_enabled(&self, severity: Severity) -> bool {
        level::should_log_level(self.level.rank(), severity.rank())
    }
}

impl fmt::Debug for FieldWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldWriter")
            .field("omit_empty", &self.omit_empty)
            .field("use_colours", &self.use_colours)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

fn add_new_line_if_missing(line: &str) -> Cow<'_, str> {
    if line.ends_with('\n') {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(format!("{line}\n"))
    }
}

/// Style a line by severity and follow it with a blank line, which keeps
/// records apart when read by a human. Slower than plain output.
#[cfg(feature = "console")]
fn colourise(severity: Severity, line: &str) -> String {
    use console::style;

    let line = line.trim_end();
    let styled = match severity {
        Severity::Debug => style(line).dim(),
        Severity::Info => style(line).green(),
        Severity::Warn => style(line).yellow(),
        Severity::Error => style(line).red(),
        Severity::Fatal => style(line).red().bold(),
        Severity::Audit => style(line).magenta(),
    };
    format!("{}\n\n", styled.force_styling(true))
}

#[cfg(not(feature = "console"))]
fn colourise(_severity: Severity, line: &str) -> String {
    line.to_string()
}

/// In-memory output shared between clones. Handy for tests and for
/// callers that need to inspect what a writer emitted.
#[derive(Clone, Debug, Default)]
pub struct MemoryOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
