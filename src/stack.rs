//! Stack trace extraction for error events and call-site resolution.
//!
//! An error's trace is taken from the first capability found on its
//! `source()` chain: an embedded [`TracedError`] backtrace, then any
//! registered [`StackTracer`] type. Failing both, the current stack is
//! captured instead.

use std::any::TypeId;
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::keys;

/// Symbol prefix of this crate's own frames.
const CRATE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");

/// One resolved frame of a stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}\n\t{}:{}", self.function, file, line),
            (Some(file), None) => write!(f, "{}\n\t{}", self.function, file),
            _ => f.write_str(&self.function),
        }
    }
}

/// Errors that can report the stack they were created on.
///
/// Implementors become visible to the logger after
/// [`register_stack_tracer`] is called for their type.
pub trait StackTracer {
    fn stack_trace(&self) -> Vec<StackFrame>;
}

type Probe = fn(&(dyn Error + 'static)) -> Option<Vec<StackFrame>>;

fn probe<T: Error + StackTracer + 'static>(err: &(dyn Error + 'static)) -> Option<Vec<StackFrame>> {
    err.downcast_ref::<T>().map(StackTracer::stack_trace)
}

fn tracers() -> &'static RwLock<Vec<(TypeId, Probe)>> {
    static TRACERS: OnceLock<RwLock<Vec<(TypeId, Probe)>>> = OnceLock::new();
    TRACERS.get_or_init(|| RwLock::new(Vec::new()))
}

/// Make errors of type `T` report their own stack trace when logged.
pub fn register_stack_tracer<T: Error + StackTracer + 'static>() {
    let id = TypeId::of::<T>();
    let mut tracers = tracers().write();
    if !tracers.iter().any(|(known, _)| *known == id) {
        tracers.push((id, probe::<T>));
    }
}

/// Error carrying the backtrace captured where it was created.
#[derive(Debug)]
pub struct TracedError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl TracedError {
    pub fn new(message: impl Into<String>) -> Self {
        TracedError {
            message: message.into(),
            source: None,
            backtrace: Backtrace::force_capture(),
        }
    }

    pub fn wrap<E: Error + Send + Sync + 'static>(err: E) -> Self {
        TracedError {
            message: err.to_string(),
            source: Some(Box::new(err)),
            backtrace: Backtrace::force_capture(),
        }
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn stack(&self) -> String {
        self.backtrace.to_string()
    }
}

impl fmt::Display for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for TracedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

/// Stack trace for `err`. Never fails: without a capability on the chain
/// the caller's current stack is used.
pub fn error_stack_trace(err: &(dyn Error + 'static)) -> String {
    let chain = || std::iter::successors(Some(err), |&e| e.source());

    if let Some(traced) = chain().find_map(|e| e.downcast_ref::<TracedError>()) {
        return traced.stack();
    }

    // Tracers may log themselves, so they run without the registry lock.
    let probes: Vec<Probe> = tracers().read().iter().map(|(_, probe)| *probe).collect();
    for link in chain() {
        for probe in &probes {
            if let Some(frames) = probe(link) {
                return render_frames(&frames);
            }
        }
    }

    current_stack()
}

/// Capture the current stack without the capture machinery and this
/// crate's own frames.
pub fn current_stack() -> String {
    let frames = parse_frames(&Backtrace::force_capture().to_string());
    let external = frames.iter().position(|f| !is_internal(&f.function));

    match external {
        Some(start) => render_frames(&frames[start..]),
        None => render_frames(&frames),
    }
}

fn is_internal(function: &str) -> bool {
    function.starts_with("std::backtrace")
        || function.starts_with("<std::backtrace")
        || (function.starts_with(CRATE_PREFIX) && !function.contains("::tests::"))
}

pub fn render_frames(frames: &[StackFrame]) -> String {
    let mut out = String::new();
    for frame in frames {
        out.push_str(&frame.to_string());
        out.push('\n');
    }
    out
}

/// Parse the textual form of a [`Backtrace`].
pub fn parse_frames(rendered: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for line in rendered.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, line_no) = split_location(location);
                frame.file = Some(file.to_string());
                frame.line = line_no;
            }
            continue;
        }

        let symbol = match line.split_once(": ") {
            Some((index, symbol)) if index.chars().all(|c| c.is_ascii_digit()) => symbol,
            _ => line,
        };
        frames.push(StackFrame {
            function: strip_hash(symbol).to_string(),
            file: None,
            line: None,
        });
    }

    frames
}

/// `path:line:column` into path and line.
fn split_location(location: &str) -> (&str, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let column = parts.next();
    let line = parts.next();
    match (parts.next(), line, column) {
        (Some(path), Some(line), Some(_)) => (path, line.parse().ok()),
        _ => (location, None),
    }
}

fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => head,
        _ => symbol,
    }
}

type CallSites = RwLock<HashMap<(&'static str, u32), Arc<str>>>;

fn call_sites() -> &'static CallSites {
    static SITES: OnceLock<CallSites> = OnceLock::new();
    SITES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Name of the function containing `file:line`, resolved from a captured
/// backtrace the first time a call site is seen and cached afterwards.
pub fn function_at(file: &'static str, line: u32) -> Arc<str> {
    if let Some(name) = call_sites().read().get(&(file, line)) {
        return Arc::clone(name);
    }

    let frames = parse_frames(&Backtrace::force_capture().to_string());
    let name: Arc<str> = frames
        .into_iter()
        .find(|f| f.line == Some(line) && f.file.as_deref().is_some_and(|p| p.ends_with(file)))
        .map(|f| Arc::from(f.function))
        .unwrap_or_else(|| Arc::from(keys::UNKNOWN));

    call_sites()
        .write()
        .entry((file, line))
        .or_insert(name)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:312:13
   1: service_event_log::stack::current_stack::h0123456789abcdef
             at ./src/stack.rs:140:30
   2: my_service::handlers::create_user
             at ./src/handlers.rs:42:9
      my_service::handlers::inlined_helper
             at ./src/handlers.rs:80:5
   3: main
";

    #[derive(Debug)]
    struct FramedError;

    impl fmt::Display for FramedError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("framed")
        }
    }

    impl Error for FramedError {}

    impl StackTracer for FramedError {
        fn stack_trace(&self) -> Vec<StackFrame> {
            vec![StackFrame {
                function: "billing::charge".into(),
                file: Some("src/billing.rs".into()),
                line: Some(7),
            }]
        }
    }

    #[derive(Debug)]
    struct Outer(FramedError);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("outer")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn parses_backtrace_text() {
        let frames = parse_frames(SAMPLE);

        assert_eq!(frames.len(), 5);
        assert_eq!(frames[1].function, "service_event_log::stack::current_stack");
        assert_eq!(frames[2].file.as_deref(), Some("./src/handlers.rs"));
        assert_eq!(frames[2].line, Some(42));
        assert_eq!(frames[3].function, "my_service::handlers::inlined_helper");
        assert_eq!(frames[4].function, "main");
        assert_eq!(frames[4].file, None);
    }

    #[test]
    fn internal_frames_are_recognized() {
        assert!(is_internal("std::backtrace::Backtrace::force_capture"));
        assert!(is_internal("service_event_log::stack::current_stack"));
        assert!(!is_internal("service_event_log::stack::tests::fallback"));
        assert!(!is_internal("my_service::handlers::create_user"));
    }

    #[test]
    fn traced_error_uses_embedded_backtrace() {
        let err = TracedError::new("boom");
        assert_eq!(error_stack_trace(&err), err.stack());

        let wrapped = Outer(FramedError);
        let traced = TracedError::wrap(wrapped);
        assert_eq!(error_stack_trace(&traced), traced.stack());
    }

    #[test]
    fn registered_tracer_is_found_on_source_chain() {
        register_stack_tracer::<FramedError>();
        register_stack_tracer::<FramedError>();

        let trace = error_stack_trace(&Outer(FramedError));
        assert_eq!(trace, "billing::charge\n\tsrc/billing.rs:7\n");
        assert_eq!(tracers().read().iter().filter(|(id, _)| *id == TypeId::of::<FramedError>()).count(), 1);
    }

    #[derive(Debug)]
    struct ReentrantError;

    impl fmt::Display for ReentrantError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("reentrant")
        }
    }

    impl Error for ReentrantError {}

    impl StackTracer for ReentrantError {
        fn stack_trace(&self) -> Vec<StackFrame> {
            // Takes the registry write lock while the trace is being built.
            register_stack_tracer::<FramedError>();
            let _ = error_stack_trace(&Outer(FramedError));
            vec![StackFrame {
                function: "reentrant::trace".into(),
                file: None,
                line: None,
            }]
        }
    }

    #[test]
    fn tracers_run_without_the_registry_lock() {
        register_stack_tracer::<ReentrantError>();

        let trace = error_stack_trace(&ReentrantError);
        assert_eq!(trace, "reentrant::trace\n");
    }

    #[test]
    fn plain_errors_fall_back_to_current_stack() {
        let err = std::io::Error::other("disk");
        let trace = error_stack_trace(&err);
        assert!(!trace.is_empty());
        assert!(!trace.starts_with("std::backtrace"));
    }
}
