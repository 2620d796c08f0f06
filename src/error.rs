use std::fmt;

/// Reason a [`Fields`](crate::Fields) set would be rejected by New Relic's
/// custom attribute rules. Purely advisory; logging never checks it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("key '{key}' cannot have 'nil' value")]
    NilValue { key: String },

    #[error("key '{key}' too long, must be less than 255 characters")]
    TooLong { key: String },

    #[error("key '{key}' must be string, float or int data type, got {kind}")]
    UnsupportedType { key: String, kind: &'static str },
}

/// Error returned by the strict `FromStr` impl of [`Severity`](crate::Severity).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown severity '{0}'")]
pub struct SeverityParseError(pub String);

/// Error returned when installing a global `tracing` subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Outcome of a fatal event: the record has been written and the process
/// must not continue.
///
/// Handed to the logger's fatal handler instead of being thrown, so the
/// host decides how shutdown happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalLogged {
    /// The serialized record, exactly as returned by the writer.
    pub record: String,
}

impl fmt::Display for FatalLogged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.record)
    }
}

impl std::error::Error for FatalLogged {}

/// Handler invoked after a fatal record was written. Never returns.
pub type FatalHandler = fn(FatalLogged) -> !;

/// Default fatal handler: report the record on stderr and abort.
pub fn abort_on_fatal(fatal: FatalLogged) -> ! {
    eprintln!("fatal event logged, aborting: {}", fatal.record.trim_end());
    std::process::abort()
}
