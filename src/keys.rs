//! Well-known keys of an emitted record.

pub const TIME: &str = "time";
pub const EVENT: &str = "event";
pub const RESOURCE: &str = "resource";
pub const OS: &str = "os";
pub const SEVERITY: &str = "severity";
pub const LOC: &str = "loc";

pub const TRACE_ID: &str = "trace_id";
pub const REQUEST_ID: &str = "request_id";
pub const CORRELATION_ID: &str = "correlation_id";
pub const CUSTOMER: &str = "customer";
pub const USER: &str = "user";

pub const PRODUCT: &str = "product";
pub const APP: &str = "app";
pub const APP_VERSION: &str = "app_version";
pub const FARM: &str = "farm";
pub const AWS_REGION: &str = "aws_region";
pub const AWS_ACCOUNT_ID: &str = "aws_account_id";

pub const EXCEPTION: &str = "exception";
pub const PROPERTIES: &str = "properties";
pub const MESSAGE: &str = "message";

pub const TIME_TAKEN: &str = "time_taken";
pub const TIME_TAKEN_MS: &str = "time_taken_ms";

/// Placeholder used when a value (host name, call site) cannot be resolved.
pub const UNKNOWN: &str = "<unknown>";
