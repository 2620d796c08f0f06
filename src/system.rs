//! Values derived from the running system rather than the caller.
//!
//! Every event gets a timestamp, host, OS, severity and call site, the
//! request-scoped identifiers and the deployment environment. Error events
//! additionally get an `exception` block. Caller-supplied values always
//! win over anything computed here.

use std::collections::btree_map::Entry;
use std::error::Error;
use std::sync::OnceLock;

use chrono::Utc;

use crate::context::RequestScopedFields;
use crate::env;
use crate::fields::{Fields, Value};
use crate::gc;
use crate::keys;
use crate::level::Severity;
use crate::stack;

/// UTC, millisecond precision, e.g. `2024-03-01T09:30:00.123Z`.
pub const RFC3339_MILLI: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Enrichment of events with system, request and environment values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemValues;

impl SystemValues {
    pub fn new() -> Self {
        SystemValues
    }

    /// Baseline fields for an event logged at `loc`.
    ///
    /// Mandatory and environment fields found in `properties` are lifted
    /// to the top level; otherwise they come from `rs_fields` and the
    /// process environment.
    pub fn system_values(
        &self,
        rs_fields: &RequestScopedFields,
        properties: &Fields,
        event: &str,
        severity: Severity,
        loc: String,
    ) -> Fields {
        let fields = crate::fields! {
            keys::TIME => time_now(),
            keys::EVENT => event,
            keys::RESOURCE => host_name(),
            keys::OS => target_os(),
            keys::SEVERITY => severity.as_str(),
            keys::LOC => loc,
        };
        let fields = self.mandatory_fields(rs_fields, fields, properties);
        self.env_fields(fields, properties)
    }

    /// Add the `exception` block for `err`.
    pub fn error_values(&self, err: &(dyn Error + 'static), mut fields: Fields) -> Fields {
        let message = err.to_string();
        let exception = crate::fields! {
            "error" => message.trim(),
            "trace" => stack::error_stack_trace(err),
            "gc_stats" => gc::read_gc_stats().to_fields(),
        };

        fields.insert(keys::EXCEPTION, exception);
        fields
    }

    pub fn mandatory_fields(&self, rs_fields: &RequestScopedFields, mut fields: Fields, properties: &Fields) -> Fields {
        let mandatory = [
            (keys::TRACE_ID, &rs_fields.trace_id),
            (keys::REQUEST_ID, &rs_fields.request_id),
            (keys::CORRELATION_ID, &rs_fields.correlation_id),
            (keys::CUSTOMER, &rs_fields.customer_aggregate_id),
            (keys::USER, &rs_fields.user_aggregate_id),
        ];

        for (key, ambient) in mandatory {
            add_field_if_missing(&mut fields, properties, key, || Value::from(ambient));
        }
        fields
    }

    pub fn env_fields(&self, mut fields: Fields, properties: &Fields) -> Fields {
        let from_env = [
            (keys::PRODUCT, env::PRODUCT_ENV),
            (keys::APP, env::APP_NAME_ENV),
            (keys::APP_VERSION, env::APP_VERSION_ENV),
            (keys::AWS_REGION, env::AWS_REGION_ENV),
            (keys::AWS_ACCOUNT_ID, env::AWS_ACCOUNT_ID_ENV),
        ];

        for (key, var) in from_env {
            add_field_if_missing(&mut fields, properties, key, || Value::from(env::env_or(var, "")));
        }
        add_field_if_missing(&mut fields, properties, keys::FARM, || {
            let legacy = env::env_or(env::APP_FARM_LEGACY_ENV, "");
            Value::from(env::get_string(env::APP_FARM_ENV, &legacy))
        });
        fields
    }
}

/// Already present > supplied in `properties` > `fallback`.
fn add_field_if_missing(fields: &mut Fields, properties: &Fields, key: &str, fallback: impl FnOnce() -> Value) {
    if let Entry::Vacant(slot) = fields.entry(key) {
        let value = match properties.get(key) {
            Some(supplied) => supplied.clone(),
            None => fallback(),
        };
        slot.insert(value);
    }
}

pub fn time_now() -> String {
    Utc::now().format(RFC3339_MILLI).to_string()
}

/// Host name, resolved once per process.
pub fn host_name() -> &'static str {
    static HOST: OnceLock<String> = OnceLock::new();
    HOST.get_or_init(|| match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(_) => keys::UNKNOWN.to_string(),
    })
}

pub fn target_os() -> &'static str {
    std::env::consts::OS
}

/// `file:line:function` of a logging call site.
pub fn location(file: &'static str, line: u32) -> String {
    let function = stack::function_at(file, line);
    format!("{file}:{line}:{function}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn rs_fields() -> RequestScopedFields {
        RequestScopedFields::new("1-2-3", "7-8-9", "1-5-9", "hooli", "UserAggregateID-123")
    }

    #[test]
    fn host_name_is_resolved_once() {
        let first = host_name();
        assert!(!first.is_empty());
        assert!(std::ptr::eq(first, host_name()));
    }

    #[test]
    fn time_has_millisecond_precision() {
        let now = time_now();
        assert_eq!(now.len(), "2024-03-01T09:30:00.123Z".len());
        assert!(now.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }

    #[test]
    #[serial]
    fn default_fields_are_all_present() {
        let fields = SystemValues::new().system_values(
            &rs_fields(),
            &Fields::new(),
            "event_name",
            Severity::Debug,
            location(file!(), line!()),
        );

        for key in [
            keys::TIME,
            keys::EVENT,
            keys::RESOURCE,
            keys::OS,
            keys::SEVERITY,
            keys::LOC,
            keys::TRACE_ID,
            keys::REQUEST_ID,
            keys::CORRELATION_ID,
            keys::CUSTOMER,
            keys::USER,
            keys::PRODUCT,
            keys::APP,
            keys::APP_VERSION,
            keys::FARM,
            keys::AWS_REGION,
            keys::AWS_ACCOUNT_ID,
        ] {
            assert!(fields.contains_key(key), "missing {key}");
        }
        assert_eq!(fields.get(keys::TRACE_ID), Some(&Value::from("1-2-3")));
        assert!(!fields.contains_key(keys::EXCEPTION));
    }

    #[test]
    fn location_names_the_calling_function() {
        let loc = location(file!(), line!());
        assert!(loc.starts_with(file!()), "{loc}");
        assert!(loc.contains("location_names_the_calling_function"), "{loc}");
    }

    #[test]
    fn explicit_properties_win_over_request_scope() {
        let properties = crate::fields! { keys::CUSTOMER => "acme", keys::REQUEST_ID => 123 };
        let fields = SystemValues::new().mandatory_fields(&rs_fields(), Fields::new(), &properties);

        assert_eq!(fields.get(keys::CUSTOMER), Some(&Value::from("acme")));
        assert_eq!(fields.get(keys::REQUEST_ID), Some(&Value::Int(123)));
        assert_eq!(fields.get(keys::USER), Some(&Value::from("UserAggregateID-123")));
    }

    #[test]
    fn present_fields_are_never_overwritten() {
        let existing = crate::fields! { keys::TRACE_ID => "already" };
        let properties = crate::fields! { keys::TRACE_ID => "property" };
        let fields = SystemValues::new().mandatory_fields(&rs_fields(), existing, &properties);

        assert_eq!(fields.get(keys::TRACE_ID), Some(&Value::from("already")));
    }

    #[test]
    #[serial]
    fn env_fields_follow_the_same_precedence() {
        std::env::set_var(env::PRODUCT_ENV, "engagement");
        std::env::set_var(env::APP_NAME_ENV, "murmur");
        std::env::remove_var(env::APP_FARM_ENV);
        std::env::set_var(env::APP_FARM_LEGACY_ENV, "dev");

        let properties = crate::fields! { keys::APP => "override" };
        let fields = SystemValues::new().env_fields(Fields::new(), &properties);

        assert_eq!(fields.get(keys::PRODUCT), Some(&Value::from("engagement")));
        assert_eq!(fields.get(keys::APP), Some(&Value::from("override")));
        assert_eq!(fields.get(keys::FARM), Some(&Value::from("dev")));

        std::env::set_var(env::APP_FARM_ENV, "production");
        let fields = SystemValues::new().env_fields(Fields::new(), &Fields::new());
        assert_eq!(fields.get(keys::FARM), Some(&Value::from("production")));

        for var in [env::PRODUCT_ENV, env::APP_NAME_ENV, env::APP_FARM_ENV, env::APP_FARM_LEGACY_ENV] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn error_values_build_exception_block() {
        let err = std::io::Error::other("  disk full \n");
        let fields = SystemValues::new().error_values(&err, Fields::new());

        let exception = fields
            .get(keys::EXCEPTION)
            .and_then(Value::as_fields)
            .expect("exception block");
        assert_eq!(exception.get("error"), Some(&Value::from("disk full")));
        assert!(exception.get("trace").and_then(Value::as_str).is_some_and(|t| !t.is_empty()));

        let gc_stats = exception.get("gc_stats").and_then(Value::as_fields).expect("gc stats");
        for key in ["last_gc", "num_gc", "pause_total", "pause_history", "pause_end", "page_quantiles"] {
            assert!(gc_stats.contains_key(key), "missing {key}");
        }
    }
}
