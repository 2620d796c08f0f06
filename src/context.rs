use serde::{Deserialize, Serialize};

/// Identifiers of the logical request an event belongs to.
///
/// Attaching these to an in-flight request is the job of the service's
/// middleware; the logger only reads them. Missing identifiers are empty
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestScopedFields {
    pub trace_id: String,
    pub request_id: String,
    pub correlation_id: String,
    pub customer_aggregate_id: String,
    pub user_aggregate_id: String,
}

impl RequestScopedFields {
    pub fn new(
        trace_id: impl Into<String>,
        request_id: impl Into<String>,
        correlation_id: impl Into<String>,
        customer_aggregate_id: impl Into<String>,
        user_aggregate_id: impl Into<String>,
    ) -> Self {
        RequestScopedFields {
            trace_id: trace_id.into(),
            request_id: request_id.into(),
            correlation_id: correlation_id.into(),
            customer_aggregate_id: customer_aggregate_id.into(),
            user_aggregate_id: user_aggregate_id.into(),
        }
    }
}

/// Anything that can hand out the request-scoped identifiers of the
/// current request (a request extension, a task-local, a test fixture).
pub trait RequestScope {
    fn request_scoped_fields(&self) -> RequestScopedFields;
}

impl RequestScope for RequestScopedFields {
    fn request_scoped_fields(&self) -> RequestScopedFields {
        self.clone()
    }
}

impl<T: RequestScope> RequestScope for Option<T> {
    fn request_scoped_fields(&self) -> RequestScopedFields {
        self.as_ref()
            .map(RequestScope::request_scoped_fields)
            .unwrap_or_default()
    }
}
