#![allow(dead_code)]

use std::sync::Arc;

use service_event_log::{FieldWriter, Fields, Logger, MemoryOutput, RequestScopedFields, WriterConfig};

pub fn rs_fields() -> RequestScopedFields {
    RequestScopedFields::new("1-2-3", "7-8-9", "1-5-9", "hooli", "UserAggregateID-123")
}

pub fn memory_writer(level: &str, omit_empty: bool) -> (Arc<FieldWriter>, MemoryOutput) {
    let output = MemoryOutput::new();
    let writer = FieldWriter::new(WriterConfig {
        output: Box::new(output.clone()),
        omit_empty,
        use_colours: false,
        level: level.to_string(),
    });
    (Arc::new(writer), output)
}

pub fn memory_logger(fields: Fields) -> (Logger, MemoryOutput) {
    let (writer, output) = memory_writer("DEBUG", false);
    (Logger::with_writer(rs_fields(), writer, fields), output)
}

pub fn parse(line: &str) -> serde_json::Value {
    serde_json::from_str(line).unwrap_or_else(|e| panic!("invalid json line {line:?}: {e}"))
}

pub fn set_env() {
    std::env::set_var("PRODUCT", "engagement");
    std::env::set_var("APP", "murmur");
    std::env::set_var("FARM", "dev");
    std::env::set_var("APP_VERSION", "87.23.11");
    std::env::set_var("AWS_REGION", "us-west-02");
    std::env::set_var("AWS_ACCOUNT_ID", "aws-account-123");
}

pub fn clear_env() {
    for var in ["PRODUCT", "APP", "FARM", "APP_ENV", "APP_VERSION", "AWS_REGION", "AWS_ACCOUNT_ID"] {
        std::env::remove_var(var);
    }
}
