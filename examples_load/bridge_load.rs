use std::io;
use std::sync::Arc;
use std::time::Instant;

use tracing::error;

use service_event_log::init::{init_tracing_with_config, BridgeConfig};
use service_event_log::{FieldWriter, Fields, Logger, RequestScopedFields, WriterConfig};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let writer = FieldWriter::new(WriterConfig {
        output: Box::new(io::sink()),
        omit_empty: true,
        use_colours: false,
        level: "DEBUG".to_string(),
    });
    let logger = Logger::with_writer(RequestScopedFields::default(), Arc::new(writer), Fields::new());

    init_tracing_with_config(
        logger,
        BridgeConfig {
            enable_stderr_diagnostics: false,
        },
    )?;

    let tasks: u64 = 8;
    let per_task: u64 = 12_500;
    let start = Instant::now();

    let handles: Vec<_> = (0..tasks)
        .map(|task| {
            tokio::spawn(async move {
                for i in 0..per_task {
                    error!(task, iteration = i, "bridge load test error");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await?;
    }

    let n = tasks * per_task;
    let elapsed = start.elapsed();
    println!(
        "tracing bridge: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
