use std::sync::Arc;
use std::thread;
use std::time::Instant;

use service_event_log::noop_writer::NoopWriter;
use service_event_log::{fields, Fields, Logger, RequestScopedFields};

fn main() {
    let writer = Arc::new(NoopWriter::default());
    let threads: u64 = 8;
    let per_thread: u64 = 25_000;

    let start = Instant::now();
    thread::scope(|s| {
        for t in 0..threads {
            let rs = RequestScopedFields::new(format!("trace-{t}"), "", "", "hooli", "");
            let logger = Logger::with_writer(rs, writer.clone(), fields! { "worker" => t });
            s.spawn(move || {
                for i in 0..per_thread {
                    logger.info("load_test_event", &[fields! { "iteration" => i }, Fields::new()]);
                }
            });
        }
    });

    let n = threads * per_thread;
    let elapsed = start.elapsed();
    println!(
        "default writer: built {} records in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
