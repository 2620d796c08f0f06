//! Collector statistics attached to error events.
//!
//! Rust programs have no tracing collector of their own, so the snapshot
//! comes from a process-wide [`GcStatsSource`]. Hosts embedding a managed
//! runtime (a script engine, a JVM bridge) install one that reports its
//! collector; everyone else gets an empty snapshot with the same keys.

use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::fields::{Fields, Value};

/// Snapshot of collector activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GcStats {
    /// Time of the most recent collection, if there was one.
    pub last_gc: Option<DateTime<Utc>>,
    pub num_gc: u64,
    pub pause_total: Duration,
    /// Recent pause durations, most recent first.
    pub pause_history: Vec<Duration>,
    /// End times of the pauses in `pause_history`.
    pub pause_end: Vec<DateTime<Utc>>,
    /// Pause duration quantiles, minimum first and maximum last.
    pub pause_quantiles: Vec<Duration>,
}

impl GcStats {
    pub fn to_fields(&self) -> Fields {
        crate::fields! {
            "last_gc" => self.last_gc,
            "num_gc" => self.num_gc,
            "pause_total" => self.pause_total,
            "pause_history" => Value::from(self.pause_history.clone()),
            "pause_end" => Value::from(self.pause_end.clone()),
            "page_quantiles" => Value::from(self.pause_quantiles.clone()),
        }
    }
}

/// Provider of [`GcStats`] snapshots.
pub trait GcStatsSource: Send + Sync {
    fn read(&self) -> GcStats;
}

impl<F> GcStatsSource for F
where
    F: Fn() -> GcStats + Send + Sync,
{
    fn read(&self) -> GcStats {
        self()
    }
}

/// Source used when nothing else is installed: no collections, ever.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCollector;

impl GcStatsSource for NoCollector {
    fn read(&self) -> GcStats {
        GcStats::default()
    }
}

static SOURCE: OnceLock<Box<dyn GcStatsSource>> = OnceLock::new();

/// Install the process-wide source. Only the first call takes effect;
/// returns `false` if a source was already installed.
pub fn set_gc_stats_source<S: GcStatsSource + 'static>(source: S) -> bool {
    SOURCE.set(Box::new(source)).is_ok()
}

/// Read a snapshot from the installed source.
pub fn read_gc_stats() -> GcStats {
    match SOURCE.get() {
        Some(source) => source.read(),
        None => NoCollector.read(),
    }
}
