//! Process-wide encoder metrics.
//!
//! Metric names come from [`tags`] and follow `pzip.<subsystem>.<metric>`.
//! The registry keeps one bucket per [`Subsystem`], so a caller can look at
//! or clear the planner, codec, writer and so on independently. With the
//! `telemetry` feature disabled every emitter compiles to nothing and
//! snapshots are empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod profile;
pub mod tags;
pub mod worker;

/// The parts of the encoder that emit metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subsystem {
    Mmap,
    Planner,
    Codec,
    Writer,
    Buffer,
    Worker,
    Pipeline,
}

impl Subsystem {
    pub const ALL: [Subsystem; 7] = [
        Subsystem::Mmap,
        Subsystem::Planner,
        Subsystem::Codec,
        Subsystem::Writer,
        Subsystem::Buffer,
        Subsystem::Worker,
        Subsystem::Pipeline,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Subsystem::Mmap => "mmap",
            Subsystem::Planner => "planner",
            Subsystem::Codec => "codec",
            Subsystem::Writer => "writer",
            Subsystem::Buffer => "buffer",
            Subsystem::Worker => "worker",
            Subsystem::Pipeline => "pipeline",
        }
    }

    /// Resolves the subsystem segment of a `pzip.<subsystem>.…` metric name.
    pub fn of_metric(name: &str) -> Option<Subsystem> {
        let segment = name.strip_prefix("pzip.")?.split('.').next()?;
        Subsystem::ALL
            .into_iter()
            .find(|subsystem| subsystem.as_str() == segment)
    }

    #[cfg_attr(not(feature = "telemetry"), allow(dead_code))]
    fn slot(self) -> usize {
        self as usize
    }
}

/// Summary of the samples recorded under one histogram name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub total: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
}

/// Point-in-time copy of recorded metrics, keyed by full metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, u64>,
    pub histograms: BTreeMap<String, HistogramSnapshot>,
}

impl TelemetrySnapshot {
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    pub fn gauge(&self, name: &str) -> Option<u64> {
        self.gauges.get(name).copied()
    }

    pub fn histogram(&self, name: &str) -> Option<HistogramSnapshot> {
        self.histograms.get(name).copied()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.gauges.is_empty() && self.histograms.is_empty()
    }

    /// Counter growth since `earlier`, omitting counters that did not move.
    ///
    /// Used to attribute process-wide counters to one file's encode.
    pub fn counters_since(&self, earlier: &TelemetrySnapshot) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .filter_map(|(name, &value)| {
                let delta = value.saturating_sub(earlier.counter(name).unwrap_or(0));
                (delta > 0).then(|| (name.clone(), delta))
            })
            .collect()
    }
}

/// Adds `value` to a counter.
#[inline]
pub fn increment_counter(name: &'static str, value: u64) {
    update(name, |bucket| {
        let counter = bucket.counters.entry(name).or_default();
        *counter = counter.saturating_add(value);
    });
}

/// Adds one sample to a histogram.
#[inline]
pub fn record_histogram(name: &'static str, value: u64) {
    update(name, |bucket| bucket.histograms.entry(name).or_default().push(value));
}

/// Sets a gauge to an absolute value.
#[inline]
pub fn set_gauge(name: &'static str, value: u64) {
    update(name, |bucket| {
        bucket.gauges.insert(name, value);
    });
}

/// Raises a gauge by `delta`.
#[inline]
pub fn add_gauge(name: &'static str, delta: u64) {
    update(name, |bucket| {
        let gauge = bucket.gauges.entry(name).or_default();
        *gauge = gauge.saturating_add(delta);
    });
}

/// Lowers a gauge by `delta`, stopping at zero.
#[inline]
pub fn sub_gauge_saturating(name: &'static str, delta: u64) {
    update(name, |bucket| {
        let gauge = bucket.gauges.entry(name).or_default();
        *gauge = gauge.saturating_sub(delta);
    });
}

/// Copies every subsystem's metrics.
pub fn snapshot() -> TelemetrySnapshot {
    let mut snapshot = TelemetrySnapshot::default();
    for subsystem in Subsystem::ALL {
        read(subsystem, |bucket| bucket.copy_into(&mut snapshot));
    }
    snapshot
}

/// Copies the metrics of one subsystem.
pub fn snapshot_subsystem(subsystem: Subsystem) -> TelemetrySnapshot {
    let mut snapshot = TelemetrySnapshot::default();
    read(subsystem, |bucket| bucket.copy_into(&mut snapshot));
    snapshot
}

/// Clears every subsystem.
pub fn reset() {
    for subsystem in Subsystem::ALL {
        reset_subsystem(subsystem);
    }
}

/// Clears the metrics of one subsystem.
pub fn reset_subsystem(subsystem: Subsystem) {
    #[cfg(feature = "telemetry")]
    {
        *registry::bucket(subsystem) = Bucket::default();
    }

    let _ = subsystem;
}

#[derive(Debug, Clone, Copy)]
struct Histogram {
    count: u64,
    total: u64,
    min: u64,
    max: u64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            count: 0,
            total: 0,
            min: u64::MAX,
            max: 0,
        }
    }
}

impl Histogram {
    fn push(&mut self, value: u64) {
        self.count = self.count.saturating_add(1);
        self.total = self.total.saturating_add(value);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn summary(&self) -> HistogramSnapshot {
        if self.count == 0 {
            return HistogramSnapshot::default();
        }
        HistogramSnapshot {
            count: self.count,
            total: self.total,
            min: self.min,
            max: self.max,
            mean: self.total as f64 / self.count as f64,
        }
    }
}

/// Metrics of one subsystem.
#[derive(Debug, Default)]
#[cfg_attr(not(feature = "telemetry"), allow(dead_code))]
struct Bucket {
    counters: BTreeMap<&'static str, u64>,
    gauges: BTreeMap<&'static str, u64>,
    histograms: BTreeMap<&'static str, Histogram>,
}

#[cfg_attr(not(feature = "telemetry"), allow(dead_code))]
impl Bucket {
    fn copy_into(&self, snapshot: &mut TelemetrySnapshot) {
        for (&name, &value) in &self.counters {
            snapshot.counters.insert(name.to_owned(), value);
        }
        for (&name, &value) in &self.gauges {
            snapshot.gauges.insert(name.to_owned(), value);
        }
        for (&name, histogram) in &self.histograms {
            snapshot.histograms.insert(name.to_owned(), histogram.summary());
        }
    }
}

#[cfg(feature = "telemetry")]
fn update(name: &'static str, apply: impl FnOnce(&mut Bucket)) {
    // Names outside the `pzip.<subsystem>.` scheme are not recorded.
    if let Some(subsystem) = Subsystem::of_metric(name) {
        apply(&mut registry::bucket(subsystem));
    }
}

#[cfg(not(feature = "telemetry"))]
fn update(_name: &'static str, _apply: impl FnOnce(&mut Bucket)) {}

#[cfg(feature = "telemetry")]
fn read(subsystem: Subsystem, visit: impl FnOnce(&Bucket)) {
    visit(&registry::bucket(subsystem));
}

#[cfg(not(feature = "telemetry"))]
fn read(_subsystem: Subsystem, _visit: impl FnOnce(&Bucket)) {}

#[cfg(feature = "telemetry")]
mod registry {
    use std::sync::{Mutex, MutexGuard, OnceLock};

    use super::{Bucket, Subsystem};

    type Buckets = [Mutex<Bucket>; Subsystem::ALL.len()];

    /// Locks one subsystem's bucket; a poisoned lock still yields its data.
    pub(super) fn bucket(subsystem: Subsystem) -> MutexGuard<'static, Bucket> {
        static BUCKETS: OnceLock<Buckets> = OnceLock::new();
        let buckets = BUCKETS.get_or_init(|| std::array::from_fn(|_| Mutex::default()));
        buckets[subsystem.slot()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
