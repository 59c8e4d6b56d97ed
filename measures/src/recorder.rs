use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use metrics::{
    Counter, CounterFn, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use tracing::{debug, error};

use crate::{Dimensions, Error, Reporter};

type SharedReporter = Arc<Mutex<Reporter>>;

/// A recorder that reports every metric update as a measure.
///
/// Counter updates are sent as counts, and histogram samples are sent as times, with the sample interpreted as a number
/// of seconds. Metric labels become string dimensions. Gauges have no representation in measures and are discarded.
///
/// Counts are deltas. Setting a counter to an absolute value only sends the increase over the highest value the counter
/// has reached so far, whether through increments or earlier absolute values. Lower values send nothing.
///
/// No aggregation happens: each update results in exactly one payload, sent on the calling thread. Updates are
/// serialized through a lock around the underlying [`Reporter`].
pub struct MeasuresRecorder {
    reporter: SharedReporter,
    measures: Mutex<HashMap<Key, Arc<Measure>>>,
}

impl MeasuresRecorder {
    /// Creates a new `MeasuresRecorder` that reports through `reporter`.
    pub fn new(reporter: Reporter) -> Self {
        MeasuresRecorder { reporter: Arc::new(Mutex::new(reporter)), measures: Mutex::new(HashMap::new()) }
    }

    /// Disconnects the underlying reporter's client.
    ///
    /// See [`Reporter::clean_up`].
    pub fn clean_up(&self) {
        self.reporter.lock().unwrap_or_else(PoisonError::into_inner).clean_up();
    }

    // Handles for the same key share one measure, so absolute values are compared against the same total no matter
    // how many times the key is registered.
    fn measure(&self, key: &Key) -> Arc<Measure> {
        let mut measures = self.measures.lock().unwrap_or_else(PoisonError::into_inner);
        let measure = measures.entry(key.clone()).or_insert_with(|| {
            Arc::new(Measure {
                reporter: Arc::clone(&self.reporter),
                metric: key.name().to_owned(),
                dimensions: key.labels().map(|label| (label.key(), label.value())).collect(),
                total: AtomicU64::new(0),
            })
        });
        Arc::clone(measure)
    }
}

impl Recorder for MeasuresRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.measure(key))
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.measure(key))
    }
}

struct Measure {
    reporter: SharedReporter,
    metric: String,
    dimensions: Dimensions,
    total: AtomicU64,
}

impl Measure {
    fn report<F>(&self, send: F)
    where
        F: FnOnce(&mut Reporter, &str, &Dimensions) -> Result<(), Error>,
    {
        let mut reporter = self.reporter.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = send(&mut reporter, &self.metric, &self.dimensions) {
            error!(metric = %self.metric, error = %e, "Failed to report measure.");
        }
    }

    fn report_count(&self, value: u64) {
        let count = i64::try_from(value).unwrap_or(i64::MAX);
        self.report(|reporter, metric, dimensions| reporter.count(metric, count, dimensions));
    }
}

impl CounterFn for Measure {
    fn increment(&self, value: u64) {
        self.total.fetch_add(value, Ordering::Relaxed);
        self.report_count(value);
    }

    fn absolute(&self, value: u64) {
        let previous = self.total.fetch_max(value, Ordering::Relaxed);
        if value > previous {
            self.report_count(value - previous);
        } else {
            debug!(metric = %self.metric, value, total = previous, "Ignoring absolute value not above counter total.");
        }
    }
}

impl HistogramFn for Measure {
    fn record(&self, value: f64) {
        match Duration::try_from_secs_f64(value) {
            Ok(elapsed) => self.report(|reporter, metric, dimensions| {
                reporter.record_time(metric, elapsed, dimensions)
            }),
            Err(e) => error!(metric = %self.metric, value, error = %e, "Dropping invalid time sample."),
        }
    }
}
