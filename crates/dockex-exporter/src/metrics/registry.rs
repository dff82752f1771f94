//! Metrics whose value outlives a single cycle: exporter counters, health
//! gauges and the inspect latency histogram.

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use dockex_common::time;

use crate::metrics::{
    sink::MetricSink,
    types::{MetricDescriptor, MetricSample, MetricValue},
};

type LabelValues = Vec<String>;

pub struct CounterMetric {
    descriptor: &'static MetricDescriptor,
    series: RwLock<BTreeMap<LabelValues, Arc<AtomicU64>>>,
}

impl CounterMetric {
    pub fn new(descriptor: &'static MetricDescriptor) -> Self {
        Self {
            descriptor,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn inc(&self, labels: &[&str], value: u64) {
        let series = self.get_or_create_series(labels);
        series.fetch_add(value, Ordering::Relaxed);
    }

    pub fn inc_one(&self, labels: &[&str]) {
        self.inc(labels, 1);
    }

    /// Makes the series visible at 0 before its first increment.
    pub fn touch(&self, labels: &[&str]) {
        self.inc(labels, 0);
    }

    pub fn get(&self, labels: &[&str]) -> u64 {
        let label_values = normalize_labels(self.descriptor, labels);
        self.series
            .read()
            .ok()
            .and_then(|guard| guard.get(&label_values).map(|value| value.load(Ordering::Relaxed)))
            .unwrap_or_default()
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        let series = match self.series.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };

        series
            .iter()
            .filter_map(|(label_values, value)| {
                sample(
                    self.descriptor,
                    MetricValue::Counter(value.load(Ordering::Relaxed) as f64),
                    label_values,
                )
            })
            .collect()
    }

    pub fn emit(&self, sink: &MetricSink) {
        self.samples().into_iter().for_each(|sample| sink.send(sample));
    }

    fn get_or_create_series(&self, labels: &[&str]) -> Arc<AtomicU64> {
        let label_values = normalize_labels(self.descriptor, labels);
        if let Ok(guard) = self.series.read()
            && let Some(existing) = guard.get(&label_values)
        {
            return existing.clone();
        }

        match self.series.write() {
            Ok(mut guard) => guard
                .entry(label_values)
                .or_insert_with(|| Arc::new(AtomicU64::new(0)))
                .clone(),
            Err(_) => Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Gauge holding an `f64` per series, stored as raw bits.
pub struct GaugeMetric {
    descriptor: &'static MetricDescriptor,
    series: RwLock<BTreeMap<LabelValues, Arc<AtomicU64>>>,
}

impl GaugeMetric {
    pub fn new(descriptor: &'static MetricDescriptor) -> Self {
        Self {
            descriptor,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn set(&self, labels: &[&str], value: f64) {
        let series = self.get_or_create_series(labels);
        series.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn set_to_current_time(&self, labels: &[&str]) {
        self.set(labels, time::unix_seconds(&time::now()));
    }

    pub fn get(&self, labels: &[&str]) -> Option<f64> {
        let label_values = normalize_labels(self.descriptor, labels);
        self.series.read().ok().and_then(|guard| {
            guard
                .get(&label_values)
                .map(|value| f64::from_bits(value.load(Ordering::Relaxed)))
        })
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        let series = match self.series.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };

        series
            .iter()
            .filter_map(|(label_values, value)| {
                sample(
                    self.descriptor,
                    MetricValue::Gauge(f64::from_bits(value.load(Ordering::Relaxed))),
                    label_values,
                )
            })
            .collect()
    }

    pub fn emit(&self, sink: &MetricSink) {
        self.samples().into_iter().for_each(|sample| sink.send(sample));
    }

    fn get_or_create_series(&self, labels: &[&str]) -> Arc<AtomicU64> {
        let label_values = normalize_labels(self.descriptor, labels);
        if let Ok(guard) = self.series.read()
            && let Some(existing) = guard.get(&label_values)
        {
            return existing.clone();
        }

        match self.series.write() {
            Ok(mut guard) => guard
                .entry(label_values)
                .or_insert_with(|| Arc::new(AtomicU64::new(0f64.to_bits())))
                .clone(),
            Err(_) => Arc::new(AtomicU64::new(0f64.to_bits())),
        }
    }
}

pub struct HistogramMetric {
    descriptor: &'static MetricDescriptor,
    buckets: Vec<f64>,
    series: RwLock<BTreeMap<LabelValues, Arc<HistogramSeries>>>,
}

struct HistogramSeries {
    bucket_counts: Vec<AtomicU64>,
    count: AtomicU64,
    sum: Mutex<f64>,
}

impl HistogramSeries {
    fn new(bucket_len: usize) -> Self {
        Self {
            bucket_counts: (0..bucket_len + 1).map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum: Mutex::new(0.0),
        }
    }
}

impl HistogramMetric {
    pub fn new(descriptor: &'static MetricDescriptor, buckets: &[f64]) -> Self {
        let mut sorted_buckets = buckets.to_vec();
        sorted_buckets.sort_by(|left, right| left.total_cmp(right));
        sorted_buckets.dedup();

        Self {
            descriptor,
            buckets: sorted_buckets,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn observe(&self, labels: &[&str], value: f64) {
        let series = self.get_or_create_series(labels);

        let bucket_index = self
            .buckets
            .iter()
            .position(|bucket| value <= *bucket)
            .unwrap_or(self.buckets.len());

        if let Some(bucket) = series.bucket_counts.get(bucket_index) {
            bucket.fetch_add(1, Ordering::Relaxed);
        }

        series.count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut sum) = series.sum.lock() {
            *sum += value;
        }
    }

    /// Makes the series visible with zero observations.
    pub fn touch(&self, labels: &[&str]) {
        self.get_or_create_series(labels);
    }

    pub fn count(&self, labels: &[&str]) -> u64 {
        let label_values = normalize_labels(self.descriptor, labels);
        self.series
            .read()
            .ok()
            .and_then(|guard| {
                guard
                    .get(&label_values)
                    .map(|series| series.count.load(Ordering::Relaxed))
            })
            .unwrap_or_default()
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        let series = match self.series.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };

        series
            .iter()
            .filter_map(|(label_values, entry)| {
                let mut buckets = self
                    .buckets
                    .iter()
                    .enumerate()
                    .map(|(index, bound)| {
                        (*bound, entry.bucket_counts[index].load(Ordering::Relaxed))
                    })
                    .collect::<Vec<_>>();

                let inf_count = entry.bucket_counts[self.buckets.len()].load(Ordering::Relaxed);
                buckets.push((f64::INFINITY, inf_count));

                let sum = match entry.sum.lock() {
                    Ok(value) => *value,
                    Err(_) => 0.0,
                };

                sample(
                    self.descriptor,
                    MetricValue::Histogram {
                        buckets,
                        count: entry.count.load(Ordering::Relaxed),
                        sum,
                    },
                    label_values,
                )
            })
            .collect()
    }

    pub fn emit(&self, sink: &MetricSink) {
        self.samples().into_iter().for_each(|sample| sink.send(sample));
    }

    fn get_or_create_series(&self, labels: &[&str]) -> Arc<HistogramSeries> {
        let label_values = normalize_labels(self.descriptor, labels);
        if let Ok(guard) = self.series.read()
            && let Some(existing) = guard.get(&label_values)
        {
            return existing.clone();
        }

        match self.series.write() {
            Ok(mut guard) => guard
                .entry(label_values)
                .or_insert_with(|| Arc::new(HistogramSeries::new(self.buckets.len())))
                .clone(),
            Err(_) => Arc::new(HistogramSeries::new(self.buckets.len())),
        }
    }
}

fn normalize_labels(descriptor: &MetricDescriptor, labels: &[&str]) -> LabelValues {
    let expected = descriptor.variable_labels.len();
    (0..expected)
        .map(|index| labels.get(index).copied().unwrap_or_default().to_string())
        .collect()
}

fn sample(
    descriptor: &'static MetricDescriptor,
    value: MetricValue,
    label_values: &[String],
) -> Option<MetricSample> {
    let labels = label_values.iter().map(String::as_str).collect::<Vec<_>>();
    MetricSample::new(descriptor, value, &labels).ok()
}
