use dockex_common::{DockexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

impl MetricType {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }
}

/// Schema of one metric family: fully qualified name, help text, kind and
/// the ordered label names every sample must fill.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub namespace: &'static str,
    pub subsystem: &'static str,
    pub name: &'static str,
    pub help: &'static str,
    pub metric_type: MetricType,
    pub variable_labels: &'static [&'static str],
    fq_name: String,
}

impl MetricDescriptor {
    pub fn new(
        namespace: &'static str,
        subsystem: &'static str,
        name: &'static str,
        help: &'static str,
        metric_type: MetricType,
        variable_labels: &'static [&'static str],
    ) -> Self {
        Self {
            namespace,
            subsystem,
            name,
            help,
            metric_type,
            variable_labels,
            fq_name: build_fq_name(namespace, subsystem, name),
        }
    }

    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(f64),
    Gauge(f64),
    /// Per-bucket (not cumulative) counts; the last bound is `+Inf`.
    Histogram {
        buckets: Vec<(f64, u64)>,
        count: u64,
        sum: f64,
    },
}

impl MetricValue {
    pub fn metric_type(&self) -> MetricType {
        match self {
            Self::Counter(_) => MetricType::Counter,
            Self::Gauge(_) => MetricType::Gauge,
            Self::Histogram { .. } => MetricType::Histogram,
        }
    }

    /// Scalar value of a counter or gauge.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Counter(value) | Self::Gauge(value) => Some(*value),
            Self::Histogram { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub descriptor: &'static MetricDescriptor,
    pub value: MetricValue,
    pub label_values: Vec<String>,
}

impl MetricSample {
    pub fn new(
        descriptor: &'static MetricDescriptor,
        value: MetricValue,
        label_values: &[&str],
    ) -> Result<Self> {
        if label_values.len() != descriptor.variable_labels.len() {
            return Err(DockexError::LabelMismatch {
                metric: descriptor.fq_name().to_string(),
                expected: descriptor.variable_labels.len(),
                got: label_values.len(),
            });
        }

        if value.metric_type() != descriptor.metric_type {
            return Err(DockexError::InvalidArgument(format!(
                "{} is a {}, got a {} value",
                descriptor.fq_name(),
                descriptor.metric_type.as_prometheus_type(),
                value.metric_type().as_prometheus_type()
            )));
        }

        Ok(Self {
            descriptor,
            value,
            label_values: label_values.iter().map(|value| (*value).to_string()).collect(),
        })
    }

    pub fn gauge(
        descriptor: &'static MetricDescriptor,
        value: f64,
        label_values: &[&str],
    ) -> Result<Self> {
        Self::new(descriptor, MetricValue::Gauge(value), label_values)
    }

    pub fn counter(
        descriptor: &'static MetricDescriptor,
        value: f64,
        label_values: &[&str],
    ) -> Result<Self> {
        Self::new(descriptor, MetricValue::Counter(value), label_values)
    }

    pub fn kind(&self) -> MetricType {
        self.value.metric_type()
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .variable_labels
            .iter()
            .position(|label| *label == name)
            .and_then(|index| self.label_values.get(index))
            .map(String::as_str)
    }

    pub fn labels(&self) -> Vec<(&'static str, &str)> {
        self.descriptor
            .variable_labels
            .iter()
            .copied()
            .zip(self.label_values.iter().map(String::as_str))
            .collect()
    }
}

fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
