use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::metrics::types::{MetricDescriptor, MetricSample, MetricValue};

/// Producer half of a cycle's sample stream.
///
/// Cheap to clone; every scraper task and container task holds its own
/// handle. The stream closes once the last handle is dropped.
#[derive(Debug, Clone)]
pub struct MetricSink {
    sender: mpsc::UnboundedSender<MetricSample>,
}

pub type SampleReceiver = mpsc::UnboundedReceiver<MetricSample>;

impl MetricSink {
    pub fn channel() -> (Self, SampleReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn send(&self, sample: MetricSample) {
        if self.sender.send(sample).is_err() {
            debug!("metric stream consumer went away, dropping sample");
        }
    }

    pub fn gauge(&self, descriptor: &'static MetricDescriptor, value: f64, labels: &[&str]) {
        self.emit(descriptor, MetricValue::Gauge(value), labels);
    }

    pub fn counter(&self, descriptor: &'static MetricDescriptor, value: f64, labels: &[&str]) {
        self.emit(descriptor, MetricValue::Counter(value), labels);
    }

    fn emit(&self, descriptor: &'static MetricDescriptor, value: MetricValue, labels: &[&str]) {
        match MetricSample::new(descriptor, value, labels) {
            Ok(sample) => self.send(sample),
            Err(err) => {
                warn!(metric = descriptor.fq_name(), error = %err, "dropping invalid sample")
            }
        }
    }
}

/// Everything one cycle emitted, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    samples: Vec<MetricSample>,
}

impl Snapshot {
    /// Consumes the stream until every producer handle is dropped.
    pub async fn drain(mut receiver: SampleReceiver) -> Self {
        let mut samples = Vec::new();
        while let Some(sample) = receiver.recv().await {
            samples.push(sample);
        }
        Self { samples }
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<MetricSample> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn of<'a>(
        &'a self,
        descriptor: &'a MetricDescriptor,
    ) -> impl Iterator<Item = &'a MetricSample> + 'a {
        self.samples
            .iter()
            .filter(move |sample| std::ptr::eq(sample.descriptor, descriptor))
    }

    /// Scalar value of the single sample of `descriptor` carrying `labels`.
    pub fn value(&self, descriptor: &MetricDescriptor, labels: &[&str]) -> Option<f64> {
        self.of(descriptor)
            .find(|sample| {
                sample
                    .label_values
                    .iter()
                    .map(String::as_str)
                    .eq(labels.iter().copied())
            })
            .and_then(|sample| sample.value.as_f64())
    }
}

impl FromIterator<MetricSample> for Snapshot {
    fn from_iter<T: IntoIterator<Item = MetricSample>>(iter: T) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}
