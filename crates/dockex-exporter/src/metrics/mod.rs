pub mod descriptors;
pub mod exposition;
pub mod registry;
pub mod sink;
pub mod types;

pub use descriptors::{DURATION_BUCKETS, Descriptors, descriptors};
pub use exposition::{CONTENT_TYPE, render_prometheus};
pub use registry::{CounterMetric, GaugeMetric, HistogramMetric};
pub use sink::{MetricSink, SampleReceiver, Snapshot};
pub use types::{MetricDescriptor, MetricSample, MetricType, MetricValue};
