//! Prometheus text exposition format (version 0.0.4).

use crate::metrics::{
    descriptors::descriptors,
    sink::Snapshot,
    types::{MetricSample, MetricValue},
};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders every registered family, in registration order, with its samples
/// sorted by label values.
pub fn render_prometheus(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    for descriptor in descriptors().all() {
        let name = descriptor.fq_name();

        output.push_str("# HELP ");
        output.push_str(name);
        output.push(' ');
        output.push_str(&escape_help(descriptor.help));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(name);
        output.push(' ');
        output.push_str(descriptor.metric_type.as_prometheus_type());
        output.push('\n');

        let mut samples = snapshot.of(descriptor).collect::<Vec<&MetricSample>>();
        samples.sort_by(|left, right| left.label_values.cmp(&right.label_values));

        for sample in samples {
            let labels = sample.labels();
            match &sample.value {
                MetricValue::Counter(value) | MetricValue::Gauge(value) => {
                    output.push_str(&render_sample_line(name, &labels, *value));
                }
                MetricValue::Histogram {
                    buckets,
                    count,
                    sum,
                } => {
                    let bucket_name = format!("{name}_bucket");
                    let mut cumulative = 0_u64;
                    for (bound, bucket_count) in buckets {
                        cumulative = cumulative.saturating_add(*bucket_count);
                        let bound = format_bucket_bound(*bound);
                        let mut bucket_labels = labels.clone();
                        bucket_labels.push(("le", bound.as_str()));
                        output.push_str(&render_sample_line(
                            &bucket_name,
                            &bucket_labels,
                            cumulative as f64,
                        ));
                    }

                    output.push_str(&render_sample_line(&format!("{name}_sum"), &labels, *sum));
                    output.push_str(&render_sample_line(
                        &format!("{name}_count"),
                        &labels,
                        *count as f64,
                    ));
                }
            }
        }
    }

    output
}

fn render_sample_line(name: &str, labels: &[(&str, &str)], value: f64) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);

    if !labels.is_empty() {
        rendered.push('{');
        for (index, (key, value)) in labels.iter().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() { "+Inf" } else { "-Inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn format_bucket_bound(value: f64) -> String {
    if value.is_infinite() {
        "+Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{format_metric_value, render_prometheus};
    use crate::metrics::{
        descriptors::{DURATION_BUCKETS, descriptors},
        registry::HistogramMetric,
        sink::Snapshot,
        types::MetricSample,
    };

    #[test]
    fn renders_help_and_type_for_every_family() {
        let output = render_prometheus(&Snapshot::default());
        for descriptor in descriptors().all() {
            assert!(output.contains(&format!("# HELP {} ", descriptor.fq_name())));
            assert!(output.contains(&format!(
                "# TYPE {} {}",
                descriptor.fq_name(),
                descriptor.metric_type.as_prometheus_type()
            )));
        }
    }

    #[test]
    fn renders_labeled_samples_sorted() {
        let d = descriptors();
        let snapshot = [
            MetricSample::gauge(&d.containers, 2.0, &["stopped"]).unwrap(),
            MetricSample::gauge(&d.containers, 5.0, &["running"]).unwrap(),
            MetricSample::gauge(&d.up, 1.0, &[]).unwrap(),
        ]
        .into_iter()
        .collect::<Snapshot>();

        let output = render_prometheus(&snapshot);
        let running = output.find("docker_containers{status=\"running\"} 5").unwrap();
        let stopped = output.find("docker_containers{status=\"stopped\"} 2").unwrap();
        assert!(running < stopped);
        assert!(output.contains("docker_up 1\n"));
    }

    #[test]
    fn escapes_label_values() {
        let d = descriptors();
        let sample =
            MetricSample::gauge(&d.container_restart_count, 0.0, &["we\"ird\\name"]).unwrap();
        let snapshot = Snapshot::from_iter([sample]);

        let output = render_prometheus(&snapshot);
        assert!(output.contains(r#"docker_container_restart_count{name="we\"ird\\name"} 0"#));
    }

    #[test]
    fn renders_cumulative_histogram() {
        let histogram =
            HistogramMetric::new(&descriptors().probe_inspect_duration_seconds, DURATION_BUCKETS);
        histogram.observe(&[], 0.00390625);
        histogram.observe(&[], 0.03125);
        histogram.observe(&[], 9.0);
        let snapshot = histogram.samples().into_iter().collect::<Snapshot>();

        let output = render_prometheus(&snapshot);
        assert!(output.contains("docker_probe_inspect_duration_seconds_bucket{le=\"0.005\"} 1\n"));
        assert!(output.contains("docker_probe_inspect_duration_seconds_bucket{le=\"0.05\"} 2\n"));
        assert!(output.contains("docker_probe_inspect_duration_seconds_bucket{le=\"5\"} 2\n"));
        assert!(output.contains("docker_probe_inspect_duration_seconds_bucket{le=\"+Inf\"} 3\n"));
        assert!(output.contains("docker_probe_inspect_duration_seconds_count 3\n"));
        assert!(output.contains("docker_probe_inspect_duration_seconds_sum 9.03515625\n"));
    }

    #[test]
    fn formats_values() {
        assert_eq!(format_metric_value(3.0), "3");
        assert_eq!(format_metric_value(0.5), "0.5");
        assert_eq!(format_metric_value(f64::INFINITY), "+Inf");
        assert_eq!(format_metric_value(f64::NAN), "NaN");
    }
}
