/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Result of scraping a single [super::MetricsProvider].

use crate::metric::Metric;

/// Holds the result of scraping a [super::MetricsProvider].
#[derive(Clone, Debug)]
pub struct MetricsResult {
    namespace: String,
    metrics: Vec<Metric>,
}

impl MetricsResult {
    /// Return a new instance.
    ///
    /// The provided `namespace` will be used as prefix to the metric name.
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            metrics: vec![],
        }
    }

    /// Builder style append of a [Metric] to this result.
    ///
    /// Values of a metric whose name was already added are merged into the
    /// existing metric.
    pub fn add_metric(mut self, metric: Metric) -> MetricsResult {
        if let Some(existing) = self
            .metrics
            .iter_mut()
            .find(|existing| existing.get_metric_name() == metric.get_metric_name())
        {
            existing.merge(metric);
        } else {
            self.metrics.push(metric);
        }
        self
    }

    /// Prefix of all metric names in this result.
    pub fn get_namespace(&self) -> &str {
        &self.namespace
    }

    /// The metrics added so far.
    pub fn get_metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Provides the metric in the `PrometheusText0.0.4` format.
    pub fn as_text(&self) -> String {
        let mut ret = String::new();
        for metric in self.metrics.iter() {
            ret.push_str(metric.as_text(&self.namespace).as_str());
            ret.push('\n');
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricLabeledValue;
    use crate::metric::MetricType;

    #[test]
    fn merges_metrics_with_same_name() {
        let metrics_result = MetricsResult::new("redis")
            .add_metric(
                Metric::from_metric_labeled_value(
                    "up",
                    MetricLabeledValue::new(1.0).add_label("addr", "a:6379"),
                )
                .set_type(MetricType::Gauge)
                .set_help("Node reachable."),
            )
            .add_metric(
                Metric::from_metric_labeled_value(
                    "uptime_in_seconds",
                    MetricLabeledValue::new(10.0).add_label("addr", "a:6379"),
                )
                .set_type(MetricType::Gauge),
            )
            .add_metric(
                Metric::from_metric_labeled_value(
                    "up",
                    MetricLabeledValue::new(0.0).add_label("addr", "b:6379"),
                )
                .set_type(MetricType::Gauge)
                .set_help("Node reachable."),
            );
        assert_eq!(metrics_result.get_metrics().len(), 2);
        let text = metrics_result.as_text();
        assert_eq!(text.matches("# HELP redis_up ").count(), 1);
        assert_eq!(text.matches("# TYPE redis_up gauge").count(), 1);
        assert!(text.contains("redis_up{addr=\"a:6379\"} 1\n"));
        assert!(text.contains("redis_up{addr=\"b:6379\"} 0\n"));
        assert!(text.contains("redis_uptime_in_seconds{addr=\"a:6379\"} 10\n"));
    }
}
