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

//! Combined outcome of one scrape of the registry.

use super::MetricsResult;

/// Outcome of one scrape: the registry's own metrics followed by one
/// [MetricsResult] per provider that succeeded, in registration order.
#[derive(Clone, Debug, Default)]
pub struct MetricsResults {
    metrics_results: Vec<MetricsResult>,
}

impl MetricsResults {
    /// Return a new instance.
    pub fn new(metrics_results: Vec<MetricsResult>) -> Self {
        Self { metrics_results }
    }

    /// Namespaces present in this result.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.metrics_results
            .iter()
            .map(MetricsResult::get_namespace)
    }

    /// Concatenated `PrometheusText0.0.4` of all results.
    pub fn as_text(&self) -> String {
        self.metrics_results
            .iter()
            .map(MetricsResult::as_text)
            .collect()
    }
}

impl FromIterator<MetricsResult> for MetricsResults {
    fn from_iter<I: IntoIterator<Item = MetricsResult>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;
    use crate::metric::MetricLabeledValue;

    #[test]
    fn keeps_order_and_namespaces() {
        let metrics_results = ["muxporter", "nginx", "redis"]
            .into_iter()
            .map(|namespace| {
                MetricsResult::new(namespace).add_metric(Metric::from_metric_labeled_value(
                    "up",
                    MetricLabeledValue::new(1.0),
                ))
            })
            .collect::<MetricsResults>();
        assert_eq!(
            metrics_results.namespaces().collect::<Vec<_>>(),
            vec!["muxporter", "nginx", "redis"]
        );
        let text = metrics_results.as_text();
        let nginx = text.find("nginx_up 1").unwrap();
        let redis = text.find("redis_up 1").unwrap();
        assert!(text.find("muxporter_up 1").unwrap() < nginx);
        assert!(nginx < redis);
    }

    #[test]
    fn empty() {
        assert!(MetricsResults::default().as_text().is_empty());
        assert_eq!(MetricsResults::default().namespaces().count(), 0);
    }
}
