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

//! Tracking and scraping of registered [MetricsProvider]s.

mod metrics_provider;
mod metrics_result;
mod metrics_results;
pub use self::metrics_provider::MetricsProvider;
pub use self::metrics_result::MetricsResult;
pub use self::metrics_results::MetricsResults;
use crate::ExporterError;
use crate::ExporterErrorKind;
use crate::metric::Metric;
use crate::metric::MetricLabeledValue;
use crate::metric::MetricType;
use crate::metric::sanitize_name;
use core::future::Future;
use futures::lock::Mutex;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

/** The registry tracks all registered [MetricsProvider]s and can be used to
scrape these for resulting metrics.

Providers are registered during startup while the registry is still owned
exclusively. Once shared (typically behind an [Arc]) the set of providers can
no longer change.
*/
pub struct MetricsProviderRegistry {
    namespace: String,
    app_version: String,
    scrape_timeout: Duration,
    grouping_window: Duration,
    metrics_result: Mutex<(Option<Instant>, MetricsResults)>,
    metrics_instances: Vec<(String, Arc<dyn MetricsProvider>)>,
}

impl MetricsProviderRegistry {
    const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);
    const DEFAULT_GROUPING_WINDOW: Duration = Duration::from_secs(1);
    const METRIC_NAME_SCRAPE_SUCCESS: &str = "scrape_collector_success";
    const METRIC_NAME_SCRAPE_DURATION: &str = "scrape_collector_duration_seconds";
    const METRIC_NAME_BUILD_INFO: &str = "build_info";
    const METRIC_LABEL_COLLECTOR: &str = "collector";
    const METRIC_LABEL_VERSION: &str = "version";

    /// Return a new empty instance.
    ///
    /// The application's own metrics are exposed under `app_name`.
    pub fn new(app_name: &str, app_version: &str) -> Self {
        Self {
            namespace: sanitize_name(app_name),
            app_version: app_version.to_owned(),
            scrape_timeout: Self::DEFAULT_SCRAPE_TIMEOUT,
            grouping_window: Self::DEFAULT_GROUPING_WINDOW,
            metrics_result: Mutex::new((None, MetricsResults::default())),
            metrics_instances: Vec::new(),
        }
    }

    /// Builder style override of the maximum time a single provider may spend
    /// on a scrape.
    pub fn with_scrape_timeout(mut self, scrape_timeout: Duration) -> Self {
        self.scrape_timeout = scrape_timeout;
        self
    }

    /// Builder style override of how long a completed scrape is served to
    /// other callers. [Duration::ZERO] disables grouping of requests.
    pub fn with_grouping_window(mut self, grouping_window: Duration) -> Self {
        self.grouping_window = grouping_window;
        self
    }

    /// Register a [MetricsProvider] for scraping.
    ///
    /// The `component_name` identifies the provider and is used as namespace
    /// for its metrics. Registering the same name twice is an error.
    pub fn register_metrics(
        &mut self,
        component_name: &str,
        provider: Arc<dyn MetricsProvider>,
    ) -> Result<(), ExporterError> {
        if self
            .metrics_instances
            .iter()
            .any(|(existing, _)| existing == component_name)
        {
            return Err(ExporterErrorKind::DuplicateRegistration.error_with_msg(format!(
                "Metrics component '{component_name}' is already registered."
            )));
        }
        log::debug!("Registered metrics component '{component_name}'.");
        self.metrics_instances
            .push((component_name.to_owned(), provider));
        Ok(())
    }

    /// Iterate over registered providers in registration order.
    pub fn providers(&self) -> impl Iterator<Item = (&str, &Arc<dyn MetricsProvider>)> {
        self.metrics_instances
            .iter()
            .map(|(component_name, provider)| (component_name.as_str(), provider))
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.metrics_instances.len()
    }

    /// Return `true` if no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.metrics_instances.is_empty()
    }

    /// Get the result of scraping all [MetricsProvider]s.
    ///
    /// This groups concurrent requests and delivers a cloned result to all
    /// callers to avoid putting unnecessary load on the [MetricsProvider]
    /// implementations.
    pub async fn get_metrics(&self) -> MetricsResults {
        if self.grouping_window.is_zero() {
            return self.metrics_internal().await;
        }
        self.group_requests(self.metrics_internal()).await
    }

    /// Scrape all [MetricsProvider]s concurrently.
    async fn metrics_internal(&self) -> MetricsResults {
        let outcomes = futures::future::join_all(
            self.providers()
                .map(|(component_name, provider)| self.scrape_provider(component_name, provider)),
        )
        .await;
        let mut metrics_results = Vec::with_capacity(outcomes.len() + 1);
        metrics_results.push(self.own_metrics(&outcomes));
        metrics_results.extend(
            outcomes
                .into_iter()
                .filter_map(|(_component_name, metrics_result, _duration)| metrics_result),
        );
        let metrics_results = MetricsResults::new(metrics_results);
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("metrics_results: {metrics_results:?}");
        } else if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Scrape produced namespaces {:?}.",
                metrics_results.namespaces().collect::<Vec<_>>()
            );
        }
        metrics_results
    }

    /// Scrape a single provider, absorbing failures and timeouts.
    async fn scrape_provider<'a>(
        &self,
        component_name: &'a str,
        provider: &Arc<dyn MetricsProvider>,
    ) -> (&'a str, Option<MetricsResult>, Duration) {
        let start = Instant::now();
        let res = tokio::time::timeout(
            self.scrape_timeout,
            provider.metrics(MetricsResult::new(component_name)),
        )
        .await
        .map_err(|_| {
            ExporterErrorKind::CollectorTimeout.error_with_msg(format!(
                "No result within {} ms.",
                self.scrape_timeout.as_millis()
            ))
        })
        .and_then(std::convert::identity);
        let duration = start.elapsed();
        match res {
            Ok(metrics_result) => (component_name, Some(metrics_result), duration),
            Err(e) => {
                log::warn!("Scraping metrics component '{component_name}' failed: {e}");
                (component_name, None, duration)
            }
        }
    }

    /// Metrics about the scrape itself.
    fn own_metrics(&self, outcomes: &[(&str, Option<MetricsResult>, Duration)]) -> MetricsResult {
        let mut metrics_result = MetricsResult::new(&self.namespace).add_metric(
            Metric::from_metric_labeled_value(
                Self::METRIC_NAME_BUILD_INFO,
                MetricLabeledValue::new(1.0)
                    .add_label(Self::METRIC_LABEL_VERSION, self.app_version.as_str()),
            )
            .set_type(MetricType::Gauge)
            .set_help("Build information of the exporter."),
        );
        if outcomes.is_empty() {
            return metrics_result;
        }
        let success = outcomes
            .iter()
            .map(|(component_name, metrics_result, _)| {
                MetricLabeledValue::new(if metrics_result.is_some() { 1.0 } else { 0.0 })
                    .add_label(Self::METRIC_LABEL_COLLECTOR, *component_name)
            })
            .collect();
        let durations = outcomes
            .iter()
            .map(|(component_name, _, duration)| {
                MetricLabeledValue::new(duration.as_secs_f64())
                    .add_label(Self::METRIC_LABEL_COLLECTOR, *component_name)
            })
            .collect();
        metrics_result = metrics_result
            .add_metric(
                Metric::from_metric_labeled_values(Self::METRIC_NAME_SCRAPE_SUCCESS, success)
                    .set_type(MetricType::Gauge)
                    .set_help("Whether a collector succeeded."),
            )
            .add_metric(
                Metric::from_metric_labeled_values(Self::METRIC_NAME_SCRAPE_DURATION, durations)
                    .set_type(MetricType::Gauge)
                    .set_help("Duration of a collector scrape."),
            );
        metrics_result
    }

    /// DDoS protection: Serve recent (but slightly stale) result to concurrent requests
    async fn group_requests(&self, future: impl Future<Output = MetricsResults>) -> MetricsResults {
        let mut guarded_result = self.metrics_result.lock().await;
        let is_fresh = guarded_result
            .0
            .is_some_and(|collected| collected.elapsed() < self.grouping_window);
        if !is_fresh {
            guarded_result.1 = future.await;
            guarded_result.0 = Some(Instant::now());
        }
        guarded_result.1.clone()
    }
}
