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

//! Metrics from the nginx `stub_status` page.

mod stub_status;

use self::stub_status::StubStatus;
use async_trait::async_trait;
use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;
use muxporter_metrics::metric::Metric;
use muxporter_metrics::metric::MetricLabeledValue;
use muxporter_metrics::metric::MetricType;
use muxporter_metrics::registry::MetricsProvider;
use muxporter_metrics::registry::MetricsResult;
use reqwest::Url;
use std::time::Duration;

/// Scrapes the nginx `stub_status` page on every call.
pub struct NginxCollector {
    status_uri: Url,
    http_client: reqwest::Client,
}

impl NginxCollector {
    /// Namespace and registry identity of this collector.
    pub const COMPONENT_NAME: &str = "nginx";
    const METRIC_NAME_CONNECTIONS_CURRENT: &str = "connections_current";
    const METRIC_NAME_CONNECTIONS_PROCESSED: &str = "connections_processed_total";
    const METRIC_LABEL_STATE: &str = "state";
    const METRIC_LABEL_STAGE: &str = "stage";

    /// Return a new instance.
    ///
    /// When `insecure` is `true` the server certificate of a `https` status
    /// URI is not verified.
    pub fn new(status_uri: &str, insecure: bool, timeout: Duration) -> Result<Self, ExporterError> {
        let status_uri = Self::parse_status_uri(status_uri)?;
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                ExporterErrorKind::StartupDependencyError
                    .error_with_msg(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            status_uri,
            http_client,
        })
    }

    /// Parse an absolute `http` or `https` status page URI.
    pub fn parse_status_uri(status_uri: &str) -> Result<Url, ExporterError> {
        Url::parse(status_uri)
            .map_err(|e| e.to_string())
            .and_then(|url| match url.scheme() {
                "http" | "https" => Ok(url),
                scheme => Err(format!("unsupported scheme '{scheme}'")),
            })
            .map_err(|msg| {
                ExporterErrorKind::ConfigurationError
                    .error_with_msg(format!("Invalid nginx status URI '{status_uri}': {msg}"))
            })
    }

    /// Fetch and parse the status page.
    async fn fetch_stub_status(&self) -> Result<StubStatus, ExporterError> {
        let response = self
            .http_client
            .get(self.status_uri.clone())
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    ExporterErrorKind::CollectorTimeout
                } else {
                    ExporterErrorKind::CollectorUnreachable
                };
                kind.error_with_msg(format!("Request to '{}' failed: {e}", self.status_uri))
            })?;
        if !response.status().is_success() {
            return Err(ExporterErrorKind::CollectorUnreachable.error_with_msg(format!(
                "Request to '{}' returned HTTP {}.",
                self.status_uri,
                response.status()
            )));
        }
        let body = response.text().await.map_err(|e| {
            ExporterErrorKind::MalformedResponse
                .error_with_msg(format!("Failed to read body from '{}': {e}", self.status_uri))
        })?;
        StubStatus::parse(&body)
    }

    fn as_metrics_result(stub_status: &StubStatus, metrics_result: MetricsResult) -> MetricsResult {
        let current = [
            ("active", stub_status.active),
            ("reading", stub_status.reading),
            ("writing", stub_status.writing),
            ("waiting", stub_status.waiting),
        ]
        .into_iter()
        .map(|(state, value)| {
            MetricLabeledValue::new(value as f64).add_label(Self::METRIC_LABEL_STATE, state)
        })
        .collect();
        let processed = [
            ("accepted", stub_status.accepted),
            ("handled", stub_status.handled),
            ("any", stub_status.requests),
        ]
        .into_iter()
        .map(|(stage, value)| {
            MetricLabeledValue::new(value as f64).add_label(Self::METRIC_LABEL_STAGE, stage)
        })
        .collect();
        metrics_result
            .add_metric(
                Metric::from_metric_labeled_values(Self::METRIC_NAME_CONNECTIONS_CURRENT, current)
                    .set_type(MetricType::Gauge)
                    .set_help("Number of connections currently processed by nginx."),
            )
            .add_metric(
                Metric::from_metric_labeled_values(
                    Self::METRIC_NAME_CONNECTIONS_PROCESSED,
                    processed,
                )
                .set_type(MetricType::Counter)
                .set_help("Number of connections and requests processed by nginx."),
            )
    }
}

#[async_trait]
impl MetricsProvider for NginxCollector {
    async fn metrics(&self, metrics_result: MetricsResult) -> Result<MetricsResult, ExporterError> {
        let stub_status = self.fetch_stub_status().await?;
        Ok(Self::as_metrics_result(&stub_status, metrics_result))
    }
}
