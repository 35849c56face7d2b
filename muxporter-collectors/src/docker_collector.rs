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

//! Metrics of running Docker containers.

mod cgroup_reader;
mod docker_api_client;

use self::cgroup_reader::CgroupReader;
use self::cgroup_reader::CgroupStats;
use self::docker_api_client::ContainerSummary;
use self::docker_api_client::DockerApiClient;
use async_trait::async_trait;
use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;
use muxporter_metrics::metric::Metric;
use muxporter_metrics::metric::MetricLabeledValue;
use muxporter_metrics::metric::MetricType;
use muxporter_metrics::metric::sanitize_name;
use muxporter_metrics::registry::MetricsProvider;
use muxporter_metrics::registry::MetricsResult;
use std::time::Duration;

/** Lists running containers through the Docker Engine API and reads their
resource accounting from the cgroup filesystem.

Selected container labels are exposed as `label_<name>` metric labels.
*/
pub struct DockerCollector {
    api_client: DockerApiClient,
    cgroup_reader: CgroupReader,
    /// Container label keys and the metric label names they are exposed as.
    label_filter: Vec<(String, String)>,
}

impl DockerCollector {
    /// Namespace and registry identity of this collector.
    pub const COMPONENT_NAME: &str = "docker";
    const METRIC_NAME_CONTAINERS_RUNNING: &str = "containers_running";
    const METRIC_NAME_CONTAINER_INFO: &str = "container_info";
    const METRIC_NAME_CPU_USAGE: &str = "container_cpu_usage_seconds_total";
    const METRIC_NAME_MEMORY_USAGE: &str = "container_memory_usage_bytes";
    const METRIC_NAME_MEMORY_LIMIT: &str = "container_memory_limit_bytes";
    const METRIC_LABEL_ID: &str = "id";
    const METRIC_LABEL_NAME: &str = "name";
    const METRIC_LABEL_IMAGE: &str = "image";

    /// Return a new instance after verifying that the daemon at `address`
    /// responds.
    pub async fn new(
        address: &str,
        cgroup_root: &str,
        cgroup_parent: &str,
        label_filter: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, ExporterError> {
        let api_client = DockerApiClient::new(address, timeout)?;
        api_client.ping().await.map_err(|e| {
            ExporterErrorKind::StartupDependencyError
                .error_with_msg(format!("Unable to reach Docker at '{address}': {e}"))
        })?;
        Ok(Self::with_client(
            api_client,
            CgroupReader::new(cgroup_root, cgroup_parent),
            label_filter,
        ))
    }

    fn with_client(
        api_client: DockerApiClient,
        cgroup_reader: CgroupReader,
        label_filter: Vec<String>,
    ) -> Self {
        let mut selected: Vec<(String, String)> = vec![];
        for key in label_filter {
            let label_name = Self::metric_label_name(&key);
            if let Some((first, _)) = selected.iter().find(|(_, name)| name == &label_name) {
                log::warn!(
                    "Ignoring container label '{key}' since '{first}' is already exposed as '{label_name}'."
                );
                continue;
            }
            selected.push((key, label_name));
        }
        Self {
            api_client,
            cgroup_reader,
            label_filter: selected,
        }
    }

    /// Name of the metric label that exposes the container label `key`.
    pub fn metric_label_name(key: &str) -> String {
        "label_".to_string() + &sanitize_name(key)
    }

    /// Labels shared by all metrics of a container.
    fn container_labels(&self, container: &ContainerSummary) -> Vec<(String, String)> {
        let mut labels = vec![
            (Self::METRIC_LABEL_ID.to_owned(), container.id.to_owned()),
            (Self::METRIC_LABEL_NAME.to_owned(), container.name().to_owned()),
            (Self::METRIC_LABEL_IMAGE.to_owned(), container.image.to_owned()),
        ];
        for (key, label_name) in &self.label_filter {
            labels.push((
                label_name.to_owned(),
                container.label(key).unwrap_or_default().to_owned(),
            ));
        }
        labels
    }

    fn labeled_value(labels: &[(String, String)], value: f64) -> MetricLabeledValue {
        labels
            .iter()
            .fold(MetricLabeledValue::new(value), |mlv, (name, value)| {
                mlv.add_label(name.as_str(), value.as_str())
            })
    }

    fn as_metrics_result(
        &self,
        containers: &[ContainerSummary],
        stats: &[CgroupStats],
        metrics_result: MetricsResult,
    ) -> MetricsResult {
        let mut info = vec![];
        let mut cpu_usage = vec![];
        let mut memory_usage = vec![];
        let mut memory_limit = vec![];
        for (container, stats) in containers.iter().zip(stats) {
            let labels = self.container_labels(container);
            info.push(Self::labeled_value(&labels, 1.0));
            if let Some(value) = stats.cpu_usage_seconds {
                cpu_usage.push(Self::labeled_value(&labels, value));
            }
            if let Some(value) = stats.memory_usage_bytes {
                memory_usage.push(Self::labeled_value(&labels, value));
            }
            if let Some(value) = stats.memory_limit_bytes {
                memory_limit.push(Self::labeled_value(&labels, value));
            }
        }
        let mut metrics_result = metrics_result.add_metric(
            Metric::from_metric_labeled_value(
                Self::METRIC_NAME_CONTAINERS_RUNNING,
                MetricLabeledValue::new(containers.len() as f64),
            )
            .set_type(MetricType::Gauge)
            .set_help("Number of running containers."),
        );
        for (metric_name, metric_type, help, mlvs) in [
            (
                Self::METRIC_NAME_CONTAINER_INFO,
                MetricType::Gauge,
                "Container identity and selected labels.",
                info,
            ),
            (
                Self::METRIC_NAME_CPU_USAGE,
                MetricType::Counter,
                "Cumulative CPU time consumed by the container.",
                cpu_usage,
            ),
            (
                Self::METRIC_NAME_MEMORY_USAGE,
                MetricType::Gauge,
                "Current memory usage of the container.",
                memory_usage,
            ),
            (
                Self::METRIC_NAME_MEMORY_LIMIT,
                MetricType::Gauge,
                "Memory limit of the container.",
                memory_limit,
            ),
        ] {
            if !mlvs.is_empty() {
                metrics_result = metrics_result.add_metric(
                    Metric::from_metric_labeled_values(metric_name, mlvs)
                        .set_type(metric_type)
                        .set_help(help),
                );
            }
        }
        metrics_result
    }
}

#[async_trait]
impl MetricsProvider for DockerCollector {
    async fn metrics(&self, metrics_result: MetricsResult) -> Result<MetricsResult, ExporterError> {
        let containers = self.api_client.list_containers().await?;
        let stats = futures::future::join_all(
            containers
                .iter()
                .map(|container| self.cgroup_reader.read(&container.id)),
        )
        .await;
        Ok(self.as_metrics_result(&containers, &stats, metrics_result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector(label_filter: &[&str]) -> DockerCollector {
        DockerCollector::with_client(
            DockerApiClient::new("unix:///nonexistent/docker.sock", Duration::from_millis(100))
                .unwrap(),
            CgroupReader::new("/nonexistent", "/docker"),
            label_filter.iter().map(|label| label.to_string()).collect(),
        )
    }

    #[test]
    fn exposes_container_metrics_with_selected_labels() {
        let containers: Vec<ContainerSummary> = serde_json::from_str(
            r#"[{"Id":"abc","Names":["/web"],"Image":"nginx:1","Labels":{"com.example.team":"shop","other":"x"}}]"#,
        )
        .unwrap();
        let stats = vec![CgroupStats {
            cpu_usage_seconds: Some(1.5),
            memory_usage_bytes: Some(2048.0),
            memory_limit_bytes: None,
        }];
        let text = collector(&["com.example.team", "missing"])
            .as_metrics_result(&containers, &stats, MetricsResult::new("docker"))
            .as_text();
        let labels = "id=\"abc\",name=\"web\",image=\"nginx:1\",label_com_example_team=\"shop\",label_missing=\"\"";
        assert!(text.contains("docker_containers_running 1\n"));
        assert!(text.contains(&format!("docker_container_info{{{labels}}} 1\n")));
        assert!(text.contains(&format!(
            "docker_container_cpu_usage_seconds_total{{{labels}}} 1.5\n"
        )));
        assert!(text.contains(&format!("docker_container_memory_usage_bytes{{{labels}}} 2048\n")));
        assert!(!text.contains("docker_container_memory_limit_bytes"));
        assert!(!text.contains("other"));
    }

    #[test]
    fn colliding_label_names_are_exposed_once() {
        let containers: Vec<ContainerSummary> = serde_json::from_str(
            r#"[{"Id":"abc","Names":["/web"],"Image":"nginx","Labels":{"a.b":"x","a_b":"y"}}]"#,
        )
        .unwrap();
        let stats = vec![CgroupStats {
            cpu_usage_seconds: None,
            memory_usage_bytes: None,
            memory_limit_bytes: None,
        }];
        let text = collector(&["a.b", "a_b"])
            .as_metrics_result(&containers, &stats, MetricsResult::new("docker"))
            .as_text();
        assert!(text.contains(
            "docker_container_info{id=\"abc\",name=\"web\",image=\"nginx\",label_a_b=\"x\"} 1\n"
        ));
        assert_eq!(text.matches("label_a_b=").count(), 1);
    }

    #[test]
    fn no_containers() {
        let text = collector(&[])
            .as_metrics_result(&[], &[], MetricsResult::new("docker"))
            .as_text();
        assert!(text.contains("docker_containers_running 0\n"));
        assert!(!text.contains("docker_container_info"));
    }

    #[tokio::test]
    async fn unreachable_daemon_fails_construction() {
        let e = DockerCollector::new(
            "unix:///nonexistent/docker.sock",
            "/sys/fs/cgroup",
            "/docker",
            vec![],
            Duration::from_millis(100),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(e.kind(), &ExporterErrorKind::StartupDependencyError);
    }
}
