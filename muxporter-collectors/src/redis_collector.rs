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

//! Metrics from the `INFO` command of one or more Redis nodes.

mod redis_info;
mod resp_client;

use self::redis_info::RedisInfo;
use self::resp_client::RespClient;
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

/// Scrapes `INFO` from every configured node on each call.
pub struct RedisCollector {
    addresses: Vec<String>,
    timeout: Duration,
}

impl RedisCollector {
    /// Namespace and registry identity of this collector.
    pub const COMPONENT_NAME: &str = "redis";
    const METRIC_NAME_UP: &str = "up";
    const METRIC_NAME_INSTANCE_INFO: &str = "instance_info";
    const METRIC_NAME_DB_KEYS: &str = "db_keys";
    const METRIC_NAME_DB_KEYS_EXPIRING: &str = "db_keys_expiring";
    const METRIC_LABEL_ADDR: &str = "addr";
    const METRIC_LABEL_DB: &str = "db";
    /// `INFO` fields that only grow and their exposed counter names.
    const COUNTERS: &[(&str, &str)] = &[
        ("total_commands_processed", "commands_processed_total"),
        ("total_connections_received", "connections_received_total"),
        ("rejected_connections", "rejected_connections_total"),
        ("expired_keys", "expired_keys_total"),
        ("evicted_keys", "evicted_keys_total"),
        ("keyspace_hits", "keyspace_hits_total"),
        ("keyspace_misses", "keyspace_misses_total"),
        ("total_net_input_bytes", "net_input_bytes_total"),
        ("total_net_output_bytes", "net_output_bytes_total"),
    ];

    /// Return a new instance for the nodes at `addresses`.
    ///
    /// Addresses are in the form `host:port` with an optional `redis://`
    /// prefix.
    pub fn new(addresses: &[String], timeout: Duration) -> Result<Self, ExporterError> {
        let addresses = addresses
            .iter()
            .map(|address| Self::normalize_address(address))
            .collect::<Result<Vec<_>, _>>()?;
        if addresses.is_empty() {
            return Err(ExporterErrorKind::ConfigurationError
                .error_with_msg("At least one Redis address is required."));
        }
        Ok(Self { addresses, timeout })
    }

    /// Strip the optional scheme and require a `host:port` pair.
    pub fn normalize_address(address: &str) -> Result<String, ExporterError> {
        let address = address.trim();
        let address = address.strip_prefix("redis://").unwrap_or(address);
        let address = address.trim_end_matches('/');
        match address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(address.to_owned())
            }
            _ => Err(ExporterErrorKind::ConfigurationError.error_with_msg(format!(
                "Redis address '{address}' is not in the form 'host:port'."
            ))),
        }
    }

    /// Append the metrics of a single node.
    fn add_node_metrics(
        mut metrics_result: MetricsResult,
        address: &str,
        info: &RedisInfo,
    ) -> MetricsResult {
        let mut instance_info = MetricLabeledValue::new(1.0).add_label(Self::METRIC_LABEL_ADDR, address);
        for (label, value) in [
            ("role", &info.role),
            ("redis_version", &info.version),
            ("redis_mode", &info.mode),
        ] {
            if let Some(value) = value {
                instance_info = instance_info.add_label(label, value.as_str());
            }
        }
        metrics_result = metrics_result.add_metric(
            Metric::from_metric_labeled_value(Self::METRIC_NAME_INSTANCE_INFO, instance_info)
                .set_type(MetricType::Gauge)
                .set_help("Identity of the Redis node."),
        );
        for (field, value) in &info.numeric_fields {
            let mlv = MetricLabeledValue::new(*value).add_label(Self::METRIC_LABEL_ADDR, address);
            let metric = match Self::COUNTERS.iter().find(|(name, _)| *name == field.as_str()) {
                Some((_, counter_name)) => {
                    Metric::from_metric_labeled_value(*counter_name, mlv).set_type(MetricType::Counter)
                }
                None => Metric::from_metric_labeled_value(sanitize_name(field), mlv)
                    .set_type(MetricType::Gauge),
            };
            metrics_result = metrics_result.add_metric(metric);
        }
        for keyspace in &info.keyspaces {
            metrics_result = metrics_result
                .add_metric(
                    Metric::from_metric_labeled_value(
                        Self::METRIC_NAME_DB_KEYS,
                        MetricLabeledValue::new(keyspace.keys)
                            .add_label(Self::METRIC_LABEL_ADDR, address)
                            .add_label(Self::METRIC_LABEL_DB, keyspace.db.as_str()),
                    )
                    .set_type(MetricType::Gauge)
                    .set_help("Total number of keys by DB."),
                )
                .add_metric(
                    Metric::from_metric_labeled_value(
                        Self::METRIC_NAME_DB_KEYS_EXPIRING,
                        MetricLabeledValue::new(keyspace.expires)
                            .add_label(Self::METRIC_LABEL_ADDR, address)
                            .add_label(Self::METRIC_LABEL_DB, keyspace.db.as_str()),
                    )
                    .set_type(MetricType::Gauge)
                    .set_help("Total number of expiring keys by DB."),
                );
        }
        metrics_result
    }

    fn up_metric(address: &str, up: bool) -> Metric {
        Metric::from_metric_labeled_value(
            Self::METRIC_NAME_UP,
            MetricLabeledValue::new(if up { 1.0 } else { 0.0 })
                .add_label(Self::METRIC_LABEL_ADDR, address),
        )
        .set_type(MetricType::Gauge)
        .set_help("Whether the last scrape of the Redis node was successful.")
    }
}

#[async_trait]
impl MetricsProvider for RedisCollector {
    async fn metrics(&self, mut metrics_result: MetricsResult) -> Result<MetricsResult, ExporterError> {
        let replies = futures::future::join_all(
            self.addresses
                .iter()
                .map(|address| RespClient::info(address, self.timeout)),
        )
        .await;
        let mut failures = 0;
        let mut last_error = None;
        for (address, reply) in self.addresses.iter().zip(replies) {
            match reply {
                Ok(info) => {
                    metrics_result = metrics_result.add_metric(Self::up_metric(address, true));
                    metrics_result =
                        Self::add_node_metrics(metrics_result, address, &RedisInfo::parse(&info));
                }
                Err(e) => {
                    log::debug!("Scraping Redis node '{address}' failed: {e}");
                    metrics_result = metrics_result.add_metric(Self::up_metric(address, false));
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            // No node could be reached
            Some(e) if failures == self.addresses.len() => Err(e),
            _ => Ok(metrics_result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn init_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    #[test]
    fn normalizes_addresses() {
        assert_eq!(
            RedisCollector::normalize_address(" redis://127.0.0.1:6379/ ").unwrap(),
            "127.0.0.1:6379"
        );
        assert!(RedisCollector::normalize_address("localhost").is_err());
        assert!(RedisCollector::normalize_address(":6379").is_err());
        assert!(RedisCollector::normalize_address("host:port").is_err());
        assert!(RedisCollector::new(&[], Duration::from_secs(1)).is_err());
    }

    #[test]
    fn exposes_counters_gauges_and_keyspace() {
        let info = RedisInfo::parse(
            "role:master\r\nredis_version:7.2.4\r\nconnected_clients:4\r\ntotal_commands_processed:99\r\ndb0:keys=10,expires=2,avg_ttl=0\r\n",
        );
        let text = RedisCollector::add_node_metrics(MetricsResult::new("redis"), "a:6379", &info)
            .as_text();
        assert!(text.contains(
            "redis_instance_info{addr=\"a:6379\",role=\"master\",redis_version=\"7.2.4\"} 1\n"
        ));
        assert!(text.contains("# TYPE redis_connected_clients gauge\n"));
        assert!(text.contains("redis_connected_clients{addr=\"a:6379\"} 4\n"));
        assert!(text.contains("# TYPE redis_commands_processed_total counter\n"));
        assert!(text.contains("redis_commands_processed_total{addr=\"a:6379\"} 99\n"));
        assert!(text.contains("redis_db_keys{addr=\"a:6379\",db=\"db0\"} 10\n"));
        assert!(text.contains("redis_db_keys_expiring{addr=\"a:6379\",db=\"db0\"} 2\n"));
    }

    /// Serve a single canned `INFO` reply per connection.
    async fn fake_node() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 14];
                if socket.read_exact(&mut request).await.is_err() {
                    continue;
                }
                let body = "# Server\r\nuptime_in_seconds:5\r\n";
                let reply = format!("${}\r\n{body}\r\n", body.len());
                let _ = socket.write_all(reply.as_bytes()).await;
            }
        });
        address
    }

    /// Reserve a local port and close it again.
    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    }

    #[tokio::test]
    async fn one_down_node_does_not_hide_the_others() {
        init_logger();
        let up = fake_node().await;
        let down = closed_port().await;
        let collector =
            RedisCollector::new(&[up.clone(), down.clone()], Duration::from_secs(2)).unwrap();
        let text = collector
            .metrics(MetricsResult::new("redis"))
            .await
            .unwrap()
            .as_text();
        assert!(text.contains(&format!("redis_up{{addr=\"{up}\"}} 1\n")));
        assert!(text.contains(&format!("redis_up{{addr=\"{down}\"}} 0\n")));
        assert!(text.contains(&format!("redis_uptime_in_seconds{{addr=\"{up}\"}} 5\n")));
    }

    #[tokio::test]
    async fn all_nodes_down_is_an_error() {
        init_logger();
        let down = closed_port().await;
        let collector = RedisCollector::new(&[down], Duration::from_secs(2)).unwrap();
        assert!(collector.metrics(MetricsResult::new("redis")).await.is_err());
    }
}
