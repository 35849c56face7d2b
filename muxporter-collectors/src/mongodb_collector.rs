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

//! Metrics from MongoDB `serverStatus`.

mod server_status_group;

pub use self::server_status_group::ServerStatusGroup;
use async_trait::async_trait;
use mongodb::Client;
use mongodb::bson::Bson;
use mongodb::bson::Document;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;
use muxporter_metrics::metric::Metric;
use muxporter_metrics::metric::MetricLabeledValue;
use muxporter_metrics::metric::MetricType;
use muxporter_metrics::metric::sanitize_name;
use muxporter_metrics::registry::MetricsProvider;
use muxporter_metrics::registry::MetricsResult;
use std::collections::HashSet;
use std::time::Duration;

/** Runs `serverStatus` on every call and exposes the numeric values of the
enabled [ServerStatusGroup]s.

The driver [Client] is created once. It connects lazily and keeps its own
connection pool, so concurrent scrapes are fine.
*/
pub struct MongodbCollector {
    client: Client,
    enabled_groups: Vec<ServerStatusGroup>,
    timeout: Duration,
}

impl MongodbCollector {
    /// Namespace and registry identity of this collector.
    pub const COMPONENT_NAME: &str = "mongodb";
    const METRIC_NAME_UP: &str = "up";

    /// Return a new instance.
    ///
    /// `uri` has the form
    /// `[mongodb://][user:pass@]host1[:port1][,host2[:port2],...][/database][?options]`.
    pub async fn new(
        uri: &str,
        enabled_groups: Vec<ServerStatusGroup>,
        timeout: Duration,
    ) -> Result<Self, ExporterError> {
        let uri = if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            uri.to_owned()
        } else {
            format!("mongodb://{uri}")
        };
        let mut client_options = ClientOptions::parse(uri.as_str()).await.map_err(|e| {
            ExporterErrorKind::ConfigurationError
                .error_with_msg(format!("Invalid MongoDB URI: {e}"))
        })?;
        client_options.connect_timeout = Some(timeout);
        client_options.server_selection_timeout = Some(timeout);
        client_options.app_name = Some("muxporter".to_owned());
        let client = Client::with_options(client_options).map_err(|e| {
            ExporterErrorKind::StartupDependencyError
                .error_with_msg(format!("Failed to create MongoDB client: {e}"))
        })?;
        Ok(Self {
            client,
            enabled_groups,
            timeout,
        })
    }

    async fn server_status(&self) -> Result<Document, ExporterError> {
        tokio::time::timeout(
            self.timeout,
            self.client
                .database("admin")
                .run_command(doc! { "serverStatus": 1 }),
        )
        .await
        .map_err(|_| {
            ExporterErrorKind::CollectorTimeout.error_with_msg(format!(
                "serverStatus did not complete within {} ms.",
                self.timeout.as_millis()
            ))
        })?
        .map_err(|e| {
            ExporterErrorKind::CollectorUnreachable
                .error_with_msg(format!("serverStatus failed: {e}"))
        })
    }

    /// Append the numeric leaves of each enabled section.
    fn add_group_metrics(
        mut metrics_result: MetricsResult,
        enabled_groups: &[ServerStatusGroup],
        server_status: &Document,
    ) -> MetricsResult {
        let mut seen = HashSet::new();
        for group in enabled_groups {
            let Ok(section) = server_status.get_document(group.section()) else {
                log::trace!("serverStatus has no section '{}'.", group.section());
                continue;
            };
            let mut values = Vec::new();
            Self::flatten(group.name(), section, &mut values);
            for (metric_name, value) in values {
                if !seen.insert(metric_name.clone()) {
                    log::debug!("Skipping repeated serverStatus metric '{metric_name}'.");
                    continue;
                }
                metrics_result = metrics_result.add_metric(
                    Metric::from_metric_labeled_value(metric_name, MetricLabeledValue::new(value))
                        .set_type(MetricType::Gauge),
                );
            }
        }
        metrics_result
    }

    /// Collect `(name, value)` for every numeric or boolean leaf of `document`.
    fn flatten(prefix: &str, document: &Document, values: &mut Vec<(String, f64)>) {
        for (key, value) in document {
            let name = prefix.to_string() + "_" + &Self::key_name(key);
            match value {
                Bson::Double(value) => values.push((name, *value)),
                Bson::Int32(value) => values.push((name, f64::from(*value))),
                Bson::Int64(value) => values.push((name, *value as f64)),
                Bson::Boolean(value) => values.push((name, if *value { 1.0 } else { 0.0 })),
                Bson::Document(document) => Self::flatten(&name, document, values),
                _ => {}
            }
        }
    }

    /// Lock statistics are keyed by lock mode, where case carries meaning.
    fn key_name(key: &str) -> String {
        match key {
            "r" => "intent_shared".to_owned(),
            "w" => "intent_exclusive".to_owned(),
            "R" => "shared".to_owned(),
            "W" => "exclusive".to_owned(),
            _ => Self::to_snake_case(key),
        }
    }

    /// `globalLock` -> `global_lock`
    fn to_snake_case(name: &str) -> String {
        let chars = name.chars().collect::<Vec<_>>();
        let mut ret = String::with_capacity(name.len() + 4);
        for (i, c) in chars.iter().enumerate() {
            if c.is_ascii_uppercase() {
                if i > 0 {
                    let previous = chars[i - 1];
                    let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
                    if previous.is_ascii_lowercase()
                        || previous.is_ascii_digit()
                        || (previous.is_ascii_uppercase() && next_is_lower)
                    {
                        ret.push('_');
                    }
                }
                ret.push(c.to_ascii_lowercase());
            } else {
                ret.push(*c);
            }
        }
        sanitize_name(&ret)
    }
}

#[async_trait]
impl MetricsProvider for MongodbCollector {
    async fn metrics(&self, metrics_result: MetricsResult) -> Result<MetricsResult, ExporterError> {
        let server_status = self.server_status().await?;
        let metrics_result = metrics_result.add_metric(
            Metric::from_metric_labeled_value(Self::METRIC_NAME_UP, MetricLabeledValue::new(1.0))
                .set_type(MetricType::Gauge)
                .set_help("Whether serverStatus could be retrieved."),
        );
        Ok(Self::add_group_metrics(
            metrics_result,
            &self.enabled_groups,
            &server_status,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_names() {
        assert_eq!(MongodbCollector::to_snake_case("globalLock"), "global_lock");
        assert_eq!(MongodbCollector::to_snake_case("opcountersRepl"), "opcounters_repl");
        assert_eq!(MongodbCollector::to_snake_case("totalCreated"), "total_created");
        assert_eq!(MongodbCollector::to_snake_case("page_faults"), "page_faults");
        assert_eq!(MongodbCollector::to_snake_case("numTCPConns"), "num_tcp_conns");
        assert_eq!(MongodbCollector::to_snake_case("<UNKNOWN>"), "_unknown_");
    }

    #[test]
    fn exposes_enabled_sections_only() {
        let server_status = doc! {
            "host": "db1",
            "connections": { "current": 3_i32, "available": 100_i32, "totalCreated": 7_i64 },
            "globalLock": { "currentQueue": { "total": 0_i32, "readers": 1_i32 } },
            "mem": { "bits": 64_i32, "resident": 12.5_f64, "supported": true },
            "opcounters": { "insert": 5_i64 },
        };
        let text = MongodbCollector::add_group_metrics(
            MetricsResult::new("mongodb"),
            &[
                ServerStatusGroup::Connections,
                ServerStatusGroup::GlobalLock,
                ServerStatusGroup::Memory,
                ServerStatusGroup::Durability,
            ],
            &server_status,
        )
        .as_text();
        assert!(text.contains("mongodb_connections_current 3\n"));
        assert!(text.contains("mongodb_connections_total_created 7\n"));
        assert!(text.contains("mongodb_global_lock_current_queue_readers 1\n"));
        assert!(text.contains("mongodb_memory_resident 12.5\n"));
        assert!(text.contains("mongodb_memory_supported 1\n"));
        assert!(!text.contains("op_counters"));
        assert!(!text.contains("host"));
    }

    #[test]
    fn lock_modes_keep_distinct_names() {
        let server_status = doc! {
            "locks": {
                "Global": {
                    "acquireCount": { "r": 10_i64, "w": 20_i64, "R": 3_i64, "W": 4_i64 },
                },
            },
        };
        let text = MongodbCollector::add_group_metrics(
            MetricsResult::new("mongodb"),
            &[ServerStatusGroup::Locks],
            &server_status,
        )
        .as_text();
        assert!(text.contains("mongodb_locks_global_acquire_count_intent_shared 10\n"));
        assert!(text.contains("mongodb_locks_global_acquire_count_intent_exclusive 20\n"));
        assert!(text.contains("mongodb_locks_global_acquire_count_shared 3\n"));
        assert!(text.contains("mongodb_locks_global_acquire_count_exclusive 4\n"));
    }

    #[tokio::test]
    async fn invalid_uri_is_a_configuration_error() {
        let e = MongodbCollector::new("mongodb://", vec![], Duration::from_millis(100))
            .await
            .err()
            .unwrap();
        assert_eq!(e.kind(), &ExporterErrorKind::ConfigurationError);
    }
}
