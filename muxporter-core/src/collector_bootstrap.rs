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

//! Conditional construction and registration of collectors.

use crate::conf::AppConfig;
use muxporter_collectors::DockerCollector;
use muxporter_collectors::MongodbCollector;
use muxporter_collectors::NginxCollector;
use muxporter_collectors::RedisCollector;
use muxporter_metrics::ExporterError;
use muxporter_metrics::registry::MetricsProvider;
use muxporter_metrics::registry::MetricsProviderRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Collector that may be enabled by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CollectorCandidate {
    Docker,
    Nginx,
    Redis,
    Mongodb,
}

impl CollectorCandidate {
    /// Evaluation and registration order.
    const ALL: [Self; 4] = [Self::Docker, Self::Nginx, Self::Redis, Self::Mongodb];

    fn component_name(&self) -> &'static str {
        match self {
            Self::Docker => DockerCollector::COMPONENT_NAME,
            Self::Nginx => NginxCollector::COMPONENT_NAME,
            Self::Redis => RedisCollector::COMPONENT_NAME,
            Self::Mongodb => MongodbCollector::COMPONENT_NAME,
        }
    }

    fn is_enabled(&self, app_config: &AppConfig) -> bool {
        match self {
            Self::Docker => app_config.docker.is_enabled(),
            Self::Nginx => app_config.nginx.is_enabled(),
            Self::Redis => app_config.redis.is_enabled(),
            Self::Mongodb => app_config.mongodb.is_enabled(),
        }
    }

    async fn construct(
        &self,
        app_config: &AppConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn MetricsProvider>, ExporterError> {
        let provider: Arc<dyn MetricsProvider> = match self {
            Self::Docker => Arc::new(
                DockerCollector::new(
                    app_config.docker.address(),
                    app_config.docker.cgroup_root(),
                    app_config.docker.cgroup_parent(),
                    app_config.docker.label_filter(),
                    timeout,
                )
                .await?,
            ),
            Self::Nginx => Arc::new(NginxCollector::new(
                app_config.nginx.status_uri(),
                app_config.nginx.insecure(),
                timeout,
            )?),
            Self::Redis => Arc::new(RedisCollector::new(
                &app_config.redis.addresses(),
                timeout,
            )?),
            Self::Mongodb => Arc::new(
                MongodbCollector::new(
                    app_config.mongodb.uri(),
                    app_config.mongodb.enabled_groups()?,
                    timeout,
                )
                .await?,
            ),
        };
        Ok(provider)
    }
}

/** Builds the [MetricsProviderRegistry] from configuration.

Every collector whose subsystem address is configured is constructed and
registered once, in a fixed order. Collectors without an address are skipped.
Any construction or registration failure aborts the bootstrap.
*/
pub struct CollectorBootstrap;

impl CollectorBootstrap {
    /// I/O timeout used by each collector.
    pub const COLLECTOR_TIMEOUT: Duration = Duration::from_secs(5);

    /// Construct and register all enabled collectors.
    pub async fn build_registry(
        app_config: &AppConfig,
    ) -> Result<MetricsProviderRegistry, ExporterError> {
        let mut registry =
            MetricsProviderRegistry::new(app_config.app_name_lowercase(), app_config.app_version())
                .with_scrape_timeout(app_config.metrics.scrape_timeout())
                .with_grouping_window(app_config.metrics.grouping_window());
        for candidate in CollectorCandidate::ALL {
            let component_name = candidate.component_name();
            if !candidate.is_enabled(app_config) {
                log::debug!("Collector '{component_name}' is not configured.");
                continue;
            }
            let provider = candidate
                .construct(app_config, Self::COLLECTOR_TIMEOUT)
                .await?;
            registry.register_metrics(component_name, provider)?;
            log::info!("Collector '{component_name}' enabled.");
        }
        if registry.is_empty() {
            log::warn!("No collector is configured. Only application metrics will be exposed.");
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muxporter_metrics::ExporterErrorKind;
    use tokio::io::AsyncReadExt;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn init_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    fn registered_names(registry: &MetricsProviderRegistry) -> Vec<String> {
        registry
            .providers()
            .map(|(component_name, _)| component_name.to_owned())
            .collect()
    }

    #[tokio::test]
    async fn nothing_configured_registers_nothing() {
        init_logger();
        let app_config = AppConfig::with_overrides("muxporter", &[]).unwrap();
        let registry = CollectorBootstrap::build_registry(&app_config).await.unwrap();
        assert!(registry.is_empty());
    }

    /// Redis node that answers every `INFO` with a minimal reply.
    async fn fake_redis_node() -> String {
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

    #[tokio::test]
    async fn only_configured_collectors_are_registered() {
        init_logger();
        let address = fake_redis_node().await;
        let app_config = AppConfig::with_overrides(
            "muxporter",
            &[("redis.addresses", address.as_str())],
        )
        .unwrap();
        let registry = CollectorBootstrap::build_registry(&app_config).await.unwrap();
        assert_eq!(registered_names(&registry), vec!["redis"]);
        let metrics_results = registry.get_metrics().await;
        assert_eq!(
            metrics_results.namespaces().collect::<Vec<_>>(),
            vec!["muxporter", "redis"]
        );
        let text = metrics_results.as_text();
        assert!(text.contains(&format!("redis_up{{addr=\"{address}\"}} 1\n")));
        for absent in ["docker_", "nginx_", "mongodb_"] {
            assert!(
                !text.lines().any(|line| line.starts_with(absent)),
                "{absent} in {text}"
            );
        }
    }

    #[tokio::test]
    async fn registration_follows_candidate_order() {
        init_logger();
        let app_config = AppConfig::with_overrides(
            "muxporter",
            &[
                ("redis.addresses", "127.0.0.1:6379"),
                ("nginx.uri", "http://127.0.0.1:8080/stub_status"),
                ("mongodb.uri", "127.0.0.1:27017"),
            ],
        )
        .unwrap();
        let registry = CollectorBootstrap::build_registry(&app_config).await.unwrap();
        assert_eq!(
            registered_names(&registry),
            vec!["nginx", "redis", "mongodb"]
        );
    }

    #[tokio::test]
    async fn unreachable_docker_is_fatal() {
        init_logger();
        let app_config = AppConfig::with_overrides(
            "muxporter",
            &[("docker.address", "unix:///nonexistent/docker.sock")],
        )
        .unwrap();
        let e = CollectorBootstrap::build_registry(&app_config)
            .await
            .err()
            .unwrap();
        assert_eq!(e.kind(), &ExporterErrorKind::StartupDependencyError);
    }
}
