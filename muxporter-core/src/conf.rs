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

//! Parsing of application configuration.

mod api_config;
mod docker_config;
mod metrics_config;
mod mongodb_config;
mod nginx_config;
mod redis_config;

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use config::builder::BuilderState;
use config::builder::DefaultState;
use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;
use serde::Deserialize;
use serde::Serialize;

pub use self::api_config::ApiConfig;
pub use self::docker_config::DockerConfig;
pub use self::metrics_config::MetricsConfig;
pub use self::mongodb_config::MongodbConfig;
pub use self::nginx_config::NginxConfig;
pub use self::redis_config::RedisConfig;

/// Package version reported by Cargo at build time.
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Static trait for tracking implementations.
trait AppConfigDefaults {
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError>;
}

/// Comma separated list as trimmed non-empty entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

/**
Application configration root.

The application name defaults to the Rust package name, but can be overridden
with the environment variable `APP_NAME`.

Configuration will be loaded from

1. the file `{application name}.json` in the current working directory.
2. environment variable overrides in the form
   `{APPLICATION_NAME}_MODULE_CONFIGKEYWITHOUTSPACES`

Lists are comma separated strings.
 */
#[derive(Debug, Deserialize, Serialize)]
pub struct AppConfig {
    /// Configuration of the exposed metrics endpoint.
    pub api: ApiConfig,
    /// Configuration of the Docker collector.
    pub docker: DockerConfig,
    /// Configuration of the nginx collector.
    pub nginx: NginxConfig,
    /// Configuration of the Redis collector.
    pub redis: RedisConfig,
    /// Configuration of the MongoDB collector.
    pub mongodb: MongodbConfig,
    /// Configuration of scrape orchestration.
    pub metrics: MetricsConfig,

    /// Lower case application name. Ignored when loading configuration.
    #[serde(skip_deserializing)]
    app_name: String,
}

impl AppConfig {
    /// The application name defaults to the Rust package name, but can be
    /// overridden with the environment variable `APP_NAME`.
    fn read_app_name_lowercase(cargo_pkg_name: &str) -> String {
        std::env::var("APP_NAME")
            .map_err(|e| {
                log::debug!(
                    "Environment variable APP_NAME: {e:?} -> Default app name '{cargo_pkg_name}' will be used."
                );
            })
            .ok()
            .map(|value| value.to_lowercase())
            .unwrap_or(cargo_pkg_name.to_owned())
    }

    /// Lower case application name.
    pub fn app_name_lowercase(&self) -> &str {
        &self.app_name
    }

    /// SemVer application version derived from the Rust package version.
    pub fn app_version(&self) -> &'static str {
        CARGO_PKG_VERSION
    }

    fn config_builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let mut config_builder = Config::builder();
        config_builder = ApiConfig::set_defaults(config_builder, "api")?;
        config_builder = DockerConfig::set_defaults(config_builder, "docker")?;
        config_builder = NginxConfig::set_defaults(config_builder, "nginx")?;
        config_builder = RedisConfig::set_defaults(config_builder, "redis")?;
        config_builder = MongodbConfig::set_defaults(config_builder, "mongodb")?;
        config_builder = MetricsConfig::set_defaults(config_builder, "metrics")?;
        Ok(config_builder)
    }

    fn configuration_error(e: ConfigError) -> ExporterError {
        ExporterErrorKind::ConfigurationError.error_with_msg(format!("Invalid configuration: {e}"))
    }

    /** Creates a new instance pre-populated with defaults, an optional
    configurations file and environment variable overrides.

    Use `env!("CARGO_PKG_NAME")` as `cargo_pkg_name`.

    The result is validated before it is returned.
    */
    pub fn new(cargo_pkg_name: &str) -> Result<Self, ExporterError> {
        let app_name = Self::read_app_name_lowercase(cargo_pkg_name);
        let config_filename = app_name.to_owned() + ".json";
        let config_env_prefix = &app_name.to_uppercase();
        let conf_file = std::env::current_dir()
            .map_err(|e| {
                ExporterErrorKind::ConfigurationError
                    .error_with_msg(format!("Unable to determine working directory: {e}"))
            })?
            .join(config_filename);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Will load '{}' configuration if present.",
                conf_file.display()
            );
        }
        let config = Self::config_builder_with_defaults()
            .map_err(Self::configuration_error)?
            .add_source(File::from(conf_file).required(false))
            .add_source(Environment::with_prefix(config_env_prefix).separator("_"))
            .build()
            .map_err(Self::configuration_error)?;
        Self::from_config(config, app_name)
    }

    /// Creates a new instance from defaults and explicit `(key, value)`
    /// overrides like `("redis.addresses", "127.0.0.1:6379")`.
    ///
    /// Neither configuration file nor environment is consulted.
    pub fn with_overrides(app_name: &str, overrides: &[(&str, &str)]) -> Result<Self, ExporterError> {
        let mut config_builder =
            Self::config_builder_with_defaults().map_err(Self::configuration_error)?;
        for (key, value) in overrides {
            config_builder = config_builder
                .set_override(*key, *value)
                .map_err(Self::configuration_error)?;
        }
        let config = config_builder.build().map_err(Self::configuration_error)?;
        Self::from_config(config, app_name.to_lowercase())
    }

    fn from_config(config: Config, app_name: String) -> Result<Self, ExporterError> {
        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(Self::configuration_error)?;
        app_config.app_name = app_name;
        log::info!("Running with configuration: {app_config:?}");
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "Running with configuration: {}",
                serde_json::to_string(&app_config).unwrap_or_default()
            );
        }
        app_config.validate()?;
        Ok(app_config)
    }

    /// Check the configuration for errors that would prevent startup.
    pub fn validate(&self) -> Result<(), ExporterError> {
        self.api.validate()?;
        self.docker.validate()?;
        self.nginx.validate()?;
        self.redis.validate()?;
        self.mongodb.validate()?;
        self.metrics.validate()
    }
}
