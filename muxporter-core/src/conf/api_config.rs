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

//! Parsing of configuration for the application's exposed metrics endpoint.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for the application's exposed metrics endpoint.
#[derive(Deserialize, Serialize)]
pub struct ApiConfig {
    /// IP address to bind to.
    address: String,
    /// IP port to bind to.
    port: u16,
    /// See [Self::metrics_path()].
    path: String,
    /// See [Self::basic_auth_user()].
    authuser: String,
    /// See [Self::basic_auth_pass()].
    #[serde(skip_serializing)]
    authpass: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("authuser", &self.authuser)
            .field(
                "authpass",
                &if self.authpass.is_empty() { "" } else { "<redacted>" },
            )
            .finish()
    }
}

impl AppConfigDefaults for ApiConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(prefix.to_string() + "." + "address", "0.0.0.0")?
            .set_default(prefix.to_string() + "." + "port", "9104")?
            .set_default(prefix.to_string() + "." + "path", "/metrics")?
            .set_default(prefix.to_string() + "." + "authuser", "")?
            .set_default(prefix.to_string() + "." + "authpass", "")
    }
}

impl ApiConfig {
    /// IP address to bind to. Defaults to the IPv4 address `0.0.0.0`.
    pub fn bind_address(&self) -> &str {
        &self.address
    }

    /// IP port to bind to. Defaults to `9104`.
    pub fn bind_port(&self) -> u16 {
        self.port
    }

    /// Absolute path the metrics are exposed under. Defaults to `/metrics`.
    pub fn metrics_path(&self) -> &str {
        &self.path
    }

    /// Basic authentication user name. Empty when disabled.
    pub fn basic_auth_user(&self) -> &str {
        &self.authuser
    }

    /// Basic authentication password. Empty when disabled.
    pub fn basic_auth_pass(&self) -> &str {
        &self.authpass
    }

    pub(super) fn validate(&self) -> Result<(), ExporterError> {
        if !self.path.starts_with('/') {
            return Err(ExporterErrorKind::ConfigurationError.error_with_msg(format!(
                "Metrics path '{}' must start with '/'.",
                self.path
            )));
        }
        if self.authuser.is_empty() != self.authpass.is_empty() {
            return Err(ExporterErrorKind::ConfigurationError.error_with_msg(
                "Both 'api.authuser' and 'api.authpass' must be set to enable basic authentication.",
            ));
        }
        Ok(())
    }
}
