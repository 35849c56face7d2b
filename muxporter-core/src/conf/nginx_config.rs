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

//! Parsing of configuration for the nginx collector.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use muxporter_collectors::NginxCollector;
use muxporter_metrics::ExporterError;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for the nginx collector.
#[derive(Debug, Deserialize, Serialize)]
pub struct NginxConfig {
    /// See [Self::status_uri()].
    uri: String,
    /// See [Self::insecure()].
    insecure: bool,
}

impl AppConfigDefaults for NginxConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(prefix.to_string() + "." + "uri", "")?
            .set_default(prefix.to_string() + "." + "insecure", "true")
    }
}

impl NginxConfig {
    /// Return `true` if the nginx collector should be enabled.
    pub fn is_enabled(&self) -> bool {
        !self.uri.trim().is_empty()
    }

    /// URI of the nginx `stub_status` page.
    pub fn status_uri(&self) -> &str {
        self.uri.trim()
    }

    /// Skip server certificate verification of a `https` status page.
    /// Defaults to `true`.
    pub fn insecure(&self) -> bool {
        self.insecure
    }

    pub(super) fn validate(&self) -> Result<(), ExporterError> {
        if self.is_enabled() {
            NginxCollector::parse_status_uri(self.status_uri())?;
        }
        Ok(())
    }
}
