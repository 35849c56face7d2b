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

//! Parsing of configuration for the MongoDB collector.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use muxporter_collectors::ServerStatusGroup;
use muxporter_metrics::ExporterError;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for the MongoDB collector.
#[derive(Deserialize, Serialize)]
pub struct MongodbConfig {
    /// See [Self::uri()].
    #[serde(skip_serializing)]
    uri: String,
    /// See [Self::enabled_groups()].
    groups: String,
}

impl std::fmt::Debug for MongodbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URI may carry credentials
        f.debug_struct("MongodbConfig")
            .field("enabled", &self.is_enabled())
            .field("groups", &self.groups)
            .finish()
    }
}

impl AppConfigDefaults for MongodbConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(prefix.to_string() + "." + "uri", "")?
            .set_default(
                prefix.to_string() + "." + "groups",
                ServerStatusGroup::DEFAULT_GROUPS,
            )
    }
}

impl MongodbConfig {
    /// Return `true` if the MongoDB collector should be enabled.
    pub fn is_enabled(&self) -> bool {
        !self.uri.trim().is_empty()
    }

    /// Connection string in the form
    /// `[mongodb://][user:pass@]host1[:port1][,host2[:port2],...][/database][?options]`.
    pub fn uri(&self) -> &str {
        self.uri.trim()
    }

    /// `serverStatus` sections to expose.
    pub fn enabled_groups(&self) -> Result<Vec<ServerStatusGroup>, ExporterError> {
        ServerStatusGroup::parse_list(&self.groups)
    }

    pub(super) fn validate(&self) -> Result<(), ExporterError> {
        self.enabled_groups().map(|_| ())
    }
}
