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

//! Parsing of configuration for the Redis collector.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use muxporter_collectors::RedisCollector;
use muxporter_metrics::ExporterError;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for the Redis collector.
#[derive(Debug, Deserialize, Serialize)]
pub struct RedisConfig {
    /// See [Self::addresses()].
    addresses: String,
}

impl AppConfigDefaults for RedisConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder.set_default(prefix.to_string() + "." + "addresses", "")
    }
}

impl RedisConfig {
    /// Return `true` if the Redis collector should be enabled.
    pub fn is_enabled(&self) -> bool {
        !self.addresses().is_empty()
    }

    /// Redis nodes as `[redis://]host:port`.
    pub fn addresses(&self) -> Vec<String> {
        super::split_list(&self.addresses)
    }

    pub(super) fn validate(&self) -> Result<(), ExporterError> {
        self.addresses()
            .iter()
            .try_for_each(|address| RedisCollector::normalize_address(address).map(|_| ()))
    }
}
