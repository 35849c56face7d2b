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

//! Parsing of configuration for the Docker collector.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use muxporter_collectors::DockerCollector;
use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for the Docker collector.
#[derive(Debug, Deserialize, Serialize)]
pub struct DockerConfig {
    /// See [Self::address()].
    address: String,
    /// See [Self::cgroup_parent()].
    parent: String,
    /// See [Self::cgroup_root()].
    cgrouproot: String,
    /// See [Self::label_filter()].
    labels: String,
}

impl AppConfigDefaults for DockerConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(prefix.to_string() + "." + "address", "")?
            .set_default(prefix.to_string() + "." + "parent", "/docker")?
            .set_default(prefix.to_string() + "." + "cgrouproot", "/sys/fs/cgroup")?
            .set_default(prefix.to_string() + "." + "labels", "")
    }
}

impl DockerConfig {
    const SUPPORTED_SCHEMES: [&str; 4] = ["unix://", "tcp://", "http://", "https://"];

    /// Return `true` if the Docker collector should be enabled.
    pub fn is_enabled(&self) -> bool {
        !self.address.trim().is_empty()
    }

    /// Docker Engine API address like `unix:///var/run/docker.sock` or
    /// `tcp://127.0.0.1:2375`.
    pub fn address(&self) -> &str {
        self.address.trim()
    }

    /// Parent cgroup of the containers. Defaults to `/docker`.
    pub fn cgroup_parent(&self) -> &str {
        &self.parent
    }

    /// Mount point of the cgroup filesystem. Defaults to `/sys/fs/cgroup`.
    pub fn cgroup_root(&self) -> &str {
        &self.cgrouproot
    }

    /// Container labels to expose as metric labels.
    pub fn label_filter(&self) -> Vec<String> {
        super::split_list(&self.labels)
    }

    pub(super) fn validate(&self) -> Result<(), ExporterError> {
        if self.is_enabled()
            && !Self::SUPPORTED_SCHEMES
                .iter()
                .any(|scheme| self.address().starts_with(scheme))
        {
            return Err(ExporterErrorKind::ConfigurationError.error_with_msg(format!(
                "Docker address '{}' must start with one of {:?}.",
                self.address(),
                Self::SUPPORTED_SCHEMES
            )));
        }
        let label_filter = self.label_filter();
        for (index, key) in label_filter.iter().enumerate() {
            let label_name = DockerCollector::metric_label_name(key);
            if let Some(other) = label_filter[..index]
                .iter()
                .find(|other| DockerCollector::metric_label_name(other) == label_name)
            {
                return Err(ExporterErrorKind::ConfigurationError.error_with_msg(format!(
                    "Docker labels '{other}' and '{key}' would both be exposed as '{label_name}'."
                )));
            }
        }
        Ok(())
    }
}
