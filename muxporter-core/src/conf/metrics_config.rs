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

//! Parsing of configuration for scrape orchestration.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::AppConfigDefaults;

/// Configuration for scrape orchestration.
#[derive(Debug, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// See [Self::scrape_timeout()].
    timeout: u64,
    /// See [Self::grouping_window()].
    cachems: u64,
}

impl AppConfigDefaults for MetricsConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(prefix.to_string() + "." + "timeout", "10000")?
            .set_default(prefix.to_string() + "." + "cachems", "1000")
    }
}

impl MetricsConfig {
    /// Upper bound for how long a single collector may take to respond.
    /// Defaults to 10 seconds.
    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Time a completed scrape is reused for concurrent requests. Defaults to
    /// 1 second. Zero disables reuse.
    pub fn grouping_window(&self) -> Duration {
        Duration::from_millis(self.cachems)
    }

    pub(super) fn validate(&self) -> Result<(), ExporterError> {
        if self.timeout == 0 {
            return Err(ExporterErrorKind::ConfigurationError
                .error_with_msg("'metrics.timeout' must be greater than zero."));
        }
        Ok(())
    }
}
