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

//! Collector contract.

use super::MetricsResult;
use crate::ExporterError;
use async_trait::async_trait;

/** A source of metrics for one monitored subsystem.

Implementations are invoked concurrently from simultaneous scrapes and must
bound their own I/O with timeouts. A returned error means that the provider
contributes no metrics to the current scrape.
*/
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Append the current metrics of the subsystem to `metrics_result`.
    async fn metrics(&self, metrics_result: MetricsResult) -> Result<MetricsResult, ExporterError>;
}
