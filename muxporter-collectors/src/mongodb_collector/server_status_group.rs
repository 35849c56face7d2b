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

//! Selectable sections of the `serverStatus` command output.

use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;

/// A group of MongoDB metrics backed by one `serverStatus` section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerStatusGroup {
    /// `asserts`
    Asserts,
    /// `dur` (journaling, only present on older storage engines)
    Durability,
    /// `backgroundFlushing`
    BackgroundFlushing,
    /// `connections`
    Connections,
    /// `extra_info`
    ExtraInfo,
    /// `globalLock`
    GlobalLock,
    /// `indexCounters`
    IndexCounters,
    /// `network`
    Network,
    /// `opcounters`
    OpCounters,
    /// `opcountersRepl`
    OpCountersRepl,
    /// `mem`
    Memory,
    /// `locks`
    Locks,
    /// `metrics`
    Metrics,
}

impl ServerStatusGroup {
    /// Group names enabled unless configured otherwise.
    pub const DEFAULT_GROUPS: &str = "asserts,durability,background_flushing,connections,extra_info,global_lock,index_counters,network,op_counters,op_counters_repl,memory,locks,metrics";

    const ALL: [(Self, &str, &str); 13] = [
        (Self::Asserts, "asserts", "asserts"),
        (Self::Durability, "durability", "dur"),
        (Self::BackgroundFlushing, "background_flushing", "backgroundFlushing"),
        (Self::Connections, "connections", "connections"),
        (Self::ExtraInfo, "extra_info", "extra_info"),
        (Self::GlobalLock, "global_lock", "globalLock"),
        (Self::IndexCounters, "index_counters", "indexCounters"),
        (Self::Network, "network", "network"),
        (Self::OpCounters, "op_counters", "opcounters"),
        (Self::OpCountersRepl, "op_counters_repl", "opcountersRepl"),
        (Self::Memory, "memory", "mem"),
        (Self::Locks, "locks", "locks"),
        (Self::Metrics, "metrics", "metrics"),
    ];

    /// Look up a group by its configuration name.
    pub fn from_name(name: &str) -> Result<Self, ExporterError> {
        Self::ALL
            .iter()
            .find(|(_, group_name, _)| *group_name == name)
            .map(|(group, _, _)| *group)
            .ok_or_else(|| {
                ExporterErrorKind::ConfigurationError
                    .error_with_msg(format!("Unknown MongoDB metric group '{name}'."))
            })
    }

    /// Parse a comma separated list of group names, ignoring duplicates and
    /// blank entries.
    pub fn parse_list(names: &str) -> Result<Vec<Self>, ExporterError> {
        let mut ret = Vec::new();
        for name in names.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let group = Self::from_name(name)?;
            if !ret.contains(&group) {
                ret.push(group);
            }
        }
        Ok(ret)
    }

    fn entry(&self) -> (Self, &'static str, &'static str) {
        Self::ALL
            .iter()
            .find(|(group, _, _)| group == self)
            .copied()
            .unwrap_or(Self::ALL[0])
    }

    /// Configuration name, also used as metric name prefix.
    pub fn name(&self) -> &'static str {
        self.entry().1
    }

    /// Key of the section in the `serverStatus` document.
    pub fn section(&self) -> &'static str {
        self.entry().2
    }
}
