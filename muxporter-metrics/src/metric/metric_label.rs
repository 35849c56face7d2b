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

//! Metric label.

/// A single `name="value"` pair attached to a measured value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricLabel {
    name: String,
    value: String,
}

impl MetricLabel {
    /// Return a new instance.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Label name.
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Unescaped label value.
    pub fn get_value(&self) -> &str {
        &self.value
    }
}
