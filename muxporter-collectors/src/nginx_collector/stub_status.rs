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

//! Parser of the `ngx_http_stub_status_module` page.

use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;

/** Connection counters of the nginx stub status page.

```text
Active connections: 291
server accepts handled requests
 16630948 16630948 31070465
Reading: 6 Writing: 179 Waiting: 106
```
*/
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StubStatus {
    pub active: u64,
    pub accepted: u64,
    pub handled: u64,
    pub requests: u64,
    pub reading: u64,
    pub writing: u64,
    pub waiting: u64,
}

impl StubStatus {
    /// Parse the body of the stub status page.
    pub fn parse(body: &str) -> Result<Self, ExporterError> {
        let lines = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>();
        if lines.len() != 4 {
            return Err(Self::malformed(format!(
                "Expected 4 lines, but got {}.",
                lines.len()
            )));
        }
        let active = lines[0]
            .strip_prefix("Active connections:")
            .ok_or_else(|| Self::malformed("Missing 'Active connections:'."))
            .and_then(|value| Self::parse_number(value.trim()))?;
        let processed = lines[2]
            .split_whitespace()
            .map(Self::parse_number)
            .collect::<Result<Vec<_>, _>>()?;
        let [accepted, handled, requests] = processed[..] else {
            return Err(Self::malformed(format!(
                "Expected 3 processed counters, but got '{}'.",
                lines[2]
            )));
        };
        let fields = lines[3].split_whitespace().collect::<Vec<_>>();
        let ["Reading:", reading, "Writing:", writing, "Waiting:", waiting] = fields[..] else {
            return Err(Self::malformed(format!(
                "Unexpected connection states '{}'.",
                lines[3]
            )));
        };
        Ok(Self {
            active,
            accepted,
            handled,
            requests,
            reading: Self::parse_number(reading)?,
            writing: Self::parse_number(writing)?,
            waiting: Self::parse_number(waiting)?,
        })
    }

    fn parse_number(value: &str) -> Result<u64, ExporterError> {
        value
            .parse::<u64>()
            .map_err(|e| Self::malformed(format!("Invalid number '{value}': {e}")))
    }

    fn malformed<S: AsRef<str>>(msg: S) -> ExporterError {
        ExporterErrorKind::MalformedResponse
            .error_with_msg(format!("Unable to parse nginx stub status. {}", msg.as_ref()))
    }
}
