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

//! Exporter errors.

use std::error::Error;
use std::fmt;

/// Cause of error.
#[derive(Debug, PartialEq, Eq)]
pub enum ExporterErrorKind {
    /// Invalid or incomplete configuration. Fatal during startup.
    ConfigurationError,
    /// A dependency required to start could not be reached or created.
    StartupDependencyError,
    /// The same collector was registered more than once.
    DuplicateRegistration,
    /// The monitored subsystem could not be reached.
    CollectorUnreachable,
    /// The monitored subsystem did not respond in time.
    CollectorTimeout,
    /// The monitored subsystem responded with something that could not be
    /// parsed.
    MalformedResponse,
    /// Authentication failed.
    AuthenticationFailure,
}

impl ExporterErrorKind {
    /// Create a new instance with an error message.
    pub fn error_with_msg<S: AsRef<str>>(self, msg: S) -> ExporterError {
        ExporterError {
            kind: self,
            msg: msg.as_ref().to_string(),
        }
    }
}

impl fmt::Display for ExporterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/** Exporter error.

Create a new instance via [ExporterErrorKind].
*/
#[derive(Debug)]
pub struct ExporterError {
    kind: ExporterErrorKind,
    msg: String,
}

impl ExporterError {
    /// Return the type of error.
    pub fn kind(&self) -> &ExporterErrorKind {
        &self.kind
    }
}

impl fmt::Display for ExporterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.msg)
    }
}

impl AsRef<ExporterError> for ExporterError {
    fn as_ref(&self) -> &ExporterError {
        self
    }
}

impl Error for ExporterError {}
