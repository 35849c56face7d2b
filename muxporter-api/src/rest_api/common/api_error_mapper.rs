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

//! Mapper of app errors to Actix-web [Error].

use super::BasicAuthenticationChecker;
use actix_web::Error;
use actix_web::HttpResponse;
use actix_web::error;
use actix_web::error::InternalError;
use actix_web::http::header;
use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;

/// Mapper of app errors to Actix-web [Error].
pub struct ApiErrorMapper {}

impl ApiErrorMapper {
    /// Response body of a failed authentication.
    pub const AUTHENTICATION_FAILURE_BODY: &str = "Invalid username or password";

    /// Return REST API [Error] from [ExporterError].
    pub fn from_exporter_error<E: AsRef<ExporterError>>(e: E) -> Error {
        let e = e.as_ref();
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Will respond with error. kind: {} msg: {e:?}", e.kind());
        }
        match e.kind() {
            ExporterErrorKind::AuthenticationFailure => {
                // HTTP 401 with challenge
                InternalError::from_response(
                    e.to_string(),
                    HttpResponse::Unauthorized()
                        .insert_header((
                            header::WWW_AUTHENTICATE,
                            BasicAuthenticationChecker::CHALLENGE,
                        ))
                        .content_type("text/plain; charset=utf-8")
                        .body(Self::AUTHENTICATION_FAILURE_BODY),
                )
                .into()
            }
            _other => {
                // HTTP 500
                error::ErrorInternalServerError(e.to_string())
            }
        }
    }
}
