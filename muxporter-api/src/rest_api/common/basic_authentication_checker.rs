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

//! Validate authentication with HTTP basic authentication.

use actix_web::HttpRequest;
use actix_web::http::header::HeaderValue;
use base64::Engine;
use base64::engine::general_purpose;
use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;

/// Validates a single pair of basic authentication credentials.
///
/// The user name and password are always both compared in constant time, so
/// the response time does not reveal which of them was wrong.
pub struct BasicAuthenticationChecker {
    username: String,
    password: String,
}

impl BasicAuthenticationChecker {
    const BASIC: &str = "Basic ";
    /// Value of the `WWW-Authenticate` header sent with a rejection.
    pub const CHALLENGE: &str = "Basic realm=\"metrics\"";

    /// Return a new instance when both `username` and `password` are
    /// non-empty, `None` when both are empty and an error otherwise.
    pub fn new(username: &str, password: &str) -> Result<Option<Self>, ExporterError> {
        match (username.is_empty(), password.is_empty()) {
            (true, true) => Ok(None),
            (false, false) => Ok(Some(Self {
                username: username.to_owned(),
                password: password.to_owned(),
            })),
            _ => Err(ExporterErrorKind::ConfigurationError.error_with_msg(
                "Both user name and password are required to enable basic authentication.",
            )),
        }
    }

    /// Return `Ok` if the request carries the expected credentials.
    pub fn check(&self, http_request: &HttpRequest) -> Result<(), ExporterError> {
        let (username, password) = Self::extract_credentials(http_request)?;
        let username_ok = Self::constant_time_eq(username.as_bytes(), self.username.as_bytes());
        let password_ok = Self::constant_time_eq(password.as_bytes(), self.password.as_bytes());
        if username_ok & password_ok {
            Ok(())
        } else {
            Err(ExporterErrorKind::AuthenticationFailure
                .error_with_msg("Invalid username or password."))
        }
    }

    /// Extract `(username, password)` from the `Authorization` header.
    fn extract_credentials(http_request: &HttpRequest) -> Result<(String, String), ExporterError> {
        let authorization_header = http_request
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .map(HeaderValue::to_str)
            .map(|res| {
                res.map_err(|e| {
                    ExporterErrorKind::AuthenticationFailure
                        .error_with_msg(format!("Invalid 'Authorization' HTTP header: {e}"))
                })
            })
            .unwrap_or_else(|| {
                Err(ExporterErrorKind::AuthenticationFailure
                    .error_with_msg("Missing 'Authorization' HTTP header."))
            })?;
        // The scheme is case-insensitive
        let encoded = authorization_header
            .get(..Self::BASIC.len())
            .filter(|scheme| scheme.eq_ignore_ascii_case(Self::BASIC))
            .map(|_| authorization_header[Self::BASIC.len()..].trim())
            .ok_or_else(|| {
                ExporterErrorKind::AuthenticationFailure
                    .error_with_msg("'Authorization' HTTP header is not of type Basic.")
            })?;
        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| {
                ExporterErrorKind::AuthenticationFailure
                    .error_with_msg(format!("Malformed basic credentials: {e}"))
            })
            .and_then(|bytes| {
                String::from_utf8(bytes).map_err(|e| {
                    ExporterErrorKind::AuthenticationFailure
                        .error_with_msg(format!("Basic credentials are not UTF-8: {e}"))
                })
            })?;
        decoded
            .split_once(':')
            .map(|(username, password)| (username.to_owned(), password.to_owned()))
            .ok_or_else(|| {
                ExporterErrorKind::AuthenticationFailure
                    .error_with_msg("Basic credentials lack the ':' separator.")
            })
    }

    /// Compare without early exit on the first differing byte.
    fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        let mut diff = 0u8;
        for (x, y) in a.iter().zip(b.iter()) {
            diff |= x ^ y;
        }
        diff == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn with_credentials(username: &str, password: &str) -> HttpRequest {
        TestRequest::default()
            .insert_header((
                actix_web::http::header::AUTHORIZATION,
                "Basic ".to_string()
                    + &general_purpose::STANDARD.encode(format!("{username}:{password}")),
            ))
            .to_http_request()
    }

    fn checker() -> BasicAuthenticationChecker {
        BasicAuthenticationChecker::new("admin", "secret")
            .unwrap()
            .unwrap()
    }

    #[test]
    fn credential_pairs() {
        assert!(BasicAuthenticationChecker::new("", "").unwrap().is_none());
        assert!(BasicAuthenticationChecker::new("admin", "").is_err());
        assert!(BasicAuthenticationChecker::new("", "secret").is_err());
    }

    #[test]
    fn matching_credentials() {
        assert!(checker().check(&with_credentials("admin", "secret")).is_ok());
        // Password may contain the separator
        let checker = BasicAuthenticationChecker::new("admin", "se:cret")
            .unwrap()
            .unwrap();
        assert!(checker.check(&with_credentials("admin", "se:cret")).is_ok());
    }

    #[test]
    fn rejected_credentials() {
        let checker = checker();
        for http_request in [
            with_credentials("admin", "wrong"),
            with_credentials("Admin", "secret"),
            with_credentials("admin", "SECRET"),
            with_credentials("", ""),
            TestRequest::default().to_http_request(),
            TestRequest::default()
                .insert_header((actix_web::http::header::AUTHORIZATION, "Bearer abc"))
                .to_http_request(),
            TestRequest::default()
                .insert_header((actix_web::http::header::AUTHORIZATION, "Basic !!!"))
                .to_http_request(),
            TestRequest::default()
                .insert_header((
                    actix_web::http::header::AUTHORIZATION,
                    "Basic ".to_string() + &general_purpose::STANDARD.encode("adminsecret"),
                ))
                .to_http_request(),
        ] {
            let e = checker.check(&http_request).err().unwrap();
            assert_eq!(e.kind(), &ExporterErrorKind::AuthenticationFailure);
        }
    }

    #[test]
    fn lower_case_scheme_is_accepted() {
        let http_request = TestRequest::default()
            .insert_header((
                actix_web::http::header::AUTHORIZATION,
                "basic ".to_string() + &general_purpose::STANDARD.encode("admin:secret"),
            ))
            .to_http_request();
        assert!(checker().check(&http_request).is_ok());
    }

    #[test]
    fn constant_time_comparison() {
        assert!(BasicAuthenticationChecker::constant_time_eq(b"abc", b"abc"));
        assert!(!BasicAuthenticationChecker::constant_time_eq(b"abc", b"abd"));
        assert!(!BasicAuthenticationChecker::constant_time_eq(b"abc", b"abcd"));
        assert!(BasicAuthenticationChecker::constant_time_eq(b"", b""));
    }
}
