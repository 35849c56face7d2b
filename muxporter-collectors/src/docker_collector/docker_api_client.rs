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

//! Docker Engine API access over a Unix socket or TCP.

use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

/// Entry of `GET /containers/json`.
#[derive(Debug, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: Vec<String>,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Labels", default)]
    pub labels: Option<HashMap<String, String>>,
}

impl ContainerSummary {
    /// Primary container name without the leading `/`.
    pub fn name(&self) -> &str {
        self.names
            .first()
            .map(|name| name.trim_start_matches('/'))
            .unwrap_or_default()
    }

    /// Value of a container label.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }
}

enum Transport {
    Unix(PathBuf),
    Http {
        base_url: String,
        http_client: reqwest::Client,
    },
}

/// Minimal read-only client of the Docker Engine API.
pub struct DockerApiClient {
    transport: Transport,
    timeout: Duration,
}

impl DockerApiClient {
    /// Upper bound of a response that will be accepted.
    const MAX_RESPONSE_BYTES: u64 = 16 * 1024 * 1024;

    /// Return a new instance for `unix:///path`, `tcp://host:port` or
    /// `http(s)://host:port`.
    pub fn new(address: &str, timeout: Duration) -> Result<Self, ExporterError> {
        let transport = if let Some(socket_path) = address.strip_prefix("unix://") {
            Transport::Unix(PathBuf::from(socket_path))
        } else {
            let base_url = if let Some(host_port) = address.strip_prefix("tcp://") {
                format!("http://{host_port}")
            } else if address.starts_with("http://") || address.starts_with("https://") {
                address.to_owned()
            } else {
                return Err(ExporterErrorKind::ConfigurationError.error_with_msg(format!(
                    "Docker address '{address}' must start with 'unix://', 'tcp://', 'http://' or 'https://'."
                )));
            };
            let http_client = reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(timeout)
                .build()
                .map_err(|e| {
                    ExporterErrorKind::StartupDependencyError
                        .error_with_msg(format!("Failed to create HTTP client: {e}"))
                })?;
            Transport::Http {
                base_url: base_url.trim_end_matches('/').to_owned(),
                http_client,
            }
        };
        Ok(Self { transport, timeout })
    }

    /// Check that the daemon answers `GET /_ping`.
    pub async fn ping(&self) -> Result<(), ExporterError> {
        let body = self.get("/_ping").await?;
        if body.trim_ascii() != b"OK" {
            return Err(ExporterErrorKind::MalformedResponse.error_with_msg(format!(
                "Unexpected reply to ping: '{}'",
                String::from_utf8_lossy(&body)
            )));
        }
        Ok(())
    }

    /// List running containers.
    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>, ExporterError> {
        self.get_json("/containers/json").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ExporterError> {
        let body = self.get(path).await?;
        serde_json::from_slice(&body).map_err(|e| {
            ExporterErrorKind::MalformedResponse
                .error_with_msg(format!("Unable to parse response of '{path}': {e}"))
        })
    }

    /// Return the body of a successful `GET`.
    async fn get(&self, path: &str) -> Result<Vec<u8>, ExporterError> {
        let (status, body) = match &self.transport {
            Transport::Unix(socket_path) => {
                tokio::time::timeout(self.timeout, Self::get_unix(socket_path, path))
                    .await
                    .map_err(|_| {
                        ExporterErrorKind::CollectorTimeout.error_with_msg(format!(
                            "Docker did not respond to '{path}' within {} ms.",
                            self.timeout.as_millis()
                        ))
                    })??
            }
            Transport::Http {
                base_url,
                http_client,
            } => {
                let response = http_client
                    .get(base_url.to_owned() + path)
                    .send()
                    .await
                    .map_err(|e| {
                        let kind = if e.is_timeout() {
                            ExporterErrorKind::CollectorTimeout
                        } else {
                            ExporterErrorKind::CollectorUnreachable
                        };
                        kind.error_with_msg(format!("Request to Docker '{path}' failed: {e}"))
                    })?;
                let status = response.status().as_u16();
                let body = response.bytes().await.map_err(|e| {
                    ExporterErrorKind::MalformedResponse
                        .error_with_msg(format!("Failed to read Docker response: {e}"))
                })?;
                (status, body.to_vec())
            }
        };
        if !(200..300).contains(&status) {
            return Err(ExporterErrorKind::CollectorUnreachable.error_with_msg(format!(
                "Docker responded to '{path}' with HTTP {status}."
            )));
        }
        Ok(body)
    }

    /// Plain HTTP/1.0 request over the Unix socket. The daemon closes the
    /// connection after the response.
    async fn get_unix(socket_path: &Path, path: &str) -> Result<(u16, Vec<u8>), ExporterError> {
        let mut stream = UnixStream::connect(socket_path).await.map_err(|e| {
            ExporterErrorKind::CollectorUnreachable.error_with_msg(format!(
                "Failed to connect to '{}': {e}",
                socket_path.display()
            ))
        })?;
        let request = format!("GET {path} HTTP/1.0\r\nHost: docker\r\nAccept: application/json\r\n\r\n");
        stream.write_all(request.as_bytes()).await.map_err(|e| {
            ExporterErrorKind::CollectorUnreachable
                .error_with_msg(format!("Failed to send request to Docker: {e}"))
        })?;
        let mut raw = Vec::new();
        stream
            .take(Self::MAX_RESPONSE_BYTES)
            .read_to_end(&mut raw)
            .await
            .map_err(|e| {
                ExporterErrorKind::CollectorUnreachable
                    .error_with_msg(format!("Failed to read response from Docker: {e}"))
            })?;
        Self::parse_http_response(&raw)
    }

    /// Split a raw HTTP/1.x response into status code and (de-chunked) body.
    fn parse_http_response(raw: &[u8]) -> Result<(u16, Vec<u8>), ExporterError> {
        let header_end = raw
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .ok_or_else(|| {
                ExporterErrorKind::MalformedResponse.error_with_msg("Incomplete HTTP response.")
            })?;
        let head = String::from_utf8_lossy(&raw[..header_end]);
        let mut lines = head.split("\r\n");
        let status = lines
            .next()
            .and_then(|status_line| status_line.split_whitespace().nth(1))
            .and_then(|status| status.parse::<u16>().ok())
            .ok_or_else(|| {
                ExporterErrorKind::MalformedResponse.error_with_msg("Invalid HTTP status line.")
            })?;
        let chunked = lines.any(|line| {
            line.split_once(':').is_some_and(|(name, value)| {
                name.trim().eq_ignore_ascii_case("transfer-encoding")
                    && value.trim().eq_ignore_ascii_case("chunked")
            })
        });
        let body = &raw[header_end + 4..];
        if chunked {
            Ok((status, Self::dechunk(body)?))
        } else {
            Ok((status, body.to_vec()))
        }
    }

    fn dechunk(mut body: &[u8]) -> Result<Vec<u8>, ExporterError> {
        let malformed =
            || ExporterErrorKind::MalformedResponse.error_with_msg("Invalid chunked encoding.");
        let mut ret = Vec::with_capacity(body.len());
        loop {
            let line_end = body
                .windows(2)
                .position(|window| window == b"\r\n")
                .ok_or_else(malformed)?;
            let size_line = String::from_utf8_lossy(&body[..line_end]);
            let size_hex = size_line.split(';').next().unwrap_or_default().trim();
            let size = usize::from_str_radix(size_hex, 16).map_err(|_| malformed())?;
            body = &body[line_end + 2..];
            if size == 0 {
                return Ok(ret);
            }
            let chunk_end = size.checked_add(2).ok_or_else(malformed)?;
            let chunk = body.get(..size).ok_or_else(malformed)?;
            ret.extend_from_slice(chunk);
            body = body.get(chunk_end..).ok_or_else(malformed)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;
    use tokio::io::BufReader;
    use tokio::net::UnixListener;

    #[test]
    fn rejects_unknown_schemes() {
        let e = DockerApiClient::new("ftp://docker", Duration::from_secs(1))
            .err()
            .unwrap();
        assert_eq!(e.kind(), &ExporterErrorKind::ConfigurationError);
        assert!(DockerApiClient::new("tcp://127.0.0.1:2375", Duration::from_secs(1)).is_ok());
        assert!(DockerApiClient::new("unix:///var/run/docker.sock", Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn parses_plain_and_chunked_responses() {
        let (status, body) = DockerApiClient::parse_http_response(
            b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nOK",
        )
        .unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, b"OK");
        let (status, body) = DockerApiClient::parse_http_response(
            b"HTTP/1.1 404 Not Found\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2;x=y\r\nde\r\n0\r\n\r\n",
        )
        .unwrap();
        assert_eq!(status, 404);
        assert_eq!(body, b"abcde");
        assert!(DockerApiClient::parse_http_response(b"HTTP/1.0 200 OK\r\n").is_err());
    }

    #[test]
    fn oversized_chunk_is_malformed() {
        let e = DockerApiClient::parse_http_response(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nabc\r\n0\r\n\r\n",
        )
        .err()
        .unwrap();
        assert_eq!(e.kind(), &ExporterErrorKind::MalformedResponse);
        let e = DockerApiClient::parse_http_response(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nabc\r\n",
        )
        .err()
        .unwrap();
        assert_eq!(e.kind(), &ExporterErrorKind::MalformedResponse);
    }

    #[test]
    fn container_name_and_labels() {
        let containers: Vec<ContainerSummary> = serde_json::from_str(
            r#"[{"Id":"abc","Names":["/web"],"Image":"nginx:1","Labels":{"app":"shop"}},
                {"Id":"def","Names":[],"Image":"redis","Labels":null}]"#,
        )
        .unwrap();
        assert_eq!(containers[0].name(), "web");
        assert_eq!(containers[0].label("app"), Some("shop"));
        assert_eq!(containers[1].name(), "");
        assert_eq!(containers[1].label("app"), None);
    }

    #[tokio::test]
    async fn talks_http_over_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("docker.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                reader.read_line(&mut request_line).await.unwrap();
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).await.unwrap();
                    if header.trim().is_empty() {
                        break;
                    }
                }
                let body = if request_line.starts_with("GET /_ping ") {
                    "OK".to_owned()
                } else {
                    r#"[{"Id":"abc","Names":["/web"],"Image":"nginx"}]"#.to_owned()
                };
                let response = format!("HTTP/1.0 200 OK\r\nContent-Length: {}\r\n\r\n{body}", body.len());
                reader.get_mut().write_all(response.as_bytes()).await.unwrap();
            }
        });
        let client = DockerApiClient::new(
            &format!("unix://{}", socket_path.display()),
            Duration::from_secs(2),
        )
        .unwrap();
        client.ping().await.unwrap();
        let containers = client.list_containers().await.unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].id, "abc");
    }
}
