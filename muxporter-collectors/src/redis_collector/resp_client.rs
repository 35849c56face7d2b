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

//! Minimal RESP client issuing a single `INFO` command.

use muxporter_metrics::ExporterError;
use muxporter_metrics::ExporterErrorKind;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpStream;

/// Connects to a single Redis node per request.
pub struct RespClient;

impl RespClient {
    const INFO_COMMAND: &[u8] = b"*1\r\n$4\r\nINFO\r\n";
    /// Upper bound of an `INFO` reply that will be accepted.
    const MAX_REPLY_BYTES: usize = 4 * 1024 * 1024;

    /// Return the `INFO` reply of the node at `address` (`host:port`).
    pub async fn info(address: &str, timeout: Duration) -> Result<String, ExporterError> {
        tokio::time::timeout(timeout, Self::info_internal(address))
            .await
            .map_err(|_| {
                ExporterErrorKind::CollectorTimeout.error_with_msg(format!(
                    "Redis node '{address}' did not respond within {} ms.",
                    timeout.as_millis()
                ))
            })?
    }

    async fn info_internal(address: &str) -> Result<String, ExporterError> {
        let mut stream = TcpStream::connect(address).await.map_err(|e| {
            ExporterErrorKind::CollectorUnreachable
                .error_with_msg(format!("Failed to connect to Redis node '{address}': {e}"))
        })?;
        stream.write_all(Self::INFO_COMMAND).await.map_err(|e| {
            ExporterErrorKind::CollectorUnreachable
                .error_with_msg(format!("Failed to send INFO to '{address}': {e}"))
        })?;
        let mut reader = BufReader::new(stream);
        Self::read_bulk_string(&mut reader).await
    }

    /// Read a RESP bulk string (`$<len>\r\n<bytes>\r\n`) or fail on an error
    /// reply (`-ERR ...`).
    async fn read_bulk_string<R: AsyncBufRead + Unpin>(
        reader: &mut R,
    ) -> Result<String, ExporterError> {
        let mut header = String::new();
        reader.read_line(&mut header).await.map_err(|e| {
            ExporterErrorKind::CollectorUnreachable
                .error_with_msg(format!("Failed to read reply: {e}"))
        })?;
        let header = header.trim_end();
        if let Some(msg) = header.strip_prefix('-') {
            return Err(ExporterErrorKind::CollectorUnreachable
                .error_with_msg(format!("Redis replied with error: {msg}")));
        }
        let len = header
            .strip_prefix('$')
            .and_then(|len| len.parse::<usize>().ok())
            .filter(|len| *len <= Self::MAX_REPLY_BYTES)
            .ok_or_else(|| {
                ExporterErrorKind::MalformedResponse
                    .error_with_msg(format!("Unexpected reply header '{header}'."))
            })?;
        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await.map_err(|e| {
            ExporterErrorKind::MalformedResponse
                .error_with_msg(format!("Truncated INFO reply: {e}"))
        })?;
        String::from_utf8(payload).map_err(|e| {
            ExporterErrorKind::MalformedResponse
                .error_with_msg(format!("INFO reply is not UTF-8: {e}"))
        })
    }
}
