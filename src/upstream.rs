//! DNS-over-HTTPS upstream client, tunneled through a SOCKS5 proxy.
//!
//! Implements the RFC 8484 GET form: the wire-format query is base64url
//! encoded (no padding) into the `dns` query parameter. Every connection the
//! HTTP client opens is dialed through the SOCKS5 proxy, including the
//! resolution of the endpoint's own hostname (`socks5h`), so no plaintext
//! DNS leaves the host.

use std::future::Future;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hickory_proto::ProtoError;
use hickory_proto::op::Message;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::wire;

/// RFC 8484 media type for DNS messages in HTTP bodies.
const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

/// Failure of one upstream exchange. None of these are retried; the caller
/// drops the request and the original requester's own resend applies.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to encode query: {0}")]
    Encode(#[source] ProtoError),
    #[error("failed to decode upstream response: {0}")]
    Decode(#[source] ProtoError),
    #[error("invalid SOCKS5 proxy address: {0}")]
    Proxy(#[source] reqwest::Error),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Http(#[source] reqwest::Error),
    #[error("upstream returned HTTP {0}")]
    Status(StatusCode),
}

/// Upstream resolution seam.
///
/// [`DohClient`] is the production implementation; tests substitute a
/// counting mock.
pub trait Upstream: Send + Sync {
    fn resolve(
        &self,
        query: &Message,
    ) -> impl Future<Output = Result<Message, UpstreamError>> + Send;
}

/// DoH client whose transport is tunneled through a SOCKS5 proxy.
///
/// The `reqwest` client is built once and shared across requests so TLS
/// sessions and HTTP/2 connections to the endpoint are reused.
pub struct DohClient {
    http: reqwest::Client,
    url: String,
}

impl DohClient {
    /// Build a client for `url`, dialing through the unauthenticated SOCKS5
    /// proxy at `socks_addr` (host:port). `timeout` bounds each whole round
    /// trip.
    pub fn new(url: String, socks_addr: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let proxy =
            reqwest::Proxy::all(format!("socks5h://{socks_addr}")).map_err(UpstreamError::Proxy)?;

        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .proxy(proxy)
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self { http, url })
    }

    fn request_url(&self, wire_bytes: &[u8]) -> String {
        format!("{}?dns={}", self.url, URL_SAFE_NO_PAD.encode(wire_bytes))
    }
}

impl Upstream for DohClient {
    async fn resolve(&self, query: &Message) -> Result<Message, UpstreamError> {
        // An inbound query that survived decoding must re-encode; a failure
        // here is an internal error, fatal to this request only.
        let wire_bytes = wire::encode(query).map_err(UpstreamError::Encode)?;
        let url = self.request_url(&wire_bytes);

        debug!(url = %self.url, query_len = wire_bytes.len(), "sending DoH query");

        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, DNS_MESSAGE_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::Http(e)
            }
        })?;

        debug!(response_len = body.len(), "DoH response received");

        // A malformed body is a decode error, never a cacheable answer.
        wire::decode(&body).map_err(UpstreamError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{MessageType, OpCode, Query};
    use hickory_proto::rr::{Name, RecordType};
    use std::str::FromStr;

    fn client() -> DohClient {
        DohClient::new(
            "https://cloudflare-dns.com/dns-query".to_string(),
            "127.0.0.1:10808",
            Duration::from_secs(10),
        )
        .expect("client builds")
    }

    #[test]
    fn request_url_uses_unpadded_base64url() {
        let client = client();
        // 0xfb 0xff forces '-' and '_' in the url-safe alphabet and would
        // need '=' padding in the padded form.
        let url = client.request_url(&[0xfb, 0xff]);
        assert_eq!(url, "https://cloudflare-dns.com/dns-query?dns=-_8");
    }

    #[test]
    fn request_url_carries_full_query() {
        let client = client();
        let mut message = Message::new();
        message.set_id(0);
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(Query::query(
            Name::from_str("example.com.").unwrap(),
            RecordType::A,
        ));
        let wire_bytes = wire::encode(&message).unwrap();

        let url = client.request_url(&wire_bytes);
        let encoded = url.split("?dns=").nth(1).unwrap();
        assert!(!encoded.is_empty());
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));

        let decoded = URL_SAFE_NO_PAD.decode(encoded).unwrap();
        assert_eq!(decoded, wire_bytes);
    }

    #[test]
    fn rejects_unparseable_proxy_address() {
        let result = DohClient::new(
            "https://cloudflare-dns.com/dns-query".to_string(),
            "not a proxy address",
            Duration::from_secs(10),
        );
        assert!(matches!(result, Err(UpstreamError::Proxy(_))));
    }
}
