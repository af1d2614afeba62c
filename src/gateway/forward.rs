//! Upstream forwarding with deliberate content-encoding handling.
//!
//! # Responsibilities
//! - Build the upstream call from the canonical request
//! - Inject the protected credential as a bearer token
//! - Advertise gzip/br/identity and decompress the reply explicitly
//! - Parse the decoded bytes as JSON
//!
//! # Design Decisions
//! - The client is built without automatic decompression so the
//!   content-encoding branch here is the only decode path
//! - An upstream non-2xx with a parseable JSON body is not an error at
//!   this layer; status and body propagate to the formatter
//! - A bounded total timeout keeps a stalled upstream from hanging the
//!   caller; timeouts surface as `UpstreamError` like any network fault

use std::io::Read;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use serde_json::Value;
use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::normalize::ProxyRequest;

/// Upstream outcome consumed by the formatter.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Forwards canonical requests to the upstream API.
pub struct Forwarder {
    client: reqwest::Client,
    base_url: Url,
}

impl Forwarder {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Forward one request, injecting `credential` as the bearer token.
    pub async fn forward(
        &self,
        request: ProxyRequest,
        credential: &str,
    ) -> GatewayResult<ProxyResponse> {
        let url = self.base_url.join(&request.path).map_err(|e| GatewayError::Upstream {
            status: None,
            message: format!("invalid upstream path: {}", e),
        })?;

        let mut headers = request.headers;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credential)).map_err(|_| {
            GatewayError::Upstream {
                status: None,
                message: "credential contains invalid header characters".into(),
            }
        })?;
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(
            header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, br, identity"),
        );

        let mut builder = self.client.request(request.method, url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.json(&body);
        }

        let response = builder.send().await.map_err(|e| GatewayError::Upstream {
            status: None,
            message: format!("upstream request failed: {}", e),
        })?;

        let status = response.status();
        let encoding = response
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("identity")
            .trim()
            .to_ascii_lowercase();

        let raw = response.bytes().await.map_err(|e| GatewayError::Upstream {
            status: Some(status),
            message: format!("failed reading upstream body: {}", e),
        })?;

        let decoded = decode_content(&encoding, &raw).map_err(|message| GatewayError::Upstream {
            status: Some(status),
            message,
        })?;

        let body: Value = serde_json::from_slice(&decoded).map_err(|e| GatewayError::Upstream {
            status: Some(status),
            message: format!("upstream returned non-JSON body: {}", e),
        })?;

        tracing::debug!(
            status = status.as_u16(),
            encoding = %encoding,
            "Upstream reply decoded"
        );

        Ok(ProxyResponse { status, body })
    }
}

/// Decompress according to the upstream's declared content-encoding.
fn decode_content(encoding: &str, raw: &[u8]) -> Result<Vec<u8>, String> {
    match encoding {
        "" | "identity" => Ok(raw.to_vec()),
        "gzip" | "x-gzip" => {
            let mut out = Vec::new();
            flate2::read::GzDecoder::new(raw)
                .read_to_end(&mut out)
                .map_err(|e| format!("gzip decompression failed: {}", e))?;
            Ok(out)
        }
        "br" => {
            let mut out = Vec::new();
            brotli::Decompressor::new(raw, 4096)
                .read_to_end(&mut out)
                .map_err(|e| format!("brotli decompression failed: {}", e))?;
            Ok(out)
        }
        other => Err(format!("unsupported content-encoding: {}", other)),
    }
}
