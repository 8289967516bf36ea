//! Executes signed requests.
//!
//! # Design
//! The client never performs I/O itself; it hands a `SignedRequest` to a
//! `Transport` and classifies the returned `HttpResponse`. `UreqTransport` is
//! the stock implementation. ureq is blocking, so each call runs on tokio's
//! blocking pool and the async caller is never stalled. Its future must be
//! polled inside a Tokio runtime; polled anywhere else it resolves to
//! `TransportError::NoRuntime`.
//!
//! Non-2xx statuses are returned as data, not as transport errors; only
//! connection-level failures become `TransportError`.

use std::future::Future;

use crate::error::TransportError;
use crate::http::{HttpResponse, SignedRequest};

/// Sends one signed request and returns the raw response.
pub trait Transport: Send + Sync + 'static {
    /// URL scheme the request is sent with, recorded on `ApiError`.
    fn scheme(&self) -> &str {
        "https"
    }

    fn send(
        &self,
        request: &SignedRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Transport on top of a shared `ureq::Agent`.
///
/// Requires a Tokio runtime when the response future is polled.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    scheme: &'static str,
}

impl UreqTransport {
    /// HTTPS transport, as used against the real service.
    pub fn new() -> Self {
        Self {
            agent: agent(),
            scheme: "https",
        }
    }

    /// Plain HTTP transport for local stand-ins such as `mock-server`.
    pub fn plain_http() -> Self {
        Self {
            agent: agent(),
            scheme: "http",
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}

impl Transport for UreqTransport {
    fn scheme(&self) -> &str {
        self.scheme
    }

    fn send(
        &self,
        request: &SignedRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let agent = self.agent.clone();
        let url = request.url(self.scheme);
        let request = request.clone();
        async move {
            let runtime = tokio::runtime::Handle::try_current()?;
            runtime.spawn_blocking(move || execute(&agent, &url, &request)).await?
        }
    }
}

fn execute(agent: &ureq::Agent, url: &str, request: &SignedRequest) -> Result<HttpResponse, TransportError> {
    tracing::debug!(%url, "sending AGCOD request");
    let mut call = agent.post(url);
    for (name, value) in &request.headers {
        // ureq derives `host` from the URL
        if name == "host" {
            continue;
        }
        call = call.header(name.as_str(), value.as_str());
    }
    let mut response = call.send(request.body.as_bytes())?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_string()?;
    tracing::debug!(status, "AGCOD response received");

    Ok(HttpResponse { status, headers, body })
}
