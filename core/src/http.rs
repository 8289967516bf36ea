//! HTTP data types exchanged between the signer, the transport and the
//! response parser.
//!
//! # Design
//! Requests and responses are plain owned data. The signer produces a
//! `SignedRequest` without touching the network; a `Transport` turns it into
//! an `HttpResponse`; `client::parse_response` classifies that response. Each
//! stage can be tested in isolation.

/// HTTP method for a request. AGCOD actions are always `POST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A fully prepared request: host, path, body and every header including the
/// v4 `authorization` signature.
///
/// Header names are lowercase and ordered as they were signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: HttpMethod,
    pub host: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl SignedRequest {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Absolute URL of this request under `scheme` (`https` in production).
    pub fn url(&self, scheme: &str) -> String {
        format!("{scheme}://{}{}", self.host, self.path)
    }

    /// The parameters actually handed to the transport, as recorded on errors.
    pub fn params(&self, scheme: &str) -> RequestParams {
        RequestParams {
            method: self.method,
            url: self.url(scheme),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// The request as it went over the wire. Attached to `ApiError` so callers
/// can log or replay a refused request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}
