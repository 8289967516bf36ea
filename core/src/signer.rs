//! AWS Signature Version 4 signing of AGCOD requests.
//!
//! # Overview
//! `sign_action` turns an action and a typed body into a `SignedRequest` for
//! one configured region. `sign_v4` is the general algorithm underneath:
//!
//! 1. canonical request: method, URI, empty query, sorted lowercase headers,
//!    signed header list, hex SHA-256 of the body;
//! 2. string to sign: algorithm, timestamp, credential scope, hex SHA-256 of
//!    the canonical request;
//! 3. signing key: HMAC chain over `AWS4<secret>`, date, region, service,
//!    `aws4_request`;
//! 4. `authorization` header carrying the credential, signed headers and
//!    signature.
//!
//! The timestamp is an input so signatures are reproducible.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::{Config, Credentials};
use crate::error::SigningError;
use crate::http::{HttpMethod, SignedRequest};
use crate::request::Action;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name in the credential scope.
pub const SERVICE: &str = "AGCODService";

type HmacSha256 = Hmac<Sha256>;

/// Scope of a v4 signature.
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningParams<'_> {
    fn amz_date(&self) -> String {
        self.time.format("%Y%m%dT%H%M%SZ").to_string()
    }

    fn date_stamp(&self) -> String {
        self.time.format("%Y%m%d").to_string()
    }

    pub fn credential_scope(&self) -> String {
        format!("{}/{}/{}/aws4_request", self.date_stamp(), self.region, self.service)
    }
}

/// Build and sign an AGCOD request for `region`.
///
/// Default headers are `accept`, `content-type` and `x-amz-target`; the
/// configured extra headers are merged over them, so an extra header with
/// the same name replaces the default.
pub fn sign_action<B: Serialize>(
    config: &Config,
    region: &str,
    action: Action,
    body: &B,
    time: DateTime<Utc>,
) -> Result<SignedRequest, SigningError> {
    let endpoint = config
        .endpoint(region)
        .ok_or_else(|| SigningError::UnknownRegion(region.to_string()))?;
    let body = serde_json::to_string(body)?;

    let defaults = [
        ("accept".to_string(), "application/json".to_string()),
        ("content-type".to_string(), "application/json".to_string()),
        ("x-amz-target".to_string(), action.target()),
    ];
    let extra = config.extra_headers().iter().map(|(name, value)| (name.clone(), value.clone()));

    let params = SigningParams {
        credentials: config.credentials(),
        region: &endpoint.region,
        service: SERVICE,
        time,
    };
    let signed = sign_v4(
        HttpMethod::Post,
        &endpoint.host,
        &action.path(),
        defaults.into_iter().chain(extra),
        body,
        &params,
    )?;
    tracing::debug!(
        action = action.as_str(),
        host = %signed.host,
        signing_region = %endpoint.region,
        "signed AGCOD request"
    );
    Ok(signed)
}

/// Sign an arbitrary request with AWS Signature Version 4.
///
/// Header names are lowercased; when a name repeats, the later value wins.
/// `host`, `x-amz-date` and, for temporary credentials,
/// `x-amz-security-token` are set by the signer.
pub fn sign_v4(
    method: HttpMethod,
    host: &str,
    path: &str,
    headers: impl IntoIterator<Item = (String, String)>,
    body: String,
    params: &SigningParams<'_>,
) -> Result<SignedRequest, SigningError> {
    let mut headers: BTreeMap<String, String> = headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect();
    headers.insert("host".to_string(), host.to_string());
    headers.insert("x-amz-date".to_string(), params.amz_date());
    if let Some(token) = &params.credentials.session_token {
        headers.insert("x-amz-security-token".to_string(), token.clone());
    }

    let canonical = canonical_request(method, path, &headers, &body);
    tracing::trace!(canonical_request = %canonical, "v4 canonical request");
    let to_sign = string_to_sign(params, &canonical);
    let key = signing_key(
        &params.credentials.secret_access_key,
        &params.date_stamp(),
        params.region,
        params.service,
    )?;
    let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes())?);

    let authorization = format!(
        "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={signature}",
        params.credentials.access_key_id,
        params.credential_scope(),
        signed_headers(&headers),
    );

    let mut headers: Vec<(String, String)> = headers.into_iter().collect();
    headers.push(("authorization".to_string(), authorization));

    Ok(SignedRequest {
        method,
        host: host.to_string(),
        path: path.to_string(),
        headers,
        body,
    })
}

/// Canonical request for already-lowercased, sorted headers.
pub fn canonical_request(
    method: HttpMethod,
    path: &str,
    headers: &BTreeMap<String, String>,
    body: &str,
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", normalize_value(value)))
        .collect();
    format!(
        "{}\n{}\n\n{canonical_headers}\n{}\n{}",
        method.as_str(),
        encode_path(path),
        signed_headers(headers),
        sha256_hex(body.as_bytes()),
    )
}

pub fn string_to_sign(params: &SigningParams<'_>, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{}\n{}\n{}",
        params.amz_date(),
        params.credential_scope(),
        sha256_hex(canonical_request.as_bytes()),
    )
}

/// Derive the per-day, per-region, per-service signing key.
pub fn signing_key(
    secret_access_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let k_date = hmac_sha256(format!("AWS4{secret_access_key}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn signed_headers(headers: &BTreeMap<String, String>) -> String {
    headers.keys().map(String::as_str).collect::<Vec<_>>().join(";")
}

fn normalize_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn encode_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(encode_segment).collect::<Vec<_>>().join("/")
}

fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(char::from(byte));
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SigningError::InvalidKey)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::request::build_create_request;

    fn example_credentials() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
    }

    fn vanilla_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    fn config() -> Config {
        Config::sandbox("Partner", example_credentials()).unwrap()
    }

    #[test]
    fn get_vanilla_vector() {
        let credentials = example_credentials();
        let params = SigningParams {
            credentials: &credentials,
            region: "us-east-1",
            service: "service",
            time: vanilla_time(),
        };
        let signed = sign_v4(
            HttpMethod::Get,
            "example.amazonaws.com",
            "/",
            Vec::new(),
            String::new(),
            &params,
        )
        .unwrap();
        assert_eq!(
            signed.header("authorization").unwrap(),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert_eq!(signed.header("x-amz-date"), Some("20150830T123600Z"));
    }

    #[test]
    fn get_vanilla_canonical_request() {
        let headers = BTreeMap::from([
            ("host".to_string(), "example.amazonaws.com".to_string()),
            ("x-amz-date".to_string(), "20150830T123600Z".to_string()),
        ]);
        assert_eq!(
            canonical_request(HttpMethod::Get, "/", &headers, ""),
            "GET\n/\n\nhost:example.amazonaws.com\nx-amz-date:20150830T123600Z\n\n\
             host;x-amz-date\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn signing_key_derivation_example() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn create_request_shape() {
        let body = build_create_request("Partner", "abc", 10.0, "USD");
        let signed = sign_action(&config(), "NA", Action::CreateGiftCard, &body, vanilla_time()).unwrap();

        assert_eq!(signed.method, HttpMethod::Post);
        assert_eq!(signed.host, "agcod-v2-gamma.amazon.com");
        assert_eq!(signed.path, "/CreateGiftCard");
        assert_eq!(signed.body, serde_json::to_string(&body).unwrap());
        assert_eq!(signed.header("accept"), Some("application/json"));
        assert_eq!(signed.header("content-type"), Some("application/json"));
        assert_eq!(
            signed.header("x-amz-target"),
            Some("com.amazonaws.agcod.AGCODService.CreateGiftCard")
        );
        let authorization = signed.header("authorization").unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/AGCODService/aws4_request, \
             SignedHeaders=accept;content-type;host;x-amz-date;x-amz-target, Signature="
        ));
    }

    #[test]
    fn signing_region_comes_from_endpoint() {
        let body = build_create_request("Partner", "abc", 10.0, "EUR");
        let signed = sign_action(&config(), "EU", Action::CreateGiftCard, &body, vanilla_time()).unwrap();
        assert_eq!(signed.host, "agcod-v2-eu-gamma.amazon.com");
        assert!(signed
            .header("authorization")
            .unwrap()
            .contains("/20150830/eu-west-1/AGCODService/aws4_request"));
    }

    #[test]
    fn signature_can_be_rederived_independently() {
        let body = build_create_request("Partner", "abc", 10.0, "USD");
        let signed = sign_action(&config(), "NA", Action::CreateGiftCard, &body, vanilla_time()).unwrap();

        let headers: BTreeMap<String, String> = signed
            .headers
            .iter()
            .filter(|(name, _)| name != "authorization")
            .cloned()
            .collect();
        let credentials = example_credentials();
        let params = SigningParams {
            credentials: &credentials,
            region: "us-east-1",
            service: SERVICE,
            time: vanilla_time(),
        };
        let canonical = canonical_request(HttpMethod::Post, "/CreateGiftCard", &headers, &signed.body);
        let key = signing_key(&credentials.secret_access_key, "20150830", "us-east-1", SERVICE).unwrap();
        let mut mac = HmacSha256::new_from_slice(&key).unwrap();
        mac.update(string_to_sign(&params, &canonical).as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        let authorization = signed.header("authorization").unwrap();
        assert!(authorization.ends_with(&format!("Signature={expected}")));
    }

    #[test]
    fn extra_headers_override_defaults() {
        let config = config()
            .with_extra_header("Accept", "application/x-amz-json-1.1")
            .with_extra_header("X-Partner-Tag", "blue");
        let body = build_create_request("Partner", "abc", 10.0, "USD");
        let signed = sign_action(&config, "NA", Action::CreateGiftCard, &body, vanilla_time()).unwrap();

        assert_eq!(signed.header("accept"), Some("application/x-amz-json-1.1"));
        assert_eq!(signed.header("x-partner-tag"), Some("blue"));
        assert_eq!(signed.headers.iter().filter(|(name, _)| name == "accept").count(), 1);
        assert!(signed.header("authorization").unwrap().contains("x-partner-tag"));
    }

    #[test]
    fn session_token_is_signed() {
        let credentials = example_credentials().with_session_token("session");
        let config = Config::sandbox("Partner", credentials).unwrap();
        let body = build_create_request("Partner", "abc", 1.0, "USD");
        let signed = sign_action(&config, "NA", Action::CreateGiftCard, &body, vanilla_time()).unwrap();
        assert_eq!(signed.header("x-amz-security-token"), Some("session"));
        assert!(signed.header("authorization").unwrap().contains("x-amz-security-token"));
    }

    #[test]
    fn unknown_region_fails() {
        let body = build_create_request("Partner", "abc", 1.0, "USD");
        let err = sign_action(&config(), "XX", Action::CreateGiftCard, &body, vanilla_time()).unwrap_err();
        assert!(matches!(err, SigningError::UnknownRegion(region) if region == "XX"));
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_path("/a b/c~d"), "/a%20b/c~d");
        assert_eq!(encode_path(""), "/");
    }

    #[test]
    fn header_values_are_trimmed() {
        assert_eq!(normalize_value("  a   b  "), "a b");
    }
}
