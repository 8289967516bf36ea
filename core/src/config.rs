//! Client configuration and region resolution.
//!
//! # Design
//! A `Config` is built once, validated, and never mutated afterwards; the
//! client shares it behind an `Arc`. The country → region index is computed
//! at construction so region inference is a map lookup, and construction
//! fails if two endpoints claim the same country.
//!
//! Configuration files are JSON with camelCase keys. `endpoint` and
//! `currency` may be omitted, in which case the defaults for the selected
//! `Environment` apply.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};

/// Environment variable naming the configuration environment.
pub const ENV_VAR: &str = "AGCOD_ENV";

/// Environment used when `AGCOD_ENV` is unset.
pub const DEFAULT_ENVIRONMENT: &str = "sandbox";

/// Directory searched by `Config::from_env`.
pub const CONFIG_DIR: &str = ".agcod";

/// Static AWS-style credentials used to sign every request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One AGCOD deployment: its host, the signing region, and the countries it
/// serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub region: String,
    pub host: String,
    pub countries: Vec<String>,
}

impl Endpoint {
    pub fn new(region: &str, host: &str, countries: &[&str]) -> Self {
        Self {
            region: region.to_string(),
            host: host.to_string(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Selects the built-in endpoint hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    /// `"production"` selects production hosts; every other name is a sandbox.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Sandbox
        }
    }

    /// Environment named by `AGCOD_ENV`, or sandbox.
    pub fn current() -> Self {
        Self::from_name(&environment_name())
    }

    /// Default NA/EU/FE endpoints.
    pub fn endpoints(self) -> BTreeMap<String, Endpoint> {
        let suffix = match self {
            Environment::Sandbox => "-gamma",
            Environment::Production => "",
        };
        BTreeMap::from([
            (
                "NA".to_string(),
                Endpoint::new("us-east-1", &format!("agcod-v2{suffix}.amazon.com"), &["US", "CA"]),
            ),
            (
                "EU".to_string(),
                Endpoint::new(
                    "eu-west-1",
                    &format!("agcod-v2-eu{suffix}.amazon.com"),
                    &["IT", "ES", "DE", "FR", "UK"],
                ),
            ),
            (
                "FE".to_string(),
                Endpoint::new("us-west-2", &format!("agcod-v2-fe{suffix}.amazon.com"), &["JP"]),
            ),
        ])
    }
}

/// Default currency of every country served by the default endpoints.
pub fn default_currencies() -> BTreeMap<String, String> {
    [
        ("US", "USD"),
        ("CA", "CAD"),
        ("IT", "EUR"),
        ("ES", "EUR"),
        ("DE", "EUR"),
        ("FR", "EUR"),
        ("UK", "GBP"),
        ("JP", "JPY"),
    ]
    .into_iter()
    .map(|(country, currency)| (country.to_string(), currency.to_string()))
    .collect()
}

fn environment_name() -> String {
    std::env::var(ENV_VAR)
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

/// On-disk form. Missing fields are filled from the environment defaults or
/// rejected by `Config::new`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    partner_id: String,
    #[serde(default)]
    credentials: Credentials,
    endpoint: Option<BTreeMap<String, Endpoint>>,
    currency: Option<BTreeMap<String, String>>,
    #[serde(default)]
    extra_headers: BTreeMap<String, String>,
}

impl ConfigFile {
    fn into_config(self, environment: Environment) -> Result<Config, ConfigError> {
        let config = Config::new(
            self.partner_id,
            self.credentials,
            self.endpoint.unwrap_or_else(|| environment.endpoints()),
            self.currency.unwrap_or_else(default_currencies),
        )?;
        Ok(self
            .extra_headers
            .into_iter()
            .fold(config, |config, (name, value)| config.with_extra_header(&name, &value)))
    }
}

/// Immutable client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    partner_id: String,
    credentials: Credentials,
    endpoints: BTreeMap<String, Endpoint>,
    currencies: BTreeMap<String, String>,
    extra_headers: BTreeMap<String, String>,
    country_regions: HashMap<String, String>,
}

impl Config {
    /// Validate and assemble a configuration.
    pub fn new(
        partner_id: impl Into<String>,
        credentials: Credentials,
        endpoints: BTreeMap<String, Endpoint>,
        currencies: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partner_id = partner_id.into();
        if partner_id.is_empty() {
            return Err(ConfigError::MissingPartnerId);
        }
        if credentials.access_key_id.is_empty() || credentials.secret_access_key.is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        let country_regions = index_countries(&endpoints)?;
        Ok(Self {
            partner_id,
            credentials,
            endpoints,
            currencies,
            extra_headers: BTreeMap::new(),
            country_regions,
        })
    }

    /// Sandbox hosts with the default country and currency tables.
    pub fn sandbox(partner_id: impl Into<String>, credentials: Credentials) -> Result<Self, ConfigError> {
        Self::new(partner_id, credentials, Environment::Sandbox.endpoints(), default_currencies())
    }

    /// Production hosts with the default country and currency tables.
    pub fn production(
        partner_id: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, ConfigError> {
        Self::new(partner_id, credentials, Environment::Production.endpoints(), default_currencies())
    }

    /// Parse an inline JSON document, defaulting to sandbox endpoints.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(json)?;
        file.into_config(Environment::Sandbox)
    }

    /// Load a JSON file; omitted endpoints follow `AGCOD_ENV`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_in(path.as_ref(), Environment::current())
    }

    /// Load `.agcod/<AGCOD_ENV>.json` from the working directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_environment(&environment_name(), Path::new(CONFIG_DIR))
    }

    /// Load `<dir>/<environment>.json` using that environment's defaults.
    pub fn load_environment(environment: &str, dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(format!("{environment}.json"));
        Self::from_file_in(&path, Environment::from_name(environment))
    }

    fn from_file_in(path: &Path, environment: Environment) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: PathBuf::from(path),
            source,
        })?;
        let file: ConfigFile = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(path),
            source,
        })?;
        tracing::debug!(path = %path.display(), ?environment, "loaded AGCOD configuration");
        file.into_config(environment)
    }

    /// Add a header sent with every request. Names are case-insensitive and
    /// stored lowercase; a later value for the same name replaces the earlier.
    pub fn with_extra_header(mut self, name: &str, value: &str) -> Self {
        self.extra_headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_currency(mut self, country: &str, currency: &str) -> Self {
        self.currencies.insert(country.to_string(), currency.to_string());
        self
    }

    /// Add or replace the endpoint for `region`.
    pub fn with_endpoint(mut self, region: &str, endpoint: Endpoint) -> Result<Self, ConfigError> {
        self.endpoints.insert(region.to_string(), endpoint);
        self.country_regions = index_countries(&self.endpoints)?;
        Ok(self)
    }

    pub fn partner_id(&self) -> &str {
        &self.partner_id
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn extra_headers(&self) -> &BTreeMap<String, String> {
        &self.extra_headers
    }

    pub fn endpoint(&self, region: &str) -> Option<&Endpoint> {
        self.endpoints.get(region)
    }

    /// Configured region codes, sorted.
    pub fn regions(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }

    /// Default currency for `country`, if one is configured.
    pub fn currency_for(&self, country: &str) -> Option<&str> {
        self.currencies.get(country).map(String::as_str)
    }

    /// Region whose endpoint serves `country`.
    pub fn resolve_region(&self, country: &str) -> Result<&str, ValidationError> {
        self.country_regions
            .get(country)
            .map(String::as_str)
            .ok_or_else(|| ValidationError::UnsupportedCountry(country.to_string()))
    }

    /// Accept exactly the configured region codes.
    pub fn validate_region(&self, region: &str) -> Result<&Endpoint, ValidationError> {
        self.endpoints
            .get(region)
            .ok_or_else(|| ValidationError::UnsupportedRegion {
                region: region.to_string(),
                valid: self.regions(),
            })
    }
}

fn index_countries(
    endpoints: &BTreeMap<String, Endpoint>,
) -> Result<HashMap<String, String>, ConfigError> {
    let mut index: HashMap<String, String> = HashMap::new();
    for (region, endpoint) in endpoints {
        for country in &endpoint.countries {
            if let Some(first) = index.get(country) {
                if first != region {
                    return Err(ConfigError::OverlappingCountry {
                        country: country.clone(),
                        first: first.clone(),
                        second: region.clone(),
                    });
                }
                continue;
            }
            index.insert(country.clone(), region.clone());
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "secret")
    }

    #[test]
    fn rejects_empty_partner_id() {
        let err = Config::sandbox("", creds()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPartnerId));
    }

    #[test]
    fn rejects_missing_credentials() {
        let err = Config::sandbox("Partner", Credentials::new("AKID", "")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
        let err = Config::sandbox("Partner", Credentials::new("", "secret")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn every_configured_country_resolves_to_its_region() {
        let config = Config::sandbox("Partner", creds()).unwrap();
        for region in config.regions() {
            let endpoint = config.endpoint(&region).unwrap();
            for country in &endpoint.countries {
                assert_eq!(config.resolve_region(country).unwrap(), region);
            }
        }
    }

    #[test]
    fn unconfigured_country_is_unsupported() {
        let config = Config::sandbox("Partner", creds()).unwrap();
        assert_eq!(
            config.resolve_region("BR").unwrap_err(),
            ValidationError::UnsupportedCountry("BR".to_string())
        );
    }

    #[test]
    fn validate_region_accepts_only_configured_keys() {
        let config = Config::sandbox("Partner", creds()).unwrap();
        for region in ["NA", "EU", "FE"] {
            assert!(config.validate_region(region).is_ok());
        }
        for region in ["XX", "na", ""] {
            let err = config.validate_region(region).unwrap_err();
            assert_eq!(err.to_string(), "region must be one of: EU, FE, NA");
        }
    }

    #[test]
    fn overlapping_countries_are_rejected() {
        let mut endpoints = Environment::Sandbox.endpoints();
        endpoints.insert("XX".to_string(), Endpoint::new("us-east-1", "example.com", &["US"]));
        let err = Config::new("Partner", creds(), endpoints, default_currencies()).unwrap_err();
        match err {
            ConfigError::OverlappingCountry { country, first, second } => {
                assert_eq!(country, "US");
                assert_eq!(first, "NA");
                assert_eq!(second, "XX");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn with_endpoint_reindexes_countries() {
        let config = Config::sandbox("Partner", creds())
            .unwrap()
            .with_endpoint("AU", Endpoint::new("us-west-2", "agcod-v2-fe-gamma.amazon.com", &["AU"]))
            .unwrap();
        assert_eq!(config.resolve_region("AU").unwrap(), "AU");
    }

    #[test]
    fn production_hosts_drop_gamma_suffix() {
        let config = Config::production("Partner", creds()).unwrap();
        assert_eq!(config.endpoint("NA").unwrap().host, "agcod-v2.amazon.com");
        assert_eq!(config.endpoint("EU").unwrap().host, "agcod-v2-eu.amazon.com");
        assert_eq!(config.endpoint("FE").unwrap().region, "us-west-2");
    }

    #[test]
    fn parses_inline_json_with_defaults() {
        let config = Config::from_json_str(
            r#"{
                "partnerId": "Partner",
                "credentials": {"accessKeyId": "AKID", "secretAccessKey": "secret"},
                "extraHeaders": {"X-Custom": "1"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.partner_id(), "Partner");
        assert_eq!(config.endpoint("NA").unwrap().host, "agcod-v2-gamma.amazon.com");
        assert_eq!(config.currency_for("US"), Some("USD"));
        assert_eq!(config.extra_headers().get("x-custom").map(String::as_str), Some("1"));
    }

    #[test]
    fn inline_json_without_credentials_is_rejected() {
        let err = Config::from_json_str(r#"{"partnerId": "Partner"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = Config::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let creds = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI").with_session_token("token-value");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("wJalrXUtnFEMI"));
        assert!(!rendered.contains("token-value"));
    }

    #[test]
    fn environment_names() {
        assert_eq!(Environment::from_name("production"), Environment::Production);
        assert_eq!(Environment::from_name("sandbox"), Environment::Sandbox);
        assert_eq!(Environment::from_name("staging"), Environment::Sandbox);
    }
}
