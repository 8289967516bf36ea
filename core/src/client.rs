//! Gift-card issuance client.
//!
//! # Design
//! `AgcodClient` holds only immutable state: the shared `Config`, the
//! transport and the id generator. Each operation validates its input,
//! builds and signs the request synchronously, and returns a `Submission`
//! that already carries the sequential id, body and signed request. The
//! network round-trip lives in `Submission::response`, a future that sends
//! the request when first polled and resolves exactly once to either the
//! parsed JSON body or a `ResponseError`.
//!
//! Signatures are valid for a limited time after creation, so await the
//! response promptly.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{ApiError, ConfigError, Error, ResponseError, ValidationError};
use crate::http::{HttpResponse, SignedRequest};
use crate::id::{ClockIdGenerator, IdGenerator};
use crate::request::{
    build_cancel_request, build_create_request, Action, CancelGiftCardRequest, CreateGiftCardRequest,
};
use crate::signer::sign_action;
use crate::transport::{Transport, UreqTransport};

/// Response of an in-flight operation.
pub struct PendingResponse {
    inner: Pin<Box<dyn Future<Output = Result<Value, ResponseError>> + Send>>,
}

impl PendingResponse {
    fn new(future: impl Future<Output = Result<Value, ResponseError>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(future),
        }
    }
}

impl Future for PendingResponse {
    type Output = Result<Value, ResponseError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for PendingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PendingResponse")
    }
}

/// Everything known about an operation at the moment it is submitted.
///
/// Keep `sequential_id`: resubmitting a create with the same id is
/// idempotent, and a cancel needs it.
#[derive(Debug)]
pub struct Submission<B> {
    pub sequential_id: String,
    pub request_body: B,
    pub signed_request: SignedRequest,
    pub response: PendingResponse,
}

/// Client for the AGCOD gift-card API.
pub struct AgcodClient<T: Transport = UreqTransport> {
    config: Arc<Config>,
    transport: Arc<T>,
    ids: Arc<dyn IdGenerator>,
}

impl AgcodClient<UreqTransport> {
    /// Client sending over HTTPS.
    ///
    /// Responses must be awaited inside a Tokio runtime.
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }

    /// Client configured from `.agcod/<AGCOD_ENV>.json`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(Config::from_env()?))
    }
}

impl<T: Transport> AgcodClient<T> {
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            ids: Arc::new(ClockIdGenerator),
        }
    }

    /// Replace the clock-based sequential id source.
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue a gift card in `country`.
    ///
    /// The region is inferred from the country. Without `currency_code` the
    /// country's configured default currency is used.
    pub fn create_gift_card(
        &self,
        country: &str,
        amount: f64,
        currency_code: Option<&str>,
    ) -> Result<Submission<CreateGiftCardRequest>, Error> {
        let region = self.config.resolve_region(country)?.to_string();
        check_amount(amount)?;
        let currency_code = match currency_code {
            Some(code) => code.to_string(),
            None => self
                .config
                .currency_for(country)
                .map(str::to_string)
                .ok_or_else(|| ValidationError::NoCurrencyForCountry(country.to_string()))?,
        };

        let sequential_id = self.ids.next_id();
        let body = build_create_request(self.config.partner_id(), &sequential_id, amount, &currency_code);
        self.submit(&region, Action::CreateGiftCard, sequential_id, body)
    }

    /// Resubmit a create whose sequential id was already issued, e.g. after
    /// a timeout. Only the region is validated.
    pub fn create_gift_card_again(
        &self,
        region: &str,
        amount: f64,
        currency_code: &str,
        sequential_id: &str,
    ) -> Result<Submission<CreateGiftCardRequest>, Error> {
        self.config.validate_region(region)?;
        let body = build_create_request(self.config.partner_id(), sequential_id, amount, currency_code);
        self.submit(region, Action::CreateGiftCard, sequential_id.to_string(), body)
    }

    /// Cancel the gift card `gc_id` created with `sequential_id`.
    pub fn cancel_gift_card(
        &self,
        region: &str,
        sequential_id: &str,
        gc_id: &str,
    ) -> Result<Submission<CancelGiftCardRequest>, Error> {
        self.config.validate_region(region)?;
        let body = build_cancel_request(self.config.partner_id(), sequential_id, gc_id);
        self.submit(region, Action::CancelGiftCard, sequential_id.to_string(), body)
    }

    fn submit<B: Serialize>(
        &self,
        region: &str,
        action: Action,
        sequential_id: String,
        body: B,
    ) -> Result<Submission<B>, Error> {
        let signed_request = sign_action(&self.config, region, action, &body, Utc::now())?;

        let transport = Arc::clone(&self.transport);
        let request = signed_request.clone();
        let response = PendingResponse::new(async move {
            let raw = transport.send(&request).await?;
            parse_response(&request, transport.scheme(), raw)
        });

        Ok(Submission {
            sequential_id,
            request_body: body,
            signed_request,
            response,
        })
    }
}

impl<T: Transport> Clone for AgcodClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for AgcodClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgcodClient")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

fn check_amount(amount: f64) -> Result<(), ValidationError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidAmount(amount))
    }
}

/// Classify a raw response.
///
/// 200 yields the parsed body. Any other status is an `ApiError` carrying
/// the request, the status and the error body; a body that is not JSON is
/// kept as a JSON string so the status is never lost.
pub fn parse_response(
    request: &SignedRequest,
    scheme: &str,
    response: HttpResponse,
) -> Result<Value, ResponseError> {
    if response.status == 200 {
        return Ok(serde_json::from_str(&response.body)?);
    }

    let body = serde_json::from_str(&response.body).unwrap_or(Value::String(response.body));
    let err = ApiError {
        request: request.params(scheme),
        status_code: response.status,
        body,
    };
    tracing::warn!(
        status = err.status_code,
        error_code = err.error_code().unwrap_or("-"),
        path = %request.path,
        "AGCOD request refused"
    );
    Err(err.into())
}
