//! Client for the Amazon Gift Codes On Demand (AGCOD) API.
//!
//! # Overview
//! Issues and cancels gift cards through signed HTTPS calls to the regional
//! AGCOD endpoints. Every operation is one stateless request/response round
//! trip: validate input, build the JSON body, sign it with AWS Signature
//! Version 4, send it, and classify the answer.
//!
//! # Design
//! - `Config` is validated once and shared immutably; there is no global
//!   state.
//! - Building and signing are pure and synchronous, so input errors surface
//!   before any I/O and the signed request is visible to the caller.
//! - The round trip itself is a future returned inside `Submission`,
//!   executed by a pluggable `Transport` (`UreqTransport` by default).
//!   `UreqTransport` runs on Tokio's blocking pool, so await the response
//!   inside a Tokio runtime; elsewhere it resolves to
//!   `TransportError::NoRuntime`.
//! - No retries, pooling policy or failover: resubmission is left to the
//!   caller via `create_gift_card_again`.
//!
//! ```no_run
//! use agcod_core::{AgcodClient, Config, Credentials};
//!
//! # async fn run() -> agcod_core::Result<()> {
//! let config = Config::sandbox("Partner", Credentials::new("AKID", "secret"))?;
//! let client = AgcodClient::new(config);
//! let submission = client.create_gift_card("US", 10.0, None)?;
//! println!("sequential id {}", submission.sequential_id);
//! let card = submission.response.await?;
//! println!("gcId {}", card["gcId"]);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod id;
pub mod request;
pub mod signer;
pub mod transport;

pub use client::{parse_response, AgcodClient, PendingResponse, Submission};
pub use config::{Config, Credentials, Endpoint, Environment};
pub use error::{
    ApiError, ConfigError, Error, ResponseError, Result, SigningError, TransportError, ValidationError,
};
pub use http::{HttpMethod, HttpResponse, RequestParams, SignedRequest};
pub use id::{ClockIdGenerator, IdGenerator};
pub use request::{Action, CancelGiftCardRequest, CreateGiftCardRequest, MoneyAmount};
pub use transport::{Transport, UreqTransport};
