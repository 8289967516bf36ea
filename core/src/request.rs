//! Request bodies for the AGCOD actions.
//!
//! # Design
//! Bodies are typed structs serialized with serde in the field order AGCOD
//! documents. Builders only assemble fields; amount and currency checks
//! happen in the client before a body is built. Every request carries a
//! `creationRequestId` of the partner id followed by the sequential id,
//! which is what makes a resubmitted create idempotent on the service side.

use serde::{Deserialize, Serialize, Serializer};

/// JSON service namespace used in the `x-amz-target` header.
pub const TARGET_PREFIX: &str = "com.amazonaws.agcod.AGCODService";

/// AGCOD operation invoked by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateGiftCard,
    CancelGiftCard,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::CreateGiftCard => "CreateGiftCard",
            Action::CancelGiftCard => "CancelGiftCard",
        }
    }

    /// Request path, `/` followed by the action name.
    pub fn path(self) -> String {
        format!("/{}", self.as_str())
    }

    /// Value of the `x-amz-target` header.
    pub fn target(self) -> String {
        format!("{TARGET_PREFIX}.{}", self.as_str())
    }
}

/// Monetary value of a gift card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyAmount {
    pub currency_code: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: f64,
}

/// Whole amounts go on the wire as integers (`10`, not `10.0`).
fn serialize_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if amount.fract() == 0.0 && amount.abs() < MAX_EXACT {
        serializer.serialize_i64(*amount as i64)
    } else {
        serializer.serialize_f64(*amount)
    }
}

/// Body of a `CreateGiftCard` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGiftCardRequest {
    pub creation_request_id: String,
    pub partner_id: String,
    pub value: MoneyAmount,
}

/// Body of a `CancelGiftCard` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelGiftCardRequest {
    pub creation_request_id: String,
    pub partner_id: String,
    pub gc_id: String,
}

pub fn creation_request_id(partner_id: &str, sequential_id: &str) -> String {
    format!("{partner_id}{sequential_id}")
}

pub fn build_create_request(
    partner_id: &str,
    sequential_id: &str,
    amount: f64,
    currency_code: &str,
) -> CreateGiftCardRequest {
    CreateGiftCardRequest {
        creation_request_id: creation_request_id(partner_id, sequential_id),
        partner_id: partner_id.to_string(),
        value: MoneyAmount {
            currency_code: currency_code.to_string(),
            amount,
        },
    }
}

pub fn build_cancel_request(partner_id: &str, sequential_id: &str, gc_id: &str) -> CancelGiftCardRequest {
    CancelGiftCardRequest {
        creation_request_id: creation_request_id(partner_id, sequential_id),
        partner_id: partner_id.to_string(),
        gc_id: gc_id.to_string(),
    }
}
