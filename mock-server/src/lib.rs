//! In-memory stand-in for the AGCOD service.
//!
//! Serves `POST /CreateGiftCard` and `POST /CancelGiftCard` over plain HTTP.
//! Requests must carry a v4 `authorization` header and the matching
//! `x-amz-target`; the signature itself is not verified. Creates are
//! idempotent on `creationRequestId`, like the real service.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

const TARGET_PREFIX: &str = "com.amazonaws.agcod.AGCODService";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyAmount {
    pub currency_code: String,
    pub amount: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGiftCard {
    pub creation_request_id: String,
    pub partner_id: String,
    pub value: MoneyAmount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelGiftCard {
    pub creation_request_id: String,
    pub partner_id: String,
    pub gc_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub card_number: Option<String>,
    pub card_status: String,
    pub expiration_date: Option<String>,
    pub value: MoneyAmount,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGiftCardResponse {
    pub card_info: CardInfo,
    pub creation_request_id: String,
    pub gc_claim_code: String,
    pub gc_expiration_date: Option<String>,
    pub gc_id: String,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelGiftCardResponse {
    pub creation_request_id: String,
    pub gc_id: String,
    pub status: String,
}

/// Issued cards, keyed by `gcId` and by `creationRequestId`.
#[derive(Debug, Default)]
pub struct Ledger {
    cards: HashMap<String, CreateGiftCardResponse>,
    by_request: HashMap<String, String>,
}

pub type Db = Arc<RwLock<Ledger>>;

type Rejection = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Ledger::default()));
    Router::new()
        .route("/CreateGiftCard", post(create_gift_card))
        .route("/CancelGiftCard", post(cancel_gift_card))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn service_error(status: StatusCode, code: &str, kind: &str, message: &str) -> Rejection {
    (
        status,
        Json(json!({"errorCode": code, "errorType": kind, "message": message})),
    )
}

fn check_signed(headers: &HeaderMap, action: &str) -> Result<(), Rejection> {
    let signed = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("AWS4-HMAC-SHA256 "));
    if !signed {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({"message": "Missing Authentication Token"})),
        ));
    }

    let expected = format!("{TARGET_PREFIX}.{action}");
    let target = headers.get("x-amz-target").and_then(|value| value.to_str().ok());
    if target != Some(expected.as_str()) {
        return Err(service_error(
            StatusCode::BAD_REQUEST,
            "InvalidTarget",
            "InvalidRequest",
            &format!("x-amz-target must be {expected}"),
        ));
    }
    Ok(())
}

async fn create_gift_card(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateGiftCard>,
) -> Result<Json<CreateGiftCardResponse>, Rejection> {
    check_signed(&headers, "CreateGiftCard")?;
    if !input.creation_request_id.starts_with(&input.partner_id) {
        return Err(service_error(
            StatusCode::BAD_REQUEST,
            "F400",
            "InvalidCreationRequestId",
            "creationRequestId must start with the partner id",
        ));
    }
    if input.value.amount < 0.0 {
        return Err(service_error(
            StatusCode::BAD_REQUEST,
            "F100",
            "InvalidAmountValue",
            "Amount must be positive",
        ));
    }

    let mut ledger = db.write().await;
    if let Some(gc_id) = ledger.by_request.get(&input.creation_request_id) {
        if let Some(card) = ledger.cards.get(gc_id) {
            tracing::info!(gc_id = %card.gc_id, "replayed gift card creation");
            return Ok(Json(card.clone()));
        }
    }

    let gc_id = Uuid::new_v4().simple().to_string();
    let card = CreateGiftCardResponse {
        card_info: CardInfo {
            card_number: None,
            card_status: "Fulfilled".to_string(),
            expiration_date: None,
            value: input.value,
        },
        creation_request_id: input.creation_request_id.clone(),
        gc_claim_code: Uuid::new_v4().simple().to_string()[..14].to_ascii_uppercase(),
        gc_expiration_date: None,
        gc_id: gc_id.clone(),
        status: "SUCCESS".to_string(),
    };
    ledger.by_request.insert(input.creation_request_id, gc_id.clone());
    ledger.cards.insert(gc_id.clone(), card.clone());
    tracing::info!(%gc_id, "issued gift card");
    Ok(Json(card))
}

async fn cancel_gift_card(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CancelGiftCard>,
) -> Result<Json<CancelGiftCardResponse>, Rejection> {
    check_signed(&headers, "CancelGiftCard")?;

    let mut ledger = db.write().await;
    let card = ledger.cards.get_mut(&input.gc_id).ok_or_else(|| {
        service_error(
            StatusCode::BAD_REQUEST,
            "F200",
            "InvalidGcId",
            "Gift card id does not exist",
        )
    })?;
    card.card_info.card_status = "RefundedToPurchaser".to_string();
    tracing::info!(gc_id = %input.gc_id, partner_id = %input.partner_id, "cancelled gift card");
    Ok(Json(CancelGiftCardResponse {
        creation_request_id: input.creation_request_id,
        gc_id: input.gc_id,
        status: "SUCCESS".to_string(),
    }))
}
