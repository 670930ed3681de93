use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::domain::{OrderRecord, OrderValidationError, PaymentMethod};
use super::scoring::{RiskClass, RiskScorer, ScoreComponent};
use crate::error::AppError;

/// Keys the legacy prediction payload must carry, in the order they are checked.
pub const LEGACY_REQUIRED_KEYS: [&str; 8] = [
    "delivery_time",
    "order_value",
    "cancellation_history",
    "distance",
    "time_of_order",
    "payment_method",
    "address_issues",
    "peak_hour_order",
];

/// Router exposing stateless scoring endpoints.
pub fn risk_router() -> Router {
    Router::new()
        .route("/predict", post(legacy_predict_handler))
        .route("/api/v1/orders/assess", post(assess_handler))
}

/// Assessment body returned by the typed endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub score: f64,
    pub class: RiskClass,
    pub is_high_risk: bool,
    pub headline: &'static str,
    pub detail: &'static str,
    pub components: Vec<ScoreComponent>,
}

pub(crate) async fn assess_handler(
    Json(order): Json<OrderRecord>,
) -> Result<Json<AssessmentView>, AppError> {
    order.validate()?;
    let assessment = RiskScorer::new().assess(&order);
    info!(score = assessment.score, class = assessment.class.label(), "order assessed over http");

    Ok(Json(AssessmentView {
        score: assessment.score,
        class: assessment.class,
        is_high_risk: assessment.is_high_risk(),
        headline: assessment.class.headline(),
        detail: assessment.class.detail(),
        components: assessment.components,
    }))
}

/// Label-encoded payload accepted by `/predict`; answers `{"cancel_prediction": 0|1}`.
pub(crate) async fn legacy_predict_handler(headers: HeaderMap, body: Bytes) -> Response {
    if !is_json(&headers) {
        return bad_request("Request must be JSON");
    }

    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(map)) if !map.is_empty() => map,
        _ => return bad_request("No JSON data received"),
    };

    let order = match legacy_order(&payload) {
        Ok(order) => order,
        Err(error) => {
            debug!(%error, "legacy prediction payload refused");
            return bad_request(&error.to_string());
        }
    };

    let class = RiskClass::from_score(RiskScorer::new().score(&order));
    let prediction = u8::from(class.is_high_risk());
    (StatusCode::OK, Json(json!({ "cancel_prediction": prediction }))).into_response()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum LegacyPayloadError {
    #[error("Missing required key: {0}")]
    MissingKey(&'static str),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: Value },
    #[error(transparent)]
    Order(#[from] OrderValidationError),
}

fn legacy_order(payload: &Map<String, Value>) -> Result<OrderRecord, LegacyPayloadError> {
    for key in LEGACY_REQUIRED_KEYS {
        if !payload.contains_key(key) {
            return Err(LegacyPayloadError::MissingKey(key));
        }
    }

    let order = OrderRecord {
        delivery_time_minutes: whole(payload, "delivery_time", u32::MAX.into())? as u32,
        order_value: number(payload, "order_value")?,
        cancellation_history_count: whole(payload, "cancellation_history", u8::MAX.into())? as u8,
        distance_km: number(payload, "distance")?,
        order_hour: whole(payload, "time_of_order", u8::MAX.into())? as u8,
        payment_method: payment(payload, "payment_method")?,
        has_address_issue: flag(payload, "address_issues")?,
        is_peak_hour_order: flag(payload, "peak_hour_order")?,
        customer_email: String::new(),
    };
    order.validate()?;
    Ok(order)
}

fn invalid(payload: &Map<String, Value>, key: &'static str) -> LegacyPayloadError {
    LegacyPayloadError::InvalidValue {
        key,
        value: payload.get(key).cloned().unwrap_or(Value::Null),
    }
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn number(payload: &Map<String, Value>, key: &'static str) -> Result<f64, LegacyPayloadError> {
    let parsed = match payload.get(key) {
        Some(Value::Number(value)) => value.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(payload, key))
}

fn whole(
    payload: &Map<String, Value>,
    key: &'static str,
    max: u64,
) -> Result<u64, LegacyPayloadError> {
    let value = number(payload, key)?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= max as f64 {
        Ok(value as u64)
    } else {
        Err(invalid(payload, key))
    }
}

fn flag(payload: &Map<String, Value>, key: &'static str) -> Result<bool, LegacyPayloadError> {
    match payload.get(key) {
        Some(Value::Bool(value)) => Ok(*value),
        _ => match whole(payload, key, 1) {
            Ok(value) => Ok(value == 1),
            Err(_) => Err(invalid(payload, key)),
        },
    }
}

fn payment(
    payload: &Map<String, Value>,
    key: &'static str,
) -> Result<PaymentMethod, LegacyPayloadError> {
    let method = match payload.get(key) {
        Some(Value::String(raw)) => PaymentMethod::parse(raw).or_else(|| {
            raw.trim()
                .parse::<i64>()
                .ok()
                .and_then(PaymentMethod::from_code)
        }),
        Some(Value::Number(code)) => code.as_i64().and_then(PaymentMethod::from_code),
        _ => None,
    };
    method.ok_or_else(|| invalid(payload, key))
}
