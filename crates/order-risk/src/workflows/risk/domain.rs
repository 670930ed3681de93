use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Upper bound of the prior-cancellations slider.
pub const MAX_CANCELLATION_HISTORY: u8 = 10;
/// Last hour of the day an order can be placed in.
pub const MAX_ORDER_HOUR: u8 = 23;

/// Payment channel selected at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    Cash,
    Upi,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Upi => "upi",
        }
    }

    /// Label-encoded index (alphabetical) used by the legacy prediction payload.
    pub fn code(self) -> u8 {
        match self {
            PaymentMethod::Card => 0,
            PaymentMethod::Cash => 1,
            PaymentMethod::Upi => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PaymentMethod::Card),
            1 => Some(PaymentMethod::Cash),
            2 => Some(PaymentMethod::Upi),
            _ => None,
        }
    }

    /// Accepts channel names as they appear in order exports.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "card" | "online" | "credit card" | "debit card" => Some(PaymentMethod::Card),
            "cash" | "cod" | "cash on delivery" => Some(PaymentMethod::Cash),
            "upi" => Some(PaymentMethod::Upi),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Attributes of one delivery order under assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub delivery_time_minutes: u32,
    pub order_value: f64,
    pub cancellation_history_count: u8,
    pub distance_km: f64,
    pub order_hour: u8,
    pub payment_method: PaymentMethod,
    pub has_address_issue: bool,
    pub is_peak_hour_order: bool,
    #[serde(default)]
    pub customer_email: String,
}

impl Default for OrderRecord {
    fn default() -> Self {
        Self {
            delivery_time_minutes: 30,
            order_value: 500.0,
            cancellation_history_count: 2,
            distance_km: 5.0,
            order_hour: 18,
            payment_method: PaymentMethod::Card,
            has_address_issue: false,
            is_peak_hour_order: false,
            customer_email: String::new(),
        }
    }
}

impl OrderRecord {
    /// Checks every numeric field against its documented range.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        non_negative(OrderField::OrderValue, self.order_value)?;
        non_negative(OrderField::DistanceKm, self.distance_km)?;
        within(
            OrderField::CancellationHistoryCount,
            i64::from(self.cancellation_history_count),
            i64::from(MAX_CANCELLATION_HISTORY),
        )?;
        within(
            OrderField::OrderHour,
            i64::from(self.order_hour),
            i64::from(MAX_ORDER_HOUR),
        )?;
        Ok(())
    }

    /// Applies a single field edit. Rejected values leave the record untouched.
    pub fn apply(&mut self, update: FieldUpdate) -> Result<(), OrderValidationError> {
        match update {
            FieldUpdate::DeliveryTimeMinutes(minutes) => {
                let minutes = within(OrderField::DeliveryTimeMinutes, minutes, i64::from(u32::MAX))?;
                self.delivery_time_minutes = minutes as u32;
            }
            FieldUpdate::OrderValue(value) => {
                self.order_value = non_negative(OrderField::OrderValue, value)?;
            }
            FieldUpdate::CancellationHistoryCount(count) => {
                let count = within(
                    OrderField::CancellationHistoryCount,
                    count,
                    i64::from(MAX_CANCELLATION_HISTORY),
                )?;
                self.cancellation_history_count = count as u8;
            }
            FieldUpdate::DistanceKm(distance) => {
                self.distance_km = non_negative(OrderField::DistanceKm, distance)?;
            }
            FieldUpdate::OrderHour(hour) => {
                let hour = within(OrderField::OrderHour, hour, i64::from(MAX_ORDER_HOUR))?;
                self.order_hour = hour as u8;
            }
            FieldUpdate::PaymentMethod(method) => self.payment_method = method,
            FieldUpdate::HasAddressIssue(flag) => self.has_address_issue = flag,
            FieldUpdate::IsPeakHourOrder(flag) => self.is_peak_hour_order = flag,
            FieldUpdate::CustomerEmail(email) => self.customer_email = email,
        }
        Ok(())
    }
}

fn non_negative(field: OrderField, value: f64) -> Result<f64, OrderValidationError> {
    if !value.is_finite() {
        return Err(OrderValidationError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(OrderValidationError::Negative { field, value });
    }
    Ok(value)
}

fn within(field: OrderField, value: i64, max: i64) -> Result<i64, OrderValidationError> {
    if (0..=max).contains(&value) {
        Ok(value)
    } else {
        Err(OrderValidationError::OutOfRange {
            field,
            value,
            min: 0,
            max,
        })
    }
}

/// Names of the editable order fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    DeliveryTimeMinutes,
    OrderValue,
    CancellationHistoryCount,
    DistanceKm,
    OrderHour,
    PaymentMethod,
    HasAddressIssue,
    IsPeakHourOrder,
    CustomerEmail,
}

impl OrderField {
    pub fn label(self) -> &'static str {
        match self {
            OrderField::DeliveryTimeMinutes => "delivery_time_minutes",
            OrderField::OrderValue => "order_value",
            OrderField::CancellationHistoryCount => "cancellation_history_count",
            OrderField::DistanceKm => "distance_km",
            OrderField::OrderHour => "order_hour",
            OrderField::PaymentMethod => "payment_method",
            OrderField::HasAddressIssue => "has_address_issue",
            OrderField::IsPeakHourOrder => "is_peak_hour_order",
            OrderField::CustomerEmail => "customer_email",
        }
    }
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single operator edit. Integer inputs are wide so negative entries can be rejected
/// instead of wrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    DeliveryTimeMinutes(i64),
    OrderValue(f64),
    CancellationHistoryCount(i64),
    DistanceKm(f64),
    OrderHour(i64),
    PaymentMethod(PaymentMethod),
    HasAddressIssue(bool),
    IsPeakHourOrder(bool),
    CustomerEmail(String),
}

impl FieldUpdate {
    pub fn field(&self) -> OrderField {
        match self {
            FieldUpdate::DeliveryTimeMinutes(_) => OrderField::DeliveryTimeMinutes,
            FieldUpdate::OrderValue(_) => OrderField::OrderValue,
            FieldUpdate::CancellationHistoryCount(_) => OrderField::CancellationHistoryCount,
            FieldUpdate::DistanceKm(_) => OrderField::DistanceKm,
            FieldUpdate::OrderHour(_) => OrderField::OrderHour,
            FieldUpdate::PaymentMethod(_) => OrderField::PaymentMethod,
            FieldUpdate::HasAddressIssue(_) => OrderField::HasAddressIssue,
            FieldUpdate::IsPeakHourOrder(_) => OrderField::IsPeakHourOrder,
            FieldUpdate::CustomerEmail(_) => OrderField::CustomerEmail,
        }
    }
}

/// Reasons an order field value is refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderValidationError {
    #[error("{field} must be a finite number")]
    NotFinite { field: OrderField },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: OrderField, value: f64 },
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: OrderField,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl OrderValidationError {
    pub fn field(&self) -> OrderField {
        match self {
            OrderValidationError::NotFinite { field }
            | OrderValidationError::Negative { field, .. }
            | OrderValidationError::OutOfRange { field, .. } => *field,
        }
    }
}

/// Syntactic `local@domain.tld` check. No DNS or deliverability guarantee.
pub fn validate_email(address: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
        .is_match(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_matches_blank_form() {
        let order = OrderRecord::default();
        assert_eq!(order.delivery_time_minutes, 30);
        assert_eq!(order.order_value, 500.0);
        assert_eq!(order.cancellation_history_count, 2);
        assert_eq!(order.distance_km, 5.0);
        assert_eq!(order.order_hour, 18);
        assert_eq!(order.payment_method, PaymentMethod::Card);
        assert!(!order.has_address_issue);
        assert!(!order.is_peak_hour_order);
        assert!(order.customer_email.is_empty());
        assert!(order.validate().is_ok());
    }

    #[test]
    fn apply_rejects_out_of_range_values_without_mutating() {
        let mut order = OrderRecord::default();

        let err = order
            .apply(FieldUpdate::CancellationHistoryCount(11))
            .expect_err("history above ten is refused");
        assert_eq!(err.field(), OrderField::CancellationHistoryCount);
        assert_eq!(order.cancellation_history_count, 2);

        assert!(order.apply(FieldUpdate::OrderHour(24)).is_err());
        assert!(order.apply(FieldUpdate::DeliveryTimeMinutes(-1)).is_err());
        assert!(matches!(
            order.apply(FieldUpdate::DistanceKm(-0.5)),
            Err(OrderValidationError::Negative { .. })
        ));
        assert!(matches!(
            order.apply(FieldUpdate::OrderValue(f64::NAN)),
            Err(OrderValidationError::NotFinite { .. })
        ));
        assert_eq!(order, OrderRecord::default());
    }

    #[test]
    fn apply_updates_accepted_values() {
        let mut order = OrderRecord::default();
        order
            .apply(FieldUpdate::OrderHour(23))
            .expect("last hour accepted");
        order
            .apply(FieldUpdate::PaymentMethod(PaymentMethod::Upi))
            .expect("payment accepted");
        order
            .apply(FieldUpdate::CustomerEmail("buyer@example.com".to_string()))
            .expect("email field accepts any text");

        assert_eq!(order.order_hour, 23);
        assert_eq!(order.payment_method, PaymentMethod::Upi);
        assert_eq!(order.customer_email, "buyer@example.com");
    }

    #[test]
    fn validate_catches_values_deserialized_out_of_range() {
        let order = OrderRecord {
            order_hour: 30,
            ..OrderRecord::default()
        };
        assert!(matches!(
            order.validate(),
            Err(OrderValidationError::OutOfRange {
                field: OrderField::OrderHour,
                ..
            })
        ));
    }

    #[test]
    fn email_shape_is_checked_syntactically() {
        assert!(validate_email("a@b.co"));
        assert!(validate_email("first.last@mail.example.org"));
        assert!(!validate_email("a@b"));
        assert!(!validate_email("a b@c.com"));
        assert!(!validate_email("@c.com"));
        assert!(!validate_email("a@@b.com"));
        assert!(!validate_email(""));
    }

    #[test]
    fn payment_codes_follow_label_encoding() {
        assert_eq!(PaymentMethod::from_code(1), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::from_code(3), None);
        assert_eq!(PaymentMethod::parse("COD"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::parse("Online"), Some(PaymentMethod::Card));
        assert_eq!(PaymentMethod::Upi.code(), 2);
    }
}
