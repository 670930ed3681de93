use super::super::domain::OrderRecord;
use super::{RiskFactor, ScoreComponent};

const HISTORY_WEIGHT: f64 = 20.0;
const LONG_DISTANCE_KM: f64 = 10.0;
const LONG_DISTANCE_PENALTY: f64 = 20.0;
const ADDRESS_ISSUE_PENALTY: f64 = 30.0;
const PEAK_HOUR_PENALTY: f64 = 15.0;
const ORDER_VALUE_DIVISOR: f64 = 100.0;

/// Raw risk score. Summed in a fixed order so the result is bit-for-bit reproducible.
pub(crate) fn score_order(order: &OrderRecord) -> f64 {
    let distance = if order.distance_km > LONG_DISTANCE_KM {
        LONG_DISTANCE_PENALTY
    } else {
        0.0
    };
    let address = if order.has_address_issue {
        ADDRESS_ISSUE_PENALTY
    } else {
        0.0
    };
    let peak = if order.is_peak_hour_order {
        PEAK_HOUR_PENALTY
    } else {
        0.0
    };

    f64::from(order.cancellation_history_count) * HISTORY_WEIGHT + distance + address + peak
        - order.order_value / ORDER_VALUE_DIVISOR
}

/// Itemised trail of the rules that contributed to `score_order`.
pub(crate) fn score_components(order: &OrderRecord) -> Vec<ScoreComponent> {
    let mut components = Vec::new();

    let history = order.cancellation_history_count;
    if history > 0 {
        components.push(ScoreComponent {
            factor: RiskFactor::CancellationHistory,
            score: f64::from(history) * HISTORY_WEIGHT,
            notes: format!("{history} prior cancellation(s)"),
        });
    }

    if order.distance_km > LONG_DISTANCE_KM {
        components.push(ScoreComponent {
            factor: RiskFactor::LongDistance,
            score: LONG_DISTANCE_PENALTY,
            notes: format!(
                "distance {:.1} km exceeds {:.0} km",
                order.distance_km, LONG_DISTANCE_KM
            ),
        });
    }

    if order.has_address_issue {
        components.push(ScoreComponent {
            factor: RiskFactor::AddressIssue,
            score: ADDRESS_ISSUE_PENALTY,
            notes: "known address problem".to_string(),
        });
    }

    if order.is_peak_hour_order {
        components.push(ScoreComponent {
            factor: RiskFactor::PeakHour,
            score: PEAK_HOUR_PENALTY,
            notes: "placed during peak demand".to_string(),
        });
    }

    if order.order_value > 0.0 {
        components.push(ScoreComponent {
            factor: RiskFactor::OrderValue,
            score: -(order.order_value / ORDER_VALUE_DIVISOR),
            notes: format!("order value {:.2} offsets risk", order.order_value),
        });
    }

    components
}
