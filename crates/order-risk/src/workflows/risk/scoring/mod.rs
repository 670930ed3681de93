mod rules;

use super::domain::OrderRecord;
use serde::{Deserialize, Serialize};

/// Scores strictly above this value are classified as high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 50.0;

/// Binary outcome of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    Safe,
    HighRisk,
}

impl RiskClass {
    pub fn from_score(score: f64) -> Self {
        if score > HIGH_RISK_THRESHOLD {
            RiskClass::HighRisk
        } else {
            RiskClass::Safe
        }
    }

    pub fn is_high_risk(self) -> bool {
        matches!(self, RiskClass::HighRisk)
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskClass::Safe => "safe",
            RiskClass::HighRisk => "high_risk",
        }
    }

    /// Banner title shown with the classification.
    pub fn headline(self) -> &'static str {
        match self {
            RiskClass::Safe => "Safe Order",
            RiskClass::HighRisk => "Likely to be Cancelled",
        }
    }

    pub fn detail(self) -> &'static str {
        match self {
            RiskClass::Safe => "This order has a low risk of cancellation",
            RiskClass::HighRisk => "This order has a high risk of cancellation",
        }
    }
}

/// Rule that contributed to a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    CancellationHistory,
    LongDistance,
    AddressIssue,
    PeakHour,
    OrderValue,
}

/// Discrete contribution to a score, kept so classifications can be explained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: RiskFactor,
    pub score: f64,
    pub notes: String,
}

/// Score, classification, and the trail of rules behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub class: RiskClass,
    pub components: Vec<ScoreComponent>,
}

impl RiskAssessment {
    pub fn is_high_risk(&self) -> bool {
        self.class.is_high_risk()
    }
}

/// Deterministic rule-based scorer.
///
/// Delivery time, order hour, payment method and customer email are collected on the
/// order but do not influence the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, order: &OrderRecord) -> f64 {
        rules::score_order(order)
    }

    pub fn assess(&self, order: &OrderRecord) -> RiskAssessment {
        let score = rules::score_order(order);

        RiskAssessment {
            score,
            class: RiskClass::from_score(score),
            components: rules::score_components(order),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::risk::domain::PaymentMethod;

    fn order(history: u8, distance: f64, address: bool, peak: bool, value: f64) -> OrderRecord {
        OrderRecord {
            cancellation_history_count: history,
            distance_km: distance,
            has_address_issue: address,
            is_peak_hour_order: peak,
            order_value: value,
            ..OrderRecord::default()
        }
    }

    #[test]
    fn moderate_history_short_trip_is_safe() {
        let assessment = RiskScorer::new().assess(&order(2, 5.0, false, false, 500.0));
        assert_eq!(assessment.score, 35.0);
        assert_eq!(assessment.class, RiskClass::Safe);
    }

    #[test]
    fn stacked_penalties_are_high_risk() {
        let assessment = RiskScorer::new().assess(&order(2, 15.0, true, true, 500.0));
        assert_eq!(assessment.score, 100.0);
        assert!(assessment.is_high_risk());
    }

    #[test]
    fn large_order_value_drives_score_negative() {
        let assessment = RiskScorer::new().assess(&order(0, 0.0, false, false, 10_000.0));
        assert_eq!(assessment.score, -100.0);
        assert_eq!(assessment.class, RiskClass::Safe);
    }

    #[test]
    fn threshold_is_exclusive() {
        // 3 * 20 - 1000 / 100 = 50
        let assessment = RiskScorer::new().assess(&order(3, 0.0, false, false, 1000.0));
        assert_eq!(assessment.score, 50.0);
        assert_eq!(assessment.class, RiskClass::Safe);

        let assessment = RiskScorer::new().assess(&order(3, 0.0, false, false, 999.0));
        assert_eq!(assessment.class, RiskClass::HighRisk);
    }

    #[test]
    fn distance_penalty_requires_strictly_more_than_ten_km() {
        let scorer = RiskScorer::new();
        assert_eq!(scorer.score(&order(0, 10.0, false, false, 0.0)), 0.0);
        assert_eq!(scorer.score(&order(0, 10.1, false, false, 0.0)), 20.0);
    }

    #[test]
    fn collected_but_unscored_fields_do_not_change_the_result() {
        let scorer = RiskScorer::new();
        let base = order(2, 15.0, true, false, 300.0);
        let varied = OrderRecord {
            delivery_time_minutes: 95,
            order_hour: 3,
            payment_method: PaymentMethod::Cash,
            customer_email: "someone@example.com".to_string(),
            ..base.clone()
        };

        assert_eq!(scorer.assess(&base), scorer.assess(&varied));
    }

    #[test]
    fn components_explain_the_total() {
        let assessment = RiskScorer::new().assess(&order(2, 15.0, true, true, 500.0));
        let factors: Vec<RiskFactor> = assessment
            .components
            .iter()
            .map(|component| component.factor)
            .collect();
        assert_eq!(
            factors,
            vec![
                RiskFactor::CancellationHistory,
                RiskFactor::LongDistance,
                RiskFactor::AddressIssue,
                RiskFactor::PeakHour,
                RiskFactor::OrderValue,
            ]
        );

        let total: f64 = assessment
            .components
            .iter()
            .map(|component| component.score)
            .sum();
        assert!((total - assessment.score).abs() < f64::EPSILON);
    }

    #[test]
    fn banner_copy_follows_classification() {
        assert_eq!(RiskClass::HighRisk.headline(), "Likely to be Cancelled");
        assert_eq!(
            RiskClass::Safe.detail(),
            "This order has a low risk of cancellation"
        );
    }
}
