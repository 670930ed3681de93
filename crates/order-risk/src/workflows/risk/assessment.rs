use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::domain::OrderRecord;
use super::scoring::{RiskAssessment, RiskScorer};

/// Asynchronous scoring port, so a remote model can replace the local rules.
pub trait AssessmentService: Send + Sync + 'static {
    fn assess(
        &self,
        order: OrderRecord,
    ) -> impl Future<Output = Result<RiskAssessment, AssessmentError>> + Send;
}

/// Scoring backend failure. The reason is shown to the operator as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct AssessmentError {
    pub reason: String,
}

impl AssessmentError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Local rule scorer behind a fixed presentation delay.
///
/// The delay only postpones delivery of the result; the arithmetic is the same for a
/// zero delay.
#[derive(Debug, Clone, Copy)]
pub struct DelayedRuleScorer {
    scorer: RiskScorer,
    delay: Duration,
}

impl DelayedRuleScorer {
    pub fn new(delay: Duration) -> Self {
        Self {
            scorer: RiskScorer::new(),
            delay,
        }
    }

    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl AssessmentService for DelayedRuleScorer {
    fn assess(
        &self,
        order: OrderRecord,
    ) -> impl Future<Output = Result<RiskAssessment, AssessmentError>> + Send {
        let scorer = self.scorer;
        let delay = self.delay;

        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let assessment = scorer.assess(&order);
            debug!(
                score = assessment.score,
                class = assessment.class.label(),
                "order scored"
            );
            Ok(assessment)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::risk::scoring::RiskClass;

    #[tokio::test(start_paused = true)]
    async fn delayed_scorer_waits_before_resolving() {
        let service = DelayedRuleScorer::new(Duration::from_millis(2000));
        let started = tokio::time::Instant::now();

        let assessment = service
            .assess(OrderRecord::default())
            .await
            .expect("rule scoring never fails");

        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert_eq!(assessment.class, RiskClass::Safe);
        assert_eq!(assessment.score, 35.0);
    }
}
