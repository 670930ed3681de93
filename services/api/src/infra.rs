use metrics_exporter_prometheus::PrometheusHandle;
use order_risk::workflows::risk::{
    DispatchFailure, NotificationDispatcher, NotificationRequest, PaymentMethod, SentNotification,
    SimulatedMailer,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Simulated mailer that refuses its first `failures` dispatches.
#[derive(Debug, Clone)]
pub(crate) struct OutageMailer {
    mailer: SimulatedMailer,
    delay: Duration,
    failures_left: Arc<AtomicUsize>,
}

impl OutageMailer {
    pub(crate) fn new(delay: Duration, failures: usize) -> Self {
        Self {
            mailer: SimulatedMailer::new(delay),
            delay,
            failures_left: Arc::new(AtomicUsize::new(failures)),
        }
    }

    pub(crate) fn outbox(&self) -> Vec<SentNotification> {
        self.mailer.outbox()
    }
}

impl NotificationDispatcher for OutageMailer {
    fn dispatch(
        &self,
        request: NotificationRequest,
    ) -> impl Future<Output = Result<(), DispatchFailure>> + Send {
        let refuse = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        let delay = self.delay;
        let delivery = self.mailer.dispatch(request);

        async move {
            if refuse {
                tokio::time::sleep(delay).await;
                return Err(DispatchFailure::new("mail relay unreachable"));
            }
            delivery.await
        }
    }
}

pub(crate) fn parse_payment_method(raw: &str) -> Result<PaymentMethod, String> {
    PaymentMethod::parse(raw)
        .ok_or_else(|| format!("unknown payment method '{raw}' (expected card, cash or upi)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_risk::workflows::risk::OrderRecord;

    fn request() -> NotificationRequest {
        NotificationRequest {
            recipient_email: "buyer@example.com".to_string(),
            order_context: OrderRecord::default(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn outage_mailer_recovers_after_configured_failures() {
        let mailer = OutageMailer::new(Duration::from_millis(500), 1);

        let first = mailer.dispatch(request()).await;
        let second = mailer.dispatch(request()).await;

        assert_eq!(first, Err(DispatchFailure::new("mail relay unreachable")));
        assert_eq!(second, Ok(()));
        assert_eq!(mailer.outbox().len(), 1);
    }

    #[test]
    fn payment_method_parser_reports_unknown_values() {
        assert_eq!(parse_payment_method("UPI"), Ok(PaymentMethod::Upi));
        let error = parse_payment_method("cheque").expect_err("cheque is not accepted");
        assert!(error.contains("cheque"));
    }
}
