use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::OrderRecord;

/// Alert the operator asks to send for a high-risk order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub recipient_email: String,
    pub order_context: OrderRecord,
}

/// Mail transport boundary.
///
/// Callers only pass syntactically valid recipients and never overlap two dispatches
/// for the same workflow.
pub trait NotificationDispatcher: Send + Sync + 'static {
    fn dispatch(
        &self,
        request: NotificationRequest,
    ) -> impl Future<Output = Result<(), DispatchFailure>> + Send;
}

/// Transport rejection. The reason is opaque and surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct DispatchFailure {
    pub reason: String,
}

impl DispatchFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Message recorded by the simulated mailer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentNotification {
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl SentNotification {
    fn compose(request: &NotificationRequest, sent_at: DateTime<Utc>) -> Self {
        let order = &request.order_context;
        let body = format!(
            "Your order of {:.2} ({:.1} km, paid by {}) has been flagged as likely to be \
             cancelled. Please confirm your delivery details so we can complete it.",
            order.order_value, order.distance_km, order.payment_method
        );

        Self {
            recipient_email: request.recipient_email.clone(),
            subject: "Order cancellation alert".to_string(),
            body,
            sent_at,
        }
    }
}

/// Stand-in transport: waits, then records the message in an in-memory outbox.
#[derive(Debug, Clone, Default)]
pub struct SimulatedMailer {
    delay: Duration,
    outbox: Arc<Mutex<Vec<SentNotification>>>,
}

impl SimulatedMailer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            outbox: Arc::default(),
        }
    }

    pub fn outbox(&self) -> Vec<SentNotification> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NotificationDispatcher for SimulatedMailer {
    fn dispatch(
        &self,
        request: NotificationRequest,
    ) -> impl Future<Output = Result<(), DispatchFailure>> + Send {
        let delay = self.delay;
        let outbox = Arc::clone(&self.outbox);

        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let message = SentNotification::compose(&request, Utc::now());
            info!(recipient = %message.recipient_email, "cancellation alert sent");
            outbox
                .lock()
                .map_err(|_| DispatchFailure::new("outbox unavailable"))?
                .push(message);
            Ok(())
        }
    }
}
