//! Operator workflow for assessing an order and alerting the customer.
//!
//! [`RiskWorkflow`] is a plain state machine: operator triggers mutate it directly and
//! return a [`Step`]. Triggers that need slow work (scoring, mail dispatch) hand back a
//! [`WorkflowCommand`] carrying a [`Ticket`]; whoever runs the command feeds the result
//! back through [`RiskWorkflow::apply`]. Tickets record the generation they were issued
//! under, so a result that arrives after the operator cleared or moved on is dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::assessment::AssessmentError;
use super::domain::{validate_email, FieldUpdate, OrderField, OrderRecord, OrderValidationError};
use super::notification::{DispatchFailure, NotificationRequest};
use super::scoring::{RiskAssessment, RiskClass};

/// Inline message shown under the recipient field.
pub const INVALID_EMAIL_MESSAGE: &str = "enter a valid email address";

/// Where the workflow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Editing,
    Scoring,
    Scored(RiskClass),
    NotifyEditing,
    NotifySending,
    NotifySent,
    NotifyFailed,
}

impl WorkflowPhase {
    pub fn label(self) -> &'static str {
        match self {
            WorkflowPhase::Editing => "editing",
            WorkflowPhase::Scoring => "scoring",
            WorkflowPhase::Scored(RiskClass::Safe) => "scored_safe",
            WorkflowPhase::Scored(RiskClass::HighRisk) => "scored_high_risk",
            WorkflowPhase::NotifyEditing => "notify_editing",
            WorkflowPhase::NotifySending => "notify_sending",
            WorkflowPhase::NotifySent => "notify_sent",
            WorkflowPhase::NotifyFailed => "notify_failed",
        }
    }

    pub fn view(self) -> WorkflowView {
        match self {
            WorkflowPhase::Editing | WorkflowPhase::Scoring | WorkflowPhase::Scored(_) => {
                WorkflowView::Assessment
            }
            WorkflowPhase::NotifyEditing
            | WorkflowPhase::NotifySending
            | WorkflowPhase::NotifySent
            | WorkflowPhase::NotifyFailed => WorkflowView::Notify,
        }
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The two mutually exclusive screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowView {
    Assessment,
    Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Idle,
    Sending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationState {
    Unscored,
    Scoring,
    Scored,
}

/// Derived view of the current classification. `is_high_risk` is only set once scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub state: ClassificationState,
    pub is_high_risk: Option<bool>,
}

/// Switches that distinguish the screen variants sharing this workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// Allow leaving the notification form for the assessment view.
    pub show_back_navigation: bool,
    /// Pre-fill the recipient with the order's customer email.
    pub seed_email_from_order: bool,
}

impl WorkflowOptions {
    /// Notification form without a way back and with an empty recipient.
    pub fn standalone() -> Self {
        Self {
            show_back_navigation: false,
            seed_email_from_order: false,
        }
    }
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            show_back_navigation: true,
            seed_email_from_order: true,
        }
    }
}

/// Generation tag attached to every asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    generation: u64,
}

impl Ticket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Slow work the machine needs someone else to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowCommand {
    Assess {
        ticket: Ticket,
        order: OrderRecord,
    },
    Dispatch {
        ticket: Ticket,
        request: NotificationRequest,
    },
}

impl WorkflowCommand {
    pub fn ticket(&self) -> Ticket {
        match self {
            WorkflowCommand::Assess { ticket, .. } | WorkflowCommand::Dispatch { ticket, .. } => {
                *ticket
            }
        }
    }
}

/// Completion of a [`WorkflowCommand`].
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    AssessmentResolved {
        ticket: Ticket,
        result: Result<RiskAssessment, AssessmentError>,
    },
    DispatchResolved {
        ticket: Ticket,
        result: Result<(), DispatchFailure>,
    },
}

/// Local input problems. Neither blocks anything beyond the trigger that raised it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Field(#[from] OrderValidationError),
    #[error("enter a valid email address")]
    InvalidEmail,
}

/// Result of a trigger or an applied event.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Not valid in the current phase, or a stale completion; nothing changed.
    Ignored,
    /// State changed without any slow work.
    Applied,
    /// State changed and the command must be run.
    Issued(WorkflowCommand),
    /// Input refused; the error is also recorded on the workflow.
    Rejected(ValidationError),
}

impl Step {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Step::Ignored)
    }

    pub fn command(&self) -> Option<&WorkflowCommand> {
        match self {
            Step::Issued(command) => Some(command),
            _ => None,
        }
    }
}

/// Transient toast-style message for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NotificationSent { recipient: String },
    DispatchFailed { reason: String },
    AssessmentFailed { reason: String },
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::NotificationSent { .. } => "Cancellation Alert Sent!",
            Notice::DispatchFailed { .. } => "Failed to Send Email",
            Notice::AssessmentFailed { .. } => "Prediction Failed",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::NotificationSent { .. })
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NotificationSent { recipient } => {
                write!(f, "notification sent to {recipient}")
            }
            Notice::DispatchFailed { reason } => write!(f, "failed to send, retry ({reason})"),
            Notice::AssessmentFailed { reason } => write!(f, "prediction failed: {reason}"),
        }
    }
}

/// Serializable picture of the workflow for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub phase: &'static str,
    pub view: WorkflowView,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub order: OrderRecord,
    pub send_status: SendStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    pub field_errors: BTreeMap<OrderField, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<&'static str>,
}

/// Single source of truth for one operator session.
#[derive(Debug, Clone)]
pub struct RiskWorkflow {
    options: WorkflowOptions,
    phase: WorkflowPhase,
    order: OrderRecord,
    assessment: Option<RiskAssessment>,
    request: Option<NotificationRequest>,
    field_errors: BTreeMap<OrderField, OrderValidationError>,
    email_invalid: bool,
    notices: Vec<Notice>,
    generation: u64,
}

impl Default for RiskWorkflow {
    fn default() -> Self {
        Self::new(WorkflowOptions::default())
    }
}

impl RiskWorkflow {
    pub fn new(options: WorkflowOptions) -> Self {
        Self {
            options,
            phase: WorkflowPhase::Editing,
            order: OrderRecord::default(),
            assessment: None,
            request: None,
            field_errors: BTreeMap::new(),
            email_invalid: false,
            notices: Vec::new(),
            generation: 0,
        }
    }

    pub fn options(&self) -> WorkflowOptions {
        self.options
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn view(&self) -> WorkflowView {
        self.phase.view()
    }

    pub fn order(&self) -> &OrderRecord {
        &self.order
    }

    pub fn assessment(&self) -> Option<&RiskAssessment> {
        self.assessment.as_ref()
    }

    pub fn notification_request(&self) -> Option<&NotificationRequest> {
        self.request.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn classification(&self) -> Classification {
        match (self.phase, &self.assessment) {
            (WorkflowPhase::Scoring, _) => Classification {
                state: ClassificationState::Scoring,
                is_high_risk: None,
            },
            (_, Some(assessment)) => Classification {
                state: ClassificationState::Scored,
                is_high_risk: Some(assessment.is_high_risk()),
            },
            (_, None) => Classification {
                state: ClassificationState::Unscored,
                is_high_risk: None,
            },
        }
    }

    pub fn send_status(&self) -> SendStatus {
        match self.phase {
            WorkflowPhase::NotifySending => SendStatus::Sending,
            WorkflowPhase::NotifySent => SendStatus::Sent,
            WorkflowPhase::NotifyFailed => SendStatus::Failed,
            _ => SendStatus::Idle,
        }
    }

    /// Whether the "send cancellation alert" action may be offered.
    pub fn can_notify(&self) -> bool {
        self.phase == WorkflowPhase::Scored(RiskClass::HighRisk)
    }

    pub fn can_go_back(&self) -> bool {
        self.options.show_back_navigation
            && matches!(
                self.phase,
                WorkflowPhase::NotifyEditing | WorkflowPhase::NotifyFailed
            )
    }

    pub fn field_error(&self, field: OrderField) -> Option<&OrderValidationError> {
        self.field_errors.get(&field)
    }

    pub fn email_error(&self) -> Option<&'static str> {
        self.email_invalid.then_some(INVALID_EMAIL_MESSAGE)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Hands pending notices to the caller, leaving none behind.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            phase: self.phase.label(),
            view: self.view(),
            classification: self.classification(),
            score: self.assessment.as_ref().map(|assessment| assessment.score),
            order: self.order.clone(),
            send_status: self.send_status(),
            recipient_email: self
                .request
                .as_ref()
                .map(|request| request.recipient_email.clone()),
            field_errors: self
                .field_errors
                .iter()
                .map(|(field, error)| (*field, error.to_string()))
                .collect(),
            email_error: self.email_error(),
        }
    }

    /// Edits one order field. Only available on the assessment screen.
    pub fn set_field(&mut self, update: FieldUpdate) -> Step {
        if self.view() != WorkflowView::Assessment {
            return Step::Ignored;
        }

        let field = update.field();
        match self.order.apply(update) {
            Ok(()) => {
                self.field_errors.remove(&field);
                Step::Applied
            }
            Err(error) => {
                debug!(%field, %error, "order field rejected");
                self.field_errors.insert(field, error.clone());
                Step::Rejected(error.into())
            }
        }
    }

    /// Starts scoring a snapshot of the current order.
    pub fn predict(&mut self) -> Step {
        match self.phase {
            WorkflowPhase::Editing | WorkflowPhase::Scored(_) => {
                let ticket = self.next_ticket();
                self.phase = WorkflowPhase::Scoring;
                self.assessment = None;
                debug!(generation = ticket.generation, "scoring requested");
                Step::Issued(WorkflowCommand::Assess {
                    ticket,
                    order: self.order.clone(),
                })
            }
            WorkflowPhase::Scoring => {
                debug!("prediction already in progress");
                Step::Ignored
            }
            _ => Step::Ignored,
        }
    }

    /// Returns to a blank form from any phase. In-flight work becomes stale.
    pub fn clear(&mut self) -> Step {
        if self.phase != WorkflowPhase::Editing {
            debug!(from = %self.phase, "workflow cleared");
        }
        self.generation += 1;
        self.phase = WorkflowPhase::Editing;
        self.order = OrderRecord::default();
        self.assessment = None;
        self.request = None;
        self.field_errors.clear();
        self.email_invalid = false;
        Step::Applied
    }

    /// Opens the notification form for a high-risk order.
    pub fn show_notify(&mut self) -> Step {
        if !self.can_notify() {
            return Step::Ignored;
        }

        let recipient_email = if self.options.seed_email_from_order {
            self.order.customer_email.clone()
        } else {
            String::new()
        };
        self.request = Some(NotificationRequest {
            recipient_email,
            order_context: self.order.clone(),
        });
        self.email_invalid = false;
        self.phase = WorkflowPhase::NotifyEditing;
        Step::Applied
    }

    /// Updates the recipient while the form is editable.
    pub fn edit_email(&mut self, email: impl Into<String>) -> Step {
        if !matches!(
            self.phase,
            WorkflowPhase::NotifyEditing | WorkflowPhase::NotifyFailed
        ) {
            return Step::Ignored;
        }

        match self.request.as_mut() {
            Some(request) => {
                request.recipient_email = email.into();
                self.email_invalid = false;
                Step::Applied
            }
            None => Step::Ignored,
        }
    }

    /// Leaves the notification form, discarding the request.
    pub fn back_to_assessment(&mut self) -> Step {
        if !self.can_go_back() {
            return Step::Ignored;
        }

        self.request = None;
        self.email_invalid = false;
        self.phase = WorkflowPhase::Scored(RiskClass::HighRisk);
        Step::Applied
    }

    /// Validates the recipient and, if well formed, issues the dispatch.
    pub fn submit(&mut self, email: impl Into<String>) -> Step {
        if !matches!(
            self.phase,
            WorkflowPhase::NotifyEditing | WorkflowPhase::NotifyFailed
        ) {
            if self.phase == WorkflowPhase::NotifySending {
                debug!("dispatch already in flight");
            }
            return Step::Ignored;
        }

        let Some(request) = self.request.as_mut() else {
            return Step::Ignored;
        };
        request.recipient_email = email.into();

        if !validate_email(&request.recipient_email) {
            self.email_invalid = true;
            return Step::Rejected(ValidationError::InvalidEmail);
        }

        let request = request.clone();
        let ticket = self.next_ticket();
        self.email_invalid = false;
        self.phase = WorkflowPhase::NotifySending;
        debug!(generation = ticket.generation, recipient = %request.recipient_email, "dispatch requested");
        Step::Issued(WorkflowCommand::Dispatch { ticket, request })
    }

    /// Applies a completion. Stale completions are discarded.
    pub fn apply(&mut self, event: WorkflowEvent) -> Step {
        match event {
            WorkflowEvent::AssessmentResolved { ticket, result } => {
                if !self.is_current(ticket, WorkflowPhase::Scoring) {
                    debug!(generation = ticket.generation, "discarding stale assessment");
                    return Step::Ignored;
                }

                match result {
                    Ok(assessment) => {
                        info!(
                            score = assessment.score,
                            class = assessment.class.label(),
                            "order assessed"
                        );
                        self.phase = WorkflowPhase::Scored(assessment.class);
                        self.assessment = Some(assessment);
                    }
                    Err(error) => {
                        warn!(%error, "assessment failed");
                        self.phase = WorkflowPhase::Editing;
                        self.notices.push(Notice::AssessmentFailed {
                            reason: error.reason,
                        });
                    }
                }
                Step::Applied
            }
            WorkflowEvent::DispatchResolved { ticket, result } => {
                if !self.is_current(ticket, WorkflowPhase::NotifySending) {
                    debug!(generation = ticket.generation, "discarding stale dispatch result");
                    return Step::Ignored;
                }

                match result {
                    Ok(()) => self.complete_dispatch(),
                    Err(failure) => {
                        warn!(reason = %failure.reason, "cancellation alert failed");
                        self.phase = WorkflowPhase::NotifyFailed;
                        self.notices.push(Notice::DispatchFailed {
                            reason: failure.reason,
                        });
                    }
                }
                Step::Applied
            }
        }
    }

    fn complete_dispatch(&mut self) {
        self.phase = WorkflowPhase::NotifySent;
        let recipient = self
            .request
            .take()
            .map(|request| request.recipient_email)
            .unwrap_or_default();
        info!(%recipient, "cancellation alert delivered");
        self.notices.push(Notice::NotificationSent { recipient });

        // Sent is transient: the form closes and the classification is dropped.
        self.generation += 1;
        self.assessment = None;
        self.email_invalid = false;
        self.phase = WorkflowPhase::Editing;
    }

    fn is_current(&self, ticket: Ticket, expected: WorkflowPhase) -> bool {
        ticket.generation == self.generation && self.phase == expected
    }

    fn next_ticket(&mut self) -> Ticket {
        self.generation += 1;
        Ticket {
            generation: self.generation,
        }
    }
}
