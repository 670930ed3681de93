//! Order cancellation risk assessment and customer alert workflow.

pub mod assessment;
pub mod batch;
pub mod domain;
pub mod machine;
pub mod notification;
pub mod router;
pub mod runtime;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use assessment::{AssessmentError, AssessmentService, DelayedRuleScorer};
pub use batch::{BatchImportError, BatchReport, BatchRow, OrderBatchImporter};
pub use domain::{
    validate_email, FieldUpdate, OrderField, OrderRecord, OrderValidationError, PaymentMethod,
};
pub use machine::{
    Classification, ClassificationState, Notice, RiskWorkflow, SendStatus, Step, Ticket,
    ValidationError, WorkflowCommand, WorkflowEvent, WorkflowOptions, WorkflowPhase,
    WorkflowSnapshot, WorkflowView, INVALID_EMAIL_MESSAGE,
};
pub use notification::{
    DispatchFailure, NotificationDispatcher, NotificationRequest, SentNotification,
    SimulatedMailer,
};
pub use router::{risk_router, AssessmentView};
pub use runtime::WorkflowRuntime;
pub use scoring::{RiskAssessment, RiskClass, RiskFactor, RiskScorer, ScoreComponent};
