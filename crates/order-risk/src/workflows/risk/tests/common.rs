use axum::response::Response;
use serde_json::Value;

use crate::workflows::risk::domain::{FieldUpdate, OrderRecord};
use crate::workflows::risk::machine::{
    RiskWorkflow, Step, Ticket, WorkflowCommand, WorkflowEvent, WorkflowOptions, WorkflowPhase,
};
use crate::workflows::risk::notification::NotificationRequest;
use crate::workflows::risk::scoring::{RiskClass, RiskScorer};

pub(super) const CUSTOMER_EMAIL: &str = "buyer@example.com";

/// Edits that push the default order over the threshold (score 100).
pub(super) fn high_risk_edits() -> Vec<FieldUpdate> {
    vec![
        FieldUpdate::DistanceKm(15.0),
        FieldUpdate::HasAddressIssue(true),
        FieldUpdate::IsPeakHourOrder(true),
        FieldUpdate::CustomerEmail(CUSTOMER_EMAIL.to_string()),
    ]
}

pub(super) fn expect_assess(step: Step) -> (Ticket, OrderRecord) {
    match step {
        Step::Issued(WorkflowCommand::Assess { ticket, order }) => (ticket, order),
        other => panic!("expected assess command, got {other:?}"),
    }
}

pub(super) fn expect_dispatch(step: Step) -> (Ticket, NotificationRequest) {
    match step {
        Step::Issued(WorkflowCommand::Dispatch { ticket, request }) => (ticket, request),
        other => panic!("expected dispatch command, got {other:?}"),
    }
}

/// Runs the local scorer for an issued assessment, as the runtime would.
pub(super) fn resolve_assessment(ticket: Ticket, order: &OrderRecord) -> WorkflowEvent {
    WorkflowEvent::AssessmentResolved {
        ticket,
        result: Ok(RiskScorer::new().assess(order)),
    }
}

pub(super) fn scored_workflow(options: WorkflowOptions, edits: Vec<FieldUpdate>) -> RiskWorkflow {
    let mut workflow = RiskWorkflow::new(options);
    for edit in edits {
        assert_eq!(workflow.set_field(edit), Step::Applied);
    }
    let (ticket, order) = expect_assess(workflow.predict());
    assert_eq!(
        workflow.apply(resolve_assessment(ticket, &order)),
        Step::Applied
    );
    workflow
}

pub(super) fn high_risk_workflow(options: WorkflowOptions) -> RiskWorkflow {
    let workflow = scored_workflow(options, high_risk_edits());
    assert_eq!(
        workflow.phase(),
        WorkflowPhase::Scored(RiskClass::HighRisk)
    );
    workflow
}

pub(super) fn notify_workflow() -> RiskWorkflow {
    let mut workflow = high_risk_workflow(WorkflowOptions::default());
    assert_eq!(workflow.show_notify(), Step::Applied);
    workflow
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
