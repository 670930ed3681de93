use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::warn;

use super::assessment::AssessmentService;
use super::domain::FieldUpdate;
use super::machine::{Notice, RiskWorkflow, Step, WorkflowCommand, WorkflowEvent, WorkflowOptions};
use super::notification::NotificationDispatcher;

/// Drives a [`RiskWorkflow`] against real scoring and mail ports.
///
/// Commands are spawned as background tasks; their completions are applied one at a
/// time by [`WorkflowRuntime::next_event`], so the workflow itself is only ever touched
/// from the caller's task.
pub struct WorkflowRuntime<S, D> {
    workflow: RiskWorkflow,
    assessor: Arc<S>,
    dispatcher: Arc<D>,
    pending: JoinSet<WorkflowEvent>,
}

impl<S, D> WorkflowRuntime<S, D>
where
    S: AssessmentService,
    D: NotificationDispatcher,
{
    pub fn new(assessor: Arc<S>, dispatcher: Arc<D>, options: WorkflowOptions) -> Self {
        Self {
            workflow: RiskWorkflow::new(options),
            assessor,
            dispatcher,
            pending: JoinSet::new(),
        }
    }

    pub fn workflow(&self) -> &RiskWorkflow {
        &self.workflow
    }

    /// Operations started but not yet applied, stale ones included.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.workflow.take_notices()
    }

    pub fn set_field(&mut self, update: FieldUpdate) -> Step {
        self.workflow.set_field(update)
    }

    pub fn predict(&mut self) -> Step {
        let step = self.workflow.predict();
        self.launch(&step);
        step
    }

    pub fn clear(&mut self) -> Step {
        self.workflow.clear()
    }

    pub fn show_notify(&mut self) -> Step {
        self.workflow.show_notify()
    }

    pub fn edit_email(&mut self, email: impl Into<String>) -> Step {
        self.workflow.edit_email(email)
    }

    pub fn back_to_assessment(&mut self) -> Step {
        self.workflow.back_to_assessment()
    }

    pub fn submit(&mut self, email: impl Into<String>) -> Step {
        let step = self.workflow.submit(email);
        self.launch(&step);
        step
    }

    /// Waits for the next completion and applies it. `None` when nothing is in flight.
    pub async fn next_event(&mut self) -> Option<Step> {
        loop {
            match self.pending.join_next().await? {
                Ok(event) => return Some(self.workflow.apply(event)),
                Err(error) => {
                    // The task never produced a completion; the phase it was meant to
                    // resolve stays put so the operator can clear or retry.
                    warn!(%error, "workflow task aborted");
                }
            }
        }
    }

    /// Applies completions until no operation remains in flight.
    pub async fn settle(&mut self) -> Vec<Step> {
        let mut steps = Vec::new();
        while let Some(step) = self.next_event().await {
            steps.push(step);
        }
        steps
    }

    fn launch(&mut self, step: &Step) {
        let Some(command) = step.command() else {
            return;
        };

        match command.clone() {
            WorkflowCommand::Assess { ticket, order } => {
                let assessor = Arc::clone(&self.assessor);
                self.pending.spawn(async move {
                    let result = assessor.assess(order).await;
                    WorkflowEvent::AssessmentResolved { ticket, result }
                });
            }
            WorkflowCommand::Dispatch { ticket, request } => {
                let dispatcher = Arc::clone(&self.dispatcher);
                self.pending.spawn(async move {
                    let result = dispatcher.dispatch(request).await;
                    WorkflowEvent::DispatchResolved { ticket, result }
                });
            }
        }
    }
}
