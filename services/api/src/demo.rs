use crate::infra::{parse_payment_method, OutageMailer};
use chrono::Local;
use clap::Args;
use order_risk::config::AppConfig;
use order_risk::error::AppError;
use order_risk::telemetry;
use order_risk::workflows::risk::{
    AssessmentService, BatchReport, DelayedRuleScorer, FieldUpdate, NotificationDispatcher,
    OrderBatchImporter, OrderRecord, PaymentMethod, RiskAssessment, RiskScorer, Step,
    WorkflowOptions, WorkflowPhase, WorkflowRuntime, INVALID_EMAIL_MESSAGE,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Promised delivery time in minutes
    #[arg(long, default_value_t = 30)]
    pub(crate) delivery_time: u32,
    /// Order value in currency units
    #[arg(long, default_value_t = 500.0)]
    pub(crate) order_value: f64,
    /// Prior cancellations by the customer (0-10)
    #[arg(long, default_value_t = 2)]
    pub(crate) cancellations: u8,
    /// Delivery distance in kilometres
    #[arg(long, default_value_t = 5.0)]
    pub(crate) distance: f64,
    /// Hour of day the order was placed (0-23)
    #[arg(long, default_value_t = 18)]
    pub(crate) hour: u8,
    /// Payment channel: card, cash or upi
    #[arg(long, value_parser = parse_payment_method, default_value = "card")]
    pub(crate) payment: PaymentMethod,
    /// The delivery address has known problems
    #[arg(long)]
    pub(crate) address_issue: bool,
    /// The order was placed during peak hours
    #[arg(long)]
    pub(crate) peak_hour: bool,
}

impl AssessArgs {
    fn order(&self) -> OrderRecord {
        OrderRecord {
            delivery_time_minutes: self.delivery_time,
            order_value: self.order_value,
            cancellation_history_count: self.cancellations,
            distance_km: self.distance,
            order_hour: self.hour,
            payment_method: self.payment,
            has_address_issue: self.address_issue,
            is_peak_hour_order: self.peak_hour,
            customer_email: String::new(),
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV export of orders to score
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Print every scored row, not just the summary
    #[arg(long)]
    pub(crate) list_rows: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Customer address the alert is sent to
    #[arg(long, default_value = "customer@example.com")]
    pub(crate) email: String,
    /// Make the first dispatch fail so the retry path is shown
    #[arg(long)]
    pub(crate) fail_dispatch: bool,
    /// Skip the simulated scoring and mail latency
    #[arg(long)]
    pub(crate) fast: bool,
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let order = args.order();
    order.validate()?;

    let assessment = RiskScorer::new().assess(&order);
    println!("Order cancellation risk");
    render_assessment(&assessment);
    Ok(())
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let report = OrderBatchImporter::from_path(&args.csv)?;
    println!("Batch risk report for {}", args.csv.display());
    render_batch(&report, args.list_rows);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        email,
        fail_dispatch,
        fast,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let (scoring_delay, dispatch_delay) = if fast {
        (Duration::ZERO, Duration::ZERO)
    } else {
        (config.workflow.scoring_delay, config.workflow.dispatch_delay)
    };

    let mailer = Arc::new(OutageMailer::new(
        dispatch_delay,
        usize::from(fail_dispatch),
    ));
    let mut runtime = WorkflowRuntime::new(
        Arc::new(DelayedRuleScorer::new(scoring_delay)),
        Arc::clone(&mailer),
        WorkflowOptions::default(),
    );

    println!("Order risk workflow demo");
    for update in demo_order(&email) {
        if let Step::Rejected(error) = runtime.set_field(update) {
            println!("- field refused: {error}");
        }
    }

    println!(
        "- scoring order (simulated latency {} ms)",
        scoring_delay.as_millis()
    );
    runtime.predict();
    runtime.settle().await;
    print_notices(&mut runtime);

    let Some(assessment) = runtime.workflow().assessment().cloned() else {
        println!("- no assessment available");
        return Ok(());
    };
    render_assessment(&assessment);

    if !assessment.is_high_risk() {
        println!("- order is safe, no alert needed");
        return Ok(());
    }

    runtime.show_notify();
    let recipient = runtime
        .workflow()
        .notification_request()
        .map(|request| request.recipient_email.clone())
        .unwrap_or(email);

    // the mailer only fails once, so a second attempt always settles the form
    for attempt in 1..=2 {
        println!("- sending alert to {recipient} (attempt {attempt})");
        if let Step::Rejected(_) = runtime.submit(recipient.as_str()) {
            println!("- {INVALID_EMAIL_MESSAGE}");
            return Ok(());
        }
        runtime.settle().await;
        print_notices(&mut runtime);

        if runtime.workflow().phase() != WorkflowPhase::NotifyFailed {
            break;
        }
    }

    println!("\nOutbox");
    for message in mailer.outbox() {
        println!(
            "- {} | {} | {}",
            message.sent_at.with_timezone(&Local).format("%H:%M:%S"),
            message.recipient_email,
            message.subject
        );
        println!("  {}", message.body);
    }
    println!("Workflow returned to {}", runtime.workflow().phase());

    Ok(())
}

fn demo_order(email: &str) -> Vec<FieldUpdate> {
    vec![
        FieldUpdate::DeliveryTimeMinutes(45),
        FieldUpdate::OrderValue(500.0),
        FieldUpdate::CancellationHistoryCount(2),
        FieldUpdate::DistanceKm(15.0),
        FieldUpdate::OrderHour(20),
        FieldUpdate::PaymentMethod(PaymentMethod::Cash),
        FieldUpdate::HasAddressIssue(true),
        FieldUpdate::IsPeakHourOrder(true),
        FieldUpdate::CustomerEmail(email.to_string()),
    ]
}

fn print_notices<S, D>(runtime: &mut WorkflowRuntime<S, D>)
where
    S: AssessmentService,
    D: NotificationDispatcher,
{
    for notice in runtime.take_notices() {
        println!("- [{}] {notice}", notice.title());
    }
}

fn render_assessment(assessment: &RiskAssessment) {
    println!(
        "- {} (score {:.1}): {}",
        assessment.class.headline(),
        assessment.score,
        assessment.class.detail()
    );
    for component in &assessment.components {
        println!("  - {:+.1} {}", component.score, component.notes);
    }
}

fn render_batch(report: &BatchReport, list_rows: bool) {
    println!(
        "- {} orders scored | {} flagged high risk",
        report.rows.len(),
        report.high_risk_count()
    );

    match report.agreement() {
        Some(agreement) => println!(
            "- {:.0}% agreement with {} recorded outcomes",
            agreement * 100.0,
            report.labelled_count()
        ),
        None => println!("- no recorded outcomes to compare against"),
    }

    if list_rows {
        println!("Rows:");
        for row in &report.rows {
            let label = match row.cancelled {
                Some(true) => " | cancelled",
                Some(false) => " | delivered",
                None => "",
            };
            println!(
                "  - {}: {:.1} {}{}",
                row.order_id,
                row.assessment.score,
                row.assessment.class.label(),
                label
            );
        }
    }
}
