use crate::demo::{run_assess, run_batch, run_demo, AssessArgs, BatchArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use order_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Order Risk",
    about = "Score delivery orders for cancellation risk and alert customers about risky orders",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a single order described by flags
    Assess(AssessArgs),
    /// Score every order in a CSV export and compare against recorded outcomes
    Batch(BatchArgs),
    /// Walk one risky order through scoring and customer notification
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Assess(args) => run_assess(args),
        Command::Batch(args) => run_batch(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_risk::workflows::risk::PaymentMethod;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["order-risk-api"]).expect("parses without arguments");
        assert!(cli.command.is_none());
    }

    #[test]
    fn assess_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "order-risk-api",
            "assess",
            "--distance",
            "15",
            "--payment",
            "cod",
            "--address-issue",
        ])
        .expect("assess flags parse");

        match cli.command {
            Some(Command::Assess(args)) => {
                assert_eq!(args.distance, 15.0);
                assert_eq!(args.payment, PaymentMethod::Cash);
                assert!(args.address_issue);
                assert!(!args.peak_hour);
                assert_eq!(args.cancellations, 2);
            }
            other => panic!("expected assess command, got {other:?}"),
        }
    }

    #[test]
    fn unknown_payment_method_is_refused() {
        let result = Cli::try_parse_from(["order-risk-api", "assess", "--payment", "cheque"]);
        assert!(result.is_err());
    }
}
