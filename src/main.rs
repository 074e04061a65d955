use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use kashela::application::aggregator::{self, Period};
use kashela::application::lifecycle::{LifecycleConfig, PaymentLifecycle};
use kashela::domain::money::Amount;
use kashela::domain::payment::{BankDetails, PaymentRequest};
use kashela::domain::ports::{ClockRef, PaymentGatewayRef};
use kashela::domain::transaction::{TransactionRecord, TransactionType};
use kashela::infrastructure::clock::{TokioClock, VirtualClock};
use kashela::infrastructure::simulated::SimulatedGateway;
use kashela::interfaces::csv::transaction_reader::TransactionReader;
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarise a financial report CSV
    Report(ReportArgs),
    /// Run a payment attempt through the gateway
    Pay(PayArgs),
}

#[derive(Args)]
struct ReportArgs {
    /// Report CSV (Date,Type,Category,Description,Amount,Reference)
    input: PathBuf,

    /// Time bucket for the period breakdown
    #[arg(long, value_enum, default_value_t = Period::Monthly)]
    period: Period,

    /// Transaction type for the category breakdown
    #[arg(long, value_enum, default_value_t = TransactionType::Expense)]
    category_type: TransactionType,

    /// Directory to write a financial-report-<date>.csv export into
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Args)]
struct PayArgs {
    #[command(subcommand)]
    method: PayMethod,

    /// Backend API base URL. Without it the simulated gateway is used.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token for the backend API
    #[arg(long, global = true, default_value = "")]
    token: String,

    /// Status checks the simulated gateway answers as pending before confirming
    #[arg(long, global = true, default_value_t = 0)]
    pending_polls: u32,

    /// Use simulated time instead of really waiting
    #[arg(long, global = true)]
    instant: bool,

    #[arg(long, global = true, default_value_t = 5)]
    poll_interval_secs: u64,

    #[arg(long, global = true, default_value_t = 10)]
    max_poll_attempts: u32,

    #[arg(long, global = true, default_value_t = 2)]
    settlement_delay_secs: u64,
}

#[derive(Subcommand)]
enum PayMethod {
    /// M-PESA push to a phone
    Mpesa {
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        phone: String,
    },
    /// Bank deposit
    Bank {
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        bank_name: String,
        #[arg(long)]
        account_number: String,
        #[arg(long)]
        account_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(args) => report(args),
        Command::Pay(args) => pay(args).await,
    }
}

fn report(args: ReportArgs) -> Result<()> {
    let file = File::open(&args.input).into_diagnostic()?;
    let reader = TransactionReader::new(file);
    let mut records: Vec<TransactionRecord> = Vec::new();
    for record in reader.transactions() {
        match record {
            Ok(record) => records.push(record),
            Err(e) => warn!("Error reading transaction: {e}"),
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let totals = aggregator::totals(&records);
    writeln!(out, "total_income,total_expenses,net_balance,profit_margin").into_diagnostic()?;
    writeln!(
        out,
        "{},{},{},{}",
        totals.total_income.normalize(),
        totals.total_expenses.normalize(),
        totals.net_balance.normalize(),
        totals.profit_margin.round_dp(2).normalize()
    )
    .into_diagnostic()?;

    let mut categories: Vec<_> = aggregator::group_by_category(&records, args.category_type)
        .into_iter()
        .collect();
    categories.sort();
    writeln!(out, "\ncategory,{}", args.category_type).into_diagnostic()?;
    for (category, amount) in categories {
        writeln!(out, "{category},{}", amount.normalize()).into_diagnostic()?;
    }

    writeln!(out, "\n{},income,expenses", args.period).into_diagnostic()?;
    for bucket in aggregator::group_by_time_period(&records, args.period) {
        writeln!(
            out,
            "{},{},{}",
            bucket.period_key,
            bucket.income.normalize(),
            bucket.expenses.normalize()
        )
        .into_diagnostic()?;
    }

    if let Some(dir) = args.export {
        let path = dir.join(aggregator::report_filename(Utc::now().date_naive()));
        let bytes = aggregator::export_to_csv(&records).into_diagnostic()?;
        std::fs::write(&path, bytes).into_diagnostic()?;
        writeln!(out, "\nexported {}", path.display()).into_diagnostic()?;
    }

    Ok(())
}

fn gateway(args: &PayArgs) -> PaymentGatewayRef {
    let simulated = || -> PaymentGatewayRef {
        Arc::new(SimulatedGateway::new().with_pending_polls(args.pending_polls))
    };

    match &args.api_url {
        #[cfg(feature = "gateway-http")]
        Some(url) => Arc::new(kashela::infrastructure::http::HttpGateway::new(
            url.as_str(),
            args.token.as_str(),
        )),
        #[cfg(not(feature = "gateway-http"))]
        Some(_) => {
            eprintln!(
                "WARNING: HTTP gateway requested via --api-url, but 'gateway-http' feature is not enabled. Falling back to the simulated gateway."
            );
            simulated()
        }
        None => simulated(),
    }
}

async fn pay(args: PayArgs) -> Result<()> {
    let request = match &args.method {
        PayMethod::Mpesa { amount, phone } => PaymentRequest::Mpesa {
            amount: Amount::new(*amount).into_diagnostic()?,
            phone_number: phone.clone(),
        },
        PayMethod::Bank {
            amount,
            bank_name,
            account_number,
            account_name,
        } => PaymentRequest::Bank {
            amount: Amount::new(*amount).into_diagnostic()?,
            details: BankDetails {
                bank_name: bank_name.clone(),
                account_number: account_number.clone(),
                account_name: account_name.clone(),
            },
        },
    };

    let clock: ClockRef = if args.instant {
        Arc::new(VirtualClock::starting_at(Utc::now()))
    } else {
        Arc::new(TokioClock)
    };
    let config = LifecycleConfig {
        poll_interval: Duration::from_secs(args.poll_interval_secs),
        max_poll_attempts: args.max_poll_attempts,
        settlement_delay: Duration::from_secs(args.settlement_delay_secs),
    };
    let lifecycle = PaymentLifecycle::new(gateway(&args), clock, config);

    let mut changes = lifecycle.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(change) = changes.recv().await {
            println!("{} {}", change.reference, change.status);
        }
    });

    let outcome = lifecycle.initiate(request).await.into_diagnostic()?;
    drop(lifecycle);
    progress.await.into_diagnostic()?;

    println!("{}", serde_json::to_string(&outcome).into_diagnostic()?);
    if let Some(record) = outcome.to_transaction(Utc::now().date_naive()) {
        let csv = aggregator::export_to_csv(&[record]).into_diagnostic()?;
        println!("{}", String::from_utf8_lossy(&csv));
    }

    if outcome.is_completed() {
        Ok(())
    } else {
        Err(miette!(
            "payment {} ended {}",
            outcome.reference,
            outcome.status
        ))
    }
}
