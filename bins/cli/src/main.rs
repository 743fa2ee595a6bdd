//! Settle CLI
//!
//! Runs candidate listing, payment recording, allocation and void workflows
//! against a JSON scenario loaded into the in-memory gateway.

mod scenario;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use settle_core::allocation::{AllocationCalculator, AllocationSet};
use settle_core::payment::{
    InMemoryGateway, PaymentGateway, PaymentMethod, PaymentService, RecordPaymentInput,
};
use settle_shared::types::{Currency, InvoiceId, Money, PayerId, PaymentId};
use settle_shared::{AppConfig, LoggingConfig};

use crate::scenario::Scenario;

#[derive(Debug, Parser)]
#[command(name = "settle", version, about = "Allocate payments across open invoices")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List a payer's invoices that can receive payment
    Candidates {
        /// Scenario file with `invoices` and `payments`
        #[arg(long, env = "SETTLE_SCENARIO")]
        scenario: PathBuf,
        /// Payer to list invoices for
        #[arg(long)]
        payer: PayerId,
    },
    /// Record a payment, optionally settling one invoice
    Record {
        #[arg(long, env = "SETTLE_SCENARIO")]
        scenario: PathBuf,
        #[arg(long)]
        payer: PayerId,
        /// Amount paid, e.g. 125.50
        #[arg(long, value_parser = AllocationCalculator::parse_amount)]
        amount: Decimal,
        /// Currency code; defaults to the configured currency
        #[arg(long)]
        currency: Option<Currency>,
        #[arg(long, default_value = "transfer", value_parser = parse_method)]
        method: PaymentMethod,
        /// Bank reference or check number
        #[arg(long)]
        reference: Option<String>,
        /// Invoice to settle; omit to record an advance payment
        #[arg(long)]
        invoice: Option<InvoiceId>,
        /// Write the resulting invoices and payments here
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Allocate a payment's unallocated amount across invoices
    Allocate {
        #[arg(long, env = "SETTLE_SCENARIO")]
        scenario: PathBuf,
        #[arg(long)]
        payment: PaymentId,
        /// Invoice to select, optionally with an amount: <uuid>[=<amount>]
        #[arg(long = "invoice", required_unless_present = "oldest_first")]
        invoices: Vec<InvoiceArg>,
        /// Fill the payer's invoices oldest first
        #[arg(long, conflicts_with = "invoices")]
        oldest_first: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Void a payment and reverse its allocations
    Void {
        #[arg(long, env = "SETTLE_SCENARIO")]
        scenario: PathBuf,
        #[arg(long)]
        payment: PaymentId,
        /// Why the payment is voided
        #[arg(long)]
        reason: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// An `--invoice` argument: an invoice ID with an optional manual amount.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InvoiceArg {
    id: InvoiceId,
    amount: Option<Decimal>,
}

impl FromStr for InvoiceArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, amount) = match s.split_once('=') {
            Some((id, amount)) => (id, Some(amount)),
            None => (s, None),
        };
        let id = id
            .trim()
            .parse()
            .map_err(|e| format!("invalid invoice id '{id}': {e}"))?;
        let amount = amount
            .map(AllocationCalculator::parse_amount)
            .transpose()
            .map_err(|e| e.to_string())?;
        Ok(Self { id, amount })
    }
}

fn parse_method(s: &str) -> Result<PaymentMethod, String> {
    PaymentMethod::parse(s).ok_or_else(|| format!("unknown payment method '{s}'"))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let json = logging.json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn service_for(
    scenario: &Path,
    config: &AppConfig,
) -> anyhow::Result<(Arc<InMemoryGateway>, PaymentService<InMemoryGateway>)> {
    let gateway = Arc::new(Scenario::load(scenario)?.into_gateway());
    let service = PaymentService::new(Arc::clone(&gateway), config.allocation.candidate_order);
    Ok((gateway, service))
}

/// Saves the gateway state if requested and returns it for output.
fn finish(gateway: &InMemoryGateway, out: Option<&Path>, payment: Value) -> anyhow::Result<Value> {
    let state = Scenario::from_gateway(gateway)?;
    if let Some(path) = out {
        state.save(path)?;
        info!(path = %path.display(), "Scenario written");
    }
    Ok(json!({ "payment": payment, "invoices": state.invoices }))
}

async fn run(command: Command, config: &AppConfig) -> anyhow::Result<Value> {
    match command {
        Command::Candidates { scenario, payer } => {
            let (_, service) = service_for(&scenario, config)?;
            let candidates = service.candidate_invoices(payer).await?;
            Ok(serde_json::to_value(candidates)?)
        }
        Command::Record {
            scenario,
            payer,
            amount,
            currency,
            method,
            reference,
            invoice,
            out,
        } => {
            let (gateway, service) = service_for(&scenario, config)?;
            let currency = currency.unwrap_or(config.allocation.default_currency);
            let payment = service
                .record_payment(RecordPaymentInput {
                    payer_id: payer,
                    amount: Money::new(amount, currency),
                    method,
                    reference,
                    invoice_id: invoice,
                })
                .await?;
            finish(&gateway, out.as_deref(), serde_json::to_value(payment)?)
        }
        Command::Allocate {
            scenario,
            payment,
            invoices,
            oldest_first,
            out,
        } => {
            let (gateway, service) = service_for(&scenario, config)?;
            let allocated = if oldest_first {
                service.allocate_oldest_first(payment).await?
            } else {
                let set = build_set(&gateway, &service, payment, &invoices).await?;
                service.allocate(payment, &set).await?
            };
            finish(&gateway, out.as_deref(), serde_json::to_value(allocated)?)
        }
        Command::Void {
            scenario,
            payment,
            reason,
            out,
        } => {
            let (gateway, service) = service_for(&scenario, config)?;
            let voided = service.void(payment, &reason).await?;
            finish(&gateway, out.as_deref(), serde_json::to_value(voided)?)
        }
    }
}

/// Selects each requested invoice in order, then applies manual amounts.
async fn build_set(
    gateway: &InMemoryGateway,
    service: &PaymentService<InMemoryGateway>,
    payment_id: PaymentId,
    invoices: &[InvoiceArg],
) -> anyhow::Result<AllocationSet> {
    let payment = gateway.fetch_payment(payment_id).await?;
    let candidates = service.candidate_invoices(payment.payer_id).await?;

    let mut set = AllocationSet::new(payment.payer_id, payment.amount.currency);
    for arg in invoices {
        let invoice = candidates
            .iter()
            .find(|inv| inv.id == arg.id)
            .ok_or_else(|| {
                anyhow!(
                    "invoice {} is not an open invoice of payer {}",
                    arg.id,
                    payment.payer_id
                )
            })?;
        set = AllocationCalculator::select_invoice(&set, invoice, payment.unallocated())?;
        if let Some(amount) = arg.amount {
            set = AllocationCalculator::set_allocation_amount(&set, arg.id, amount)?;
        }
    }
    Ok(set)
}

/// Parses the command line after `.env` is loaded, so `env` fallbacks such
/// as `SETTLE_SCENARIO` can come from the file.
fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    Cli::try_parse_from(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit());

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let output = run(cli.command, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
