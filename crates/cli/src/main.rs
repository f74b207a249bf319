use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use noteforge_core::catalog::{
    CatalogClient, CatalogFetch, NoopResponseCache, NormalizedProduct, RECENT_FETCH_LIMIT,
};
use noteforge_core::config::Settings;
use noteforge_core::domain::inputs::WizardRequest;
use noteforge_core::domain::{Currency, Objective, RiskProfile};
use noteforge_core::ideas::{self, PlatformHealth, HEALTH_FETCH_LIMIT};
use noteforge_core::llm::AnthropicPhraser;

#[derive(Debug, Parser)]
#[command(name = "noteforge_cli")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build idea cards for a request and print them as JSON.
    Ideas {
        #[command(flatten)]
        request: RequestArgs,

        /// Ask the phrasing model to reword titles and explainers.
        #[arg(long)]
        phrase: bool,
    },
    /// Show the comparable cohort and its coupon band.
    Preview {
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Check that the upstream catalog answers.
    PlatformHealth,
}

#[derive(Debug, Args)]
struct RequestArgs {
    /// e.g. "Enhanced Income", "Capital Preservation".
    #[arg(long, value_parser = parse_objective)]
    objective: Objective,

    /// Comma-separated ticker or index codes.
    #[arg(long, value_delimiter = ',', required = true)]
    underliers: Vec<String>,

    #[arg(long, default_value_t = 24)]
    tenor_months: u32,

    #[arg(long, value_parser = parse_currency, default_value = "USD")]
    currency: Currency,

    #[arg(long, value_parser = parse_risk, default_value = "Moderate")]
    risk: RiskProfile,

    /// Skip the upstream fetch and use static bands only.
    #[arg(long)]
    offline: bool,
}

impl RequestArgs {
    fn to_request(&self) -> WizardRequest {
        WizardRequest {
            objective: Some(self.objective),
            tenor_months: Some(f64::from(self.tenor_months)),
            underliers: Some(self.underliers.clone()),
            risk_profile: Some(self.risk),
            investment_currency: Some(self.currency),
            notes: None,
        }
    }
}

fn parse_objective(s: &str) -> Result<Objective, String> {
    Objective::parse(s).ok_or_else(|| {
        let known: Vec<_> = Objective::ALL.iter().map(|o| o.as_str()).collect();
        format!("unknown objective {s:?}; expected one of: {}", known.join(", "))
    })
}

fn parse_currency(s: &str) -> Result<Currency, String> {
    Currency::parse(s)
        .ok_or_else(|| format!("unsupported currency {s:?}; expected AUD, USD or EUR"))
}

fn parse_risk(s: &str) -> Result<RiskProfile, String> {
    [
        RiskProfile::Conservative,
        RiskProfile::Moderate,
        RiskProfile::Aggressive,
    ]
    .into_iter()
    .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
    .ok_or_else(|| format!("unknown risk profile {s:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let cli = Cli::parse();
    let result = run(cli.command, &settings).await;
    if let Err(e) = &result {
        sentry_anyhow::capture_anyhow(e);
    }
    result
}

async fn run(command: Command, settings: &Settings) -> anyhow::Result<()> {
    // One-shot process: nothing to gain from caching responses.
    let catalog = CatalogClient::from_settings(settings, Arc::new(NoopResponseCache))?;

    match command {
        Command::Ideas { request, phrase } => {
            let inputs = request
                .to_request()
                .validate_and_into_inputs()
                .context("invalid request")?;
            let products = load_products(&catalog, request.offline).await;

            let mut response = ideas::build_ideas(&inputs, &products, &settings.article_base);
            if phrase {
                let phraser = AnthropicPhraser::from_settings(settings)?;
                ideas::phrase_ideas(&phraser, &inputs, &mut response, &settings.article_base)
                    .await;
            }
            print_json(&response)
        }
        Command::Preview { request } => {
            let inputs = request
                .to_request()
                .into_preview_inputs()
                .context("invalid request")?;
            let products = load_products(&catalog, request.offline).await;
            print_json(&ideas::preview_cohort(inputs, &products))
        }
        Command::PlatformHealth => {
            let fetch = catalog.fetch_recent(HEALTH_FETCH_LIMIT).await;
            let health = PlatformHealth::from_fetch(catalog.base_url(), &fetch);
            print_json(&health)?;
            match fetch {
                CatalogFetch::Products(products) => {
                    tracing::info!(count = products.len(), base = ?catalog.base_url(), "platform reachable");
                    Ok(())
                }
                CatalogFetch::Unavailable(err) => {
                    Err(anyhow::Error::new(err).context("platform health check failed"))
                }
            }
        }
    }
}

async fn load_products(catalog: &CatalogClient, offline: bool) -> Vec<NormalizedProduct> {
    if offline {
        tracing::info!("offline: skipping upstream fetch");
        return Vec::new();
    }
    match catalog.fetch_recent(RECENT_FETCH_LIMIT).await {
        CatalogFetch::Products(products) => {
            tracing::info!(count = products.len(), "catalog products loaded");
            products
        }
        CatalogFetch::Unavailable(err) => {
            tracing::warn!(error = %err, "catalog unavailable; using static bands");
            Vec::new()
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{out}");
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
