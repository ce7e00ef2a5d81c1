//! Budget Planner
//!
//! Browse the cloud pricing catalog, estimate the monthly cost of a plan in
//! USD and a local currency, and export the estimate as a PDF report.

use clap::{Parser, Subcommand, ValueEnum};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_budget::rates::{AwesomeApiSource, RateSource, StaticRateSource};
use domain_budget::report::methodology_notes;
use domain_budget::{
    BudgetSession, CatalogGateway, DEFAULT_HOURS_PER_MONTH, InMemoryCatalog, MongoCatalogGateway,
    RateProvider, ReportOptions,
};
use eyre::{Result, WrapErr};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod output;
mod plan;

use config::Config;
use output::{Currency, EstimateJson};
use plan::Plan;

#[derive(Parser)]
#[command(name = "budget-planner")]
#[command(about = "Estimate monthly cloud infrastructure costs and export a PDF budget")]
struct Cli {
    /// Read the catalog from JSON exports instead of MongoDB (repeatable)
    #[arg(long = "catalog-file", global = true)]
    catalog_files: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cloud providers in the catalog
    Providers,

    /// List service categories offered by a provider
    Categories {
        #[arg(short, long)]
        provider: String,
    },

    /// List resources of a provider and category with their unit prices
    Resources {
        #[arg(short, long)]
        provider: String,

        #[arg(short, long)]
        category: String,
    },

    /// Show the current USD exchange rate
    Rate,

    /// Price a plan file and optionally write the PDF report
    Estimate {
        /// JSON plan: { "items": [ { provider, service_type, name, quantity?, hours_per_month?, justification? } ] }
        #[arg(long)]
        plan: PathBuf,

        /// Write the PDF report to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Use this exchange rate instead of querying the quote service
        #[arg(long, value_parser = parse_positive_rate)]
        rate: Option<Decimal>,

        /// Leave the safety-margin figure out of the PDF
        #[arg(long)]
        hide_safe_budget: bool,

        /// PDF banner title
        #[arg(long)]
        title: Option<String>,

        /// Name printed in the PDF page footers
        #[arg(long)]
        brand: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn parse_positive_rate(raw: &str) -> std::result::Result<Decimal, String> {
    let rate: Decimal = raw
        .trim()
        .parse()
        .map_err(|e| format!("not a decimal number: {e}"))?;
    if rate <= Decimal::ZERO {
        return Err(format!("exchange rate must be greater than zero, got {rate}"));
    }
    Ok(rate)
}

async fn open_catalog(config: &Config, files: &[PathBuf]) -> Result<Box<dyn CatalogGateway>> {
    if files.is_empty() {
        info!("Connecting to pricing catalog...");
        let gateway = MongoCatalogGateway::connect(&config.catalog)
            .await
            .wrap_err("Pricing catalog is unavailable; pass --catalog-file to work offline")?;
        return Ok(Box::new(gateway));
    }

    let mut catalog = InMemoryCatalog::default();
    for file in files {
        catalog.merge(InMemoryCatalog::from_json_file(file).await?);
    }
    Ok(Box::new(catalog))
}

fn rate_provider(config: &Config, pinned: Option<Decimal>) -> Arc<RateProvider> {
    let source: Box<dyn RateSource> = match pinned {
        Some(rate) => Box::new(StaticRateSource(rate)),
        None => Box::new(AwesomeApiSource::new(&config.rates)),
    };
    Arc::new(RateProvider::new(source, &config.rates))
}

fn report_options(
    generated_at: chrono::NaiveDateTime,
    currency: &Currency,
    title: Option<String>,
    brand: Option<String>,
    hide_safe_budget: bool,
) -> ReportOptions {
    let mut options = ReportOptions::new(generated_at)
        .with_currency(currency.code.clone(), currency.symbol.clone())
        .with_safe_budget(!hide_safe_budget);
    if let Some(title) = title {
        options = options.with_title(title);
    }
    if let Some(brand) = brand {
        options = options.with_brand(brand);
    }
    options
}

async fn write_report(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .wrap_err_with(|| format!("cannot write report to {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let cli = Cli::parse();
    let currency = Currency {
        code: config.rates.local_currency.clone(),
        symbol: config.rates.currency_symbol.clone(),
    };

    match cli.command {
        Commands::Providers => {
            let catalog = open_catalog(&config, &cli.catalog_files).await?;
            let providers = catalog.list_providers().await?;
            if providers.is_empty() {
                warn!("Catalog is empty; seed it before estimating");
            }
            for provider in providers {
                println!("{provider}");
            }
        }

        Commands::Categories { provider } => {
            let catalog = open_catalog(&config, &cli.catalog_files).await?;
            for category in catalog.list_categories(&provider).await? {
                println!("{category}");
            }
        }

        Commands::Resources { provider, category } => {
            let catalog = open_catalog(&config, &cli.catalog_files).await?;
            let entries = catalog.list_resources(&provider, &category).await?;
            if entries.is_empty() {
                warn!(%provider, %category, "No resources found");
            }
            println!("{}", output::resources(&entries));
        }

        Commands::Rate => {
            let quote = rate_provider(&config, None).get_quote().await;
            println!(
                "1 USD = {} {} ({})",
                currency.symbol,
                domain_budget::format::format_rate(quote.rate),
                quote.origin
            );
        }

        Commands::Estimate {
            plan,
            output,
            format,
            rate,
            hide_safe_budget,
            title,
            brand,
        } => {
            let plan = Plan::load(&plan).await?;
            if plan.items.is_empty() {
                warn!("Plan has no items; the estimate will be zero");
            }

            let catalog = open_catalog(&config, &cli.catalog_files).await?;
            let mut session = BudgetSession::new(catalog, rate_provider(&config, rate));

            for (index, item) in plan.items.iter().enumerate() {
                session.add_item(item).await.wrap_err_with(|| {
                    format!(
                        "plan item {} ({} / {} / {})",
                        index + 1,
                        item.provider,
                        item.service_type,
                        item.name
                    )
                })?;
            }

            let dashboard = session.dashboard().await;
            match format {
                OutputFormat::Json => {
                    let estimate = EstimateJson {
                        dashboard: &dashboard,
                        lines: session.cart().lines(),
                    };
                    println!("{}", serde_json::to_string_pretty(&estimate)?);
                }
                OutputFormat::Table => {
                    println!("{}", output::dashboard(&dashboard, &currency));
                    println!("{}", output::details(session.cart().lines()));
                    let notes =
                        methodology_notes(DEFAULT_HOURS_PER_MONTH, dashboard.safety_margin_percent);
                    print!("{}", output::methodology(&notes));
                }
            }

            if let Some(path) = output {
                let options = report_options(
                    chrono::Local::now().naive_local(),
                    &currency,
                    title,
                    brand,
                    hide_safe_budget,
                );
                let bytes = session.render_report(options).await?;
                write_report(&path, &bytes).await?;
                info!(path = %path.display(), bytes = bytes.len(), "Report written");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_estimate() {
        let cli = Cli::try_parse_from([
            "budget-planner",
            "--catalog-file",
            "aws.json",
            "--catalog-file",
            "gcp.json",
            "estimate",
            "--plan",
            "plan.json",
            "--format",
            "json",
            "--rate",
            "5.25",
            "--hide-safe-budget",
            "--title",
            "Staging Platform",
        ])
        .unwrap();

        assert_eq!(cli.catalog_files.len(), 2);
        match cli.command {
            Commands::Estimate {
                plan,
                output,
                format,
                rate,
                hide_safe_budget,
                title,
                brand,
            } => {
                assert_eq!(plan, PathBuf::from("plan.json"));
                assert!(output.is_none());
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(rate, Some(Decimal::new(525, 2)));
                assert!(hide_safe_budget);
                assert_eq!(title.as_deref(), Some("Staging Platform"));
                assert!(brand.is_none());
            }
            _ => panic!("expected estimate"),
        }
    }

    #[test]
    fn test_rate_must_be_numeric() {
        let result = Cli::try_parse_from(["budget-planner", "estimate", "--plan", "p.json", "--rate", "abc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rate_must_be_positive() {
        for raw in ["0", "0.0", "-2", "-0.5"] {
            let flag = format!("--rate={raw}");
            let result =
                Cli::try_parse_from(["budget-planner", "estimate", "--plan", "p.json", flag.as_str()]);
            assert!(result.is_err(), "accepted {raw}");
        }

        assert_eq!(parse_positive_rate(" 5.25 "), Ok(Decimal::new(525, 2)));
        assert!(parse_positive_rate("0").unwrap_err().contains("greater than zero"));
    }

    #[test]
    fn test_report_options_keep_defaults_unless_overridden() {
        let generated_at = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let currency = Currency {
            code: "EUR".to_string(),
            symbol: "€".to_string(),
        };

        let defaults = report_options(generated_at, &currency, None, None, false);
        assert_eq!(defaults.title, ReportOptions::new(generated_at).title);
        assert_eq!(defaults.brand, ReportOptions::new(generated_at).brand);
        assert_eq!(defaults.currency_symbol, "€");
        assert!(defaults.show_safe_budget);

        let custom = report_options(
            generated_at,
            &currency,
            Some("Data Platform".to_string()),
            Some("Acme Cloud".to_string()),
            true,
        );
        assert_eq!(custom.title, "Data Platform");
        assert_eq!(custom.brand, "Acme Cloud");
        assert!(!custom.show_safe_budget);
    }

    #[tokio::test]
    async fn test_catalog_files_are_merged() {
        use std::io::Write;

        let mut aws = tempfile::NamedTempFile::new().unwrap();
        aws.write_all(br#"[{"provider": "AWS", "service_type": "Compute", "name": "t3.micro"}]"#)
            .unwrap();
        let mut gcp = tempfile::NamedTempFile::new().unwrap();
        gcp.write_all(br#"{"provider": "GCP", "service_type": "Compute", "name": "e2-small"}"#)
            .unwrap();

        let config = temp_env::with_vars_unset(["APP_ENV"], || Config::from_env().unwrap());
        let files = vec![aws.path().to_path_buf(), gcp.path().to_path_buf()];
        let catalog = open_catalog(&config, &files).await.unwrap();

        let providers: Vec<String> = catalog.list_providers().await.unwrap().into_iter().collect();
        assert_eq!(providers, vec!["AWS", "GCP"]);
    }

    #[tokio::test]
    async fn test_pinned_rate_skips_the_quote_service() {
        let config = temp_env::with_vars_unset(["APP_ENV"], || Config::from_env().unwrap());
        let provider = rate_provider(&config, Some(Decimal::new(5, 0)));

        let quote = provider.get_quote().await;
        assert_eq!(quote.rate, Decimal::new(5, 0));
        assert_eq!(quote.origin, domain_budget::RateOrigin::Live);
    }
}
