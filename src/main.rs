mod cli;

use anyhow::{Context, Result};
use cli::Args;
use property_scout::config::{Config, CONFIG_FILE};
use property_scout::models::{Field, ObservationSet, PropertyReport};
use property_scout::sources::{Collector, PropertyQuery};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .init();

    info!("🏠 Property Scout - Multi-Source Property Analysis");
    info!("==================================================");

    let query = match &args.address {
        Some(address) => PropertyQuery::new(address.clone()),
        None => PropertyQuery::default(),
    };

    let mut config = Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    args.apply_overrides(&mut config);
    config.validate()?;

    if query.address.is_none() {
        warn!("Could not parse '{}' as a street address; using it verbatim", query.raw_address);
    }

    // Gather observations, either from a saved payload or from the configured sources
    let observations = match &args.payload {
        Some(path) => {
            info!("Loading observations from {}", path.display());
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&contents)?;
            ObservationSet::from_json_with_sources(&payload, &config.source_ids())?
        }
        None => collect(&config, &query).await?,
    };

    let report = property_scout::reconcile(
        &query.display_address(),
        &observations,
        &config.deal,
        &config.market,
    )?;

    print_report(&report, config.alerts.roi_threshold);

    let json = serde_json::to_string_pretty(&report)?;
    tokio::fs::write(&args.output, json)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("💾 Saved report to {}", args.output.display());

    Ok(())
}

/// Handle --init-config: write a default property-scout.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to change market assumptions, deal terms and sources.");
    Ok(())
}

async fn collect(config: &Config, query: &PropertyQuery) -> Result<ObservationSet> {
    let timeout = config.source_timeout();
    let sources = config
        .acquisition
        .sources
        .iter()
        .map(|s| s.build(timeout))
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Querying {} sources for {}...",
        sources.len(),
        query.display_address()
    );

    let collector = Collector::new(sources, timeout)
        .with_retries(config.acquisition.retries, config.retry_backoff());

    Ok(collector.collect(query).await)
}

fn print_report(report: &PropertyReport, roi_threshold: f64) {
    let c = &report.consensus;
    let a = &report.analysis;
    let money = |v: Option<f64>| v.map(|v| format!("${:.0}", v)).unwrap_or_else(|| "N/A".to_string());
    let count = |v: Option<f64>| v.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "N/A".to_string());

    println!();
    println!("{}", report.address);
    println!("   Value: {}   Rent: {}/mo", money(c.value), money(c.rent));
    println!(
        "   {} bed / {} bath, {} sqft",
        count(c.beds),
        count(c.baths),
        count(c.sqft)
    );
    match c.plausible_year_built() {
        Some(year) => println!("   Built: {}", year),
        None => println!("   Built: N/A"),
    }
    if let Some(taxes) = &c.taxes {
        println!("   Taxes: {}", taxes);
    }
    if let Some(last_sold) = &c.last_sold {
        println!("   Last sold: {}", last_sold);
    }
    println!("   Images: {}", c.images.len());
    println!();

    println!("Sources ({}):", c.quality_summary());
    for outcome in &c.source_status {
        println!("   {:<10} {}", outcome.source, outcome.status.label());
    }
    let value_sources = c.contributors_for(Field::Value);
    if !value_sources.is_empty() {
        println!("   Value averaged over: {}", value_sources.join(", "));
    }
    if c.is_low_confidence() {
        println!("   ❌ Less than 2 sources successful - data reliability may be low");
    }
    if c.value.is_none() || c.rent.is_none() {
        println!("   ⚠️ Insufficient market data - missing value or rent treated as 0");
    }
    println!();

    println!(
        "Deal: purchase ${:.0}, reno ${:.0}, {} months held",
        report.deal.purchase, report.deal.reno, report.deal.hold_months
    );
    println!("   Net profit:    ${:.0}", a.net_profit);
    println!("   ROI:           {:.1}%", a.roi);
    println!("   Cap rate:      {:.2}%", a.cap_rate);
    println!("   Cash flow:     ${:.2}/mo", a.cash_flow);
    println!("   Cash on cash:  {:.2}%", a.cash_on_cash);
    println!("   IRR (monthly): {:.2}%", a.irr);
    println!("   Basis:         ${:.0}", a.basis);
    println!();

    if a.meets_roi_threshold(roi_threshold) {
        println!("🎯 Alert: property meets the {:.0}% ROI requirement - review now.", roi_threshold);
    }
}
