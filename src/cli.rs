//! Command-line interface argument parsing.

use clap::Parser;
use property_scout::config::{Config, CONFIG_FILE};
use std::path::PathBuf;

/// Property Scout - multi-source property valuation and deal analysis
///
/// Collects observations for one address from every configured source,
/// reconciles them into a consensus record and analyzes the deal.
///
/// Examples:
///   property-scout "1841 Marks Ave, Akron, OH 44305"
///   property-scout "1841 Marks Ave, Akron, OH 44305" --payload saved.json
///   property-scout "12 Elm St, Dayton, OH 45402" --purchase 85000 --reno 15000
///   property-scout --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Street address to analyze, e.g. "1841 Marks Ave, Akron, OH 44305"
    #[arg(value_name = "ADDRESS")]
    pub address: Option<String>,

    /// Reconcile a saved JSON payload of per-source observations instead of
    /// querying the sources
    #[arg(long, value_name = "FILE")]
    pub payload: Option<PathBuf>,

    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = CONFIG_FILE,
        env = "PROPERTY_SCOUT_CONFIG"
    )]
    pub config: PathBuf,

    /// Where to write the JSON report
    #[arg(short, long, value_name = "FILE", default_value = "consensus_report.json")]
    pub output: PathBuf,

    /// Purchase price, overrides [deal].purchase
    #[arg(long, value_name = "USD")]
    pub purchase: Option<f64>,

    /// Renovation budget, overrides [deal].reno
    #[arg(long, value_name = "USD")]
    pub reno: Option<f64>,

    /// Rental hold in months, overrides [deal].hold_months
    #[arg(long, value_name = "MONTHS")]
    pub hold_months: Option<u32>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    /// Generate a default property-scout.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply deal overrides from the command line on top of the file config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(purchase) = self.purchase {
            config.deal.purchase = purchase;
        }
        if let Some(reno) = self.reno {
            config.deal.reno = reno;
        }
        if let Some(hold_months) = self.hold_months {
            config.deal.hold_months = hold_months;
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
