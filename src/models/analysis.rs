use serde::{Deserialize, Serialize};

use super::consensus::ConsensusRecord;
use crate::error::{Result, ScoutError};

/// Longest accepted rental hold, in months (50 years). The cash-flow schedule
/// has one entry per month.
pub const MAX_HOLD_MONTHS: u32 = 600;

/// Deal terms supplied by the caller for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealParameters {
    /// Purchase price
    #[serde(default = "default_purchase")]
    pub purchase: f64,
    /// Renovation budget
    #[serde(default = "default_reno")]
    pub reno: f64,
    /// Months the property is held as a rental before resale
    #[serde(default = "default_hold_months")]
    pub hold_months: u32,
}

impl Default for DealParameters {
    fn default() -> Self {
        Self {
            purchase: default_purchase(),
            reno: default_reno(),
            hold_months: default_hold_months(),
        }
    }
}

impl DealParameters {
    /// Reject deal terms the analyzer cannot evaluate in bounded time.
    pub fn validate(&self) -> Result<()> {
        if self.hold_months > MAX_HOLD_MONTHS {
            return Err(ScoutError::InvalidInput(format!(
                "hold_months must be at most {}, got {}",
                MAX_HOLD_MONTHS, self.hold_months
            )));
        }
        Ok(())
    }
}

fn default_purchase() -> f64 {
    100_000.0
}

fn default_reno() -> f64 {
    20_000.0
}

fn default_hold_months() -> u32 {
    12
}

/// Market assumptions shared by every analysis run.
///
/// Percentages are expressed as whole numbers (`80.0` means 80%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSettings {
    /// Base holding period in days before renovation time is added
    #[serde(default = "default_hold_days_base")]
    pub hold_days_base: f64,
    /// Loan-to-value percentage
    #[serde(default = "default_ltv")]
    pub ltv: f64,
    /// Annual interest rate percentage
    #[serde(default = "default_interest")]
    pub interest: f64,
    /// Amortization period in years
    #[serde(default = "default_amortization")]
    pub amortization: u32,
    #[serde(default = "default_brokerage")]
    pub brokerage: f64,
    #[serde(default = "default_sales_closing")]
    pub sales_closing: f64,
    #[serde(default = "default_acquisition")]
    pub acquisition: f64,
    #[serde(default = "default_vacancy")]
    pub vacancy: f64,
    #[serde(default = "default_maintenance")]
    pub maintenance: f64,
    #[serde(default = "default_management")]
    pub management: f64,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            hold_days_base: default_hold_days_base(),
            ltv: default_ltv(),
            interest: default_interest(),
            amortization: default_amortization(),
            brokerage: default_brokerage(),
            sales_closing: default_sales_closing(),
            acquisition: default_acquisition(),
            vacancy: default_vacancy(),
            maintenance: default_maintenance(),
            management: default_management(),
        }
    }
}

impl MarketSettings {
    /// Vacancy, maintenance and management combined, in percent of rent.
    pub fn operating_expense_pct(&self) -> f64 {
        self.vacancy + self.maintenance + self.management
    }

    /// Share of the purchase price paid in cash, as a fraction.
    pub fn equity_fraction(&self) -> f64 {
        1.0 - self.ltv / 100.0
    }
}

fn default_hold_days_base() -> f64 {
    60.0
}

fn default_ltv() -> f64 {
    80.0
}

fn default_interest() -> f64 {
    5.5
}

fn default_amortization() -> u32 {
    30
}

fn default_brokerage() -> f64 {
    3.0
}

fn default_sales_closing() -> f64 {
    1.5
}

fn default_acquisition() -> f64 {
    1.5
}

fn default_vacancy() -> f64 {
    5.0
}

fn default_maintenance() -> f64 {
    10.0
}

fn default_management() -> f64 {
    8.0
}

/// Profitability metrics for one deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub net_profit: f64,
    /// Return on invested cash, percent
    pub roi: f64,
    /// Net operating income over purchase price, percent
    pub cap_rate: f64,
    /// Monthly cash flow after debt service and operating expenses
    pub cash_flow: f64,
    /// Annual cash flow over down payment, percent
    pub cash_on_cash: f64,
    /// Per-period internal rate of return of `cash_flows`, percent
    pub irr: f64,
    /// Purchase, renovation, carrying and acquisition costs
    pub basis: f64,
    pub hold_days: f64,
    pub hold_months: f64,
    pub carrying: f64,
    pub sale_costs: f64,
    pub total_invest: f64,
    pub noi: f64,
    pub down_payment: f64,
    pub mortgage_monthly: f64,
    /// Schedule the IRR was solved over
    pub cash_flows: Vec<f64>,
}

impl AnalysisResult {
    /// Whether the deal clears the alert threshold (strictly above).
    pub fn meets_roi_threshold(&self, threshold_pct: f64) -> bool {
        self.roi > threshold_pct
    }

    /// Cumulative cash flow at the end of each of the next `months` months.
    pub fn cumulative_projection(&self, months: u32) -> Vec<f64> {
        (1..=months).map(|m| self.cash_flow * m as f64).collect()
    }
}

/// Everything produced for one analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyReport {
    pub address: String,
    pub consensus: ConsensusRecord,
    pub deal: DealParameters,
    pub analysis: AnalysisResult,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}
