//! Investment metrics for a reconciled property.
//!
//! The analyzer is total: missing market data counts as zero and every
//! division checks its denominator, so a result always comes back.

use tracing::debug;

use crate::models::{AnalysisResult, ConsensusRecord, DealParameters, MarketSettings};

use super::irr::irr;

/// Monthly carrying cost as a fraction of the purchase price
pub const CARRYING_RATE: f64 = 0.007;
/// Floor on the monthly carrying cost
pub const MIN_MONTHLY_CARRYING: f64 = 500.0;
/// Every started block of renovation budget adds a week to the hold
pub const RENO_BLOCK: f64 = 10_000.0;
pub const DAYS_PER_RENO_BLOCK: f64 = 7.0;
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Investment analyzer bound to one set of market assumptions
#[derive(Debug, Clone)]
pub struct Analyzer {
    settings: MarketSettings,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(MarketSettings::default())
    }
}

impl Analyzer {
    pub fn new(settings: MarketSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MarketSettings {
        &self.settings
    }

    pub fn analyze(&self, consensus: &ConsensusRecord, deal: &DealParameters) -> AnalysisResult {
        let arv = consensus.value.unwrap_or(0.0);
        let rent = consensus.rent.unwrap_or(0.0);
        self.analyze_values(arv, rent, deal)
    }

    /// Same as [`Analyzer::analyze`] with after-repair value and rent given directly.
    pub fn analyze_values(&self, arv: f64, rent: f64, deal: &DealParameters) -> AnalysisResult {
        let s = &self.settings;
        let purchase = deal.purchase;
        let reno = deal.reno;

        let hold_days = s.hold_days_base + (reno / RENO_BLOCK).floor() * DAYS_PER_RENO_BLOCK;
        let hold_months = hold_days / DAYS_PER_MONTH;

        let monthly_carrying = (CARRYING_RATE * purchase).max(MIN_MONTHLY_CARRYING);
        let carrying = monthly_carrying * hold_months;

        let sale_costs = arv * (s.brokerage + s.sales_closing) / 100.0;
        let acquisition_costs = purchase * s.acquisition / 100.0;

        let net_profit = arv - purchase - reno - carrying - sale_costs - acquisition_costs;

        let down_payment = purchase * s.equity_fraction();
        let total_invest = down_payment + reno;
        let roi = safe_pct(net_profit, total_invest);

        let expense_pct = s.operating_expense_pct();
        let noi = rent * 12.0 * (1.0 - expense_pct / 100.0);
        let cap_rate = safe_pct(noi, purchase);

        let mortgage_monthly = mortgage_payment(purchase * s.ltv / 100.0, s.interest, s.amortization);
        let cash_flow = rent - mortgage_monthly - rent * expense_pct / 100.0;
        let cash_on_cash = safe_pct(cash_flow * 12.0, down_payment);

        let cash_flows = cash_flow_schedule(
            down_payment + reno,
            cash_flow,
            deal.hold_months,
            arv - down_payment - carrying - sale_costs,
        );
        let irr_pct = irr(&cash_flows).map(|r| r * 100.0).unwrap_or_else(|| {
            debug!("No IRR for a schedule of {} flows", cash_flows.len());
            0.0
        });

        let basis = purchase + reno + carrying + acquisition_costs;

        AnalysisResult {
            net_profit,
            roi,
            cap_rate,
            cash_flow,
            cash_on_cash,
            irr: irr_pct,
            basis,
            hold_days,
            hold_months,
            carrying,
            sale_costs,
            total_invest,
            noi,
            down_payment,
            mortgage_monthly,
            cash_flows,
        }
    }
}

/// Monthly payment on an amortizing loan.
///
/// `annual_rate_pct` is a percentage; zero years means no loan payment and a
/// zero rate falls back to straight-line repayment.
pub fn mortgage_payment(principal: f64, annual_rate_pct: f64, years: u32) -> f64 {
    if years == 0 {
        return 0.0;
    }
    let periods = years as f64 * 12.0;
    let monthly_rate = annual_rate_pct / 100.0 / 12.0;
    if monthly_rate == 0.0 {
        return principal / periods;
    }
    let payment = principal * monthly_rate / (1.0 - (1.0 + monthly_rate).powf(-periods));
    if payment.is_finite() {
        payment
    } else {
        0.0
    }
}

/// `[-initial, monthly x months, exit]`
pub fn cash_flow_schedule(initial_outlay: f64, monthly: f64, months: u32, exit: f64) -> Vec<f64> {
    let mut flows = Vec::with_capacity(months as usize + 2);
    flows.push(-initial_outlay);
    flows.extend(std::iter::repeat(monthly).take(months as usize));
    flows.push(exit);
    flows
}

fn safe_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let pct = numerator / denominator * 100.0;
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}
