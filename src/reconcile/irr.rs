//! Internal rate of return over a periodic cash-flow schedule.
//!
//! Roots are searched in `u = ln(1 + r)`, which maps every rate above -100%
//! onto the real line. The scan is dense near `u = 0`, where realistic rates
//! live, and coarser further out; each sign change is bisected. Among all
//! roots found the one closest to zero wins.

/// Scan step for `|u| <= FINE_SPAN`
const FINE_STEP: f64 = 0.001;
const FINE_SPAN: f64 = 1.0;
/// Scan step beyond the fine span
const COARSE_STEP: f64 = 0.01;
/// `|u|` limit of the scan: rates from about -1 + 4e-18 to 2e17
const MAX_LOG_GROWTH: f64 = 40.0;
const TOLERANCE: f64 = 1e-14;
const MAX_BISECTIONS: usize = 200;

/// Net present value of `cash_flows` at per-period `rate`; the first flow is
/// undiscounted.
pub fn npv(rate: f64, cash_flows: &[f64]) -> f64 {
    let factor = 1.0 + rate;
    let mut discount = 1.0;
    let mut total = 0.0;
    for cf in cash_flows {
        total += cf / discount;
        discount *= factor;
    }
    total
}

/// Per-period IRR as a fraction, or `None` when the schedule has fewer than
/// two flows, never changes sign, or has no root.
pub fn irr(cash_flows: &[f64]) -> Option<f64> {
    if cash_flows.len() < 2 || cash_flows.iter().any(|cf| !cf.is_finite()) {
        return None;
    }

    let has_inflow = cash_flows.iter().any(|cf| *cf > 0.0);
    let has_outflow = cash_flows.iter().any(|cf| *cf < 0.0);
    if !(has_inflow && has_outflow) {
        return None;
    }

    // Leading and trailing zero flows only add a root at r = -1 or r = inf.
    let first = cash_flows.iter().position(|cf| *cf != 0.0)?;
    let last = cash_flows.iter().rposition(|cf| *cf != 0.0)?;
    let flows = &cash_flows[first..=last];

    let mut best: Option<f64> = None;
    let mut consider = |u: f64| {
        let rate = u.exp_m1();
        if rate.is_finite() && best.map_or(true, |b| rate.abs() < b.abs()) {
            best = Some(rate);
        }
    };

    let mut grid = log_growth_grid();
    let mut prev_u = grid.next()?;
    let mut prev_value = scaled_npv(prev_u, flows);
    if prev_value == 0.0 {
        consider(prev_u);
    }

    for u in grid {
        let value = scaled_npv(u, flows);
        if value == 0.0 {
            consider(u);
        } else if prev_value != 0.0 && prev_value.signum() != value.signum() {
            consider(bisect(prev_u, u, prev_value, flows));
        }
        prev_u = u;
        prev_value = value;
    }

    best
}

/// NPV at growth factor `g = e^u`, rescaled by a positive factor so it stays
/// finite: discounted to period 0 when `g >= 1`, compounded to the last
/// period otherwise. Only its sign and zeros matter.
fn scaled_npv(u: f64, flows: &[f64]) -> f64 {
    let growth = u.exp();
    if growth >= 1.0 {
        npv(growth - 1.0, flows)
    } else {
        flows.iter().fold(0.0, |acc, cf| acc * growth + cf)
    }
}

fn bisect(mut lo: f64, mut hi: f64, mut f_lo: f64, flows: &[f64]) -> f64 {
    for _ in 0..MAX_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        let f_mid = scaled_npv(mid, flows);
        if f_mid == 0.0 || (hi - lo).abs() < TOLERANCE {
            return mid;
        }
        if f_lo.signum() == f_mid.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Ascending scan points in `u`, built from integer steps so `u = 0` is hit
/// exactly.
fn log_growth_grid() -> impl Iterator<Item = f64> {
    let fine = (FINE_SPAN / FINE_STEP).round() as i64;
    let coarse = ((MAX_LOG_GROWTH - FINE_SPAN) / COARSE_STEP).round() as i64;

    let below = (1..=coarse)
        .rev()
        .map(|i| -FINE_SPAN - i as f64 * COARSE_STEP);
    let near = (-fine..=fine).map(|i| i as f64 * FINE_STEP);
    let above = (1..=coarse).map(|i| FINE_SPAN + i as f64 * COARSE_STEP);

    below.chain(near).chain(above)
}
