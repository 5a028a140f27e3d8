use super::engine::round2;
use super::types::{ChartPoint, Schedule, YearlyRollup};

pub const CHART_SAMPLE_MONTHS: u32 = 6;

/// Calendar-year totals of a ledger, preceded by a year-0 row holding the
/// original principal.
pub fn yearly_rollup(schedule: &Schedule, principal: f64) -> Vec<YearlyRollup> {
    let mut years = Vec::with_capacity(schedule.months() as usize / 12 + 2);
    years.push(YearlyRollup {
        year: 0,
        payment: 0.0,
        principal: 0.0,
        interest: 0.0,
        balance: round2(principal),
    });
    years.extend(yearly_totals(schedule));
    years
}

/// Calendar-year totals without the origination row. Year `n` covers months
/// `12(n-1)+1 ..= 12n`; the balance is the last one seen in the year.
pub fn yearly_totals(schedule: &Schedule) -> Vec<YearlyRollup> {
    let mut years: Vec<YearlyRollup> = Vec::new();
    for entry in schedule.entries() {
        let year = (entry.month - 1) / 12 + 1;
        match years.last_mut() {
            Some(current) if current.year == year => {
                current.payment += entry.payment;
                current.principal += entry.principal;
                current.interest += entry.interest;
                current.balance = entry.balance;
            }
            _ => years.push(YearlyRollup {
                year,
                payment: entry.payment,
                principal: entry.principal,
                interest: entry.interest,
                balance: entry.balance,
            }),
        }
    }
    for year in &mut years {
        year.payment = round2(year.payment);
        year.principal = round2(year.principal);
        year.interest = round2(year.interest);
    }
    years
}

/// Balance of `schedule` at `month`, with month 0 reporting `principal` and
/// anything past the end reporting 0.
pub fn balance_at(schedule: &Schedule, month: u32, principal: f64) -> f64 {
    if month == 0 {
        return round2(principal);
    }
    schedule.balance_after(month).unwrap_or(0.0)
}

/// Samples both balances every six months from origination until the longer
/// schedule ends.
pub fn chart_points(baseline: &Schedule, alternative: &Schedule, principal: f64) -> Vec<ChartPoint> {
    let last = baseline.months().max(alternative.months());
    (0..=last)
        .step_by(CHART_SAMPLE_MONTHS as usize)
        .map(|month| ChartPoint {
            month,
            baseline_balance: balance_at(baseline, month, principal),
            overpay_balance: balance_at(alternative, month, principal),
        })
        .collect()
}

/// Running interest total, rounded to the cent at each month.
pub fn cumulative_interest(schedule: &Schedule) -> Vec<f64> {
    let mut total = 0.0;
    schedule
        .entries()
        .iter()
        .map(|entry| {
            total += entry.interest;
            round2(total)
        })
        .collect()
}

/// First month (1-based) where the alternative's cumulative interest plus
/// `fee` falls below the baseline's, compared over the shorter schedule.
pub fn break_even_month(baseline: &Schedule, alternative: &Schedule, fee: f64) -> Option<u32> {
    let base = cumulative_interest(baseline);
    let alt = cumulative_interest(alternative);
    base.iter()
        .zip(alt.iter())
        .position(|(&b, &a)| round2(a + fee) < b)
        .map(|idx| idx as u32 + 1)
}
