use super::engine::{monthly_rate, round2};
use super::error::EngineError;
use super::types::{
    ContributionFrequency, MAX_TERM_MONTHS, SavingsParameters, SavingsPeriod, SavingsProjection,
};

pub const WEEKS_PER_MONTH: f64 = 4.33333;

/// Monthly compounding where each period's contribution lands before that
/// period's interest is applied.
pub fn savings_growth(params: &SavingsParameters) -> Result<SavingsProjection, EngineError> {
    if params.years == 0 {
        return Err(EngineError::invalid(
            "Projection years must be greater than zero.",
        ));
    }
    if params.years > MAX_TERM_MONTHS / 12 {
        return Err(EngineError::invalid(format!(
            "Projection years must be at most {}.",
            MAX_TERM_MONTHS / 12
        )));
    }

    let rate = monthly_rate(params.annual_rate_pct);
    let contribution = match params.frequency {
        ContributionFrequency::Monthly => params.contribution,
        ContributionFrequency::Weekly => params.contribution * WEEKS_PER_MONTH,
        ContributionFrequency::Unscheduled => 0.0,
    };

    let periods = params.years * 12;
    let mut balance = params.initial_balance;
    let mut total_contributions = 0.0;
    let mut total_interest = 0.0;
    let mut history = Vec::with_capacity(periods as usize);
    for period in 1..=periods {
        balance += contribution;
        total_contributions += contribution;
        let interest = balance * rate;
        balance += interest;
        total_interest += interest;
        history.push(SavingsPeriod {
            period,
            balance: round2(balance),
        });
    }

    Ok(SavingsProjection {
        final_balance: round2(balance),
        total_contributions: round2(total_contributions),
        total_interest: round2(total_interest),
        history,
    })
}
