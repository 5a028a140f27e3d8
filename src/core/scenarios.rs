use tracing::debug;

use super::aggregate::{break_even_month, chart_points, yearly_rollup};
use super::engine::{base_payment, monthly_rate, round_to, round2, simulate};
use super::error::EngineError;
use super::types::{
    LoanParameters, LoanToValue, MAX_TERM_MONTHS, OverpaymentHeadline, OverpaymentParameters,
    OverpaymentSummary, RefinanceParameters, RefinanceSummary, RolloverParameters, RolloverSummary,
    TargetTermHeadline, TargetTermParameters, TargetTermSummary,
};

/// Annual overpayment, as a share of the loan, most lenders allow without
/// early-repayment charges.
pub const PENALTY_FREE_OVERPAY_PCT: f64 = 10.0;

fn years_from_months(months: u32) -> f64 {
    round_to(f64::from(months) / 12.0, 1)
}

fn years_between(longer: u32, shorter: u32) -> f64 {
    round_to((f64::from(longer) - f64::from(shorter)) / 12.0, 1)
}

fn term_ceiling_error() -> EngineError {
    EngineError::invalid(format!(
        "Loan term must be at most {} years.",
        MAX_TERM_MONTHS / 12
    ))
}

fn ensure_within_term_ceiling(loans: &[&LoanParameters]) -> Result<(), EngineError> {
    if loans.iter().any(|loan| loan.term_months > MAX_TERM_MONTHS) {
        return Err(term_ceiling_error());
    }
    Ok(())
}

pub fn overpayment_summary(
    params: &OverpaymentParameters,
) -> Result<OverpaymentSummary, EngineError> {
    let loan = &params.loan;
    ensure_within_term_ceiling(&[loan])?;
    if !loan.is_valid() {
        return Err(EngineError::invalid("Invalid loan amount or years."));
    }

    let (baseline, base_first) = simulate(&loan.without_overpayment());
    let (accelerated, over_first) = simulate(loan);

    let baseline_interest = baseline.total_interest();
    let overpay_interest = accelerated.total_interest();
    let ltv_pct = if params.property_value > 0.0 {
        LoanToValue::Percent(round2(loan.principal / params.property_value * 100.0))
    } else {
        LoanToValue::NotApplicable
    };

    let structured_summary = OverpaymentHeadline {
        base_monthly_payment: round2(base_first),
        overpay_monthly_payment: round2(loan.overpayment.typical_payment(over_first)),
        time_saved_years: years_between(baseline.months(), accelerated.months()),
        interest_saved: round2(baseline_interest - overpay_interest),
        ltv_pct,
        baseline_interest: round2(baseline_interest),
        overpay_interest: round2(overpay_interest),
        baseline_months: baseline.months(),
        overpay_months: accelerated.months(),
    };

    Ok(OverpaymentSummary {
        structured_summary,
        chart_data: chart_points(&baseline, &accelerated, loan.principal),
        yearly_schedule: yearly_rollup(&accelerated, loan.principal),
        monthly_schedule: accelerated,
    })
}

/// Pays the foreign loan off with its overpayments, then redirects the whole
/// freed monthly payment, converted, into the domestic loan.
pub fn rollover_summary(params: &RolloverParameters) -> Result<RolloverSummary, EngineError> {
    let foreign = &params.foreign;
    let domestic = &params.domestic;
    ensure_within_term_ceiling(&[foreign, domestic])?;
    if !foreign.is_valid() || !domestic.is_valid() {
        return Err(EngineError::invalid(
            "EUR or GBP mortgage data is missing or invalid.",
        ));
    }

    let (eur_baseline, _) = simulate(&foreign.without_overpayment());
    let (eur_accelerated, eur_first) = simulate(foreign);
    let eur_months = eur_accelerated.months();
    let eur_baseline_interest = eur_baseline.total_interest();
    let eur_overpay_interest = eur_accelerated.total_interest();

    let freed_eur = foreign.overpayment.typical_payment(eur_first);
    let freed_gbp = freed_eur * params.conversion_rate;

    let (uk_baseline, _) = simulate(domestic);
    let uk_baseline_months = uk_baseline.months();
    if eur_months >= uk_baseline_months {
        return Err(EngineError::Infeasible(format!(
            "No rollover benefit: the EUR mortgage takes {eur_months} months, which is not \
             before the GBP mortgage finishes ({uk_baseline_months} months)."
        )));
    }

    let uk_balance_at_roll = uk_baseline.balance_after(eur_months).unwrap_or(0.0);
    let uk_interest_pre_roll = uk_baseline.interest_through(eur_months);
    let months_left_baseline = uk_baseline_months - eur_months;

    let mut post_roll = domestic.rebased(eur_months, uk_balance_at_roll, months_left_baseline);
    post_roll.overpayment.monthly_extra += freed_gbp;
    let (uk_post_roll, _) = simulate(&post_roll);
    debug!(
        eur_months,
        uk_baseline_months,
        post_roll_months = uk_post_roll.months(),
        "rollover simulated"
    );

    let uk_baseline_interest = uk_baseline.total_interest();
    let uk_with_roll_interest = uk_interest_pre_roll + uk_post_roll.total_interest();
    let uk_baseline_years = years_from_months(uk_baseline_months);
    let eur_years = years_from_months(eur_months);
    let uk_post_roll_years = years_from_months(uk_post_roll.months());
    let annual_overpay_pct = if uk_balance_at_roll > 0.0 {
        round_to(freed_gbp * 12.0 / uk_balance_at_roll * 100.0, 1)
    } else {
        0.0
    };

    Ok(RolloverSummary {
        eur_payoff_time_years: eur_years,
        eur_payoff_time_months: eur_months,
        eur_freed_payment: round2(freed_eur),
        gbp_freed_payment: round2(freed_gbp),
        conversion_rate: params.conversion_rate,
        eur_baseline_interest: round2(eur_baseline_interest),
        eur_overpay_interest: round2(eur_overpay_interest),
        eur_interest_saved: round2(eur_baseline_interest - eur_overpay_interest),
        uk_principal: round2(domestic.principal),
        uk_baseline_payoff_years: uk_baseline_years,
        uk_remaining_term_at_payoff_years: years_from_months(months_left_baseline),
        uk_remaining_term_at_payoff_months: months_left_baseline,
        uk_baseline_total_interest: round2(uk_baseline_interest),
        uk_balance_at_rollover: round2(uk_balance_at_roll),
        uk_extra_monthly_from_eur: round2(freed_gbp),
        uk_annual_overpay_pct: annual_overpay_pct,
        uk_payoff_after_rollover_years: uk_post_roll_years,
        uk_total_interest_with_rollover: round2(uk_with_roll_interest),
        uk_interest_saved_vs_baseline: round2(uk_baseline_interest - uk_with_roll_interest),
        comparison_baseline_years: uk_baseline_years,
        comparison_with_rollover_years: uk_post_roll_years,
        comparison_time_saved_years: round_to(uk_baseline_years - uk_post_roll_years, 1),
        total_mortgage_free_time_years: round_to(eur_years + uk_post_roll_years, 1),
        chart_data: chart_points(&eur_baseline, &eur_accelerated, foreign.principal),
        eur_baseline_monthly: eur_baseline,
        eur_monthly: eur_accelerated,
        uk_baseline_monthly: uk_baseline,
        uk_post_roll_monthly: uk_post_roll,
    })
}

pub fn refinance_summary(params: &RefinanceParameters) -> Result<RefinanceSummary, EngineError> {
    let current = &params.current;
    ensure_within_term_ceiling(&[current])?;
    if !current.is_valid() {
        return Err(EngineError::invalid("Invalid current loan amount or years."));
    }
    let (baseline, _) = simulate(current);

    let outstanding = match params.months_elapsed {
        0 => current.principal,
        elapsed => baseline.balance_after(elapsed).unwrap_or(current.principal),
    };

    let offer = &params.offer;
    let refinanced = LoanParameters {
        principal: offer.principal.unwrap_or(outstanding),
        annual_rate_pct: offer.annual_rate_pct,
        term_months: offer.term_months.unwrap_or(current.term_months),
        overpayment: offer.overpayment,
        rate_changes: offer.rate_changes.clone(),
    };
    ensure_within_term_ceiling(&[&refinanced])?;
    if !refinanced.is_valid() {
        return Err(EngineError::invalid(
            "Invalid refinance loan amount or years.",
        ));
    }
    let (refinance, _) = simulate(&refinanced);

    let break_even = break_even_month(&baseline, &refinance, offer.fees);
    let baseline_total_interest = baseline.total_interest();
    let refinance_interest = refinance.total_interest();

    Ok(RefinanceSummary {
        break_even_month: break_even,
        fees: round2(offer.fees),
        outstanding_balance: round2(outstanding),
        baseline_total_interest: round2(baseline_total_interest),
        refinance_total_interest: round2(refinance_interest + offer.fees),
        interest_saved: round2(baseline_total_interest - refinance_interest),
        baseline_months: baseline.months(),
        refinance_months: refinance.months(),
        baseline_monthly: baseline,
        refinance_monthly: refinance,
    })
}

/// Flat monthly overpayment needed to clear a loan in `target_years`
/// instead of `current_years`.
pub fn target_term_summary(
    params: &TargetTermParameters,
) -> Result<TargetTermSummary, EngineError> {
    if params.current_years > MAX_TERM_MONTHS / 12 {
        return Err(term_ceiling_error());
    }
    if !(params.principal > 0.0) || params.current_years == 0 || params.target_years == 0 {
        return Err(EngineError::invalid("Invalid inputs."));
    }
    if params.target_years >= params.current_years {
        return Err(EngineError::invalid(
            "Target years must be less than current years.",
        ));
    }

    let current_months = params.current_years * 12;
    let rate = monthly_rate(params.annual_rate_pct);
    let base_monthly = base_payment(params.principal, rate, i64::from(current_months));
    let target_monthly = base_payment(
        params.principal,
        rate,
        i64::from(params.target_years) * 12,
    );

    let required = (target_monthly - base_monthly).max(0.0);
    let annual = required * 12.0;
    let percent_of_loan = annual / params.principal * 100.0;

    let mut loan = LoanParameters::new(params.principal, params.annual_rate_pct, current_months);
    loan.overpayment.monthly_extra = required;
    let (baseline, _) = simulate(&loan.without_overpayment());
    let (accelerated, _) = simulate(&loan);

    Ok(TargetTermSummary {
        structured_summary: TargetTermHeadline {
            base_monthly: round2(base_monthly),
            target_monthly: round2(target_monthly),
            required_overpayment: round2(required),
            annual_overpayment: round2(annual),
            percent_of_loan: round2(percent_of_loan),
            cap_status: if percent_of_loan <= PENALTY_FREE_OVERPAY_PCT {
                "Within 10% cap"
            } else {
                "Exceeds 10% cap"
            },
        },
        yearly_schedule: yearly_rollup(&accelerated, params.principal),
        chart_data: chart_points(&baseline, &accelerated, params.principal),
        monthly_schedule: accelerated,
    })
}
