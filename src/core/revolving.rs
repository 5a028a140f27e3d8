use tracing::debug;

use super::aggregate::{chart_points, yearly_rollup};
use super::engine::{monthly_rate, round_to, round2};
use super::error::EngineError;
use super::types::{
    LedgerEntry, RevolvingHeadline, RevolvingParameters, RevolvingSummary, Schedule,
};

pub const REVOLVING_HORIZON_MONTHS: u32 = 600;
/// Reported month count for a minimum-payment path that cannot outpace
/// interest.
pub const DEBT_SPIRAL_MONTHS: i64 = -1;
const SPIRAL_GRACE_MONTHS: u32 = 12;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PaymentPlan {
    /// The card's minimum: the larger of a percentage of the balance and a
    /// flat floor.
    Minimum { percent: f64, flat: f64 },
    Fixed(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevolvingPayoff {
    pub schedule: Schedule,
    /// Unrounded interest accrued over the simulated months.
    pub total_interest: f64,
    /// `None` when the minimum payment fell into a debt spiral.
    pub months: Option<u32>,
}

impl RevolvingPayoff {
    pub fn reported_months(&self) -> i64 {
        self.months.map(i64::from).unwrap_or(DEBT_SPIRAL_MONTHS)
    }
}

pub fn revolving_payoff(balance: f64, apr_pct: f64, plan: PaymentPlan) -> RevolvingPayoff {
    let rate = monthly_rate(apr_pct);
    let mut balance = balance;
    let mut entries = Vec::new();
    let mut total_interest = 0.0;
    let mut month = 0;

    while balance > 0.0 && month < REVOLVING_HORIZON_MONTHS {
        month += 1;
        let interest = balance * rate;
        total_interest += interest;

        let mut payment = match plan {
            PaymentPlan::Fixed(amount) => amount,
            PaymentPlan::Minimum { percent, flat } => (balance * percent / 100.0).max(flat),
        };
        if matches!(plan, PaymentPlan::Minimum { .. }) && payment < interest {
            payment = interest + 1.0;
            if month > SPIRAL_GRACE_MONTHS {
                debug!(month, balance, "minimum payment cannot outpace interest");
                return RevolvingPayoff {
                    schedule: Schedule::new(entries),
                    total_interest,
                    months: None,
                };
            }
        }

        let principal_paid;
        if balance + interest < payment {
            payment = balance + interest;
            principal_paid = balance;
            balance = 0.0;
        } else {
            principal_paid = payment - interest;
            balance -= principal_paid;
        }

        entries.push(LedgerEntry {
            month,
            payment: round2(payment),
            principal: round2(principal_paid),
            interest: round2(interest),
            balance: round2(balance),
        });
    }

    RevolvingPayoff {
        schedule: Schedule::new(entries),
        total_interest,
        months: Some(month),
    }
}

/// Thousands-separated amount with two decimals, e.g. `1,234.50`.
fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

/// Minimum-payment payoff compared against an optional fixed payment.
pub fn revolving_summary(params: &RevolvingParameters) -> Result<RevolvingSummary, EngineError> {
    if !(params.balance > 0.0) || !(params.apr_pct > 0.0) {
        return Err(EngineError::invalid("Please enter a valid balance and APR."));
    }

    let minimum = revolving_payoff(
        params.balance,
        params.apr_pct,
        PaymentPlan::Minimum {
            percent: params.min_payment_pct,
            flat: params.min_payment_flat,
        },
    );

    let has_fixed = params.fixed_payment > 0.0;
    let fixed = if has_fixed {
        let first_interest = params.balance * monthly_rate(params.apr_pct);
        if params.fixed_payment <= first_interest {
            return Err(EngineError::invalid(format!(
                "Your fixed payment (£{}) must be higher than the first month's interest (£{}) to pay off the debt.",
                format_money(params.fixed_payment),
                format_money(first_interest)
            )));
        }
        revolving_payoff(
            params.balance,
            params.apr_pct,
            PaymentPlan::Fixed(params.fixed_payment),
        )
    } else {
        RevolvingPayoff {
            schedule: Schedule::default(),
            total_interest: 0.0,
            months: Some(0),
        }
    };

    let min_months = minimum.reported_months();
    let fixed_months = fixed.reported_months();
    let structured_summary = RevolvingHeadline {
        min_pay_months: min_months,
        min_pay_debt_spiral: minimum.months.is_none(),
        min_pay_interest: round2(minimum.total_interest),
        fixed_pay_months: fixed_months,
        fixed_pay_interest: round2(fixed.total_interest),
        interest_saved: if has_fixed {
            round2(minimum.total_interest - fixed.total_interest)
        } else {
            0.0
        },
        time_saved_years: if has_fixed {
            round_to((min_months - fixed_months) as f64 / 12.0, 1)
        } else {
            0.0
        },
    };

    Ok(RevolvingSummary {
        structured_summary,
        chart_data: chart_points(&minimum.schedule, &fixed.schedule, params.balance),
        yearly_schedule: yearly_rollup(&fixed.schedule, params.balance),
        monthly_schedule: fixed.schedule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(fixed_payment: f64) -> RevolvingParameters {
        RevolvingParameters {
            balance: 10_000.0,
            apr_pct: 20.0,
            min_payment_pct: 2.0,
            min_payment_flat: 25.0,
            fixed_payment,
        }
    }

    #[test]
    fn minimum_payments_cost_more_than_fixed() {
        let summary = revolving_summary(&card(300.0)).expect("valid card");
        let headline = &summary.structured_summary;
        assert!(headline.min_pay_months > 0);
        assert!(!headline.min_pay_debt_spiral);
        assert!(headline.fixed_pay_months > 0);
        assert!(headline.min_pay_interest > headline.fixed_pay_interest);
        assert!(headline.interest_saved > 0.0);
        assert!(headline.time_saved_years > 0.0);
        assert_eq!(
            summary.monthly_schedule.months() as i64,
            headline.fixed_pay_months
        );
        assert_eq!(summary.monthly_schedule.final_balance(), Some(0.0));
    }

    #[test]
    fn minimum_only_leaves_fixed_side_empty() {
        let summary = revolving_summary(&card(0.0)).expect("valid card");
        let headline = &summary.structured_summary;
        assert_eq!(headline.fixed_pay_months, 0);
        assert_eq!(headline.interest_saved, 0.0);
        assert_eq!(headline.time_saved_years, 0.0);
        assert!(summary.monthly_schedule.is_empty());
        assert_eq!(summary.yearly_schedule.len(), 1);
        assert!(summary.chart_data.len() > 1);
        assert!(summary.chart_data[1..].iter().all(|p| p.overpay_balance == 0.0));
    }

    #[test]
    fn fixed_payment_must_beat_first_interest() {
        let err = revolving_summary(&card(150.0)).expect_err("150 < 166.67 interest");
        assert_eq!(
            err.to_string(),
            "Your fixed payment (£150.00) must be higher than the first month's interest (£166.67) to pay off the debt."
        );
    }

    #[test]
    fn rejects_missing_balance_or_apr() {
        let mut params = card(0.0);
        params.apr_pct = 0.0;
        assert!(revolving_summary(&params).is_err());
        params = card(0.0);
        params.balance = -5.0;
        assert_eq!(
            revolving_summary(&params).expect_err("must reject").to_string(),
            "Please enter a valid balance and APR."
        );
    }

    #[test]
    fn minimum_below_interest_is_a_debt_spiral() {
        let payoff = revolving_payoff(
            10_000.0,
            30.0,
            PaymentPlan::Minimum {
                percent: 1.0,
                flat: 5.0,
            },
        );
        assert_eq!(payoff.months, None);
        assert_eq!(payoff.reported_months(), DEBT_SPIRAL_MONTHS);
        assert_eq!(payoff.schedule.months(), SPIRAL_GRACE_MONTHS);
        assert!(payoff.total_interest > 0.0);
    }

    #[test]
    fn payoff_is_capped_at_horizon() {
        let payoff = revolving_payoff(50_000.0, 12.0, PaymentPlan::Fixed(500.5));
        assert_eq!(payoff.months, Some(REVOLVING_HORIZON_MONTHS));
        assert!(payoff.schedule.final_balance().unwrap() > 0.0);
    }

    #[test]
    fn money_is_grouped_by_thousands() {
        assert_eq!(format_money(1_234_567.891), "1,234,567.89");
        assert_eq!(format_money(166.666), "166.67");
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(-1_000.0), "-1,000.00");
    }
}
