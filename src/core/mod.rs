mod aggregate;
mod engine;
mod error;
mod normalize;
mod revolving;
mod savings;
mod scenarios;
mod types;

use serde::{Deserialize, Serialize};

pub use aggregate::{
    CHART_SAMPLE_MONTHS, balance_at, break_even_month, chart_points, cumulative_interest,
    yearly_rollup, yearly_totals,
};
pub use engine::{SAFETY_HORIZON_MONTHS, base_payment, monthly_rate, round2, simulate};
pub use error::EngineError;
pub use normalize::{normalize_rate_percent, parse_rate_change_list, parse_rate_percent};
pub use revolving::{
    DEBT_SPIRAL_MONTHS, PaymentPlan, REVOLVING_HORIZON_MONTHS, RevolvingPayoff, revolving_payoff,
    revolving_summary,
};
pub use savings::savings_growth;
pub use scenarios::{
    overpayment_summary, refinance_summary, rollover_summary, target_term_summary,
};
pub use types::{
    ChartPoint, ContributionFrequency, LedgerEntry, LoanParameters, LoanToValue, MAX_TERM_MONTHS,
    OverpaymentHeadline, OverpaymentParameters, OverpaymentRule, OverpaymentSummary,
    RateSchedule, RefinanceOffer, RefinanceParameters, RefinanceSummary, RevolvingHeadline,
    RevolvingParameters, RevolvingSummary, RolloverParameters, RolloverSummary, SavingsParameters,
    SavingsPeriod, SavingsProjection, Schedule, TargetTermHeadline, TargetTermParameters,
    TargetTermSummary, YearlyRollup,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    SavingsGrowth,
    RolloverExport,
    Rollover,
    Refinance,
    Revolving,
    TargetTerm,
    Overpayment,
}

impl Scenario {
    pub fn label(self) -> &'static str {
        match self {
            Self::SavingsGrowth => "Savings growth",
            Self::RolloverExport => "Rollover export",
            Self::Rollover => "Rollover",
            Self::Refinance => "Refinance",
            Self::Revolving => "Credit card",
            Self::TargetTerm => "Target term",
            Self::Overpayment => "Overpayment",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioRequest {
    SavingsGrowth(SavingsParameters),
    Rollover(RolloverParameters),
    Refinance(RefinanceParameters),
    Revolving(RevolvingParameters),
    TargetTerm(TargetTermParameters),
    Overpayment(OverpaymentParameters),
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScenarioOutcome {
    SavingsGrowth(SavingsProjection),
    Rollover(Box<RolloverSummary>),
    Refinance(RefinanceSummary),
    Revolving(RevolvingSummary),
    TargetTerm(TargetTermSummary),
    Overpayment(OverpaymentSummary),
}

pub fn run_scenario(request: &ScenarioRequest) -> Result<ScenarioOutcome, EngineError> {
    match request {
        ScenarioRequest::SavingsGrowth(params) => {
            savings_growth(params).map(ScenarioOutcome::SavingsGrowth)
        }
        ScenarioRequest::Rollover(params) => {
            rollover_summary(params).map(|summary| ScenarioOutcome::Rollover(Box::new(summary)))
        }
        ScenarioRequest::Refinance(params) => {
            refinance_summary(params).map(ScenarioOutcome::Refinance)
        }
        ScenarioRequest::Revolving(params) => {
            revolving_summary(params).map(ScenarioOutcome::Revolving)
        }
        ScenarioRequest::TargetTerm(params) => {
            target_term_summary(params).map(ScenarioOutcome::TargetTerm)
        }
        ScenarioRequest::Overpayment(params) => {
            overpayment_summary(params).map(ScenarioOutcome::Overpayment)
        }
    }
}
