use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::{
    ContributionFrequency, EngineError, LoanParameters, OverpaymentParameters, OverpaymentRule,
    RateSchedule, RefinanceOffer, RefinanceParameters, RevolvingParameters, RolloverParameters,
    SavingsParameters, Scenario, ScenarioRequest, TargetTermParameters, normalize_rate_percent,
    parse_rate_change_list, parse_rate_percent,
};

const DEFAULT_CONVERSION_RATE: f64 = 0.85;
const DEFAULT_MIN_PAYMENT_PCT: f64 = 2.0;
const DEFAULT_MIN_PAYMENT_FLAT: f64 = 25.0;

/// A dictionary value as the mobile client sends it: numbers arrive either as
/// JSON numbers or as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(f64),
    Text(String),
    Other(Value),
}

impl Loose {
    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }

    fn number(&self, field: &str) -> Result<f64, EngineError> {
        match self {
            Self::Number(v) => Ok(*v),
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| EngineError::coercion(field, format!("'{text}'"))),
            Self::Other(v) => Err(EngineError::coercion(field, v)),
        }
    }

    fn whole(&self, field: &str) -> Result<i64, EngineError> {
        match self {
            Self::Number(v) if v.is_finite() => Ok(v.trunc() as i64),
            Self::Number(v) => Err(EngineError::coercion(field, v)),
            Self::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| EngineError::coercion(field, format!("'{text}'"))),
            Self::Other(v) => Err(EngineError::coercion(field, v)),
        }
    }

    fn rate(&self) -> f64 {
        match self {
            Self::Number(v) => normalize_rate_percent(*v),
            Self::Text(text) => parse_rate_percent(text),
            Self::Other(_) => 0.0,
        }
    }

    fn text(&self) -> String {
        match self {
            Self::Number(v) => v.to_string(),
            Self::Text(text) => text.clone(),
            Self::Other(_) => String::new(),
        }
    }
}

fn present(value: &Option<Loose>) -> Option<&Loose> {
    value.as_ref().filter(|v| !v.is_blank())
}

fn number_or(value: &Option<Loose>, field: &str, default: f64) -> Result<f64, EngineError> {
    present(value).map_or(Ok(default), |v| v.number(field))
}

fn whole_or(value: &Option<Loose>, field: &str, default: i64) -> Result<i64, EngineError> {
    present(value).map_or(Ok(default), |v| v.whole(field))
}

fn count(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

fn months_from_years(years: i64) -> u32 {
    count(years.saturating_mul(12))
}

fn rate_or_zero(value: &Option<Loose>) -> f64 {
    present(value).map_or(0.0, Loose::rate)
}

fn rate_changes(value: &Option<Loose>) -> RateSchedule {
    present(value).map_or_else(RateSchedule::new, |v| parse_rate_change_list(&v.text()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoanPayload {
    loan: Option<Loose>,
    rate: Option<Loose>,
    years: Option<Loose>,
    value: Option<Loose>,
    monthly_overpay: Option<Loose>,
    overpay_pct_of_base: Option<Loose>,
    annual_lump: Option<Loose>,
    annual_lump_month: Option<Loose>,
    one_off_lump: Option<Loose>,
    one_off_lump_month: Option<Loose>,
    rate_changes: Option<Loose>,
    // Sent by the client, not used by any calculation.
    #[allow(dead_code)]
    inflation: Option<Loose>,
}

impl LoanPayload {
    fn overpayment(&self) -> Result<OverpaymentRule, EngineError> {
        Ok(OverpaymentRule {
            monthly_extra: number_or(&self.monthly_overpay, "monthly_overpay", 0.0)?,
            percent_of_base: number_or(&self.overpay_pct_of_base, "overpay_pct_of_base", 0.0)?,
            annual_lump: number_or(&self.annual_lump, "annual_lump", 0.0)?,
            annual_lump_month: count(whole_or(&self.annual_lump_month, "annual_lump_month", 12)?),
            one_off_lump: number_or(&self.one_off_lump, "one_off_lump", 0.0)?,
            one_off_lump_month: count(whole_or(
                &self.one_off_lump_month,
                "one_off_lump_month",
                0,
            )?),
        })
    }

    fn loan_parameters(&self) -> Result<LoanParameters, EngineError> {
        Ok(LoanParameters {
            principal: number_or(&self.loan, "loan", 0.0)?,
            annual_rate_pct: rate_or_zero(&self.rate),
            term_months: months_from_years(whole_or(&self.years, "years", 0)?),
            overpayment: self.overpayment()?,
            rate_changes: rate_changes(&self.rate_changes),
        })
    }

    fn property_value(&self) -> Result<f64, EngineError> {
        number_or(&self.value, "value", 0.0)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RolloverPayload {
    eur_data: LoanPayload,
    gbp_data: LoanPayload,
    conversion_rate: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OfferPayload {
    #[serde(flatten)]
    loan: LoanPayload,
    fees: Option<Loose>,
    closing_costs: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RefinancePayload {
    current: LoanPayload,
    refinance: OfferPayload,
    months_elapsed: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TargetTermPayload {
    loan_amount: Option<Loose>,
    annual_rate: Option<Loose>,
    current_years: Option<Loose>,
    target_years: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RevolvingPayload {
    balance: Option<Loose>,
    apr: Option<Loose>,
    min_payment_pct: Option<Loose>,
    min_payment_flat: Option<Loose>,
    fixed_payment: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SavingsPayload {
    initial_balance: Option<Loose>,
    contribution_amount: Option<Loose>,
    annual_rate: Option<Loose>,
    years: Option<Loose>,
    frequency: Option<Loose>,
}

fn parse<T: DeserializeOwned>(data: Value) -> Result<T, EngineError> {
    let data = if data.is_null() {
        Value::Object(Default::default())
    } else {
        data
    };
    serde_json::from_value(data).map_err(|e| EngineError::invalid(format!("Invalid data payload: {e}")))
}

fn overpayment_request(payload: LoanPayload) -> Result<ScenarioRequest, EngineError> {
    Ok(ScenarioRequest::Overpayment(OverpaymentParameters {
        loan: payload.loan_parameters()?,
        property_value: payload.property_value()?,
    }))
}

fn rollover_request(payload: RolloverPayload) -> Result<ScenarioRequest, EngineError> {
    Ok(ScenarioRequest::Rollover(RolloverParameters {
        foreign: payload.eur_data.loan_parameters()?,
        domestic: payload.gbp_data.loan_parameters()?,
        conversion_rate: number_or(
            &payload.conversion_rate,
            "conversion_rate",
            DEFAULT_CONVERSION_RATE,
        )?,
    }))
}

fn refinance_request(payload: RefinancePayload) -> Result<ScenarioRequest, EngineError> {
    let offer = &payload.refinance;
    let fees = number_or(&offer.fees, "fees", 0.0)? + number_or(&offer.closing_costs, "closing_costs", 0.0)?;
    let principal = present(&offer.loan.loan)
        .map(|v| v.number("loan"))
        .transpose()?;
    let term_months = present(&offer.loan.years)
        .map(|v| v.whole("years").map(months_from_years))
        .transpose()?;

    Ok(ScenarioRequest::Refinance(RefinanceParameters {
        current: payload.current.loan_parameters()?,
        months_elapsed: count(whole_or(&payload.months_elapsed, "months_elapsed", 0)?),
        offer: RefinanceOffer {
            principal,
            annual_rate_pct: rate_or_zero(&offer.loan.rate),
            term_months,
            overpayment: offer.loan.overpayment()?,
            rate_changes: rate_changes(&offer.loan.rate_changes),
            fees,
        },
    }))
}

fn target_term_request(payload: TargetTermPayload) -> Result<ScenarioRequest, EngineError> {
    Ok(ScenarioRequest::TargetTerm(TargetTermParameters {
        principal: number_or(&payload.loan_amount, "loan_amount", 0.0)?,
        annual_rate_pct: rate_or_zero(&payload.annual_rate),
        current_years: count(whole_or(&payload.current_years, "current_years", 0)?),
        target_years: count(whole_or(&payload.target_years, "target_years", 0)?),
    }))
}

fn revolving_request(payload: RevolvingPayload) -> Result<ScenarioRequest, EngineError> {
    Ok(ScenarioRequest::Revolving(RevolvingParameters {
        balance: number_or(&payload.balance, "balance", 0.0)?,
        apr_pct: rate_or_zero(&payload.apr),
        min_payment_pct: number_or(
            &payload.min_payment_pct,
            "min_payment_pct",
            DEFAULT_MIN_PAYMENT_PCT,
        )?,
        min_payment_flat: number_or(
            &payload.min_payment_flat,
            "min_payment_flat",
            DEFAULT_MIN_PAYMENT_FLAT,
        )?,
        fixed_payment: number_or(&payload.fixed_payment, "fixed_payment", 0.0)?,
    }))
}

fn savings_request(payload: SavingsPayload) -> Result<ScenarioRequest, EngineError> {
    let frequency = present(&payload.frequency)
        .map_or(ContributionFrequency::Monthly, |v| {
            ContributionFrequency::parse(&v.text())
        });
    Ok(ScenarioRequest::SavingsGrowth(SavingsParameters {
        initial_balance: number_or(&payload.initial_balance, "initial_balance", 0.0)?,
        contribution: number_or(&payload.contribution_amount, "contribution_amount", 0.0)?,
        annual_rate_pct: number_or(&payload.annual_rate, "annual_rate", 0.0)?,
        years: count(whole_or(&payload.years, "years", 0)?),
        frequency,
    }))
}

/// Decodes the loose data dictionary for `scenario` into typed parameters.
pub fn decode(scenario: Scenario, data: Value) -> Result<ScenarioRequest, EngineError> {
    match scenario {
        Scenario::SavingsGrowth => savings_request(parse(data)?),
        Scenario::RolloverExport | Scenario::Rollover => rollover_request(parse(data)?),
        Scenario::Refinance => refinance_request(parse(data)?),
        Scenario::Revolving => revolving_request(parse(data)?),
        Scenario::TargetTerm => target_term_request(parse(data)?),
        Scenario::Overpayment => overpayment_request(parse(data)?),
    }
}
