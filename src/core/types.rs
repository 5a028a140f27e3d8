use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// Month number (1-based, relative to the loan start) mapped to the new annual
/// rate in percent that applies from that month on.
pub type RateSchedule = BTreeMap<u32, f64>;

/// Longest term accepted for any loan or projection.
pub const MAX_TERM_MONTHS: u32 = 100 * 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverpaymentRule {
    pub monthly_extra: f64,
    pub percent_of_base: f64,
    pub annual_lump: f64,
    /// Month-of-year (1..=12) on which `annual_lump` is paid.
    pub annual_lump_month: u32,
    pub one_off_lump: f64,
    /// Absolute month on which `one_off_lump` is paid; 0 disables it.
    pub one_off_lump_month: u32,
}

impl Default for OverpaymentRule {
    fn default() -> Self {
        Self {
            monthly_extra: 0.0,
            percent_of_base: 0.0,
            annual_lump: 0.0,
            annual_lump_month: 12,
            one_off_lump: 0.0,
            one_off_lump_month: 0,
        }
    }
}

impl OverpaymentRule {
    pub fn extra_for(&self, month: u32, base_payment: f64) -> f64 {
        let mut extra = self.monthly_extra + base_payment * (self.percent_of_base / 100.0);
        if self.annual_lump != 0.0 && (month - 1) % 12 + 1 == self.annual_lump_month {
            extra += self.annual_lump;
        }
        if self.one_off_lump != 0.0 && month == self.one_off_lump_month {
            extra += self.one_off_lump;
        }
        extra
    }

    /// The payment made in an ordinary month: base plus the recurring extras,
    /// lumps excluded.
    pub fn typical_payment(&self, base_payment: f64) -> f64 {
        base_payment + self.monthly_extra + base_payment * (self.percent_of_base / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanParameters {
    pub principal: f64,
    pub annual_rate_pct: f64,
    pub term_months: u32,
    pub overpayment: OverpaymentRule,
    pub rate_changes: RateSchedule,
}

impl LoanParameters {
    pub fn new(principal: f64, annual_rate_pct: f64, term_months: u32) -> Self {
        Self {
            principal,
            annual_rate_pct,
            term_months,
            overpayment: OverpaymentRule::default(),
            rate_changes: RateSchedule::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.principal.is_finite()
            && self.principal > 0.0
            && (1..=MAX_TERM_MONTHS).contains(&self.term_months)
    }

    /// Same loan and rate path with every overpayment removed.
    pub fn without_overpayment(&self) -> Self {
        Self {
            overpayment: OverpaymentRule::default(),
            ..self.clone()
        }
    }

    /// Restarts the loan `offset` months in, with a fresh principal and term.
    ///
    /// The base rate and both lump months stay as configured. Rate changes at
    /// or before the offset are dropped, later ones shift back by `offset`.
    /// A one-off lump due at or before the offset is dropped.
    pub fn rebased(&self, offset: u32, principal: f64, term_months: u32) -> Self {
        let rate_changes = self
            .rate_changes
            .range(offset.saturating_add(1)..)
            .map(|(&month, &rate)| (month - offset, rate))
            .collect();

        let mut overpayment = self.overpayment;
        if overpayment.one_off_lump_month <= offset {
            overpayment.one_off_lump = 0.0;
        }

        Self {
            principal,
            annual_rate_pct: self.annual_rate_pct,
            term_months,
            overpayment,
            rate_changes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub month: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Schedule {
    entries: Vec<LedgerEntry>,
}

impl Schedule {
    pub fn new(entries: Vec<LedgerEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn months(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_interest(&self) -> f64 {
        self.entries.iter().map(|e| e.interest).sum()
    }

    pub fn total_principal(&self) -> f64 {
        self.entries.iter().map(|e| e.principal).sum()
    }

    pub fn final_balance(&self) -> Option<f64> {
        self.entries.last().map(|e| e.balance)
    }

    /// Ending balance of `month`; `None` for month 0 or once the schedule
    /// has terminated.
    pub fn balance_after(&self, month: u32) -> Option<f64> {
        if month == 0 {
            return None;
        }
        self.entries.get(month as usize - 1).map(|e| e.balance)
    }

    pub fn interest_through(&self, month: u32) -> f64 {
        self.entries
            .iter()
            .take(month as usize)
            .map(|e| e.interest)
            .sum()
    }}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlyRollup {
    pub year: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub month: u32,
    pub baseline_balance: f64,
    pub overpay_balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverpaymentParameters {
    pub loan: LoanParameters,
    pub property_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RolloverParameters {
    /// Loan paid off first (EUR in the original use case).
    pub foreign: LoanParameters,
    /// Loan that receives the freed payment (GBP in the original use case).
    pub domestic: LoanParameters,
    /// Domestic currency units per foreign unit.
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinanceOffer {
    /// Defaults to the outstanding balance of the current loan.
    pub principal: Option<f64>,
    pub annual_rate_pct: f64,
    /// Defaults to the current loan's term.
    pub term_months: Option<u32>,
    pub overpayment: OverpaymentRule,
    pub rate_changes: RateSchedule,
    pub fees: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinanceParameters {
    pub current: LoanParameters,
    pub months_elapsed: u32,
    pub offer: RefinanceOffer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetTermParameters {
    pub principal: f64,
    pub annual_rate_pct: f64,
    pub current_years: u32,
    pub target_years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevolvingParameters {
    pub balance: f64,
    pub apr_pct: f64,
    pub min_payment_pct: f64,
    pub min_payment_flat: f64,
    /// 0 disables the fixed-payment comparison.
    pub fixed_payment: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContributionFrequency {
    Monthly,
    Weekly,
    /// Unrecognised frequency text; no contributions are made.
    Unscheduled,
}

impl ContributionFrequency {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "monthly" => Self::Monthly,
            "weekly" => Self::Weekly,
            _ => Self::Unscheduled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavingsParameters {
    pub initial_balance: f64,
    pub contribution: f64,
    pub annual_rate_pct: f64,
    pub years: u32,
    pub frequency: ContributionFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoanToValue {
    Percent(f64),
    NotApplicable,
}

impl Serialize for LoanToValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Percent(pct) => serializer.serialize_f64(*pct),
            Self::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverpaymentHeadline {
    pub base_monthly_payment: f64,
    pub overpay_monthly_payment: f64,
    pub time_saved_years: f64,
    pub interest_saved: f64,
    pub ltv_pct: LoanToValue,
    pub baseline_interest: f64,
    pub overpay_interest: f64,
    pub baseline_months: u32,
    pub overpay_months: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverpaymentSummary {
    pub structured_summary: OverpaymentHeadline,
    pub chart_data: Vec<ChartPoint>,
    pub yearly_schedule: Vec<YearlyRollup>,
    pub monthly_schedule: Schedule,
}

#[derive(Debug, Clone, Serialize)]
pub struct RolloverSummary {
    pub eur_payoff_time_years: f64,
    pub eur_payoff_time_months: u32,
    pub eur_freed_payment: f64,
    pub gbp_freed_payment: f64,
    pub conversion_rate: f64,
    pub eur_baseline_interest: f64,
    pub eur_overpay_interest: f64,
    pub eur_interest_saved: f64,
    pub uk_principal: f64,
    pub uk_baseline_payoff_years: f64,
    pub uk_remaining_term_at_payoff_years: f64,
    pub uk_remaining_term_at_payoff_months: u32,
    pub uk_baseline_total_interest: f64,
    pub uk_balance_at_rollover: f64,
    pub uk_extra_monthly_from_eur: f64,
    pub uk_annual_overpay_pct: f64,
    pub uk_payoff_after_rollover_years: f64,
    pub uk_total_interest_with_rollover: f64,
    pub uk_interest_saved_vs_baseline: f64,
    pub comparison_baseline_years: f64,
    pub comparison_with_rollover_years: f64,
    pub comparison_time_saved_years: f64,
    pub total_mortgage_free_time_years: f64,
    pub eur_baseline_monthly: Schedule,
    pub eur_monthly: Schedule,
    pub uk_baseline_monthly: Schedule,
    pub uk_post_roll_monthly: Schedule,
    pub chart_data: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefinanceSummary {
    pub baseline_monthly: Schedule,
    pub refinance_monthly: Schedule,
    pub break_even_month: Option<u32>,
    pub fees: f64,
    pub outstanding_balance: f64,
    pub baseline_total_interest: f64,
    pub refinance_total_interest: f64,
    pub interest_saved: f64,
    pub baseline_months: u32,
    pub refinance_months: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetTermHeadline {
    pub base_monthly: f64,
    pub target_monthly: f64,
    pub required_overpayment: f64,
    pub annual_overpayment: f64,
    pub percent_of_loan: f64,
    pub cap_status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetTermSummary {
    pub structured_summary: TargetTermHeadline,
    pub yearly_schedule: Vec<YearlyRollup>,
    pub monthly_schedule: Schedule,
    pub chart_data: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevolvingHeadline {
    pub min_pay_months: i64,
    pub min_pay_debt_spiral: bool,
    pub min_pay_interest: f64,
    pub fixed_pay_months: i64,
    pub fixed_pay_interest: f64,
    pub interest_saved: f64,
    pub time_saved_years: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevolvingSummary {
    pub structured_summary: RevolvingHeadline,
    pub chart_data: Vec<ChartPoint>,
    pub yearly_schedule: Vec<YearlyRollup>,
    pub monthly_schedule: Schedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SavingsPeriod {
    pub period: u32,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavingsProjection {
    pub final_balance: f64,
    pub total_contributions: f64,
    pub total_interest: f64,
    pub history: Vec<SavingsPeriod>,
}
