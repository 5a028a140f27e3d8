use rust_xlsxwriter::{
    Chart, ChartType, Color, Format, FormatBorder, Workbook, Worksheet, XlsxError,
};
use tracing::debug;

use crate::core::{
    CHART_SAMPLE_MONTHS, EngineError, RolloverSummary, Schedule, balance_at, yearly_totals,
};

pub const ROLLOVER_FILENAME: &str = "rollover_analysis.xlsx";

const CHART_SHEET: &str = "Chart_Data";
const LEDGER_HEADERS: [&str; 5] = ["month", "payment", "principal", "interest", "balance"];
const YEARLY_HEADERS: [&str; 5] = ["year", "payment", "principal", "interest", "balance"];
const BALANCE_HEADERS: [&str; 5] = [
    "month",
    "eur_baseline_balance",
    "eur_overpay_balance",
    "uk_baseline_balance",
    "uk_post_roll_balance",
];
const CHART_SERIES: [(u16, &str); 4] = [
    (1, "EUR Baseline"),
    (2, "EUR Overpay"),
    (3, "UK Baseline"),
    (4, "UK Post-Roll"),
];

#[derive(Debug)]
pub struct ExportedWorkbook {
    pub filename: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Number(f64),
    Text(&'static str),
    Blank,
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Blank, Cell::Number)
    }
}

#[derive(Debug)]
struct Table {
    name: &'static str,
    headers: &'static [&'static str],
    rows: Vec<Vec<Cell>>,
}

enum ColumnStyle {
    Count,
    Currency,
    Plain,
}

fn column_style(header: &str) -> ColumnStyle {
    if header == "month" || header == "year" {
        ColumnStyle::Count
    } else if ["balance", "payment", "principal", "interest"]
        .iter()
        .any(|k| header.contains(k))
    {
        ColumnStyle::Currency
    } else {
        ColumnStyle::Plain
    }
}

struct Formats {
    header: Format,
    count: Format,
    currency: Format,
    plain: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xDCE6F1))
                .set_border(FormatBorder::Thin),
            count: Format::new().set_num_format("0"),
            currency: Format::new().set_num_format("£#,##0.00"),
            plain: Format::new().set_num_format("0.00"),
        }
    }

    fn for_column(&self, header: &str) -> &Format {
        match column_style(header) {
            ColumnStyle::Count => &self.count,
            ColumnStyle::Currency => &self.currency,
            ColumnStyle::Plain => &self.plain,
        }
    }
}

fn ledger_table(name: &'static str, schedule: &Schedule) -> Table {
    Table {
        name,
        headers: &LEDGER_HEADERS,
        rows: schedule
            .entries()
            .iter()
            .map(|e| {
                vec![
                    Cell::Number(f64::from(e.month)),
                    Cell::Number(e.payment),
                    Cell::Number(e.principal),
                    Cell::Number(e.interest),
                    Cell::Number(e.balance),
                ]
            })
            .collect(),
    }
}

fn yearly_table(name: &'static str, schedule: &Schedule) -> Table {
    Table {
        name,
        headers: &YEARLY_HEADERS,
        rows: yearly_totals(schedule)
            .iter()
            .map(|y| {
                vec![
                    Cell::Number(f64::from(y.year)),
                    Cell::Number(y.payment),
                    Cell::Number(y.principal),
                    Cell::Number(y.interest),
                    Cell::Number(y.balance),
                ]
            })
            .collect(),
    }
}

fn schedules(summary: &RolloverSummary) -> [&Schedule; 4] {
    [
        &summary.eur_baseline_monthly,
        &summary.eur_monthly,
        &summary.uk_baseline_monthly,
        &summary.uk_post_roll_monthly,
    ]
}

fn last_month(summary: &RolloverSummary) -> u32 {
    schedules(summary)
        .iter()
        .map(|s| s.months())
        .max()
        .unwrap_or(0)
}

/// Each schedule's balance by its own month number; blank once it has ended.
fn comparison_table(summary: &RolloverSummary) -> Table {
    let rows = (1..=last_month(summary))
        .map(|month| {
            let mut row = vec![Cell::Number(f64::from(month))];
            row.extend(
                schedules(summary)
                    .iter()
                    .map(|s| Cell::from(s.balance_after(month))),
            );
            row
        })
        .collect();
    Table {
        name: "Comparison",
        headers: &BALANCE_HEADERS,
        rows,
    }
}

fn chart_table(summary: &RolloverSummary) -> Table {
    let eur_principal = summary
        .chart_data
        .first()
        .map_or(0.0, |p| p.baseline_balance);
    let principals = [
        eur_principal,
        eur_principal,
        summary.uk_principal,
        summary.uk_balance_at_rollover,
    ];
    let rows = (0..=last_month(summary))
        .step_by(CHART_SAMPLE_MONTHS as usize)
        .map(|month| {
            let mut row = vec![Cell::Number(f64::from(month))];
            row.extend(
                schedules(summary)
                    .iter()
                    .zip(principals)
                    .map(|(s, principal)| Cell::Number(balance_at(s, month, principal))),
            );
            row
        })
        .collect();
    Table {
        name: CHART_SHEET,
        headers: &BALANCE_HEADERS,
        rows,
    }
}

fn summary_table(summary: &RolloverSummary) -> Table {
    let metrics = [
        ("EUR payoff time (years)", summary.eur_payoff_time_years),
        ("EUR freed payment", summary.eur_freed_payment),
        ("GBP freed payment", summary.gbp_freed_payment),
        ("Conversion rate", summary.conversion_rate),
        ("EUR baseline interest", summary.eur_baseline_interest),
        ("EUR interest with overpayment", summary.eur_overpay_interest),
        ("EUR interest saved", summary.eur_interest_saved),
        ("UK baseline payoff (years)", summary.uk_baseline_payoff_years),
        ("UK balance at rollover", summary.uk_balance_at_rollover),
        ("UK extra monthly from EUR", summary.uk_extra_monthly_from_eur),
        ("UK annual overpayment (%)", summary.uk_annual_overpay_pct),
        ("UK payoff after rollover (years)", summary.uk_payoff_after_rollover_years),
        ("UK baseline total interest", summary.uk_baseline_total_interest),
        ("UK total interest with rollover", summary.uk_total_interest_with_rollover),
        ("UK interest saved", summary.uk_interest_saved_vs_baseline),
        ("Time saved (years)", summary.comparison_time_saved_years),
        ("Total mortgage-free time (years)", summary.total_mortgage_free_time_years),
    ];
    Table {
        name: "Summary",
        headers: &["metric", "value"],
        rows: metrics
            .into_iter()
            .map(|(label, value)| vec![Cell::Text(label), Cell::Number(value)])
            .collect(),
    }
}

fn rollover_tables(summary: &RolloverSummary) -> Vec<Table> {
    vec![
        ledger_table("EUR_Baseline_Monthly", &summary.eur_baseline_monthly),
        ledger_table("EUR_Overpay_Monthly", &summary.eur_monthly),
        yearly_table("EUR_Baseline_Yearly", &summary.eur_baseline_monthly),
        yearly_table("EUR_Overpay_Yearly", &summary.eur_monthly),
        ledger_table("UK_Baseline_Monthly", &summary.uk_baseline_monthly),
        ledger_table("UK_PostRoll_Monthly", &summary.uk_post_roll_monthly),
        yearly_table("UK_Baseline_Yearly", &summary.uk_baseline_monthly),
        yearly_table("UK_PostRoll_Yearly", &summary.uk_post_roll_monthly),
        comparison_table(summary),
        chart_table(summary),
        summary_table(summary),
    ]
}

fn write_table<'a>(
    workbook: &'a mut Workbook,
    table: &Table,
    formats: &Formats,
) -> Result<&'a mut Worksheet, XlsxError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(table.name)?;
    for (col, header) in table.headers.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &formats.header)?;
        sheet.set_column_width(col, header.len().max(10) as f64 + 4.0)?;
    }
    for (idx, row) in table.rows.iter().enumerate() {
        let row_num = idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let format = formats.for_column(table.headers[col]);
            match cell {
                Cell::Number(value) => {
                    sheet.write_number_with_format(row_num, col as u16, *value, format)?;
                }
                Cell::Text(text) => {
                    sheet.write_string(row_num, col as u16, *text)?;
                }
                Cell::Blank => {}
            }
        }
    }
    Ok(sheet)
}

fn balance_chart(last_row: u32) -> Chart {
    let mut chart = Chart::new(ChartType::Line);
    for (col, name) in CHART_SERIES {
        chart
            .add_series()
            .set_name(name)
            .set_categories((CHART_SHEET, 1, 0, last_row, 0))
            .set_values((CHART_SHEET, 1, col, last_row, col));
    }
    chart.title().set_name("Mortgage balances");
    chart.x_axis().set_name("Month");
    chart.y_axis().set_name("Balance");
    chart.set_width(760).set_height(360);
    chart
}

fn build_workbook(summary: &RolloverSummary) -> Result<Vec<u8>, XlsxError> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    for table in rollover_tables(summary) {
        let sheet = write_table(&mut workbook, &table, &formats)?;
        if table.name == CHART_SHEET {
            let chart = balance_chart(table.rows.len() as u32);
            sheet.insert_chart(1, 6, &chart)?;
        }
    }
    workbook.save_to_buffer()
}

pub fn export_rollover_workbook(summary: &RolloverSummary) -> Result<ExportedWorkbook, EngineError> {
    let bytes = build_workbook(summary).map_err(|e| EngineError::Export(e.to_string()))?;
    debug!(size = bytes.len(), "rollover workbook written");
    Ok(ExportedWorkbook {
        filename: ROLLOVER_FILENAME,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LoanParameters, RolloverParameters, rollover_summary};

    fn sample_summary() -> RolloverSummary {
        let mut foreign = LoanParameters::new(60_000.0, 4.0, 15 * 12);
        foreign.overpayment.monthly_extra = 300.0;
        rollover_summary(&RolloverParameters {
            foreign,
            domestic: LoanParameters::new(250_000.0, 5.0, 30 * 12),
            conversion_rate: 0.85,
        })
        .expect("feasible rollover")
    }

    #[test]
    fn workbook_is_a_zip_archive() {
        let exported = export_rollover_workbook(&sample_summary()).expect("export succeeds");
        assert_eq!(exported.filename, "rollover_analysis.xlsx");
        assert!(exported.bytes.len() > 1_000);
        assert_eq!(&exported.bytes[..2], b"PK");
    }

    #[test]
    fn sheets_follow_the_fixed_order() {
        let names: Vec<_> = rollover_tables(&sample_summary())
            .iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(
            names,
            [
                "EUR_Baseline_Monthly",
                "EUR_Overpay_Monthly",
                "EUR_Baseline_Yearly",
                "EUR_Overpay_Yearly",
                "UK_Baseline_Monthly",
                "UK_PostRoll_Monthly",
                "UK_Baseline_Yearly",
                "UK_PostRoll_Yearly",
                "Comparison",
                "Chart_Data",
                "Summary",
            ]
        );
    }

    #[test]
    fn yearly_sheets_start_at_year_one() {
        let summary = sample_summary();
        let table = yearly_table("UK_Baseline_Yearly", &summary.uk_baseline_monthly);
        assert_eq!(table.rows.len(), 30);
        assert_eq!(table.rows[0][0], Cell::Number(1.0));
    }

    #[test]
    fn comparison_blanks_finished_schedules() {
        let summary = sample_summary();
        let table = comparison_table(&summary);
        assert_eq!(table.rows.len(), 360);
        let eur_months = summary.eur_monthly.months() as usize;
        assert!(matches!(table.rows[eur_months - 1][2], Cell::Number(_)));
        assert_eq!(table.rows[eur_months][2], Cell::Blank);
        assert!(matches!(table.rows[359][3], Cell::Number(_)));
    }

    #[test]
    fn chart_data_samples_every_six_months_from_origination() {
        let summary = sample_summary();
        let table = chart_table(&summary);
        assert_eq!(table.rows.len(), 61);
        assert_eq!(table.rows[0][0], Cell::Number(0.0));
        assert_eq!(table.rows[0][3], Cell::Number(250_000.0));
        assert_eq!(
            table.rows[0][4],
            Cell::Number(summary.uk_balance_at_rollover)
        );
        assert_eq!(table.rows[1][0], Cell::Number(6.0));
    }

    #[test]
    fn money_columns_get_currency_format() {
        assert!(matches!(column_style("month"), ColumnStyle::Count));
        assert!(matches!(column_style("uk_post_roll_balance"), ColumnStyle::Currency));
        assert!(matches!(column_style("interest"), ColumnStyle::Currency));
        assert!(matches!(column_style("value"), ColumnStyle::Plain));
    }
}
