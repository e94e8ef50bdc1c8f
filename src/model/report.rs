//! Aggregations over the operations collection: dashboard totals, period
//! filtering and the monthly trend series. Pure functions; the reference
//! date is always passed in so period math is testable.

use crate::model::{Amount, Operation, OperationType, Subtype};
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The dashboard aggregates for a set of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_income: Amount,
    pub main_income: Amount,
    pub side_income: Amount,
    pub total_expenses: Amount,
    pub personal_expenses: Amount,
    pub business_expenses: Amount,
    /// Income minus expenses; may be negative.
    pub balance: Amount,
    /// Side income minus business expenses; may be negative.
    pub side_profit: Amount,
}

/// Computes totals over the given operations.
pub fn totals<'a>(operations: impl IntoIterator<Item = &'a Operation>) -> Totals {
    let mut t = Totals::default();
    for op in operations {
        match op.op_type {
            OperationType::Income => {
                t.total_income += op.amount;
                match op.subtype {
                    Subtype::Main => t.main_income += op.amount,
                    _ => t.side_income += op.amount,
                }
            }
            OperationType::Expense => {
                t.total_expenses += op.amount;
                match op.subtype {
                    Subtype::Personal => t.personal_expenses += op.amount,
                    _ => t.business_expenses += op.amount,
                }
            }
        }
    }
    t.balance = t.total_income - t.total_expenses;
    t.side_profit = t.side_income - t.business_expenses;
    t
}

/// A reporting period, evaluated relative to a reference date.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    #[default]
    CurrentMonth,
    LastMonth,
    CurrentQuarter,
    Year,
    All,
}

serde_plain::derive_display_from_serialize!(Period);
serde_plain::derive_fromstr_from_deserialize!(Period);

impl Period {
    /// Whether `date` falls inside this period as seen from `today`.
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Period::CurrentMonth => {
                date.year() == today.year() && date.month() == today.month()
            }
            Period::LastMonth => {
                let (y, m) = shift_month(today.year(), today.month(), 1);
                date.year() == y && date.month() == m
            }
            Period::CurrentQuarter => {
                date.year() == today.year()
                    && (date.month0() / 3) == (today.month0() / 3)
            }
            Period::Year => date.year() == today.year(),
            Period::All => true,
        }
    }
}

/// Filters operations to those dated inside `period`.
pub fn for_period<'a>(
    operations: &'a [Operation],
    period: Period,
    today: NaiveDate,
) -> Vec<&'a Operation> {
    operations
        .iter()
        .filter(|op| period.contains(op.date, today))
        .collect()
}

/// One month of the trend series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthTotals {
    /// Human-readable month label, e.g. "Aug 2026".
    pub label: String,
    pub totals: Totals,
}

/// The last `months` months of totals, oldest first, as seen from `today`.
pub fn monthly_series(operations: &[Operation], months: u32, today: NaiveDate) -> Vec<MonthTotals> {
    let mut series = Vec::with_capacity(months as usize);
    for back in (0..months).rev() {
        let (y, m) = shift_month(today.year(), today.month(), back);
        let month_ops = operations
            .iter()
            .filter(|op| op.date.year() == y && op.date.month() == m);
        let label = NaiveDate::from_ymd_opt(y, m, 1)
            .map(|d| d.format("%b %Y").to_string())
            .unwrap_or_default();
        series.push(MonthTotals {
            label,
            totals: totals(month_ops),
        });
    }
    series
}

/// One row of the expenses-by-category breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: String,
    pub amount: Amount,
    /// Share of total expenses, in percent.
    pub share: f64,
}

/// Expenses grouped by category, sorted by amount descending, with each
/// category's share of the total.
pub fn expenses_by_category<'a>(
    operations: impl IntoIterator<Item = &'a Operation>,
) -> Vec<CategoryShare> {
    let mut by_category: BTreeMap<&str, Amount> = BTreeMap::new();
    let mut total = Amount::ZERO;
    for op in operations {
        if op.op_type != OperationType::Expense {
            continue;
        }
        *by_category.entry(op.category.as_str()).or_default() += op.amount;
        total += op.amount;
    }

    let mut rows: Vec<CategoryShare> = by_category
        .into_iter()
        .map(|(category, amount)| {
            let share = if total.is_zero() {
                0.0
            } else {
                (amount.value() / total.value()).to_f64().unwrap_or_default() * 100.0
            };
            CategoryShare {
                category: category.to_string(),
                amount,
                share,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.category.cmp(&b.category)));
    rows
}

/// The year/month that is `back` months before the given year/month.
fn shift_month(year: i32, month: u32, back: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}
