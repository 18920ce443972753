//! Extraction of engine input from free-form statement tabs.
//!
//! Each metric is looked up by a list of alternative field names, first hit
//! wins. Some metrics can also be assembled from parts (a sum of line items
//! or an inflow minus an outflow). Values may be JSON numbers or numeric
//! strings; anything else counts as missing.

use campusplan_shared::types::Year;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::store::{TabKind, VersionTabs};
use crate::metrics::{MetricKey, MetricRecord, MetricsError};

/// One way of reading a metric from a payload.
#[derive(Debug, Clone, Copy)]
enum Source {
    /// A single field.
    Field(&'static str),
    /// Sum of whichever line items are present.
    Sum(&'static [&'static str]),
    /// `inflow - outflow`, missing side counted as zero.
    Net {
        inflow: &'static str,
        outflow: &'static str,
    },
}

struct Mapping {
    key: MetricKey,
    tab: TabKind,
    sources: &'static [Source],
}

const MAPPINGS: &[Mapping] = &[
    // Profit and loss
    Mapping {
        key: MetricKey::Revenue,
        tab: TabKind::Pnl,
        sources: &[
            Source::Field("revenue"),
            Source::Field("total_revenue"),
            Source::Sum(&["tuition_revenue", "other_revenue"]),
        ],
    },
    Mapping {
        key: MetricKey::CostOfSales,
        tab: TabKind::Pnl,
        sources: &[Source::Field("cost_of_sales"), Source::Field("cogs")],
    },
    Mapping {
        key: MetricKey::OperatingExpenses,
        tab: TabKind::Pnl,
        sources: &[
            Source::Field("operating_expenses"),
            Source::Field("opex"),
            Source::Sum(&["staff_costs", "rent_expense", "other_opex"]),
        ],
    },
    Mapping {
        key: MetricKey::Depreciation,
        tab: TabKind::Pnl,
        sources: &[
            Source::Field("depreciation"),
            Source::Field("depreciation_amortization"),
        ],
    },
    Mapping {
        key: MetricKey::InterestIncome,
        tab: TabKind::Pnl,
        sources: &[Source::Field("interest_income"), Source::Field("finance_income")],
    },
    Mapping {
        key: MetricKey::InterestExpense,
        tab: TabKind::Pnl,
        sources: &[Source::Field("interest_expense"), Source::Field("finance_costs")],
    },
    // Balance sheet
    Mapping {
        key: MetricKey::Cash,
        tab: TabKind::BalanceSheet,
        sources: &[Source::Field("cash"), Source::Field("cash_and_equivalents")],
    },
    Mapping {
        key: MetricKey::AssetsCurrent,
        tab: TabKind::BalanceSheet,
        sources: &[Source::Field("assets_current"), Source::Field("current_assets")],
    },
    Mapping {
        key: MetricKey::AssetsFixed,
        tab: TabKind::BalanceSheet,
        sources: &[
            Source::Field("assets_fixed"),
            Source::Field("fixed_assets"),
            Source::Field("ppe"),
        ],
    },
    Mapping {
        key: MetricKey::LiabilitiesCurrent,
        tab: TabKind::BalanceSheet,
        sources: &[
            Source::Field("liabilities_current"),
            Source::Field("current_liabilities"),
        ],
    },
    Mapping {
        key: MetricKey::Debt,
        tab: TabKind::BalanceSheet,
        sources: &[Source::Field("debt"), Source::Field("long_term_debt")],
    },
    Mapping {
        key: MetricKey::Equity,
        tab: TabKind::BalanceSheet,
        sources: &[Source::Field("equity"), Source::Field("total_equity")],
    },
    // Cash flow
    Mapping {
        key: MetricKey::CfOperating,
        tab: TabKind::CashFlow,
        sources: &[
            Source::Field("cf_operating"),
            Source::Field("operating_cash_flow"),
            Source::Net {
                inflow: "operating_cash_in",
                outflow: "operating_cash_out",
            },
        ],
    },
    Mapping {
        key: MetricKey::CfInvesting,
        tab: TabKind::CashFlow,
        sources: &[
            Source::Field("cf_investing"),
            Source::Field("investing_cash_flow"),
            Source::Net {
                inflow: "investing_cash_in",
                outflow: "investing_cash_out",
            },
        ],
    },
    Mapping {
        key: MetricKey::CfFinancing,
        tab: TabKind::CashFlow,
        sources: &[
            Source::Field("cf_financing"),
            Source::Field("financing_cash_flow"),
            Source::Net {
                inflow: "financing_cash_in",
                outflow: "financing_cash_out",
            },
        ],
    },
    Mapping {
        key: MetricKey::CashBeginning,
        tab: TabKind::CashFlow,
        sources: &[Source::Field("cash_beginning"), Source::Field("opening_cash")],
    },
];

/// Reads a decimal from a JSON number or numeric string.
pub fn decimal_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn field(payload: &Value, name: &str) -> Option<Decimal> {
    payload.get(name).and_then(decimal_value)
}

impl Source {
    fn read(self, key: MetricKey, payload: &Value) -> Result<Option<Decimal>, MetricsError> {
        match self {
            Self::Field(name) => Ok(field(payload, name)),
            Self::Sum(names) => names
                .iter()
                .filter_map(|name| field(payload, name))
                .try_fold(None, |total: Option<Decimal>, item| {
                    total
                        .map_or(Some(item), |total| total.checked_add(item))
                        .map(Some)
                        .ok_or(MetricsError::Overflow(key))
                }),
            Self::Net { inflow, outflow } => {
                match (field(payload, inflow), field(payload, outflow)) {
                    (None, None) => Ok(None),
                    (inflow, outflow) => inflow
                        .unwrap_or_default()
                        .checked_sub(outflow.unwrap_or_default())
                        .map(Some)
                        .ok_or(MetricsError::Overflow(key)),
                }
            }
        }
    }
}

fn payload(tabs: &VersionTabs, tab: TabKind) -> Option<&Value> {
    match tab {
        TabKind::Pnl => tabs.pnl.as_ref(),
        TabKind::BalanceSheet => tabs.balance_sheet.as_ref(),
        TabKind::CashFlow => tabs.cash_flow.as_ref(),
        _ => None,
    }
}

/// Builds the base record from the three statement payloads.
///
/// Missing tabs and missing fields leave the metric unset.
///
/// # Errors
///
/// Returns `Overflow` when line items summed into a metric leave the
/// decimal range.
pub fn extract_base_record(tabs: &VersionTabs) -> Result<MetricRecord, MetricsError> {
    let mut record = MetricRecord::new();
    for mapping in MAPPINGS {
        let Some(payload) = payload(tabs, mapping.tab) else {
            continue;
        };
        for source in mapping.sources {
            if let Some(value) = source.read(mapping.key, payload)? {
                record.insert(mapping.key, value);
                break;
            }
        }
    }
    Ok(record)
}

/// Copies the base record onto every year of `start..=end`.
///
/// Opening cash only applies to the first year; later years take it from
/// the previous year's closing cash.
pub fn replicate_across_years(
    base: &MetricRecord,
    start: Year,
    end: Year,
) -> BTreeMap<Year, MetricRecord> {
    let mut later = base.clone();
    later.remove(MetricKey::CashBeginning);

    Year::range(start, end)
        .map(|year| {
            let record = if year == start { base.clone() } else { later.clone() };
            (year, record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn year(value: i32) -> Year {
        Year::new(value).unwrap()
    }

    #[test]
    fn test_primary_field_names() {
        let tabs = VersionTabs {
            pnl: Some(json!({"revenue": 1000, "cost_of_sales": 300, "operating_expenses": "400"})),
            balance_sheet: Some(json!({"cash": 50.5, "debt": 10})),
            cash_flow: Some(json!({"cf_operating": 20, "cash_beginning": 30})),
        };
        let record = extract_base_record(&tabs).unwrap();
        assert_eq!(record.get(MetricKey::Revenue), Some(dec!(1000)));
        assert_eq!(record.get(MetricKey::CostOfSales), Some(dec!(300)));
        assert_eq!(record.get(MetricKey::OperatingExpenses), Some(dec!(400)));
        assert_eq!(record.get(MetricKey::Cash), Some(dec!(50.5)));
        assert_eq!(record.get(MetricKey::Debt), Some(dec!(10)));
        assert_eq!(record.get(MetricKey::CfOperating), Some(dec!(20)));
        assert_eq!(record.get(MetricKey::CashBeginning), Some(dec!(30)));
        assert_eq!(record.len(), 7);
    }

    #[test]
    fn test_fallback_names_and_parts() {
        let tabs = VersionTabs {
            pnl: Some(json!({
                "tuition_revenue": 900,
                "other_revenue": 100,
                "staff_costs": 200,
                "rent_expense": 50,
                "cogs": 10
            })),
            balance_sheet: Some(json!({"fixed_assets": 700, "total_equity": 400})),
            cash_flow: Some(json!({
                "operating_cash_in": 500,
                "operating_cash_out": 320,
                "financing_cash_out": 40,
                "opening_cash": 15
            })),
        };
        let record = extract_base_record(&tabs).unwrap();
        assert_eq!(record.get(MetricKey::Revenue), Some(dec!(1000)));
        assert_eq!(record.get(MetricKey::OperatingExpenses), Some(dec!(250)));
        assert_eq!(record.get(MetricKey::CostOfSales), Some(dec!(10)));
        assert_eq!(record.get(MetricKey::AssetsFixed), Some(dec!(700)));
        assert_eq!(record.get(MetricKey::Equity), Some(dec!(400)));
        assert_eq!(record.get(MetricKey::CfOperating), Some(dec!(180)));
        assert_eq!(record.get(MetricKey::CfFinancing), Some(dec!(-40)));
        assert_eq!(record.get(MetricKey::CfInvesting), None);
        assert_eq!(record.get(MetricKey::CashBeginning), Some(dec!(15)));
    }

    #[test]
    fn test_primary_name_wins_over_fallback() {
        let tabs = VersionTabs {
            pnl: Some(json!({"revenue": 5, "total_revenue": 6, "tuition_revenue": 7})),
            ..VersionTabs::default()
        };
        assert_eq!(extract_base_record(&tabs).unwrap().get(MetricKey::Revenue), Some(dec!(5)));
    }

    #[test]
    fn test_unusable_values_are_ignored() {
        let tabs = VersionTabs {
            pnl: Some(json!({"revenue": "n/a", "total_revenue": 12, "cogs": null, "opex": [1]})),
            balance_sheet: Some(json!(["not", "an", "object"])),
            cash_flow: None,
        };
        let record = extract_base_record(&tabs).unwrap();
        assert_eq!(record.get(MetricKey::Revenue), Some(dec!(12)));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_empty_tabs_give_empty_record() {
        assert!(extract_base_record(&VersionTabs::default()).unwrap().is_empty());
    }

    #[test]
    fn test_overflowing_parts_are_an_error() {
        let tabs = VersionTabs {
            pnl: Some(json!({
                "tuition_revenue": "79228162514264337593543950335",
                "other_revenue": 1
            })),
            cash_flow: Some(json!({
                "financing_cash_in": "-79228162514264337593543950335",
                "financing_cash_out": 1
            })),
            ..VersionTabs::default()
        };
        assert_eq!(
            extract_base_record(&tabs),
            Err(MetricsError::Overflow(MetricKey::Revenue))
        );

        let tabs = VersionTabs {
            cash_flow: tabs.cash_flow,
            ..VersionTabs::default()
        };
        assert_eq!(
            extract_base_record(&tabs),
            Err(MetricsError::Overflow(MetricKey::CfFinancing))
        );
    }

    #[test]
    fn test_decimal_value_forms() {
        assert_eq!(decimal_value(&json!(" 12.50 ")), Some(dec!(12.50)));
        assert_eq!(decimal_value(&json!(-3)), Some(dec!(-3)));
        assert_eq!(decimal_value(&json!(1e3)), Some(dec!(1000)));
        assert_eq!(decimal_value(&json!(true)), None);
    }

    #[test]
    fn test_replicate_keeps_opening_cash_on_first_year_only() {
        let base: MetricRecord = [
            (MetricKey::Revenue, dec!(100)),
            (MetricKey::CashBeginning, dec!(40)),
        ]
        .into_iter()
        .collect();

        let years = replicate_across_years(&base, year(2025), year(2027));
        assert_eq!(years.len(), 3);
        assert_eq!(years[&year(2025)].get(MetricKey::CashBeginning), Some(dec!(40)));
        assert_eq!(years[&year(2026)].get(MetricKey::CashBeginning), None);
        assert_eq!(years[&year(2027)].get(MetricKey::Revenue), Some(dec!(100)));
    }
}
