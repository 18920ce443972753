//! The closed set of metric keys.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A metric tracked per (version, year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    // Revenue and P&L
    /// Total revenue.
    Revenue,
    /// Tuition part of revenue.
    TuitionRevenue,
    /// Non-tuition revenue.
    OtherRevenue,
    /// Direct cost of sales.
    CostOfSales,
    /// Revenue minus cost of sales.
    GrossProfit,
    /// Operating expenses.
    OperatingExpenses,
    /// Staff costs (part of operating expenses).
    StaffCosts,
    /// Rent (part of operating expenses).
    RentExpense,
    /// Gross profit minus operating expenses.
    Ebitda,
    /// Depreciation and amortisation.
    Depreciation,
    /// EBITDA minus depreciation.
    Ebit,
    /// Interest earned on positive cash.
    InterestIncome,
    /// Interest paid on overdraft.
    InterestExpense,
    /// EBIT plus net interest.
    NetIncome,
    /// Operational provision (share of operating expenses).
    ProvisionOperational,
    /// Contingency provision (share of net income or revenue).
    ProvisionContingency,

    // Balance sheet
    /// Cash held on the balance sheet.
    Cash,
    /// Current assets, including cash.
    AssetsCurrent,
    /// Fixed assets.
    AssetsFixed,
    /// Total assets.
    Assets,
    /// Current liabilities.
    LiabilitiesCurrent,
    /// Long-term debt.
    Debt,
    /// Total liabilities.
    Liabilities,
    /// Total equity.
    Equity,
    /// Cumulative retained earnings.
    RetainedEarnings,

    // Cash flow
    /// Net operating cash flow.
    CfOperating,
    /// Net investing cash flow.
    CfInvesting,
    /// Net financing cash flow.
    CfFinancing,
    /// Sum of the three cash flow legs.
    CfNetChange,
    /// Opening cash for the year.
    CashBeginning,
    /// Closing cash for the year.
    CashEnding,
}

/// Metric keys written to the metric store for every computed year.
pub const PERSISTED_METRICS: [MetricKey; 21] = [
    MetricKey::Revenue,
    MetricKey::CostOfSales,
    MetricKey::GrossProfit,
    MetricKey::OperatingExpenses,
    MetricKey::Ebitda,
    MetricKey::Depreciation,
    MetricKey::Ebit,
    MetricKey::InterestIncome,
    MetricKey::InterestExpense,
    MetricKey::NetIncome,
    MetricKey::Cash,
    MetricKey::Assets,
    MetricKey::Liabilities,
    MetricKey::Equity,
    MetricKey::RetainedEarnings,
    MetricKey::CfOperating,
    MetricKey::CfInvesting,
    MetricKey::CfFinancing,
    MetricKey::CfNetChange,
    MetricKey::CashBeginning,
    MetricKey::CashEnding,
];

impl MetricKey {
    /// Every metric key, in declaration order.
    pub const ALL: [Self; 31] = [
        Self::Revenue,
        Self::TuitionRevenue,
        Self::OtherRevenue,
        Self::CostOfSales,
        Self::GrossProfit,
        Self::OperatingExpenses,
        Self::StaffCosts,
        Self::RentExpense,
        Self::Ebitda,
        Self::Depreciation,
        Self::Ebit,
        Self::InterestIncome,
        Self::InterestExpense,
        Self::NetIncome,
        Self::ProvisionOperational,
        Self::ProvisionContingency,
        Self::Cash,
        Self::AssetsCurrent,
        Self::AssetsFixed,
        Self::Assets,
        Self::LiabilitiesCurrent,
        Self::Debt,
        Self::Liabilities,
        Self::Equity,
        Self::RetainedEarnings,
        Self::CfOperating,
        Self::CfInvesting,
        Self::CfFinancing,
        Self::CfNetChange,
        Self::CashBeginning,
        Self::CashEnding,
    ];

    /// Returns the storage name of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::TuitionRevenue => "tuition_revenue",
            Self::OtherRevenue => "other_revenue",
            Self::CostOfSales => "cost_of_sales",
            Self::GrossProfit => "gross_profit",
            Self::OperatingExpenses => "operating_expenses",
            Self::StaffCosts => "staff_costs",
            Self::RentExpense => "rent_expense",
            Self::Ebitda => "ebitda",
            Self::Depreciation => "depreciation",
            Self::Ebit => "ebit",
            Self::InterestIncome => "interest_income",
            Self::InterestExpense => "interest_expense",
            Self::NetIncome => "net_income",
            Self::ProvisionOperational => "provision_operational",
            Self::ProvisionContingency => "provision_contingency",
            Self::Cash => "cash",
            Self::AssetsCurrent => "assets_current",
            Self::AssetsFixed => "assets_fixed",
            Self::Assets => "assets",
            Self::LiabilitiesCurrent => "liabilities_current",
            Self::Debt => "debt",
            Self::Liabilities => "liabilities",
            Self::Equity => "equity",
            Self::RetainedEarnings => "retained_earnings",
            Self::CfOperating => "cf_operating",
            Self::CfInvesting => "cf_investing",
            Self::CfFinancing => "cf_financing",
            Self::CfNetChange => "cf_net_change",
            Self::CashBeginning => "cash_beginning",
            Self::CashEnding => "cash_ending",
        }
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric name outside the closed key set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric key: {0}")]
pub struct UnknownMetricKey(pub String);

impl std::str::FromStr for MetricKey {
    type Err = UnknownMetricKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownMetricKey(s.to_string()))
    }
}
