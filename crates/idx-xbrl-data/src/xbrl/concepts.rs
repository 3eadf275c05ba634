//! Mapping from taxonomy concepts to report line items.
//!
//! Each line item lists candidate local names in priority order. IDX
//! `idx-cor` names come first, then the IFRS names some filers use.

use crate::model::LineItems;

/// Document and entity information concepts.
pub mod dei {
    /// Last day of the reporting period
    pub const CURRENT_PERIOD_END_DATE: &str = "CurrentPeriodEndDate";
    /// Registered entity name
    pub const ENTITY_NAME: &str = "EntityName";
    /// Exchange entity code
    pub const ENTITY_CODE: &str = "EntityCode";

    /// All metadata concepts read by the parser.
    pub const ALL: [&str; 3] = [CURRENT_PERIOD_END_DATE, ENTITY_NAME, ENTITY_CODE];
}

/// A line item of [`LineItems`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineItem {
    /// Total assets
    TotalAssets,
    /// Current assets
    CurrentAssets,
    /// Total liabilities
    TotalLiabilities,
    /// Current liabilities
    CurrentLiabilities,
    /// Total equity
    TotalEquity,
    /// Equity attributable to owners of the parent
    EquityAttributableToParent,
    /// Cash and cash equivalents
    CashAndEquivalents,
    /// Revenue
    Revenue,
    /// Gross profit
    GrossProfit,
    /// Operating income
    OperatingIncome,
    /// Profit before income tax
    ProfitBeforeTax,
    /// Net income
    NetIncome,
    /// Net income attributable to owners of the parent
    NetIncomeAttributableToParent,
    /// Basic EPS
    EpsBasic,
    /// Diluted EPS
    EpsDiluted,
    /// Operating cash flow
    OperatingCashFlow,
    /// Investing cash flow
    InvestingCashFlow,
    /// Financing cash flow
    FinancingCashFlow,
}

impl LineItem {
    /// Every line item, balance sheet first.
    pub const ALL: [Self; 18] = [
        Self::TotalAssets,
        Self::CurrentAssets,
        Self::TotalLiabilities,
        Self::CurrentLiabilities,
        Self::TotalEquity,
        Self::EquityAttributableToParent,
        Self::CashAndEquivalents,
        Self::Revenue,
        Self::GrossProfit,
        Self::OperatingIncome,
        Self::ProfitBeforeTax,
        Self::NetIncome,
        Self::NetIncomeAttributableToParent,
        Self::EpsBasic,
        Self::EpsDiluted,
        Self::OperatingCashFlow,
        Self::InvestingCashFlow,
        Self::FinancingCashFlow,
    ];

    /// Candidate concept local names, highest priority first.
    pub const fn concepts(&self) -> &'static [&'static str] {
        match self {
            Self::TotalAssets => &["Assets", "TotalAssets"],
            Self::CurrentAssets => &["CurrentAssets", "TotalCurrentAssets"],
            Self::TotalLiabilities => &["Liabilities", "TotalLiabilities"],
            Self::CurrentLiabilities => &["CurrentLiabilities", "TotalCurrentLiabilities"],
            Self::TotalEquity => &["Equity", "TotalEquity"],
            Self::EquityAttributableToParent => &[
                "EquityAttributableToEquityOwnersOfParentEntity",
                "EquityAttributableToOwnersOfParent",
            ],
            Self::CashAndEquivalents => &["CashAndCashEquivalents"],
            Self::Revenue => &["SalesAndRevenue", "Revenue", "Revenues"],
            Self::GrossProfit => &["GrossProfit"],
            Self::OperatingIncome => &[
                "ProfitLossFromOperatingActivities",
                "OperatingIncomeLoss",
            ],
            Self::ProfitBeforeTax => &[
                "ProfitLossBeforeIncomeTax",
                "ProfitLossBeforeTax",
            ],
            Self::NetIncome => &["ProfitLoss", "NetIncomeLoss"],
            Self::NetIncomeAttributableToParent => &[
                "ProfitLossAttributableToParentEntity",
                "ProfitLossAttributableToOwnersOfParent",
            ],
            Self::EpsBasic => &[
                "BasicEarningsLossPerShareFromContinuingOperations",
                "BasicEarningsLossPerShare",
            ],
            Self::EpsDiluted => &[
                "DilutedEarningsLossPerShareFromContinuingOperations",
                "DilutedEarningsLossPerShare",
            ],
            Self::OperatingCashFlow => &[
                "NetCashFlowsReceivedFromUsedInOperatingActivities",
                "CashFlowsFromUsedInOperatingActivities",
            ],
            Self::InvestingCashFlow => &[
                "NetCashFlowsReceivedFromUsedInInvestingActivities",
                "CashFlowsFromUsedInInvestingActivities",
            ],
            Self::FinancingCashFlow => &[
                "NetCashFlowsReceivedFromUsedInFinancingActivities",
                "CashFlowsFromUsedInFinancingActivities",
            ],
        }
    }

    /// Field name in [`LineItems`].
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::TotalAssets => "total_assets",
            Self::CurrentAssets => "current_assets",
            Self::TotalLiabilities => "total_liabilities",
            Self::CurrentLiabilities => "current_liabilities",
            Self::TotalEquity => "total_equity",
            Self::EquityAttributableToParent => "equity_attributable_to_parent",
            Self::CashAndEquivalents => "cash_and_equivalents",
            Self::Revenue => "revenue",
            Self::GrossProfit => "gross_profit",
            Self::OperatingIncome => "operating_income",
            Self::ProfitBeforeTax => "profit_before_tax",
            Self::NetIncome => "net_income",
            Self::NetIncomeAttributableToParent => "net_income_attributable_to_parent",
            Self::EpsBasic => "eps_basic",
            Self::EpsDiluted => "eps_diluted",
            Self::OperatingCashFlow => "operating_cash_flow",
            Self::InvestingCashFlow => "investing_cash_flow",
            Self::FinancingCashFlow => "financing_cash_flow",
        }
    }

    /// Whether the item is reported per share rather than in currency.
    pub const fn is_per_share(&self) -> bool {
        matches!(self, Self::EpsBasic | Self::EpsDiluted)
    }

    /// Read the item's value from `items`.
    pub const fn value(&self, items: &LineItems) -> Option<f64> {
        match self {
            Self::TotalAssets => Some(items.total_assets),
            Self::CurrentAssets => items.current_assets,
            Self::TotalLiabilities => items.total_liabilities,
            Self::CurrentLiabilities => items.current_liabilities,
            Self::TotalEquity => items.total_equity,
            Self::EquityAttributableToParent => items.equity_attributable_to_parent,
            Self::CashAndEquivalents => items.cash_and_equivalents,
            Self::Revenue => items.revenue,
            Self::GrossProfit => items.gross_profit,
            Self::OperatingIncome => items.operating_income,
            Self::ProfitBeforeTax => items.profit_before_tax,
            Self::NetIncome => items.net_income,
            Self::NetIncomeAttributableToParent => items.net_income_attributable_to_parent,
            Self::EpsBasic => items.eps_basic,
            Self::EpsDiluted => items.eps_diluted,
            Self::OperatingCashFlow => items.operating_cash_flow,
            Self::InvestingCashFlow => items.investing_cash_flow,
            Self::FinancingCashFlow => items.financing_cash_flow,
        }
    }

    /// Store an optional value into its field. `TotalAssets` is ignored here.
    pub fn assign(&self, items: &mut LineItems, value: Option<f64>) {
        let slot = match self {
            Self::TotalAssets => return,
            Self::CurrentAssets => &mut items.current_assets,
            Self::TotalLiabilities => &mut items.total_liabilities,
            Self::CurrentLiabilities => &mut items.current_liabilities,
            Self::TotalEquity => &mut items.total_equity,
            Self::EquityAttributableToParent => &mut items.equity_attributable_to_parent,
            Self::CashAndEquivalents => &mut items.cash_and_equivalents,
            Self::Revenue => &mut items.revenue,
            Self::GrossProfit => &mut items.gross_profit,
            Self::OperatingIncome => &mut items.operating_income,
            Self::ProfitBeforeTax => &mut items.profit_before_tax,
            Self::NetIncome => &mut items.net_income,
            Self::NetIncomeAttributableToParent => &mut items.net_income_attributable_to_parent,
            Self::EpsBasic => &mut items.eps_basic,
            Self::EpsDiluted => &mut items.eps_diluted,
            Self::OperatingCashFlow => &mut items.operating_cash_flow,
            Self::InvestingCashFlow => &mut items.investing_cash_flow,
            Self::FinancingCashFlow => &mut items.financing_cash_flow,
        };
        *slot = value;
    }
}

/// Whether a concept local name feeds a line item or the record metadata.
pub fn is_mapped(local_name: &str) -> bool {
    dei::ALL.contains(&local_name)
        || LineItem::ALL
            .iter()
            .any(|item| item.concepts().contains(&local_name))
}
