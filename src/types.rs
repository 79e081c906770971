use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

/// The closed set of financial-statement categories this crate understands.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
#[serde(try_from = "String", into = "String")]
pub enum StatementType {
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    ComprehensiveIncome,
    ShareholdersEquity,
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementType::IncomeStatement => write!(f, "Income Statement"),
            StatementType::BalanceSheet => write!(f, "Balance Sheet"),
            StatementType::CashFlow => write!(f, "Cash Flow Statement"),
            StatementType::ComprehensiveIncome => write!(f, "Statement of Comprehensive Income"),
            StatementType::ShareholdersEquity => write!(f, "Statement of Shareholders' Equity"),
            StatementType::Unknown => write!(f, "Unknown"),
        }
    }
}

impl FromStr for StatementType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<StatementType, String> {
        match s.to_lowercase().replace(['_', '-'], " ").as_str() {
            "income statement" | "statement of income" | "statement of operations" => {
                Ok(StatementType::IncomeStatement)
            }
            "balance sheet" | "statement of financial position" => Ok(StatementType::BalanceSheet),
            "cash flow" | "cash flow statement" | "statement of cash flows" => {
                Ok(StatementType::CashFlow)
            }
            "comprehensive income" | "statement of comprehensive income" => {
                Ok(StatementType::ComprehensiveIncome)
            }
            "shareholders equity"
            | "shareholders' equity"
            | "stockholders equity"
            | "stockholders' equity"
            | "statement of shareholders' equity" => Ok(StatementType::ShareholdersEquity),
            "unknown" => Ok(StatementType::Unknown),
            other => Err(format!("unrecognized statement type: {}", other)),
        }
    }
}

impl TryFrom<String> for StatementType {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        StatementType::from_str(&s)
    }
}

impl From<StatementType> for String {
    fn from(ty: StatementType) -> String {
        ty.to_string()
    }
}

pub static STATEMENT_TYPES: Lazy<String> = Lazy::new(|| {
    StatementType::iter()
        .filter(|t| !matches!(t, StatementType::Unknown))
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl StatementType {
    pub fn list_types() -> &'static str {
        &STATEMENT_TYPES
    }
}

/// One page of a document, classified by statement type with a confidence
/// score in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPage {
    pub page_index: usize,
    pub statement_type: StatementType,
    pub confidence: f64,
}

/// One row of a parsed financial statement.
///
/// `name` is kept verbatim, including the original leading whitespace, so the
/// indentation of the source table survives into the record. A section header
/// never carries values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Period label to raw value text, in the header row's period order.
    /// Empty cells are omitted: absence means "no value", never zero.
    pub values: Vec<(String, String)>,
    pub indent_level: u32,
    pub is_section_header: bool,
    pub is_total: bool,
    pub section: Option<String>,
    pub parent_section: Option<String>,
    pub order: u32,
}

impl LineItem {
    pub fn value_for(&self, period: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(p, _)| p == period)
            .map(|(_, v)| v.as_str())
    }
}

/// The terminal output of one table parse: an ordered period list and the
/// line items in source order. Never mutated after return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub periods: Vec<String>,
    pub line_items: Vec<LineItem>,
}

/// A parsed statement tagged with the identity of the document it came from,
/// the consolidator's unit of input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatement {
    pub source_id: String,
    pub statement: ParsedStatement,
}

impl SourceStatement {
    pub fn new(source_id: impl Into<String>, statement: ParsedStatement) -> Self {
        Self {
            source_id: source_id.into(),
            statement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    Detail,
    SectionHeader,
    Total,
}

/// Where one consolidated value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOrigin {
    pub original_name: String,
    pub source_id: String,
}

/// The merged identity of one or more near-duplicate line items across
/// source documents. `values` is keyed by normalized 4-digit year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedAccount {
    pub canonical_name: String,
    pub values: BTreeMap<String, String>,
    pub indent_level: u32,
    pub section: Option<String>,
    pub parent_section: Option<String>,
    pub category: AccountCategory,
    pub merged_from: Vec<MergeOrigin>,
}

/// One entry of the merge audit trail, grouped by final consolidated name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub consolidated_name: String,
    pub merged_from: Vec<MergeOrigin>,
}

/// The terminal artifact of a consolidation run. Periods are years sorted
/// descending; accounts keep first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedStatement {
    pub statement_type: StatementType,
    pub periods: Vec<String>,
    pub accounts: Vec<ConsolidatedAccount>,
    pub merge_summary: Vec<MergeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_type_display_round_trip() {
        for ty in StatementType::iter() {
            let label = ty.to_string();
            assert_eq!(label.parse::<StatementType>().unwrap(), ty);
        }
    }

    #[test]
    fn statement_type_from_common_aliases() {
        assert_eq!(
            "statement of operations".parse::<StatementType>().unwrap(),
            StatementType::IncomeStatement
        );
        assert_eq!(
            "stockholders' equity".parse::<StatementType>().unwrap(),
            StatementType::ShareholdersEquity
        );
        assert!("annual report".parse::<StatementType>().is_err());
    }

    #[test]
    fn statement_type_serde_round_trip() {
        let json = serde_json::to_string(&StatementType::BalanceSheet).unwrap();
        assert_eq!(json, "\"Balance Sheet\"");
        let back: StatementType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StatementType::BalanceSheet);
    }

    #[test]
    fn line_item_value_lookup() {
        let item = LineItem {
            name: "Revenue".to_string(),
            values: vec![
                ("2024".to_string(), "1,000".to_string()),
                ("2023".to_string(), "900".to_string()),
            ],
            indent_level: 0,
            is_section_header: false,
            is_total: false,
            section: None,
            parent_section: None,
            order: 0,
        };
        assert_eq!(item.value_for("2023"), Some("900"));
        assert_eq!(item.value_for("2022"), None);
    }
}
