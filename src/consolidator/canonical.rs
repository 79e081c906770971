use once_cell::sync::Lazy;

use crate::types::StatementType;

/// Substring patterns mapping near-synonymous income-statement names to one
/// canonical name. Ordered most-specific first; the first matching pattern
/// wins. Matching is case-insensitive on the trimmed name.
static INCOME_STATEMENT_CANONICAL: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("cost of goods sold", "Cost of revenue"),
        ("cost of sales", "Cost of revenue"),
        ("cost of revenue", "Cost of revenue"),
        ("selling, general and administrative", "Selling, general and administrative"),
        ("general and administrative", "General and administrative"),
        ("research and development", "Research and development"),
        ("operating expenses", "Operating expenses"),
        ("provision for income taxes", "Income tax expense"),
        ("income tax expense", "Income tax expense"),
        ("interest expense", "Interest expense"),
    ]
});

/// The canonical name an account name maps to, if this statement type has a
/// canonical table and the name matches a pattern. Only income statements
/// carry such a table today.
pub fn canonical_name(ty: StatementType, name: &str) -> Option<&'static str> {
    if ty != StatementType::IncomeStatement {
        return None;
    }
    let lowered = name.trim().to_lowercase();
    INCOME_STATEMENT_CANONICAL
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
        .map(|(_, canonical)| *canonical)
}
