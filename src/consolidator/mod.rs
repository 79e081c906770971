use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::error::{FinStatError, Result};
use crate::types::{
    AccountCategory, ConsolidatedAccount, ConsolidatedStatement, LineItem, MergeOrigin,
    MergeRecord, SourceStatement, StatementType,
};

pub mod canonical;
pub mod similarity;

pub use canonical::canonical_name;
pub use similarity::{LcsSimilarity, NameSimilarity};

/// Tuned similarity cutoff for fuzzy account matching; carried as-is.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

/// The canonical period key for merging: the first 4-digit substring of a
/// period label. "Year Ended 2022", "FY2022" and "2022" all normalize to
/// "2022"; a label with no year is excluded from the merged timeline.
pub fn normalize_year(label: &str) -> Option<String> {
    YEAR.find(label).map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Exact,
    Canonical,
    Fuzzy,
    New,
}

enum Decision {
    Merge(usize, MatchKind),
    Create(String),
}

struct AccountEntry {
    canonical_name: String,
    section: Option<String>,
    parent_section: Option<String>,
    indent_level: u32,
    category: AccountCategory,
    values: BTreeMap<String, String>,
    merged_from: Vec<MergeOrigin>,
}

/// Merges N parsed statements of one statement type, produced from different
/// source documents over different (possibly overlapping) periods, into one
/// multi-period statement with a full merge audit trail.
///
/// Matching is first-match-wins and order-sensitive: sources are processed
/// in input order and line items in source order, so identical input always
/// yields identical output.
pub struct StatementConsolidator {
    statement_type: StatementType,
    fuzzy_threshold: f64,
    similarity: Box<dyn NameSimilarity>,
}

impl StatementConsolidator {
    pub fn new(statement_type: StatementType) -> Self {
        Self {
            statement_type,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            similarity: Box::new(LcsSimilarity),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_similarity(mut self, similarity: Box<dyn NameSimilarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Consolidate the given sources into one statement.
    ///
    /// An empty source list is a setup error; once inputs are present,
    /// merging is deterministic and total.
    pub fn consolidate(&self, sources: &[SourceStatement]) -> Result<ConsolidatedStatement> {
        if sources.is_empty() {
            return Err(FinStatError::MissingSource);
        }

        let mut accounts: Vec<AccountEntry> = Vec::new();

        for source in sources {
            debug!(
                "consolidating source {:?} ({} line items)",
                source.source_id,
                source.statement.line_items.len()
            );
            for item in &source.statement.line_items {
                self.absorb(&mut accounts, item, &source.source_id);
            }
        }

        let mut years: Vec<String> = accounts
            .iter()
            .flat_map(|a| a.values.keys().cloned())
            .collect();
        years.sort();
        years.dedup();
        years.reverse();

        let merge_summary = accounts
            .iter()
            .map(|a| MergeRecord {
                consolidated_name: a.canonical_name.clone(),
                merged_from: a.merged_from.clone(),
            })
            .collect();

        let accounts = accounts
            .into_iter()
            .map(|a| ConsolidatedAccount {
                canonical_name: a.canonical_name,
                values: a.values,
                indent_level: a.indent_level,
                section: a.section,
                parent_section: a.parent_section,
                category: a.category,
                merged_from: a.merged_from,
            })
            .collect();

        Ok(ConsolidatedStatement {
            statement_type: self.statement_type,
            periods: years,
            accounts,
            merge_summary,
        })
    }

    /// Run one line item through the matching cascade and merge it into the
    /// accumulator.
    fn absorb(&self, accounts: &mut Vec<AccountEntry>, item: &LineItem, source_id: &str) {
        let name = item.name.trim();

        let (index, kind) = match self.decide(accounts, item, name) {
            Decision::Merge(index, kind) => (index, kind),
            Decision::Create(canonical_name) => {
                accounts.push(AccountEntry {
                    canonical_name,
                    section: item.section.clone(),
                    parent_section: item.parent_section.clone(),
                    indent_level: item.indent_level,
                    category: category_of(item),
                    values: BTreeMap::new(),
                    merged_from: Vec::new(),
                });
                (accounts.len() - 1, MatchKind::New)
            }
        };

        let entry = &mut accounts[index];
        debug!(
            "{:?}: {:?} from {:?} -> {:?}",
            kind, name, source_id, entry.canonical_name
        );

        for (period, value) in &item.values {
            let Some(year) = normalize_year(period) else {
                debug!("period {:?} has no extractable year, skipping", period);
                continue;
            };
            if let Some(existing) = entry.values.get(&year) {
                if existing != value {
                    warn!(
                        "{:?} already has a value for {} ({:?}); keeping it over {:?} from {:?}",
                        entry.canonical_name, year, existing, value, source_id
                    );
                }
                continue;
            }
            entry.values.insert(year, value.clone());
        }

        entry.merged_from.push(MergeOrigin {
            original_name: name.to_string(),
            source_id: source_id.to_string(),
        });
    }

    fn decide(&self, accounts: &[AccountEntry], item: &LineItem, name: &str) -> Decision {
        // 1. Exact: same name, same parent section, compatible section.
        if let Some(i) = accounts
            .iter()
            .position(|a| a.canonical_name == name && self.placement_matches(a, item))
        {
            return Decision::Merge(i, MatchKind::Exact);
        }

        // 2. Canonical pattern, within the same placement. A pattern hit
        // settles the name either way; fuzzy matching is not consulted.
        if let Some(canonical) = canonical_name(self.statement_type, name) {
            if let Some(i) = accounts
                .iter()
                .position(|a| a.canonical_name == canonical && self.placement_matches(a, item))
            {
                return Decision::Merge(i, MatchKind::Canonical);
            }
            return Decision::Create(canonical.to_string());
        }

        // 3. Fuzzy, only where section compatibility already holds.
        let mut best: Option<(usize, f64)> = None;
        for (i, account) in accounts.iter().enumerate() {
            if !self.placement_matches(account, item) {
                continue;
            }
            let ratio = self.similarity.ratio(name, &account.canonical_name);
            if best.map(|(_, r)| ratio > r).unwrap_or(true) {
                best = Some((i, ratio));
            }
        }
        if let Some((i, ratio)) = best {
            if ratio > self.fuzzy_threshold {
                return Decision::Merge(i, MatchKind::Fuzzy);
            }
        }

        Decision::Create(name.to_string())
    }

    /// Section compatibility: parent sections must agree exactly; sections
    /// must be equal, or one side unset. A name match alone is never enough
    /// to merge two accounts.
    fn placement_matches(&self, account: &AccountEntry, item: &LineItem) -> bool {
        account.parent_section == item.parent_section
            && sections_compatible(&account.section, &item.section)
    }
}

fn sections_compatible(a: &Option<String>, b: &Option<String>) -> bool {
    a.is_none() || b.is_none() || a == b
}

fn category_of(item: &LineItem) -> AccountCategory {
    if item.is_section_header {
        AccountCategory::SectionHeader
    } else if item.is_total {
        AccountCategory::Total
    } else {
        AccountCategory::Detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, section: Option<&str>, values: &[(&str, &str)]) -> LineItem {
        LineItem {
            name: name.to_string(),
            values: values
                .iter()
                .map(|(p, v)| (p.to_string(), v.to_string()))
                .collect(),
            indent_level: 0,
            is_section_header: false,
            is_total: false,
            section: section.map(String::from),
            parent_section: None,
            order: 0,
        }
    }

    fn source(id: &str, periods: &[&str], items: Vec<LineItem>) -> SourceStatement {
        SourceStatement::new(
            id,
            crate::types::ParsedStatement {
                periods: periods.iter().map(|p| p.to_string()).collect(),
                line_items: items,
            },
        )
    }

    #[test]
    fn test_year_normalization() {
        assert_eq!(normalize_year("Year Ended 2022"), Some("2022".to_string()));
        assert_eq!(normalize_year("FY2022"), Some("2022".to_string()));
        assert_eq!(normalize_year("2022"), Some("2022".to_string()));
        assert_eq!(normalize_year("Q3"), None);
    }

    #[test]
    fn test_empty_input_is_a_setup_error() {
        let consolidator = StatementConsolidator::new(StatementType::IncomeStatement);
        assert!(matches!(
            consolidator.consolidate(&[]),
            Err(FinStatError::MissingSource)
        ));
    }

    #[test]
    fn test_same_name_different_sections_stay_apart() {
        let a = source(
            "10-K 2022",
            &["2022"],
            vec![item("Deferred income taxes", Some("Assets"), &[("2022", "17,180")])],
        );
        let b = source(
            "10-K 2023",
            &["2022"],
            vec![item(
                "Deferred income taxes",
                Some("Liabilities"),
                &[("2022", "514")],
            )],
        );

        let consolidator = StatementConsolidator::new(StatementType::BalanceSheet);
        let result = consolidator.consolidate(&[a, b]).unwrap();

        assert_eq!(result.accounts.len(), 2);
        assert_eq!(result.accounts[0].section.as_deref(), Some("Assets"));
        assert_eq!(result.accounts[0].values["2022"], "17,180");
        assert_eq!(result.accounts[1].section.as_deref(), Some("Liabilities"));
        assert_eq!(result.accounts[1].values["2022"], "514");
    }

    #[test]
    fn test_canonical_merge_of_operating_expenses() {
        let a = source(
            "fy22",
            &["2022"],
            vec![item("Total operating expenses", None, &[("2022", "4,100")])],
        );
        let b = source(
            "fy23",
            &["2023"],
            vec![item("Operating expenses", None, &[("2023", "4,450")])],
        );

        let consolidator = StatementConsolidator::new(StatementType::IncomeStatement);
        let result = consolidator.consolidate(&[a, b]).unwrap();

        assert_eq!(result.accounts.len(), 1);
        let account = &result.accounts[0];
        assert_eq!(account.canonical_name, "Operating expenses");
        assert_eq!(account.values["2022"], "4,100");
        assert_eq!(account.values["2023"], "4,450");
        assert_eq!(account.merged_from.len(), 2);
    }

    #[test]
    fn test_canonical_match_respects_sections() {
        let a = source(
            "a",
            &["2022"],
            vec![item(
                "Total operating expenses",
                Some("Continuing operations"),
                &[("2022", "10")],
            )],
        );
        let b = source(
            "b",
            &["2023"],
            vec![item(
                "Operating expenses",
                Some("Discontinued operations"),
                &[("2023", "11")],
            )],
        );

        let consolidator = StatementConsolidator::new(StatementType::IncomeStatement);
        let result = consolidator.consolidate(&[a, b]).unwrap();

        // Both canonicalize to the same name but sit in different sections,
        // so they stay two accounts.
        assert_eq!(result.accounts.len(), 2);
        assert_eq!(result.accounts[0].canonical_name, "Operating expenses");
        assert_eq!(result.accounts[1].canonical_name, "Operating expenses");
        assert_ne!(result.accounts[0].section, result.accounts[1].section);
    }

    #[test]
    fn test_fuzzy_merge_requires_section_compatibility() {
        let a = source(
            "a",
            &["2022"],
            vec![item("Accounts receivable", Some("Assets"), &[("2022", "900")])],
        );
        let b = source(
            "b",
            &["2023"],
            vec![item(
                "Accounts receivable, net",
                Some("Assets"),
                &[("2023", "950")],
            )],
        );

        let consolidator = StatementConsolidator::new(StatementType::BalanceSheet);
        let result = consolidator.consolidate(&[a, b]).unwrap();
        assert_eq!(result.accounts.len(), 1);
        assert_eq!(result.accounts[0].canonical_name, "Accounts receivable");
        assert_eq!(result.accounts[0].values.len(), 2);
    }

    #[test]
    fn test_unset_section_is_backward_compatible() {
        let a = source(
            "older export",
            &["2021"],
            vec![item("Goodwill", None, &[("2021", "120")])],
        );
        let b = source(
            "newer export",
            &["2022"],
            vec![item("Goodwill", Some("Assets"), &[("2022", "120")])],
        );

        let consolidator = StatementConsolidator::new(StatementType::BalanceSheet);
        let result = consolidator.consolidate(&[a, b]).unwrap();
        assert_eq!(result.accounts.len(), 1);
    }

    #[test]
    fn test_periods_sorted_descending() {
        let a = source(
            "a",
            &["FY2021", "FY2023"],
            vec![item(
                "Revenue",
                None,
                &[("FY2021", "1"), ("FY2023", "3")],
            )],
        );
        let b = source(
            "b",
            &["Year Ended 2022"],
            vec![item("Revenue", None, &[("Year Ended 2022", "2")])],
        );

        let consolidator = StatementConsolidator::new(StatementType::IncomeStatement);
        let result = consolidator.consolidate(&[a, b]).unwrap();
        assert_eq!(result.periods, vec!["2023", "2022", "2021"]);
    }

    #[test]
    fn test_single_source_is_pass_through() {
        let items = vec![
            item("Revenue", None, &[("2024", "1,000")]),
            item("Interest income", None, &[("2024", "25")]),
        ];
        let consolidator = StatementConsolidator::new(StatementType::IncomeStatement);
        let result = consolidator
            .consolidate(&[source("only", &["2024"], items)])
            .unwrap();

        assert_eq!(result.periods, vec!["2024"]);
        assert_eq!(result.accounts.len(), 2);
        assert_eq!(result.accounts[0].canonical_name, "Revenue");
        assert_eq!(result.accounts[0].values["2024"], "1,000");
        assert_eq!(result.accounts[1].canonical_name, "Interest income");
        for account in &result.accounts {
            assert_eq!(account.merged_from.len(), 1);
            assert_eq!(account.merged_from[0].source_id, "only");
        }
    }

    #[test]
    fn test_first_value_wins_on_year_conflict() {
        let a = source("a", &["2022"], vec![item("Revenue", None, &[("2022", "100")])]);
        let b = source("b", &["2022"], vec![item("Revenue", None, &[("2022", "101")])]);

        let consolidator = StatementConsolidator::new(StatementType::IncomeStatement);
        let result = consolidator.consolidate(&[a, b]).unwrap();
        assert_eq!(result.accounts[0].values["2022"], "100");
    }

    #[test]
    fn test_provenance_records_every_origin() {
        let a = source(
            "doc-a",
            &["2022"],
            vec![item("Total operating expenses", None, &[("2022", "10")])],
        );
        let b = source(
            "doc-b",
            &["2023"],
            vec![item("Operating expenses", None, &[("2023", "11")])],
        );

        let consolidator = StatementConsolidator::new(StatementType::IncomeStatement);
        let result = consolidator.consolidate(&[a, b]).unwrap();

        assert_eq!(result.merge_summary.len(), 1);
        let record = &result.merge_summary[0];
        assert_eq!(record.consolidated_name, "Operating expenses");
        assert_eq!(
            record.merged_from,
            vec![
                MergeOrigin {
                    original_name: "Total operating expenses".to_string(),
                    source_id: "doc-a".to_string(),
                },
                MergeOrigin {
                    original_name: "Operating expenses".to_string(),
                    source_id: "doc-b".to_string(),
                },
            ]
        );
    }
}
