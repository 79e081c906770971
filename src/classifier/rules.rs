use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::types::StatementType;

/// Calibration parameters for page scoring.
///
/// The defaults are empirically tuned and carried as-is; changing them
/// without a labeled validation set will shift classification behavior in
/// ways that are hard to predict.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Weight of one content-indicator hit.
    pub content_weight: f64,
    /// Weight of one structure-indicator hit.
    pub structure_weight: f64,
    /// Score floor granted to any page that survives validation.
    pub base_score: f64,
    /// Fixed boost when the header band carries the canonical
    /// "CONSOLIDATED STATEMENT(S) OF <TYPE>" phrase.
    pub header_boost: f64,
    /// Below this confidence a page is reported as `Unknown`.
    pub unknown_floor: f64,
    /// Confidence the surrounding pipeline treats as "good enough".
    pub quality_gate: f64,
    /// Pages matching more negative indicators than this are rejected.
    pub max_negative_matches: usize,
    /// Tie-break bonus for pages inside `statement_page_range`.
    pub positional_bonus: f64,
    /// 1-based page range where primary statements typically live.
    pub statement_page_range: (usize, usize),
    /// Lines of page text used as the header band when no header source is
    /// supplied.
    pub header_fallback_lines: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            content_weight: 0.05,
            structure_weight: 0.1,
            base_score: 0.3,
            header_boost: 0.5,
            unknown_floor: 0.2,
            quality_gate: 0.7,
            max_negative_matches: 3,
            positional_bonus: 0.1,
            statement_page_range: (35, 50),
            header_fallback_lines: 8,
        }
    }
}

/// Pattern groups and thresholds for one statement type. Pure data.
pub struct TypeRules {
    /// Broad, low-precision discovery patterns; any single hit makes the
    /// page a candidate. Intentionally over-inclusive.
    pub primary: Vec<Regex>,
    /// Type-specific secondary indicators.
    pub content: Vec<Regex>,
    /// Structural indicators (units captions, period captions, columns).
    pub structure: Vec<Regex>,
    /// Narrative/MD&A phrasing that argues against a statement page.
    pub negative: Vec<Regex>,
    /// At least one of these must match for the page to score at all.
    pub required: Vec<Regex>,
    /// Minimum content-indicator hits for a valid page of this type.
    pub min_content_matches: usize,
    /// Canonical title phrase for the header-band boost.
    pub header: Regex,
}

impl TypeRules {
    pub fn count_matches(patterns: &[Regex], text: &str) -> usize {
        patterns.iter().filter(|p| p.is_match(text)).count()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static rule pattern must compile"))
        .collect()
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static rule pattern must compile")
}

/// Narrative phrasing shared by every type's negative group. All patterns run
/// against NFKC-normalized, lowercased page text.
const NEGATIVE_PATTERNS: [&str; 7] = [
    r"(?:increased|decreased)\s+(?:by\s+)?\$?\d+(?:\.\d+)?",
    r"\d+(?:\.\d+)?%\s+(?:increase|decrease)",
    r"driven by",
    r"primarily due to",
    r"see item\s+\d+",
    r"refer to (?:item|part)\s",
    r"discussion and analysis",
];

static RULES: Lazy<BTreeMap<StatementType, TypeRules>> = Lazy::new(|| {
    let mut map = BTreeMap::new();

    map.insert(
        StatementType::IncomeStatement,
        TypeRules {
            primary: compile(&[
                r"statements? of (?:income|operations|earnings)",
                r"income statements?",
                r"\brevenues?\b",
                r"net income",
            ]),
            content: compile(&[
                r"net (?:revenues?|sales)",
                r"cost of (?:revenues?|sales|goods sold)",
                r"gross profit",
                r"operating expenses",
                r"research and development",
                r"selling, general and administrative",
                r"operating income",
                r"(?:provision|benefit) for income taxes|income tax (?:expense|provision)",
                r"interest (?:expense|income)",
                r"earnings per share",
                r"weighted[- ]average (?:number of )?shares",
                r"\bdiluted\b",
            ]),
            structure: compile(&[
                r"\(in (?:thousands|millions)",
                r"(?:years?|quarters?|periods?) ended",
                r"per share",
                r"(?m)(?:19|20)\d{2}\s+(?:19|20)\d{2}",
            ]),
            negative: compile(&NEGATIVE_PATTERNS),
            required: compile(&[r"\brevenues?\b|net sales|statements? of (?:income|operations)"]),
            min_content_matches: 4,
            header: re(r"consolidated statements? of (?:income|operations|earnings)"),
        },
    );

    map.insert(
        StatementType::BalanceSheet,
        TypeRules {
            primary: compile(&[
                r"balance sheets?",
                r"statements? of financial position",
            ]),
            content: compile(&[
                r"total assets",
                r"total liabilities",
                r"(?:stockholders|shareholders)['\u{2019}]? equity",
                r"cash and cash equivalents",
                r"accounts receivable",
                r"\binventories\b",
                r"property(?:, plant)? and equipment",
                r"\bgoodwill\b",
                r"accounts payable",
                r"accrued (?:liabilities|expenses)",
                r"retained earnings",
                r"long-term debt",
            ]),
            structure: compile(&[
                r"\(in (?:thousands|millions)",
                r"(?:december|march|june|september)\s+\d{1,2},?\s+(?:19|20)\d{2}",
                r"\bas of\b",
                r"\$\s*[\d,]+",
            ]),
            negative: compile(&NEGATIVE_PATTERNS),
            required: compile(&[r"total assets|balance sheets?"]),
            min_content_matches: 3,
            header: re(r"consolidated (?:balance sheets?|statements? of financial position)"),
        },
    );

    // The cash-flow floor is zero: its strongest signals are the header
    // boost and the activity-section markers alone.
    map.insert(
        StatementType::CashFlow,
        TypeRules {
            primary: compile(&[r"cash flows?"]),
            content: compile(&[
                r"operating activities",
                r"investing activities",
                r"financing activities",
                r"depreciation and amortization",
                r"net cash (?:provided by|used in)",
                r"proceeds from",
                r"payments? (?:for|of|on)",
                r"purchases? of property",
                r"cash and cash equivalents at (?:beginning|end)",
            ]),
            structure: compile(&[
                r"\(in (?:thousands|millions)",
                r"(?:years?|periods?) ended",
                r"supplemental (?:cash flow )?disclosures?",
            ]),
            negative: compile(&NEGATIVE_PATTERNS),
            required: compile(&[r"cash flows?"]),
            min_content_matches: 0,
            header: re(r"consolidated statements? of cash flows?"),
        },
    );

    map.insert(
        StatementType::ComprehensiveIncome,
        TypeRules {
            primary: compile(&[r"comprehensive income"]),
            content: compile(&[
                r"other comprehensive income",
                r"foreign currency translation",
                r"unrealized (?:gains?|losses?)",
                r"(?:cash flow )?hedges?",
                r"reclassification adjustments?",
                r"\bpension\b",
            ]),
            structure: compile(&[
                r"\(in (?:thousands|millions)",
                r"(?:years?|periods?) ended",
            ]),
            negative: compile(&NEGATIVE_PATTERNS),
            required: compile(&[r"comprehensive income"]),
            min_content_matches: 1,
            header: re(r"consolidated statements? of comprehensive income"),
        },
    );

    map.insert(
        StatementType::ShareholdersEquity,
        TypeRules {
            primary: compile(&[r"(?:shareholders|stockholders)['\u{2019}]? equity"]),
            content: compile(&[
                r"common stock",
                r"additional paid-?in capital",
                r"retained earnings",
                r"treasury stock",
                r"accumulated other comprehensive",
                r"dividends declared",
                r"repurchases? of common stock",
                r"balance at",
            ]),
            structure: compile(&[
                r"\(in (?:thousands|millions)",
                r"shares\s+amount",
            ]),
            negative: compile(&NEGATIVE_PATTERNS),
            required: compile(&[r"(?:shareholders|stockholders)['\u{2019}]? equity"]),
            min_content_matches: 2,
            header: re(
                r"consolidated statements? of (?:changes in )?(?:shareholders|stockholders)['\u{2019}]? equity",
            ),
        },
    );

    map
});

pub struct RuleTable;

impl RuleTable {
    /// The rule set for one statement type. `Unknown` has no rules.
    pub fn for_type(ty: StatementType) -> Option<&'static TypeRules> {
        RULES.get(&ty)
    }

    /// Statement types that carry rules, in deterministic order.
    pub fn classified_types() -> impl Iterator<Item = StatementType> {
        RULES.keys().copied()
    }
}
