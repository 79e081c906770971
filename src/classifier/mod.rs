use itertools::Itertools;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization;

use crate::types::{ClassifiedPage, StatementType};

pub mod rules;

pub use rules::{RuleTable, ScoringConfig, TypeRules};

/// Supplies the text of a page's top header band (the title region, roughly
/// the top 120 units of the page's coordinate space). Implemented by the
/// page-rendering collaborator; when absent the classifier falls back to the
/// first lines of the page text.
pub trait HeaderSource {
    fn header_text(&self, page_index: usize) -> Option<String>;
}

/// The classifier's output: per-page detail plus the page map handed to the
/// targeted re-extraction collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub pages: Vec<ClassifiedPage>,
    pub by_type: BTreeMap<StatementType, Vec<usize>>,
    /// Confidence threshold the surrounding pipeline treats as reliable.
    pub quality_gate: f64,
}

impl Classification {
    pub fn pages_for(&self, ty: StatementType) -> &[usize] {
        self.by_type.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Highest confidence among this type's accepted pages.
    pub fn confidence_for(&self, ty: StatementType) -> Option<f64> {
        self.pages
            .iter()
            .filter(|p| p.statement_type == ty)
            .map(|p| p.confidence)
            .fold(None, |acc, c| Some(acc.map_or(c, |a: f64| a.max(c))))
    }

    /// Whether this type was classified confidently enough for the pipeline
    /// to proceed without flagging for review.
    pub fn meets_quality_gate(&self, ty: StatementType) -> bool {
        self.confidence_for(ty)
            .map(|c| c >= self.quality_gate)
            .unwrap_or(false)
    }
}

// Table-of-contents and footnote-page detection, shared across types.
static DOT_LEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\.{2,}\s*\d{1,4}\s*$").unwrap());
static ELLIPSIS_LEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}").unwrap());
static TOC_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"table of contents").unwrap());
static ITEM_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*item\s+\d+[a-z]?\s*[.:]").unwrap());
static PART_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*part\s+(?:iv|i{1,3})\b").unwrap());
static TRAILING_PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\s\d{1,3}\s*$").unwrap());
static CONSOLIDATED_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"consolidated (?:balance|statements?)").unwrap());
static SEE_NOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"see note\s+\d+").unwrap());
static REFER_NOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"refer to the notes").unwrap());

/// How many dot-leader lines mark a page as a contents/index page outright.
const DOT_LEADER_PAGE_THRESHOLD: usize = 3;

#[derive(Debug)]
struct PageCandidate {
    page_index: usize,
    statement_type: StatementType,
    confidence: f64,
}

/// Classifies document pages by financial-statement type in three phases:
/// broad candidate discovery, validation with RuleTable scoring, and
/// document-wide ambiguity resolution. Deterministic throughout.
pub struct PageClassifier {
    config: ScoringConfig,
}

impl Default for PageClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PageClassifier {
    pub fn new() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Classify using the first lines of each page as its header band.
    pub fn classify(&self, pages: &[String]) -> Classification {
        self.run(pages, None)
    }

    /// Classify with header-band text supplied by the page-rendering
    /// collaborator.
    pub fn classify_with_headers(
        &self,
        pages: &[String],
        headers: &dyn HeaderSource,
    ) -> Classification {
        self.run(pages, Some(headers))
    }

    fn run(&self, pages: &[String], headers: Option<&dyn HeaderSource>) -> Classification {
        let normalized: Vec<String> = pages.iter().map(|p| normalize(p)).collect();
        let header_bands: Vec<String> = pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let band = headers
                    .and_then(|h| h.header_text(i))
                    .unwrap_or_else(|| fallback_header(page, self.config.header_fallback_lines));
                normalize(&band)
            })
            .collect();

        let candidates = self.discover(&normalized);
        debug!("discovery produced {} candidates", candidates.len());

        let scored = self.validate(&candidates, &normalized, &header_bands);
        debug!("{} candidates survived validation", scored.len());

        let accepted = self.resolve(scored);

        let mut pages_out: Vec<ClassifiedPage> = accepted
            .into_iter()
            .map(|c| {
                let statement_type = if c.confidence < self.config.unknown_floor {
                    StatementType::Unknown
                } else {
                    c.statement_type
                };
                ClassifiedPage {
                    page_index: c.page_index,
                    statement_type,
                    confidence: c.confidence,
                }
            })
            .collect();
        pages_out.sort_by_key(|p| (p.page_index, p.statement_type));

        let mut by_type: BTreeMap<StatementType, Vec<usize>> = BTreeMap::new();
        for page in &pages_out {
            if page.statement_type != StatementType::Unknown {
                by_type
                    .entry(page.statement_type)
                    .or_default()
                    .push(page.page_index);
            }
        }

        for (ty, indices) in &by_type {
            info!("{}: pages {:?}", ty, indices);
        }

        Classification {
            pages: pages_out,
            by_type,
            quality_gate: self.config.quality_gate,
        }
    }

    /// Phase 1: any single broad-pattern hit makes the page a candidate.
    /// Over-inclusive on purpose; validation does the pruning.
    fn discover(&self, normalized: &[String]) -> Vec<(usize, StatementType)> {
        let mut candidates = Vec::new();
        for (page_index, text) in normalized.iter().enumerate() {
            for ty in RuleTable::classified_types() {
                let rules = RuleTable::for_type(ty).expect("classified type has rules");
                if rules.primary.iter().any(|p| p.is_match(text)) {
                    candidates.push((page_index, ty));
                }
            }
        }
        candidates
    }

    /// Phase 2: reject contents/footnote pages, then score the survivors.
    fn validate(
        &self,
        candidates: &[(usize, StatementType)],
        normalized: &[String],
        header_bands: &[String],
    ) -> Vec<PageCandidate> {
        let rejected_pages: Vec<bool> = normalized
            .iter()
            .enumerate()
            .map(|(i, text)| {
                if is_contents_page(text) {
                    debug!("page {} rejected: table of contents / index", i);
                    true
                } else if is_footnote_page(text) {
                    debug!("page {} rejected: footnote references", i);
                    true
                } else {
                    false
                }
            })
            .collect();

        candidates
            .iter()
            .filter(|(page_index, _)| !rejected_pages[*page_index])
            .filter_map(|&(page_index, ty)| {
                let rules = RuleTable::for_type(ty).expect("classified type has rules");
                self.score_page(rules, &normalized[page_index], &header_bands[page_index])
                    .map(|confidence| PageCandidate {
                        page_index,
                        statement_type: ty,
                        confidence,
                    })
                    .or_else(|| {
                        debug!("page {} rejected for {}", page_index, ty);
                        None
                    })
            })
            .collect()
    }

    /// Score one surviving candidate page, or reject it outright.
    fn score_page(&self, rules: &TypeRules, text: &str, header_band: &str) -> Option<f64> {
        if TypeRules::count_matches(&rules.primary, text) == 0 {
            return None;
        }
        if TypeRules::count_matches(&rules.negative, text) > self.config.max_negative_matches {
            return None;
        }
        if TypeRules::count_matches(&rules.required, text) < 1 {
            return None;
        }
        let content = TypeRules::count_matches(&rules.content, text);
        if content < rules.min_content_matches {
            return None;
        }
        let structure = TypeRules::count_matches(&rules.structure, text);
        let header_hit = rules.header.is_match(header_band);
        Some(compute_confidence(&self.config, content, structure, header_hit))
    }

    /// Phase 3: per-type ambiguity resolution across the document.
    fn resolve(&self, scored: Vec<PageCandidate>) -> Vec<PageCandidate> {
        let grouped = scored
            .into_iter()
            .map(|c| (c.statement_type, c))
            .into_group_map();

        let mut accepted = Vec::new();
        for (ty, mut group) in grouped {
            group.sort_by_key(|c| c.page_index);
            if group.len() == 1 {
                accepted.extend(group);
                continue;
            }

            // A cash-flow statement often continues onto the next page for
            // its supplemental disclosures; keep both pages of the first
            // consecutive pair instead of picking one.
            if ty == StatementType::CashFlow {
                if let Some(i) = (0..group.len() - 1)
                    .find(|&i| group[i + 1].page_index == group[i].page_index + 1)
                {
                    debug!(
                        "cash flow spans consecutive pages {} and {}",
                        group[i].page_index,
                        group[i + 1].page_index
                    );
                    let second = group.swap_remove(i + 1);
                    let first = group.swap_remove(i);
                    accepted.push(first);
                    accepted.push(second);
                    continue;
                }
            }

            let best = group
                .into_iter()
                .max_by(|a, b| {
                    let ka = self.comparison_key(a);
                    let kb = self.comparison_key(b);
                    ka.partial_cmp(&kb)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        // Equal keys resolve to the earlier page.
                        .then(b.page_index.cmp(&a.page_index))
                })
                .expect("group is non-empty");
            debug!(
                "{} resolved to page {} (confidence {:.2})",
                ty, best.page_index, best.confidence
            );
            accepted.push(best);
        }
        accepted
    }

    /// Confidence with the positional tie-break bonus applied for pages
    /// inside the typical statement-section range. The bonus only affects
    /// comparison, never the reported confidence.
    fn comparison_key(&self, candidate: &PageCandidate) -> f64 {
        let page_number = candidate.page_index + 1;
        let (lo, hi) = self.config.statement_page_range;
        if (lo..=hi).contains(&page_number) {
            candidate.confidence + self.config.positional_bonus
        } else {
            candidate.confidence
        }
    }
}

pub(crate) fn compute_confidence(
    config: &ScoringConfig,
    content_matches: usize,
    structure_matches: usize,
    header_hit: bool,
) -> f64 {
    let mut score = (content_matches as f64 * config.content_weight
        + structure_matches as f64 * config.structure_weight
        + config.base_score)
        .min(1.0);
    if header_hit {
        score = (score + config.header_boost).min(1.0);
    }
    score
}

fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

fn fallback_header(page: &str, lines: usize) -> String {
    page.lines().take(lines).collect::<Vec<_>>().join("\n")
}

fn is_contents_page(text: &str) -> bool {
    if DOT_LEADER.find_iter(text).count() >= DOT_LEADER_PAGE_THRESHOLD {
        return true;
    }
    if TOC_HEADING.is_match(text) && !CONSOLIDATED_PHRASE.is_match(text) {
        let signals = [
            ELLIPSIS_LEADER.is_match(text),
            TRAILING_PAGE_NUMBER.is_match(text),
            ITEM_MARKER.is_match(text),
            PART_MARKER.is_match(text),
        ]
        .iter()
        .filter(|s| **s)
        .count();
        return signals >= 2;
    }
    false
}

fn is_footnote_page(text: &str) -> bool {
    SEE_NOTE.find_iter(text).count() > 3 || REFER_NOTES.find_iter(text).count() > 1
}
