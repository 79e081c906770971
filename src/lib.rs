//! Core engine for turning extracted document text into multi-period
//! financial statements.
//!
//! Three stages, each a synchronous pure function over in-memory data:
//! classify pages by statement type ([`classifier::PageClassifier`]), parse
//! the re-extracted table text of classified pages into typed line items
//! ([`parser::TableParser`]), and merge parsed statements from several source
//! documents into one consolidated statement with a full merge audit trail
//! ([`consolidator::StatementConsolidator`]).
//!
//! The crate performs no I/O. Text extraction, page rendering, spreadsheet
//! output and persistence are external collaborators; this library only
//! defines the data contract they exchange.

pub mod classifier;
pub mod consolidator;
pub mod error;
pub mod parser;
pub mod types;

// Re-exports
pub use classifier::{Classification, HeaderSource, PageClassifier, RuleTable, ScoringConfig};
pub use consolidator::{normalize_year, NameSimilarity, StatementConsolidator};
pub use error::{FinStatError, Result};
pub use parser::{coerce_number, parse_amount, TableParser};
pub use types::{
    ClassifiedPage, ConsolidatedAccount, ConsolidatedStatement, LineItem, MergeOrigin,
    MergeRecord, ParsedStatement, SourceStatement, StatementType,
};
