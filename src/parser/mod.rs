use log::debug;

use crate::error::{FinStatError, Result};
use crate::types::{LineItem, ParsedStatement};

pub mod numeric;

pub use numeric::{coerce_number, parse_amount};

/// Field delimiter of the re-extracted table text. Matches the pipe-separated
/// rows the targeted re-extraction collaborator emits for classified pages.
pub const FIELD_DELIMITER: char = '|';

const MAX_INDENT: u32 = 10;
const INDENT_WIDTH: usize = 4;

/// Header cells that are column labels rather than period labels.
const HEADER_STOPLIST: [&str; 3] = ["account", "description", "item"];

/// A row whose name contains any of these is a total line and closes the
/// section it belongs to.
const TOTAL_KEYWORDS: [&str; 7] = [
    "total",
    "subtotal",
    "sum",
    "net",
    "gross",
    "operating income",
    "net income",
];

/// Parses delimiter-separated table text into an ordered, hierarchical
/// [`ParsedStatement`].
///
/// The parser itself holds no state: section hierarchy is tracked in a
/// per-call context, so parses of unrelated documents can never leak
/// hierarchy into one another, including across threads.
pub struct TableParser;

impl Default for TableParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TableParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one classified region of pipe-delimited rows.
    ///
    /// Fails with [`FinStatError::NoTabularRows`] when the input contains no
    /// delimiter-separated rows; individual cells that fail numeric coercion
    /// degrade to "no value" and never abort the parse.
    pub fn parse(&self, text: &str) -> Result<ParsedStatement> {
        let rows: Vec<&str> = text
            .lines()
            .filter(|line| line.matches(FIELD_DELIMITER).count() >= 2)
            .collect();

        let Some((header, data_rows)) = rows.split_first() else {
            return Err(FinStatError::NoTabularRows);
        };

        let periods = parse_header(header);
        debug!("header row yields {} period columns: {:?}", periods.len(), periods);

        let mut sections = SectionContext::new();
        let mut line_items = Vec::new();
        let mut order: u32 = 0;

        for row in data_rows {
            let cells: Vec<&str> = row.split(FIELD_DELIMITER).collect();
            let name = cells[0].trim_end();
            if name.trim().is_empty() {
                debug!("discarding row with empty name: {:?}", row);
                continue;
            }

            let value_cells: Vec<&str> = cells[1..]
                .iter()
                .take(periods.len())
                .map(|c| c.trim())
                .collect();
            let has_numeric = value_cells.iter().any(|c| coerce_number(c).is_some());

            let lowered = name.trim().to_lowercase();
            let is_total = TOTAL_KEYWORDS.iter().any(|k| lowered.contains(k));
            // A row with no numeric value opens a section, unless its name
            // marks it as a total for a section already open.
            let is_section_header = !has_numeric && !is_total;

            let item = if is_section_header {
                let section = sections.current().cloned();
                let parent_section = sections.parent().cloned();
                sections.push(name.trim().to_string());
                debug!("section open: {:?} (depth {})", name.trim(), sections.depth());
                LineItem {
                    name: name.to_string(),
                    values: Vec::new(),
                    indent_level: sections.depth().saturating_sub(1) as u32,
                    is_section_header: true,
                    is_total: false,
                    section,
                    parent_section,
                    order,
                }
            } else {
                let values: Vec<(String, String)> = periods
                    .iter()
                    .zip(value_cells.iter())
                    .filter(|(_, v)| !v.is_empty())
                    .map(|(p, v)| (p.clone(), v.to_string()))
                    .collect();

                let leading_ws = name.chars().take_while(|c| c.is_whitespace()).count();
                let indent =
                    (sections.depth() + leading_ws / INDENT_WIDTH).min(MAX_INDENT as usize) as u32;

                let item = LineItem {
                    name: name.to_string(),
                    values,
                    indent_level: indent,
                    is_section_header: false,
                    is_total,
                    section: sections.current().cloned(),
                    parent_section: sections.parent().cloned(),
                    order,
                };
                if is_total {
                    let closed = sections.pop();
                    debug!("total line {:?} closes section {:?}", name.trim(), closed);
                }
                item
            };

            line_items.push(item);
            order += 1;
        }

        debug!(
            "parsed {} line items across {} periods",
            line_items.len(),
            periods.len()
        );
        Ok(ParsedStatement {
            periods,
            line_items,
        })
    }
}

fn parse_header(header: &str) -> Vec<String> {
    let mut cells = header.split(FIELD_DELIMITER);
    // First cell is the account/description label column, not a period.
    cells.next();
    cells
        .map(str::trim)
        .filter(|c| !c.is_empty() && !HEADER_STOPLIST.contains(&c.to_lowercase().as_str()))
        .map(String::from)
        .collect()
}

/// Explicit per-parse section hierarchy, threaded through the row loop.
struct SectionContext {
    stack: Vec<String>,
}

impl SectionContext {
    fn new() -> Self {
        Self { stack: Vec::new() }
    }

    fn current(&self) -> Option<&String> {
        self.stack.last()
    }

    fn parent(&self) -> Option<&String> {
        self.stack.len().checked_sub(2).and_then(|i| self.stack.get(i))
    }

    fn push(&mut self, name: String) {
        self.stack.push(name);
    }

    fn pop(&mut self) -> Option<String> {
        self.stack.pop()
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}
