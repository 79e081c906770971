use crate::error::{FinStatError, Result};

/// Best-effort numeric coercion used while classifying rows.
///
/// Strips `$`, thousands separators, and surrounding whitespace; a value
/// wrapped in parentheses is negative. Returns `None` both for empty cells
/// and for text that is not a number; during row classification either one
/// simply means "no value".
pub fn coerce_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (body, negated) = strip_parentheses(trimmed);
    let cleaned: String = body
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .map(|n| if negated { -n } else { n })
}

/// Public numeric-extraction entry point.
///
/// Unlike [`coerce_number`], a value that fails to parse is an error here;
/// an empty or whitespace-only value is still "no value", not zero and not
/// an error.
pub fn parse_amount(raw: &str) -> Result<Option<f64>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    match coerce_number(raw) {
        Some(n) => Ok(Some(n)),
        None => Err(FinStatError::InvalidNumber(raw.to_string())),
    }
}

fn strip_parentheses(value: &str) -> (&str, bool) {
    if value.len() >= 2 && value.starts_with('(') && value.ends_with(')') {
        (&value[1..value.len() - 1], true)
    } else {
        (value, false)
    }
}
