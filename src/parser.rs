// Layout table - maps bank CSV header signatures onto the canonical row shape
// Supporting another bank export means adding one LayoutRule entry to LAYOUTS.

use crate::error::{Result, TriageError};
use crate::rows::{CanonicalRow, DisplayWidths};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Category given to rows whose source has no category column
pub const DEFAULT_CATEGORY: &str = "Food";

const US_DATE: &str = "%m/%d/%Y";
const ISO_DATE: &str = "%Y-%m-%d";

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceLayout - the closed set of recognized export layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLayout {
    /// `Date,Description,Amount`, charges positive
    Basic,
    /// Capital One card: separate debit and credit columns
    CapitalOne,
    /// Chase checking account
    ChaseChecking,
    /// Chase credit card
    ChaseCard,
}

impl SourceLayout {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceLayout::Basic => "Date/Description/Amount",
            SourceLayout::CapitalOne => "Capital One card",
            SourceLayout::ChaseChecking => "Chase checking",
            SourceLayout::ChaseCard => "Chase card",
        }
    }

    /// The extraction rule for this layout
    pub fn rule(&self) -> &'static LayoutRule {
        match self {
            SourceLayout::Basic => &BASIC,
            SourceLayout::CapitalOne => &CAPITAL_ONE,
            SourceLayout::ChaseChecking => &CHASE_CHECKING,
            SourceLayout::ChaseCard => &CHASE_CARD,
        }
    }
}

/// Where the canonical category comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    Column(usize),
    Default(&'static str),
}

/// Where the canonical amount comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSource {
    /// One signed column; `negate` flips charge-positive sources to debit-negative
    Signed { column: usize, negate: bool },
    /// Debit column if filled (negated), otherwise the credit column as-is
    DebitCredit { debit: usize, credit: usize },
}

/// Extraction rule for one header signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRule {
    pub layout: SourceLayout,
    /// Header row joined with commas, compared verbatim
    pub header: &'static str,
    pub date_column: usize,
    pub date_format: &'static str,
    pub description_column: usize,
    pub category: CategorySource,
    pub amount: AmountSource,
}

impl LayoutRule {
    /// Smallest row width that holds every column this rule reads
    pub fn min_columns(&self) -> usize {
        let mut columns = vec![self.date_column, self.description_column];
        if let CategorySource::Column(c) = self.category {
            columns.push(c);
        }
        match self.amount {
            AmountSource::Signed { column, .. } => columns.push(column),
            AmountSource::DebitCredit { debit, credit } => {
                columns.push(debit);
                columns.push(credit);
            }
        }
        columns.into_iter().max().unwrap_or(0) + 1
    }
}

const BASIC: LayoutRule = LayoutRule {
    layout: SourceLayout::Basic,
    header: "Date,Description,Amount",
    date_column: 0,
    date_format: US_DATE,
    description_column: 1,
    category: CategorySource::Default(DEFAULT_CATEGORY),
    amount: AmountSource::Signed {
        column: 2,
        negate: true,
    },
};

// Capital One already exports ISO dates
const CAPITAL_ONE: LayoutRule = LayoutRule {
    layout: SourceLayout::CapitalOne,
    header: "Transaction Date,Posted Date,Card No.,Description,Category,Debit,Credit",
    date_column: 0,
    date_format: ISO_DATE,
    description_column: 3,
    category: CategorySource::Column(4),
    amount: AmountSource::DebitCredit {
        debit: 5,
        credit: 6,
    },
};

const CHASE_CHECKING: LayoutRule = LayoutRule {
    layout: SourceLayout::ChaseChecking,
    header: "Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #",
    date_column: 1,
    date_format: US_DATE,
    description_column: 2,
    category: CategorySource::Default(DEFAULT_CATEGORY),
    amount: AmountSource::Signed {
        column: 3,
        negate: false,
    },
};

const CHASE_CARD: LayoutRule = LayoutRule {
    layout: SourceLayout::ChaseCard,
    header: "Transaction Date,Post Date,Description,Category,Type,Amount,Memo",
    date_column: 0,
    date_format: US_DATE,
    description_column: 2,
    category: CategorySource::Column(3),
    amount: AmountSource::Signed {
        column: 5,
        negate: false,
    },
};

/// Every recognized layout, consulted in order by `detect_layout`
pub const LAYOUTS: &[LayoutRule] = &[BASIC, CAPITAL_ONE, CHASE_CHECKING, CHASE_CARD];

// ============================================================================
// DETECTION
// ============================================================================

/// Join header cells into the signature used for layout lookup.
///
/// A UTF-8 byte-order mark on the first cell is dropped.
pub fn header_signature<'a, I>(cells: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = cells.into_iter().collect::<Vec<_>>().join(",");
    joined.trim_start_matches('\u{feff}').to_string()
}

/// Find the layout whose header matches exactly (case and punctuation sensitive)
pub fn detect_layout(header: &str) -> Result<SourceLayout> {
    LAYOUTS
        .iter()
        .find(|rule| rule.header == header)
        .map(|rule| rule.layout)
        .ok_or_else(|| TriageError::UnsupportedLayout {
            header: header.to_string(),
        })
}

// ============================================================================
// FORMATTING
// ============================================================================

/// Normalize one raw CSV row of `layout` into a canonical row
pub fn format_row(
    fields: &[&str],
    layout: SourceLayout,
    widths: DisplayWidths,
) -> Result<CanonicalRow> {
    let rule = layout.rule();
    let needed = rule.min_columns();
    if fields.len() < needed {
        return Err(TriageError::MalformedRow {
            expected: needed,
            found: fields.len(),
        });
    }

    let date = parse_date(fields[rule.date_column], rule.date_format)?;
    let description = fields[rule.description_column];
    let category = match rule.category {
        CategorySource::Column(c) => fields[c],
        CategorySource::Default(name) => name,
    };
    let amount = match rule.amount {
        AmountSource::Signed { column, negate } => {
            let value = parse_amount(fields[column])?;
            if negate {
                -value
            } else {
                value
            }
        }
        AmountSource::DebitCredit { debit, credit } => {
            if fields[debit].trim().is_empty() {
                parse_amount(fields[credit])?
            } else {
                -parse_amount(fields[debit])?
            }
        }
    };

    Ok(CanonicalRow::new(date, description, category, amount, widths))
}

pub fn parse_date(value: &str, format: &'static str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), format).map_err(|_| TriageError::MalformedDate {
        value: value.to_string(),
        expected: format,
    })
}

/// Parse an amount such as `12.50`, `-$1,200.00` or `$4`
pub fn parse_amount(value: &str) -> Result<Decimal> {
    let malformed = || TriageError::MalformedAmount {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let digits = rest.strip_prefix('$').unwrap_or(rest).replace(',', "");
    if digits.is_empty() || digits.starts_with('-') || digits.starts_with('+') {
        return Err(malformed());
    }

    let parsed = Decimal::from_str(&digits).map_err(|_| malformed())?;
    Ok(if negative { -parsed } else { parsed })
}

// ============================================================================
// TESTS
// ============================================================================
