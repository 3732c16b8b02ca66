// Row model shared by the unsorted and approved lists
// Rows are tagged instead of being plain strings, so header/separator framing
// is recognized by variant, never by sniffing a rendered prefix.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::ops::Index;

// ============================================================================
// DISPLAY WIDTHS
// ============================================================================

/// Separator placed between fixed-width columns of a rendered row
pub const FIELD_SEPARATOR: &str = " | ";

/// Canonical dates are always `YYYY-MM-DD`
pub const DATE_WIDTH: usize = 10;

const AMOUNT_WIDTH: usize = 11;

/// Display widths chosen at ingestion time.
///
/// Descriptions and categories are fitted to these widths once, when the row is
/// created; the shell uses the same values to render aligned columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayWidths {
    pub desc_len: usize,
    pub cat_len: usize,
}

impl DisplayWidths {
    pub fn new(desc_len: usize, cat_len: usize) -> Self {
        DisplayWidths { desc_len, cat_len }
    }
}

impl Default for DisplayWidths {
    fn default() -> Self {
        DisplayWidths::new(50, 20)
    }
}

/// Pad `text` with trailing spaces to `width`, or truncate it to `width`.
///
/// Widths count characters, not bytes. Overflow is cut, never wrapped.
pub fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count < width {
        let mut out = String::with_capacity(text.len() + width - count);
        out.push_str(text);
        out.extend(std::iter::repeat(' ').take(width - count));
        out
    } else {
        text.chars().take(width).collect()
    }
}

/// Format an amount with exactly two fractional digits.
///
/// A zero (including a negated zero) always renders as `0.00`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    if rounded.is_zero() {
        return "0.00".to_string();
    }
    format!("{:.2}", rounded)
}

// ============================================================================
// CANONICAL ROW
// ============================================================================

/// One normalized transaction: date, description, category, amount.
///
/// Sign convention: debits are negative, credits positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRow {
    date: NaiveDate,
    description: String,
    category: String,
    amount: Decimal,
}

impl CanonicalRow {
    /// Build a row, fitting description and category to `widths`
    pub fn new(
        date: NaiveDate,
        description: &str,
        category: &str,
        amount: Decimal,
        widths: DisplayWidths,
    ) -> Self {
        CanonicalRow {
            date,
            description: fit(description, widths.desc_len),
            category: fit(category, widths.cat_len),
            amount,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The date as `YYYY-MM-DD`; lexicographic order equals chronological order
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Fixed-width description, including padding
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Fixed-width category, including padding
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn amount_text(&self) -> String {
        format_amount(self.amount)
    }

    /// Replace the category, re-fitted to `cat_len`.
    ///
    /// Returns false (and leaves the row byte-identical) when the trimmed
    /// category already equals the new one.
    pub fn set_category(&mut self, category: &str, cat_len: usize) -> bool {
        let fitted = fit(category, cat_len);
        if self.category.trim_end() == fitted.trim_end() {
            return false;
        }
        self.category = fitted;
        true
    }

    /// Fixed-width columns joined with `" | "`
    pub fn render(&self) -> String {
        [
            self.date_key(),
            self.description.clone(),
            self.category.clone(),
            self.amount_text(),
        ]
        .join(FIELD_SEPARATOR)
    }
}

// ============================================================================
// ROWS AND ROW LISTS
// ============================================================================

/// An entry of a row list: framing sentinels or a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// Column titles, first row of the unsorted list
    Header,
    /// Visual break between source files
    Separator,
    /// Trailing empty row kept for the display shell; carries no data
    Blank,
    Data(CanonicalRow),
}

impl Row {
    /// Sentinels are never moved or re-categorized
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Row::Data(_))
    }

    pub fn as_data(&self) -> Option<&CanonicalRow> {
        match self {
            Row::Data(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_data_mut(&mut self) -> Option<&mut CanonicalRow> {
        match self {
            Row::Data(row) => Some(row),
            _ => None,
        }
    }

    pub fn render(&self, widths: DisplayWidths) -> String {
        match self {
            Row::Header => [
                fit("Date", DATE_WIDTH),
                fit("Description", widths.desc_len),
                fit("Category", widths.cat_len),
                "Amount".to_string(),
            ]
            .join(FIELD_SEPARATOR),
            Row::Separator => [
                "-".repeat(DATE_WIDTH),
                "-".repeat(widths.desc_len),
                "-".repeat(widths.cat_len),
                "-".repeat(AMOUNT_WIDTH),
            ]
            .join("-|-"),
            Row::Blank => String::new(),
            Row::Data(row) => row.render(),
        }
    }
}

/// Ordered rows as shown in one pane: data rows plus framing sentinels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowList {
    rows: Vec<Row>,
}

impl RowList {
    pub fn new() -> Self {
        RowList { rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &CanonicalRow> {
        self.rows.iter().filter_map(Row::as_data)
    }

    /// Number of rows excluding sentinels
    pub fn data_len(&self) -> usize {
        self.data_rows().count()
    }

    /// Drop the trailing blank row if present. Returns whether one was removed.
    pub fn strip_trailing_blank(&mut self) -> bool {
        if matches!(self.rows.last(), Some(Row::Blank)) {
            self.rows.pop();
            true
        } else {
            false
        }
    }

    /// Rendered lines, one per row, for fixed-width display
    pub fn render_lines(&self, widths: DisplayWidths) -> Vec<String> {
        self.rows.iter().map(|row| row.render(widths)).collect()
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }
}

impl Index<usize> for RowList {
    type Output = Row;

    fn index(&self, index: usize) -> &Row {
        &self.rows[index]
    }
}

impl From<Vec<Row>> for RowList {
    fn from(rows: Vec<Row>) -> Self {
        RowList { rows }
    }
}

impl FromIterator<Row> for RowList {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        RowList {
            rows: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
