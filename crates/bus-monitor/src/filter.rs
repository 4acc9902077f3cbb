//! Per-column row filtering
//!
//! Each column may carry one textual predicate; all active predicates must
//! match for a row to be visible.
//!
//! | Column    | Syntax                                   | Match                                   |
//! |-----------|------------------------------------------|-----------------------------------------|
//! | Name      | any text                                 | case-insensitive substring              |
//! | Address   | hex digits, optional `0x`                | exact or prefix of the uppercase hex    |
//! | Data      | hex digits, whitespace ignored           | substring of the uppercase hex payload  |
//! | Source    | `N`, `A-B`, `>=N`, `<=N`, `>N`, `<N`     | `N` means equality                      |
//! | Count     | same as Source                           | `N` means equality                      |
//! | Frequency | same as Source                           | `N` means "at least N" frames/second    |
//!
//! Numeric text that does not parse falls back to a substring match on the
//! formatted value.

use std::collections::BTreeMap;

use crate::row::{Column, RowSnapshot};

/// Numeric constraint
#[derive(Debug, Clone, Copy, PartialEq)]
enum NumericMatch {
    Equal(f64),
    AtLeast(f64),
    AtMost(f64),
    Above(f64),
    Below(f64),
    Between(f64, f64),
}

impl NumericMatch {
    fn parse(text: &str, column: Column) -> Option<Self> {
        let number = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());

        if let Some(rest) = text.strip_prefix(">=") {
            return number(rest).map(Self::AtLeast);
        }
        if let Some(rest) = text.strip_prefix("<=") {
            return number(rest).map(Self::AtMost);
        }
        if let Some(rest) = text.strip_prefix('>') {
            return number(rest).map(Self::Above);
        }
        if let Some(rest) = text.strip_prefix('<') {
            return number(rest).map(Self::Below);
        }
        if let Some((lo, hi)) = text.split_once('-') {
            let (lo, hi) = (number(lo)?, number(hi)?);
            return Some(Self::Between(lo.min(hi), lo.max(hi)));
        }

        let value = number(text)?;
        Some(match column {
            Column::Frequency => Self::AtLeast(value),
            _ => Self::Equal(value),
        })
    }

    fn matches(&self, value: f64) -> bool {
        match *self {
            Self::Equal(v) => value == v,
            Self::AtLeast(v) => value >= v,
            Self::AtMost(v) => value <= v,
            Self::Above(v) => value > v,
            Self::Below(v) => value < v,
            Self::Between(lo, hi) => value >= lo && value <= hi,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    /// Normalized needle for a substring match
    Contains(String),
    /// Normalized needle the column text must start with
    Prefix(String),
    Numeric(NumericMatch),
}

/// One column's filter: the text as entered and its parsed form
#[derive(Debug, Clone, PartialEq)]
struct ColumnFilter {
    text: String,
    predicate: Predicate,
}

impl ColumnFilter {
    fn parse(column: Column, text: &str) -> Self {
        let predicate = match column {
            Column::Name => Predicate::Contains(text.to_lowercase()),
            Column::Address => {
                let hex = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(text);
                Predicate::Prefix(hex.to_ascii_uppercase())
            }
            Column::Data => Predicate::Contains(
                text.chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_ascii_uppercase(),
            ),
            Column::Source | Column::Count | Column::Frequency => {
                match NumericMatch::parse(text, column) {
                    Some(numeric) => Predicate::Numeric(numeric),
                    None => Predicate::Contains(text.to_lowercase()),
                }
            }
        };

        Self {
            text: text.to_string(),
            predicate,
        }
    }

    fn matches(&self, column: Column, row: &RowSnapshot) -> bool {
        match &self.predicate {
            Predicate::Numeric(numeric) => numeric.matches(numeric_value(column, row)),
            Predicate::Contains(needle) => column_text(column, row).contains(needle.as_str()),
            Predicate::Prefix(needle) => column_text(column, row).starts_with(needle.as_str()),
        }
    }
}

fn numeric_value(column: Column, row: &RowSnapshot) -> f64 {
    match column {
        Column::Source => row.id.source as f64,
        Column::Count => row.count as f64,
        Column::Frequency => row.frequency,
        Column::Name | Column::Address | Column::Data => f64::NAN,
    }
}

/// Column value in the normalized form its needle is compared against
fn column_text(column: Column, row: &RowSnapshot) -> String {
    match column {
        Column::Name => row.name.to_lowercase(),
        Column::Source => row.id.source.to_string(),
        Column::Address => row.id.address_hex(),
        Column::Frequency => format_frequency(row.frequency),
        Column::Count => row.count.to_string(),
        Column::Data => row.data_hex(),
    }
}

/// Frequency as shown in the table
pub fn format_frequency(frequency: f64) -> String {
    if frequency <= 0.0 {
        "--".to_string()
    } else if frequency < 10.0 {
        format!("{:.2}", frequency)
    } else {
        format!("{:.0}", frequency)
    }
}

/// Set of per-column predicates, ANDed together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    columns: BTreeMap<Column, ColumnFilter>,
}

impl FilterSet {
    /// Create an empty set (matches every row)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSet::set`]
    pub fn with(mut self, column: Column, text: &str) -> Self {
        self.set(column, text);
        self
    }

    /// Set one column's filter text; blank text removes the filter
    ///
    /// Returns true if the effective filter changed.
    pub fn set(&mut self, column: Column, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return self.columns.remove(&column).is_some();
        }
        let filter = ColumnFilter::parse(column, text);
        if self.columns.get(&column) == Some(&filter) {
            return false;
        }
        self.columns.insert(column, filter);
        true
    }

    /// Remove one column's filter
    pub fn remove(&mut self, column: Column) -> bool {
        self.columns.remove(&column).is_some()
    }

    /// Remove every filter
    pub fn clear(&mut self) {
        self.columns.clear();
    }

    /// Filter text for a column, as entered (trimmed)
    pub fn get(&self, column: Column) -> Option<&str> {
        self.columns.get(&column).map(|f| f.text.as_str())
    }

    /// Columns with an active filter and their text
    pub fn iter(&self) -> impl Iterator<Item = (Column, &str)> + '_ {
        self.columns
            .iter()
            .map(|(column, filter)| (*column, filter.text.as_str()))
    }

    /// True if no column is filtered
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// True if the filter only depends on values that never change for a row
    pub fn is_static(&self) -> bool {
        self.columns
            .keys()
            .all(|column| matches!(column, Column::Source | Column::Address | Column::Name))
    }

    /// Evaluate every active predicate against a row
    pub fn matches(&self, row: &RowSnapshot) -> bool {
        self.columns
            .iter()
            .all(|(column, filter)| filter.matches(*column, row))
    }
}

/// Decide whether a row is visible under a filter set
pub fn matches(row: &RowSnapshot, filters: &FilterSet) -> bool {
    filters.matches(row)
}
