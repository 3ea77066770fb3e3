//! Multi-symbol time alignment and normalization.
//!
//! Series are outer-joined on date. A symbol with no price on a date gets an
//! explicit missing cell, never a zero and never a forward-filled value.
//! Normalization rescales each column so its first present price reads 100.

use super::series::RawSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Date-indexed table of prices, one column per display name.
///
/// Every column has exactly `dates.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

/// Raw prices after the outer join.
pub type AlignedTable = PriceTable;

/// Prices rescaled to 100 at each column's first present value.
pub type NormalizedTable = PriceTable;

impl PriceTable {
    /// True when the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Column names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.dates.len()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Cell value; `None` when the cell is missing or the row/column is absent.
    pub fn get(&self, date: NaiveDate, name: &str) -> Option<f64> {
        let row = self.dates.binary_search(&date).ok()?;
        self.columns.get(name)?.get(row).copied().flatten()
    }

    /// Rows in date order, cells in column order.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, Vec<Option<f64>>)> + '_ {
        self.dates.iter().enumerate().map(move |(i, date)| {
            let cells = self.columns.values().map(|c| c[i]).collect();
            (*date, cells)
        })
    }

    /// The table as date → (name → cell).
    pub fn to_row_map(&self) -> BTreeMap<NaiveDate, BTreeMap<String, Option<f64>>> {
        self.dates
            .iter()
            .enumerate()
            .map(|(i, date)| {
                let row = self
                    .columns
                    .iter()
                    .map(|(name, cells)| (name.clone(), cells[i]))
                    .collect();
                (*date, row)
            })
            .collect()
    }
}

/// Output of [`align_and_normalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    pub raw: AlignedTable,
    pub normalized: NormalizedTable,
    /// Columns left out of `normalized` because they hold no price at all.
    pub unnormalized: Vec<String>,
}

/// Outer-join the series on date and derive the normalized table.
///
/// Never fails: an empty input, or one where no column has a price, gives
/// empty tables that callers test with `is_empty`.
pub fn align_and_normalize(successes: &BTreeMap<String, RawSeries>) -> Alignment {
    let raw = align(successes);

    let mut normalized_columns = BTreeMap::new();
    let mut unnormalized = Vec::new();

    for (name, cells) in &raw.columns {
        match cells.iter().flatten().next().copied() {
            Some(initial) => {
                let scaled = cells
                    .iter()
                    .map(|cell| cell.map(|v| v * 100.0 / initial))
                    .collect();
                normalized_columns.insert(name.clone(), scaled);
            }
            None => {
                tracing::warn!(
                    column = %name,
                    "no price in aligned range, excluded from normalized table"
                );
                unnormalized.push(name.clone());
            }
        }
    }

    let normalized = if normalized_columns.is_empty() {
        PriceTable::default()
    } else {
        PriceTable {
            dates: raw.dates.clone(),
            columns: normalized_columns,
        }
    };

    Alignment {
        raw,
        normalized,
        unnormalized,
    }
}

/// Union date axis, missing cells as `None`, rows with no price dropped.
fn align(successes: &BTreeMap<String, RawSeries>) -> AlignedTable {
    let all_dates: BTreeSet<NaiveDate> = successes
        .values()
        .flat_map(|s| s.points().iter().map(|(d, _)| *d))
        .collect();
    let axis: Vec<NaiveDate> = all_dates.into_iter().collect();

    let mut columns: BTreeMap<String, Vec<Option<f64>>> = successes
        .iter()
        .map(|(name, series)| {
            let mut cells = vec![None; axis.len()];
            for (date, price) in series.points() {
                if let Ok(i) = axis.binary_search(date) {
                    cells[i] = *price;
                }
            }
            (name.clone(), cells)
        })
        .collect();

    let keep: Vec<bool> = (0..axis.len())
        .map(|i| columns.values().any(|c| c[i].is_some()))
        .collect();

    let dates = axis
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(d, _)| *d)
        .collect();
    for cells in columns.values_mut() {
        let mut row = 0;
        cells.retain(|_| {
            let k = keep[row];
            row += 1;
            k
        });
    }

    PriceTable { dates, columns }
}
