//! Conversion of price tables to Polars DataFrames for downstream consumers.

use super::align::PriceTable;
use super::provider::DataError;
use chrono::NaiveDate;
use polars::prelude::*;

/// 1970-01-01, day zero of the Polars `Date` type.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// A `date` column (Polars `Date`) followed by one nullable `f64` column per
/// display name. Missing cells become nulls.
pub fn to_dataframe(table: &PriceTable) -> Result<DataFrame, DataError> {
    let days: Vec<i32> = table
        .dates()
        .iter()
        .map(|d| (*d - epoch()).num_days() as i32)
        .collect();

    let mut columns = Vec::with_capacity(table.width() + 1);
    columns.push(
        Column::new("date".into(), days)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Export(format!("date cast: {e}")))?,
    );
    for name in table.names() {
        let cells: Vec<Option<f64>> = table.column(name).unwrap_or_default().to_vec();
        columns.push(Column::new(name.into(), cells));
    }

    DataFrame::new(columns).map_err(|e| DataError::Export(format!("dataframe creation: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::align::align_and_normalize;
    use crate::data::series::RawSeries;
    use std::collections::BTreeMap;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn frame_has_date_and_nullable_columns() {
        let mut input = BTreeMap::new();
        input.insert(
            "A".to_string(),
            RawSeries::new(vec![(d(2), Some(10.0)), (d(3), Some(12.0))]).unwrap(),
        );
        input.insert(
            "B".to_string(),
            RawSeries::new(vec![(d(3), Some(4.0))]).unwrap(),
        );
        let out = align_and_normalize(&input);

        let df = to_dataframe(&out.normalized).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);

        let a = df.column("A").unwrap().f64().unwrap();
        assert_eq!(a.get(1), Some(120.0));
        let b = df.column("B").unwrap().f64().unwrap();
        assert_eq!(b.get(0), None);
        assert_eq!(b.get(1), Some(100.0));
    }

    #[test]
    fn empty_table_gives_date_only_frame() {
        let df = to_dataframe(&PriceTable::default()).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 1);
    }
}
