//! CSV rendering of price tables.

use super::align::PriceTable;
use super::provider::DataError;

/// Render a table as CSV.
///
/// Columns: `date`, then one column per display name in table order.
/// Missing cells are left empty.
pub fn table_csv(table: &PriceTable) -> Result<String, DataError> {
    let map_err = |e: csv::Error| DataError::Export(format!("csv write: {e}"));
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date".to_string()];
    header.extend(table.names().map(String::from));
    wtr.write_record(&header).map_err(map_err)?;

    for (date, cells) in table.rows() {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(date.to_string());
        record.extend(
            cells
                .iter()
                .map(|c| c.map(|v| format!("{v:.6}")).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(map_err)?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| DataError::Export(format!("failed to flush CSV writer: {e}")))?;
    String::from_utf8(data).map_err(|e| DataError::Export(format!("CSV output is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::align::align_and_normalize;
    use crate::data::series::RawSeries;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn renders_missing_cells_empty() {
        let mut input = BTreeMap::new();
        input.insert(
            "Apple".to_string(),
            RawSeries::new(vec![(d(2), Some(185.5)), (d(3), Some(184.25))]).unwrap(),
        );
        input.insert(
            "Alphabet (Google)".to_string(),
            RawSeries::new(vec![(d(3), Some(140.0))]).unwrap(),
        );
        let out = align_and_normalize(&input);

        let csv = table_csv(&out.raw).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,Alphabet (Google),Apple");
        assert_eq!(lines[1], "2024-01-02,,185.500000");
        assert_eq!(lines[2], "2024-01-03,140.000000,184.250000");
    }

    #[test]
    fn empty_table_is_header_only() {
        let csv = table_csv(&PriceTable::default()).unwrap();
        assert_eq!(csv, "date\n");
    }
}
