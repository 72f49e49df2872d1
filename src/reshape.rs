use std::io::Cursor;

use chrono::NaiveDate;
use polars::prelude::*;

use crate::error::{Result, TrajectoryError};
use crate::schema::{long, raw};

/// The CSV as read: one row per (country, province), one column per day.
pub struct RawCaseTable {
    frame: DataFrame,
    /// Date columns in file order, with their parsed dates.
    dates: Vec<(String, NaiveDate)>,
}

/// Long-form records: `location`, `date`, `cases` (nullable Int64).
pub struct LongCaseFrame(pub(crate) DataFrame);

impl RawCaseTable {
    /// Read CSV bytes with every column as String.
    ///
    /// Column names are trimmed. Every column that is not one of the geo
    /// columns or `Country/Region` must be a `M/D/YY` date.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let mut frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        let trimmed: Vec<String> = frame
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        frame.set_column_names(trimmed.as_slice())?;

        Self::from_frame(frame)
    }

    pub fn from_frame(frame: DataFrame) -> Result<Self> {
        if frame.column(raw::COUNTRY_REGION).is_err() {
            return Err(TrajectoryError::MissingColumn(raw::COUNTRY_REGION.to_string()));
        }

        let mut dates = Vec::new();
        for name in frame.get_column_names_str() {
            if name == raw::COUNTRY_REGION || raw::GEO_COLUMNS.contains(&name) {
                continue;
            }
            let date = parse_date_header(name)?;
            dates.push((name.to_string(), date));
        }

        tracing::debug!(
            rows = frame.height(),
            date_columns = dates.len(),
            "Loaded raw case table"
        );

        Ok(Self { frame, dates })
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().map(|(_, d)| *d)
    }

    /// Melt the date columns into one record per (row, date).
    ///
    /// Geo columns are dropped. Empty cells become null cases. Rows with a
    /// blank `Country/Region` have no grouping key and are skipped.
    pub fn melt(&self) -> Result<LongCaseFrame> {
        if self.frame.height() > MAX_ROWS {
            return Err(TrajectoryError::InvalidData(format!(
                "{} rows exceed the supported maximum of {MAX_ROWS}",
                self.frame.height()
            )));
        }

        let locations = self.frame.column(raw::COUNTRY_REGION)?.str()?;
        let rows: Vec<(usize, &str)> = locations
            .iter()
            .enumerate()
            .filter_map(|(i, loc)| {
                let loc = loc.map(str::trim).filter(|l| !l.is_empty());
                if loc.is_none() {
                    tracing::warn!(row = i, "Skipping row with blank {}", raw::COUNTRY_REGION);
                }
                loc.map(|l| (i, l))
            })
            .collect();

        let capacity = rows.len() * self.dates.len();
        let mut location_col: Vec<String> = Vec::with_capacity(capacity);
        let mut date_col: Vec<NaiveDate> = Vec::with_capacity(capacity);
        let mut cases_col: Vec<Option<i64>> = Vec::with_capacity(capacity);

        for (header, date) in &self.dates {
            let cells = self.frame.column(header)?.str()?;
            for &(i, location) in &rows {
                let cases = parse_count(cells.get(i), location, header)?;

                location_col.push(location.to_string());
                date_col.push(*date);
                cases_col.push(cases);
            }
        }

        let frame = DataFrame::new(vec![
            Column::new(long::LOCATION.into(), location_col),
            Column::new(long::DATE.into(), date_col),
            Column::new(long::CASES.into(), cases_col),
        ])?;

        tracing::debug!(records = frame.height(), "Melted case table");
        Ok(LongCaseFrame(frame))
    }
}

impl LongCaseFrame {
    pub fn height(&self) -> usize {
        self.0.height()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.0
    }
}

fn parse_date_header(name: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(name, raw::DATE_FORMAT).map_err(|e| {
        TrajectoryError::InvalidDateColumn {
            column: name.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Largest case count a single cell may hold. Well above any real count.
pub const MAX_CASE_COUNT: i64 = 1_000_000_000_000;

/// Row limit that keeps a group sum of capped cells within `i64`.
const MAX_ROWS: usize = (i64::MAX / MAX_CASE_COUNT) as usize;

/// Empty cell → unknown. Integral floats such as `12.0` are accepted.
/// Counts must lie in `0..=MAX_CASE_COUNT`.
fn parse_count(cell: Option<&str>, location: &str, date: &str) -> Result<Option<i64>> {
    let text = match cell.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(text) => text,
    };

    let count = match text.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => match text.parse::<f64>() {
            // Range-check before the cast, which would saturate
            Ok(f) if f.fract() == 0.0 && (0.0..=MAX_CASE_COUNT as f64).contains(&f) => {
                Some(f as i64)
            }
            _ => None,
        },
    };
    match count {
        Some(n) if (0..=MAX_CASE_COUNT).contains(&n) => Ok(Some(n)),
        _ => Err(TrajectoryError::InvalidCount {
            location: location.to_string(),
            date: date.to_string(),
            value: text.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    const CSV: &str = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20
,Italy,43.0,12.0,1,3
Hubei,China,30.9,112.2,444,
Beijing,China,40.1,116.4,14,22
";

    #[test]
    fn parses_date_headers() {
        let table = RawCaseTable::from_csv_bytes(CSV.as_bytes()).unwrap();
        let dates: Vec<_> = table.dates().collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 22).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 23).unwrap(),
            ]
        );
        assert_eq!(table.height(), 3);
    }

    #[test]
    fn melt_emits_one_record_per_row_and_date() {
        let table = RawCaseTable::from_csv_bytes(CSV.as_bytes()).unwrap();
        let long = table.melt().unwrap();
        assert_eq!(long.height(), 6);
        assert_eq!(long.frame().get_column_names_str(), vec!["location", "date", "cases"]);
        // Hubei on 1/23/20 is empty
        assert_eq!(long.frame().column("cases").unwrap().null_count(), 1);
    }

    #[test]
    fn trims_header_whitespace() {
        let csv = " Province/State , Country/Region ,Lat,Long, 1/22/20 \n,Spain,40,-4,7\n";
        let table = RawCaseTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.dates().count(), 1);
    }

    #[test]
    fn rejects_non_date_columns() {
        let csv = "Province/State,Country/Region,Lat,Long,Population,1/22/20\n,Spain,40,-4,47,1\n";
        let err = RawCaseTable::from_csv_bytes(csv.as_bytes()).err().unwrap();
        assert_eq!(err.kind(), FailureKind::Parse);
        assert!(matches!(err, TrajectoryError::InvalidDateColumn { ref column, .. } if column == "Population"));
    }

    #[test]
    fn requires_country_column() {
        let csv = "Province/State,Lat,Long,1/22/20\n,40,-4,1\n";
        let err = RawCaseTable::from_csv_bytes(csv.as_bytes()).err().unwrap();
        assert!(matches!(err, TrajectoryError::MissingColumn(_)));
    }

    #[test]
    fn rejects_garbage_counts() {
        let csv = "Province/State,Country/Region,Lat,Long,1/22/20\n,Spain,40,-4,lots\n";
        let table = RawCaseTable::from_csv_bytes(csv.as_bytes()).unwrap();
        let err = table.melt().err().unwrap();
        assert_eq!(
            err.to_string(),
            "Invalid case count 'lots' for Spain on 1/22/20"
        );
    }

    #[test]
    fn count_parsing() {
        assert_eq!(parse_count(Some(" 12 "), "X", "d").unwrap(), Some(12));
        assert_eq!(parse_count(Some("12.0"), "X", "d").unwrap(), Some(12));
        assert_eq!(parse_count(Some(""), "X", "d").unwrap(), None);
        assert_eq!(parse_count(None, "X", "d").unwrap(), None);
        assert!(parse_count(Some("1.5"), "X", "d").is_err());
        assert_eq!(parse_count(Some("0"), "X", "d").unwrap(), Some(0));
        assert_eq!(
            parse_count(Some("1000000000000"), "X", "d").unwrap(),
            Some(MAX_CASE_COUNT)
        );
    }

    #[test]
    fn out_of_range_counts_are_rejected() {
        for text in ["1e300", "99999999999999999999", "-5", "inf", "NaN", "1000000000001"] {
            let err = parse_count(Some(text), "X", "d").unwrap_err();
            assert!(
                matches!(err, TrajectoryError::InvalidCount { ref value, .. } if value == text),
                "{text} gave {err}"
            );
        }
    }

    #[test]
    fn overflowing_sub_locations_fail_to_parse() {
        let csv = "\
Province/State,Country/Region,Lat,Long,1/22/20
A,X,0,0,9223372036854775807
B,X,0,0,100
";
        let table = RawCaseTable::from_csv_bytes(csv.as_bytes()).unwrap();
        let err = table.melt().err().unwrap();
        assert_eq!(err.kind(), FailureKind::Parse);
        assert!(matches!(err, TrajectoryError::InvalidCount { .. }));
    }

    #[test]
    fn blank_country_rows_are_skipped() {
        let csv = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20
Nowhere,,0,0,5,6
,Spain,40,-4,7,8
Somewhere,  ,0,0,1,2
";
        let table = RawCaseTable::from_csv_bytes(csv.as_bytes()).unwrap();
        let long = table.melt().unwrap();
        assert_eq!(long.height(), 2);
        let locations: Vec<_> = long
            .frame()
            .column(long::LOCATION)
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(locations, vec!["Spain", "Spain"]);
    }
}
