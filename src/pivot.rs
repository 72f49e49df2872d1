use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use polars::prelude::*;

use crate::aggregation::AggregatedCaseFrame;
use crate::error::{Result, TrajectoryError};
use crate::schema::long;

/// Date-indexed, location-columned case table.
///
/// `None` marks a date outside a location's data. It is never read as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct WideCaseTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<i64>>>,
}

impl WideCaseTable {
    /// Pivot: dates ascending down the rows, one column per location.
    pub fn from_aggregated(agg: &AggregatedCaseFrame) -> Result<Self> {
        let df = agg.frame();
        let locations = df.column(long::LOCATION)?.str()?;
        let dates = df.column(long::DATE)?.date()?;
        let cases = df.column(long::CASES)?.i64()?;

        let mut keyed: Vec<(String, NaiveDate, i64)> = Vec::with_capacity(df.height());
        for (i, date) in dates.as_date_iter().enumerate() {
            let (Some(location), Some(date), Some(n)) = (locations.get(i), date, cases.get(i))
            else {
                return Err(TrajectoryError::InvalidData(format!(
                    "Null key or value in aggregated row {i}"
                )));
            };
            keyed.push((location.to_string(), date, n));
        }

        Self::from_cells(keyed)
    }

    /// Build from `(location, date, cases)` cells. Keys must be unique.
    pub fn from_cells(cells: impl IntoIterator<Item = (String, NaiveDate, i64)>) -> Result<Self> {
        let cells: Vec<_> = cells.into_iter().collect();

        let dates: Vec<NaiveDate> = cells
            .iter()
            .map(|(_, d, _)| *d)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let row_of: BTreeMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut columns: BTreeMap<String, Vec<Option<i64>>> = BTreeMap::new();
        for (location, date, n) in cells {
            let column = columns
                .entry(location.clone())
                .or_insert_with(|| vec![None; dates.len()]);
            let slot = &mut column[row_of[&date]];
            if slot.is_some() {
                return Err(TrajectoryError::InvalidData(format!(
                    "Duplicate cell for {location} on {date}"
                )));
            }
            *slot = Some(n);
        }

        tracing::debug!(
            dates = dates.len(),
            locations = columns.len(),
            "Pivoted case table"
        );
        Ok(Self { dates, columns })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, location: &str) -> Option<&[Option<i64>]> {
        self.columns.get(location).map(Vec::as_slice)
    }

    pub fn get(&self, location: &str, date: NaiveDate) -> Option<i64> {
        let row = self.dates.binary_search(&date).ok()?;
        self.columns.get(location)?[row]
    }

    /// `(date, cases)` pairs, in date order, with unknown cells excluded.
    pub(crate) fn known_cells<'a>(
        &'a self,
        column: &'a [Option<i64>],
    ) -> impl Iterator<Item = (NaiveDate, i64)> + 'a {
        self.dates
            .iter()
            .zip(column)
            .filter_map(|(d, n)| n.map(|n| (*d, n)))
    }

    /// Calendar series for one location, as plotted by the single-country view.
    pub fn location_series(&self, location: &str) -> Result<Vec<(NaiveDate, i64)>> {
        let column = self
            .column(location)
            .ok_or_else(|| TrajectoryError::UnknownLocation(location.to_string()))?;
        Ok(self.known_cells(column).collect())
    }

    /// `date` column followed by one nullable Int64 column per location.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::new(long::DATE.into(), self.dates.clone()));
        for (location, values) in &self.columns {
            columns.push(Column::new(location.as_str().into(), values.clone()));
        }
        Ok(DataFrame::new(columns)?)
    }
}
