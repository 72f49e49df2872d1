use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::Result;
use crate::pivot::WideCaseTable;
use crate::schema::trajectory::DAYS_SINCE;

/// Log-transformed cases, indexed by days since the threshold was first exceeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory(Vec<f64>);

impl Trajectory {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value at a day offset; `None` past the end of the series.
    pub fn at(&self, offset: usize) -> Option<f64> {
        self.0.get(offset).copied()
    }
}

/// One trajectory per location that ever exceeded `min_cases`.
///
/// Columns are ragged: shorter series have no value at higher offsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryTable {
    min_cases: i64,
    series: BTreeMap<String, Trajectory>,
}

/// `ln(v)` for positive counts, 0 for anything else.
pub fn log_transform(cases: i64) -> f64 {
    if cases > 0 {
        (cases as f64).ln()
    } else {
        0.0
    }
}

/// Align every location on the first day its cases exceed `min_cases`.
///
/// Only known cells strictly above the threshold are kept, in date order,
/// then re-indexed from 0. Locations that never qualify are omitted.
pub fn derive_trajectories(wide: &WideCaseTable, min_cases: i64) -> TrajectoryTable {
    let mut series = BTreeMap::new();

    for location in wide.locations() {
        let Some(column) = wide.column(location) else {
            continue;
        };
        let values: Vec<f64> = wide
            .known_cells(column)
            .filter(|(_, n)| *n > min_cases)
            .map(|(_, n)| log_transform(n))
            .collect();

        if values.is_empty() {
            tracing::trace!(location, min_cases, "Location never exceeded threshold");
            continue;
        }
        series.insert(location.to_string(), Trajectory(values));
    }

    tracing::debug!(
        min_cases,
        locations = series.len(),
        dropped = wide.locations().count() - series.len(),
        "Derived trajectories"
    );
    TrajectoryTable { min_cases, series }
}

impl TrajectoryTable {
    pub fn min_cases(&self) -> i64 {
        self.min_cases
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn contains(&self, location: &str) -> bool {
        self.series.contains_key(location)
    }

    pub fn get(&self, location: &str) -> Option<&Trajectory> {
        self.series.get(location)
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Trajectory)> + '_ {
        self.series.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Length of the longest trajectory, i.e. the number of offset rows.
    pub fn max_len(&self) -> usize {
        self.series.values().map(Trajectory::len).max().unwrap_or(0)
    }

    /// `days_since` column plus one Float64 column per location, null-padded.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let rows = self.max_len();
        let mut columns: Vec<Column> = Vec::with_capacity(self.series.len() + 1);
        columns.push(Column::new(DAYS_SINCE.into(), (0..rows as u32).collect::<Vec<u32>>()));

        for (location, trajectory) in &self.series {
            let padded: Vec<Option<f64>> = (0..rows).map(|i| trajectory.at(i)).collect();
            columns.push(Column::new(location.as_str().into(), padded));
        }
        Ok(DataFrame::new(columns)?)
    }
}
