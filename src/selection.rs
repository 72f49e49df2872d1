use std::collections::BTreeSet;

use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::schema::trajectory::DAYS_SINCE;
use crate::trajectory::TrajectoryTable;

/// The set of locations a user has ticked.
///
/// May name locations that are not (or no longer) in the table; those are
/// dropped when the view is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(BTreeSet<String>);

impl Selection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all(table: &TrajectoryTable) -> Self {
        Self(table.locations().map(str::to_string).collect())
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, location: &str) -> bool {
        self.0.contains(location)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    /// Keep only names present in `table`.
    pub fn retain_known(&mut self, table: &TrajectoryTable) {
        self.0.retain(|name| table.contains(name));
    }
}

/// One plotted line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub location: String,
    pub values: Vec<f64>,
}

/// What the plot shows: the selected trajectories, same row semantics as
/// the table (offset i = i days since the threshold was crossed).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewData {
    pub series: Vec<SeriesView>,
    /// Selected names that were not in the table.
    pub dropped: usize,
}

/// Restrict `table` to `selection`. Unknown names are ignored.
pub fn select_view(table: &TrajectoryTable, selection: &Selection) -> ViewData {
    let series = table
        .iter()
        .filter(|(name, _)| selection.contains(name))
        .map(|(name, trajectory)| SeriesView {
            location: name.to_string(),
            values: trajectory.values().to_vec(),
        })
        .collect();

    let mut dropped = 0;
    for name in selection.names().filter(|name| !table.contains(name)) {
        tracing::debug!(location = name, "Ignoring unknown location in selection");
        dropped += 1;
    }

    ViewData { series, dropped }
}

impl ViewData {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.iter().map(|s| s.location.as_str())
    }

    /// Number of offset rows the view spans.
    pub fn max_len(&self) -> usize {
        self.series.iter().map(|s| s.values.len()).max().unwrap_or(0)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Same layout as `TrajectoryTable::to_dataframe`, limited to the view.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let rows = self.max_len();
        let mut columns: Vec<Column> = Vec::with_capacity(self.series.len() + 1);
        columns.push(Column::new(DAYS_SINCE.into(), (0..rows as u32).collect::<Vec<u32>>()));
        for s in &self.series {
            let padded: Vec<Option<f64>> = (0..rows).map(|i| s.values.get(i).copied()).collect();
            columns.push(Column::new(s.location.as_str().into(), padded));
        }
        Ok(DataFrame::new(columns)?)
    }
}
