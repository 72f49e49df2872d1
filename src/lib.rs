//! Case-count trajectories for COVID-19 dashboards.
//!
//! Turns the CSSE confirmed-cases time series (one row per province, one
//! column per day) into per-country series aligned on the day each country
//! first exceeded a case threshold, log-transformed, plus the selection and
//! rendering plumbing a dashboard needs around them.

pub mod aggregation;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod pivot;
pub mod reshape;
pub mod schema;
pub mod selection;
pub mod trajectory;
pub mod visualization;

#[cfg(feature = "python")]
mod model;

pub use config::{PipelineConfig, RetryConfig};
pub use dashboard::{Dashboard, DataState, EventHandler};
pub use error::{FailureKind, Result, TrajectoryError};
pub use fetch::{fetch_with_retry, CsvSource, FileSource, HttpSource};
pub use pipeline::{build_snapshot, fetch_snapshot, Snapshot};
pub use pivot::WideCaseTable;
pub use selection::{select_view, Selection, SeriesView, ViewData};
pub use trajectory::{derive_trajectories, log_transform, Trajectory, TrajectoryTable};

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;
    use pyo3::types::PyModule;

    use crate::model::TrajectoryModel;
    use crate::schema;

    /// Export schema constants as Python submodules
    fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Raw
        let raw = PyModule::new(m.py(), "raw")?;
        raw.add("PROVINCE_STATE", schema::raw::PROVINCE_STATE)?;
        raw.add("COUNTRY_REGION", schema::raw::COUNTRY_REGION)?;
        raw.add("LAT", schema::raw::LAT)?;
        raw.add("LONG", schema::raw::LONG)?;
        raw.add("DATE_FORMAT", schema::raw::DATE_FORMAT)?;
        m.add_submodule(&raw)?;

        // Long
        let long = PyModule::new(m.py(), "long")?;
        long.add("LOCATION", schema::long::LOCATION)?;
        long.add("DATE", schema::long::DATE)?;
        long.add("CASES", schema::long::CASES)?;
        m.add_submodule(&long)?;

        // Trajectory
        let trajectory = PyModule::new(m.py(), "trajectory")?;
        trajectory.add("DAYS_SINCE", schema::trajectory::DAYS_SINCE)?;
        m.add_submodule(&trajectory)?;

        // Defaults
        let defaults = PyModule::new(m.py(), "defaults")?;
        defaults.add("CONFIRMED_URL", schema::defaults::CONFIRMED_URL)?;
        defaults.add("MIN_CASES", schema::defaults::MIN_CASES)?;
        defaults.add("LOCATION", schema::defaults::LOCATION)?;
        m.add_submodule(&defaults)?;

        Ok(())
    }

    #[pymodule]
    fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<TrajectoryModel>()?;
        add_schema_exports(m)?;
        Ok(())
    }
}
