use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::PipelineConfig;
use crate::dashboard::{Dashboard, DataState, EventHandler};
use crate::error::TrajectoryError;
use crate::fetch::{FileSource, HttpSource};
use crate::visualization::{self, ChartConfig, ChartData, PlotStyle};

/// Python-facing wrapper around `Dashboard`.
///
/// A Python dashboard host (Bokeh, Panel, a notebook) keeps one of these per
/// session and calls it from its widget callbacks.
#[pyclass]
pub struct TrajectoryModel {
    dashboard: Dashboard,
}

#[pymethods]
impl TrajectoryModel {
    /// `config_toml` is parsed as a `PipelineConfig`; `min_cases` and
    /// `url` override it when given.
    #[new]
    #[pyo3(signature = (min_cases=None, url=None, config_toml=None))]
    fn new(
        min_cases: Option<i64>,
        url: Option<String>,
        config_toml: Option<&str>,
    ) -> PyResult<Self> {
        let mut config = match config_toml {
            Some(text) => PipelineConfig::from_toml_str(text)?,
            None => PipelineConfig::default(),
        };
        if let Some(min_cases) = min_cases {
            config.min_cases = min_cases;
        }
        if let Some(url) = url {
            config.source_url = url;
        }
        config.validate()?;
        Ok(Self {
            dashboard: Dashboard::new(config),
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Fetch the configured URL (with retry) and rebuild everything.
    ///
    /// Failures do not raise; check `state` afterwards.
    fn fetch(&mut self) -> PyResult<PyDataFrame> {
        let config = self.dashboard.config().clone();
        let source = HttpSource::new(config.source_url, &config.retry)?;
        let view = self.dashboard.on_refresh(&source);
        Ok(PyDataFrame(view.to_dataframe()?))
    }

    /// Load a local copy of the time-series CSV.
    fn load_csv(&mut self, path: &str) -> PyResult<PyDataFrame> {
        let view = self.dashboard.on_refresh(&FileSource::new(path));
        Ok(PyDataFrame(view.to_dataframe()?))
    }

    // ── Selection ───────────────────────────────────────────────────────────

    fn select(&mut self, locations: Vec<String>) -> PyResult<PyDataFrame> {
        let view = self.dashboard.on_selection_changed(&locations);
        Ok(PyDataFrame(view.to_dataframe()?))
    }

    fn select_all(&mut self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.dashboard.on_select_all().to_dataframe()?))
    }

    fn clear(&mut self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.dashboard.on_clear().to_dataframe()?))
    }

    // ── Single location ─────────────────────────────────────────────────────

    /// Calendar series (`date`, `cases`) for one location.
    #[pyo3(signature = (location=None))]
    fn location_series(&self, location: Option<&str>) -> PyResult<PyDataFrame> {
        use crate::schema::long;
        use polars::prelude::*;

        let series = self.dashboard.location_series(location)?;
        let (dates, cases): (Vec<chrono::NaiveDate>, Vec<i64>) = series.into_iter().unzip();
        let df = DataFrame::new(vec![
            Column::new(long::DATE.into(), dates),
            Column::new(long::CASES.into(), cases),
        ])
        .map_err(TrajectoryError::from)?;
        Ok(PyDataFrame(df))
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn locations(&self) -> Vec<String> {
        self.dashboard.locations()
    }

    #[getter]
    fn selected(&self) -> Vec<String> {
        self.dashboard
            .selection()
            .names()
            .map(str::to_string)
            .collect()
    }

    /// One of `not_loaded`, `ready`, `unavailable: ...`, `invalid: ...`.
    #[getter]
    fn state(&self) -> String {
        match self.dashboard.state() {
            DataState::NotLoaded => "not_loaded".to_string(),
            DataState::Ready => "ready".to_string(),
            DataState::Unavailable { message } => format!("unavailable: {message}"),
            DataState::Invalid { message } => format!("invalid: {message}"),
        }
    }

    #[getter]
    fn wide_df(&self) -> PyResult<Option<PyDataFrame>> {
        match self.dashboard.wide() {
            Some(wide) => Ok(Some(PyDataFrame(wide.to_dataframe()?))),
            None => Ok(None),
        }
    }

    #[getter]
    fn trajectories_df(&self) -> PyResult<Option<PyDataFrame>> {
        match self.dashboard.trajectories() {
            Some(table) => Ok(Some(PyDataFrame(table.to_dataframe()?))),
            None => Ok(None),
        }
    }

    #[getter]
    fn view_df(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.dashboard.view().to_dataframe()?))
    }

    #[getter]
    fn view_json(&self) -> PyResult<String> {
        Ok(self.dashboard.view().to_json()?)
    }

    // ── Visualization ───────────────────────────────────────────────────────

    /// Render the current view (or a single location's calendar series) as
    /// a self-contained HTML string.
    ///
    /// Args:
    ///     location: when given, plot that location's cases over date
    ///     style: "line" or "points" (default: "line")
    ///     title: chart title
    ///     width_px / height_px: SVG size (default: 700 x 400)
    #[pyo3(signature = (location=None, style="line", title=None, width_px=700, height_px=400))]
    fn render_html(
        &self,
        location: Option<&str>,
        style: &str,
        title: Option<String>,
        width_px: u32,
        height_px: u32,
    ) -> PyResult<String> {
        let style = match style {
            "line" => PlotStyle::Line,
            "points" => PlotStyle::Points,
            other => {
                return Err(PyValueError::new_err(format!(
                    "Invalid style: '{other}'. Must be 'line' or 'points'"
                )))
            }
        };

        let html = match location {
            Some(location) => {
                let points = self.dashboard.location_series(Some(location))?;
                let config = ChartConfig {
                    title: title.unwrap_or_else(|| format!("Covid-19 {location}")),
                    width_px,
                    height_px,
                    style,
                };
                visualization::generate_chart_html(
                    &ChartData::Calendar {
                        location,
                        points: &points,
                    },
                    &config,
                )
            }
            None => {
                let config = ChartConfig {
                    title: title.unwrap_or_else(|| ChartConfig::default().title),
                    width_px,
                    height_px,
                    style,
                };
                visualization::generate_chart_html(
                    &ChartData::Trajectories(self.dashboard.view()),
                    &config,
                )
            }
        };
        Ok(html)
    }
}
