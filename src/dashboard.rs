use crate::config::PipelineConfig;
use crate::error::{FailureKind, Result, TrajectoryError};
use crate::fetch::CsvSource;
use crate::pipeline::{build_snapshot, fetch_snapshot, Snapshot};
use crate::pivot::WideCaseTable;
use crate::selection::{select_view, Selection, ViewData};
use crate::trajectory::TrajectoryTable;

/// Whether the dashboard has data to show, and if not, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataState {
    NotLoaded,
    Ready,
    /// Fetch failed after retries; the user may retry.
    Unavailable { message: String },
    /// The snapshot could not be parsed.
    Invalid { message: String },
}

/// One handler per widget event. Each returns the view to render.
pub trait EventHandler {
    fn on_selection_changed(&mut self, locations: &[String]) -> &ViewData;
    fn on_select_all(&mut self) -> &ViewData;
    fn on_clear(&mut self) -> &ViewData;
    fn on_refresh(&mut self, source: &dyn CsvSource) -> &ViewData;
}

/// Owns the snapshot, the selection and the rendered view.
///
/// All handlers run synchronously; the view is always recomputed from the
/// current snapshot and selection.
pub struct Dashboard {
    config: PipelineConfig,
    snapshot: Option<Snapshot>,
    selection: Selection,
    /// Set by the first load and by select-all; every refresh then
    /// re-selects all locations, including newly qualifying ones.
    follow_all: bool,
    view: ViewData,
    state: DataState,
}

impl Dashboard {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            snapshot: None,
            selection: Selection::none(),
            follow_all: true,
            view: ViewData::default(),
            state: DataState::NotLoaded,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> &DataState {
        &self.state
    }

    pub fn view(&self) -> &ViewData {
        &self.view
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn trajectories(&self) -> Option<&TrajectoryTable> {
        self.snapshot.as_ref().map(|s| &s.trajectories)
    }

    pub fn wide(&self) -> Option<&WideCaseTable> {
        self.snapshot.as_ref().map(|s| &s.wide)
    }

    /// Every location a checkbox list should offer.
    pub fn locations(&self) -> Vec<String> {
        self.trajectories()
            .map(|t| t.locations().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Calendar series for `location`, or the configured default location.
    pub fn location_series(
        &self,
        location: Option<&str>,
    ) -> Result<Vec<(chrono::NaiveDate, i64)>> {
        let location = location.unwrap_or(&self.config.default_location);
        match self.wide() {
            Some(wide) => wide.location_series(location),
            None => Err(TrajectoryError::NotLoaded(format!(
                "no snapshot loaded, cannot look up '{location}'"
            ))),
        }
    }

    /// Build a snapshot from CSV bytes already in hand.
    pub fn load_bytes(&mut self, csv: &[u8]) -> &ViewData {
        let outcome = build_snapshot(csv, self.config.min_cases);
        self.apply(outcome);
        &self.view
    }

    fn apply(&mut self, outcome: Result<Snapshot>) {
        match outcome {
            Ok(snapshot) => {
                if self.follow_all {
                    self.selection = Selection::all(&snapshot.trajectories);
                } else {
                    self.selection.retain_known(&snapshot.trajectories);
                }
                self.snapshot = Some(snapshot);
                self.state = DataState::Ready;
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!(error = %message, "Keeping previous snapshot");
                self.state = match err.kind() {
                    FailureKind::Fetch => DataState::Unavailable { message },
                    _ => DataState::Invalid { message },
                };
            }
        }
        self.refresh_view();
    }

    fn refresh_view(&mut self) {
        self.view = match self.trajectories() {
            Some(table) => select_view(table, &self.selection),
            None => ViewData::default(),
        };
    }
}

impl EventHandler for Dashboard {
    fn on_selection_changed(&mut self, locations: &[String]) -> &ViewData {
        self.selection = Selection::from_names(locations.iter().cloned());
        self.follow_all = false;
        self.refresh_view();
        &self.view
    }

    fn on_select_all(&mut self) -> &ViewData {
        self.selection = self
            .trajectories()
            .map(Selection::all)
            .unwrap_or_default();
        self.follow_all = true;
        self.refresh_view();
        &self.view
    }

    fn on_clear(&mut self) -> &ViewData {
        self.selection = Selection::none();
        self.follow_all = false;
        self.refresh_view();
        &self.view
    }

    fn on_refresh(&mut self, source: &dyn CsvSource) -> &ViewData {
        let outcome = fetch_snapshot(source, &self.config);
        self.apply(outcome);
        &self.view
    }
}
