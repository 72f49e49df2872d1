use crate::aggregation::aggregate;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::fetch::{fetch_with_retry, CsvSource};
use crate::pivot::WideCaseTable;
use crate::reshape::RawCaseTable;
use crate::trajectory::{derive_trajectories, TrajectoryTable};

/// Everything the dashboards plot, rebuilt from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub wide: WideCaseTable,
    pub trajectories: TrajectoryTable,
}

/// raw CSV → melt → group+sum → pivot → trajectories.
pub fn build_snapshot(csv: &[u8], min_cases: i64) -> Result<Snapshot> {
    let _span = tracing::info_span!("build_snapshot", min_cases).entered();

    let raw = RawCaseTable::from_csv_bytes(csv)?;
    let records = raw.melt()?;
    let aggregated = aggregate(&records)?;
    let wide = WideCaseTable::from_aggregated(&aggregated)?;
    let trajectories = derive_trajectories(&wide, min_cases);

    tracing::info!(
        rows = raw.height(),
        dates = wide.dates().len(),
        trajectories = trajectories.len(),
        "Built snapshot"
    );
    Ok(Snapshot { wide, trajectories })
}

/// Fetch (with retry) and build a snapshot in one blocking call.
pub fn fetch_snapshot(source: &dyn CsvSource, config: &PipelineConfig) -> Result<Snapshot> {
    let csv = fetch_with_retry(source, &config.retry)?;
    build_snapshot(&csv, config.min_cases)
}
