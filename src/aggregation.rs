use polars::prelude::*;

use crate::error::Result;
use crate::reshape::LongCaseFrame;
use crate::schema::long;

/// Unique `(location, date)` keys with summed cases, sorted by date then location.
pub struct AggregatedCaseFrame(pub(crate) DataFrame);

/// Group long records by `(location, date)` and sum cases.
///
/// Null cases are dropped before grouping, so a key whose cells are all
/// unknown disappears instead of turning into 0.
pub fn aggregate(records: &LongCaseFrame) -> Result<AggregatedCaseFrame> {
    let df = records
        .0
        .clone()
        .lazy()
        .filter(col(long::CASES).is_not_null())
        .group_by([col(long::LOCATION), col(long::DATE)])
        .agg([col(long::CASES).sum()])
        .sort([long::DATE, long::LOCATION], SortMultipleOptions::default())
        .collect()?;

    tracing::debug!(
        input_records = records.height(),
        keys = df.height(),
        "Aggregated case records"
    );
    Ok(AggregatedCaseFrame(df))
}

impl AggregatedCaseFrame {
    pub fn height(&self) -> usize {
        self.0.height()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reshape::RawCaseTable;

    fn aggregate_csv(csv: &str) -> AggregatedCaseFrame {
        let table = RawCaseTable::from_csv_bytes(csv.as_bytes()).unwrap();
        aggregate(&table.melt().unwrap()).unwrap()
    }

    fn cases_for(agg: &AggregatedCaseFrame, location: &str) -> Vec<i64> {
        let df = agg
            .frame()
            .clone()
            .lazy()
            .filter(col(long::LOCATION).eq(lit(location)))
            .collect()
            .unwrap();
        df.column(long::CASES)
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn sums_provinces_into_country() {
        let agg = aggregate_csv(
            "\
Province/State,Country/Region,Lat,Long,3/1/20,3/2/20
Ontario,Canada,51.2,-85.3,10,20
Quebec,Canada,52.9,-73.5,5,7
,France,46.2,2.2,100,130
",
        );
        assert_eq!(agg.height(), 4);
        assert_eq!(cases_for(&agg, "Canada"), vec![15, 27]);
        assert_eq!(cases_for(&agg, "France"), vec![100, 130]);
    }

    #[test]
    fn all_unknown_key_is_absent() {
        let agg = aggregate_csv(
            "\
Province/State,Country/Region,Lat,Long,3/1/20,3/2/20
,Peru,-9.2,-75.0,,4
",
        );
        assert_eq!(cases_for(&agg, "Peru"), vec![4]);
    }

    #[test]
    fn partially_unknown_key_sums_known_cells() {
        let agg = aggregate_csv(
            "\
Province/State,Country/Region,Lat,Long,3/1/20
A,Chile,0,0,
B,Chile,0,0,6
",
        );
        assert_eq!(cases_for(&agg, "Chile"), vec![6]);
    }
}
