use chrono::NaiveDate;
use proptest::prelude::*;

use covid_trajectories::{build_snapshot, derive_trajectories, WideCaseTable};

const LOCATIONS: [&str; 3] = ["Alpha", "Beta", "Gamma"];

/// Up to five rows, each tied to one of three countries, over `days` dates.
fn rows_strategy() -> impl Strategy<Value = (usize, Vec<(usize, Vec<Option<u32>>)>)> {
    (1usize..6).prop_flat_map(|days| {
        let row = (0usize..LOCATIONS.len(), prop::collection::vec(prop::option::weighted(0.9, 0u32..500), days));
        (Just(days), prop::collection::vec(row, 1..6))
    })
}

fn to_csv(days: usize, rows: &[(usize, Vec<Option<u32>>)]) -> String {
    let start = NaiveDate::from_ymd_opt(2020, 2, 27).unwrap();
    let mut csv = String::from("Province/State,Country/Region,Lat,Long");
    for d in 0..days {
        let date = start + chrono::Duration::days(d as i64);
        csv.push_str(&format!(",{}", date.format("%-m/%-d/%y")));
    }
    csv.push('\n');
    for (i, (loc, cells)) in rows.iter().enumerate() {
        csv.push_str(&format!("P{i},{},0,0", LOCATIONS[*loc]));
        for cell in cells {
            match cell {
                Some(n) => csv.push_str(&format!(",{n}")),
                None => csv.push(','),
            }
        }
        csv.push('\n');
    }
    csv
}

proptest! {
    #[test]
    fn pivot_cell_is_sum_of_sub_locations((days, rows) in rows_strategy()) {
        let csv = to_csv(days, &rows);
        let snapshot = build_snapshot(csv.as_bytes(), 50).unwrap();
        let start = NaiveDate::from_ymd_opt(2020, 2, 27).unwrap();

        for (loc_idx, name) in LOCATIONS.iter().enumerate() {
            for d in 0..days {
                let known: Vec<i64> = rows
                    .iter()
                    .filter(|(l, _)| *l == loc_idx)
                    .filter_map(|(_, cells)| cells[d].map(i64::from))
                    .collect();
                let expected = if known.is_empty() { None } else { Some(known.iter().sum()) };
                let date = start + chrono::Duration::days(d as i64);
                prop_assert_eq!(snapshot.wide.get(name, date), expected);
            }
        }
    }

    #[test]
    fn raising_threshold_never_lengthens(
        cells in prop::collection::vec(prop::option::of(0i64..1000), 1..20),
        low in -5i64..500,
        bump in 0i64..500,
    ) {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let wide = WideCaseTable::from_cells(
            cells
                .iter()
                .enumerate()
                .filter_map(|(i, n)| n.map(|n| ("X".to_string(), start + chrono::Duration::days(i as i64), n))),
        )
        .unwrap();

        let len_at = |min_cases| derive_trajectories(&wide, min_cases).get("X").map_or(0, |t| t.len());
        prop_assert!(len_at(low + bump) <= len_at(low));
    }

    #[test]
    fn absent_iff_never_above_threshold(
        cells in prop::collection::vec(0i64..200, 1..15),
        min_cases in 0i64..200,
    ) {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let wide = WideCaseTable::from_cells(
            cells
                .iter()
                .enumerate()
                .map(|(i, n)| ("X".to_string(), start + chrono::Duration::days(i as i64), *n)),
        )
        .unwrap();
        let present = derive_trajectories(&wide, min_cases).contains("X");
        prop_assert_eq!(present, cells.iter().any(|n| *n > min_cases));
    }
}
