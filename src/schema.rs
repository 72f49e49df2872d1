/// Column-name constants and fixed formats for the case-count tables.
/// Single source of truth - shared by the pipeline stages and the Python binding.

// ── Raw CSSE time-series columns ────────────────────────────────────────────
pub mod raw {
    pub const PROVINCE_STATE: &str = "Province/State";
    pub const COUNTRY_REGION: &str = "Country/Region";
    pub const LAT: &str = "Lat";
    pub const LONG: &str = "Long";

    /// Non-temporal columns dropped before the melt.
    pub const GEO_COLUMNS: [&str; 3] = [PROVINCE_STATE, LAT, LONG];

    /// Date headers look like `1/22/20`.
    pub const DATE_FORMAT: &str = "%m/%d/%y";
}

// ── Long / aggregated columns ───────────────────────────────────────────────
pub mod long {
    pub const LOCATION: &str = "location";
    pub const DATE: &str = "date";
    pub const CASES: &str = "cases";
}

// ── Trajectory table columns ────────────────────────────────────────────────
pub mod trajectory {
    pub const DAYS_SINCE: &str = "days_since";
}

// ── Defaults ────────────────────────────────────────────────────────────────
pub mod defaults {
    pub const CONFIRMED_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_global.csv";
    pub const MIN_CASES: i64 = 50;
    pub const LOCATION: &str = "United Kingdom";
}
