use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Major holders breakdown of a ticker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldersBreakdown {
    pub ticker: String,

    /// % of shares held by all insiders
    pub pct_shares_held_by_insiders: f64,

    /// % of shares held by institutions
    pub pct_shares_held_by_institutions: f64,

    /// % of float held by institutions
    pub pct_float_held_by_institutions: f64,

    /// Number of institutions holding shares
    pub institutions_count: i64,
}

/// One line of a top holders table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldersRow {
    pub holder: String,
    pub shares: i64,
    pub date_reported: NaiveDate,

    /// Percent of outstanding shares
    pub pct_out: f64,

    /// Dollar value of the position
    pub value: i64,
}

/// Top institutional or top mutual fund holders of a ticker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldersTable {
    pub ticker: String,
    pub rows: Vec<HoldersRow>,
}

/// Everything returned by a holders lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holders {
    pub breakdown: HoldersBreakdown,
    pub institutional: HoldersTable,
    pub funds: HoldersTable,
}
