use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Chart interval accepted by the acquisition pipeline.
///
/// Parsing from a string is the validation step: anything outside this set
/// is rejected with [`MarketDataError::InvalidInterval`] before a request is
/// ever built.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    #[default]
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Interval {
    /// Every supported interval, in ascending order.
    pub const ALL: [Interval; 11] = [
        Interval::OneDay,
        Interval::FiveDays,
        Interval::OneMonth,
        Interval::ThreeMonths,
        Interval::SixMonths,
        Interval::OneYear,
        Interval::TwoYears,
        Interval::FiveYears,
        Interval::TenYears,
        Interval::YearToDate,
        Interval::Max,
    ];

    /// Wire representation used in query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneDay => "1d",
            Interval::FiveDays => "5d",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonths => "3mo",
            Interval::SixMonths => "6mo",
            Interval::OneYear => "1y",
            Interval::TwoYears => "2y",
            Interval::FiveYears => "5y",
            Interval::TenYears => "10y",
            Interval::YearToDate => "ytd",
            Interval::Max => "max",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| MarketDataError::InvalidInterval(s.to_string()))
    }
}

impl TryFrom<String> for Interval {
    type Error = MarketDataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}
