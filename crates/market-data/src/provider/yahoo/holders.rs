//! Yahoo holders page decoding.
//!
//! The page carries three tables, in order:
//! 1. the major holders breakdown, one value per row in the first cell
//! 2. top institutional holders
//! 3. top mutual fund holders
//!
//! Both holder grids start with a header row followed by rows of
//! `Holder | Shares | Date Reported | % Out | Value`.

use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::html::{Row, Table};
use crate::models::{Holders, HoldersBreakdown, HoldersRow, HoldersTable};

use super::PROVIDER_ID;

const EXPECTED_TABLES: usize = 3;
const BREAKDOWN_ROWS: usize = 4;
const HOLDER_COLUMNS: usize = 5;

/// Date format of the "Date Reported" column, e.g. "Dec 30, 2020".
const REPORTED_DATE_FORMAT: &str = "%b %e, %Y";

/// Parse a percentage such as "13.26%".
pub fn parse_percent(value: &str) -> Result<f64, MarketDataError> {
    value
        .trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .map_err(|_| MarketDataError::decode(PROVIDER_ID, format!("Invalid percentage '{}'", value)))
}

/// Parse an integer with thousands separators such as "9,276,087".
pub fn parse_grouped_int(value: &str) -> Result<i64, MarketDataError> {
    value
        .trim()
        .replace(',', "")
        .parse::<i64>()
        .map_err(|_| MarketDataError::decode(PROVIDER_ID, format!("Invalid integer '{}'", value)))
}

/// Parse a reported date such as "Dec 30, 2020".
pub fn parse_reported_date(value: &str) -> Result<NaiveDate, MarketDataError> {
    NaiveDate::parse_from_str(value.trim(), REPORTED_DATE_FORMAT)
        .map_err(|_| MarketDataError::decode(PROVIDER_ID, format!("Invalid date '{}'", value)))
}

/// Turn the extracted page tables into holders data.
///
/// Any structural shortfall or unparseable field fails the whole lookup.
pub(super) fn decode_holders(ticker: &str, tables: &[Table]) -> Result<Holders, MarketDataError> {
    if tables.len() < EXPECTED_TABLES {
        return Err(MarketDataError::decode(
            PROVIDER_ID,
            format!("Expected {} tables, found {}", EXPECTED_TABLES, tables.len()),
        ));
    }

    Ok(Holders {
        breakdown: decode_breakdown(ticker, &tables[0])?,
        institutional: decode_holders_table(ticker, &tables[1])?,
        funds: decode_holders_table(ticker, &tables[2])?,
    })
}

fn decode_breakdown(ticker: &str, table: &Table) -> Result<HoldersBreakdown, MarketDataError> {
    if table.rows.len() < BREAKDOWN_ROWS {
        return Err(MarketDataError::decode(
            PROVIDER_ID,
            format!(
                "Expected {} breakdown rows, found {}",
                BREAKDOWN_ROWS,
                table.rows.len()
            ),
        ));
    }

    let value = |index: usize| -> Result<&str, MarketDataError> {
        table.rows[index]
            .first()
            .map(String::as_str)
            .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, format!("Breakdown row {} is empty", index)))
    };

    Ok(HoldersBreakdown {
        ticker: ticker.to_string(),
        pct_shares_held_by_insiders: parse_percent(value(0)?)?,
        pct_shares_held_by_institutions: parse_percent(value(1)?)?,
        pct_float_held_by_institutions: parse_percent(value(2)?)?,
        institutions_count: parse_grouped_int(value(3)?)?,
    })
}

fn decode_holders_table(ticker: &str, table: &Table) -> Result<HoldersTable, MarketDataError> {
    let rows = table
        .rows
        .iter()
        .skip(1)
        .map(decode_holders_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HoldersTable {
        ticker: ticker.to_string(),
        rows,
    })
}

fn decode_holders_row(row: &Row) -> Result<HoldersRow, MarketDataError> {
    if row.len() < HOLDER_COLUMNS {
        return Err(MarketDataError::decode(
            PROVIDER_ID,
            format!("Expected {} holder columns, found {}", HOLDER_COLUMNS, row.len()),
        ));
    }

    Ok(HoldersRow {
        holder: row[0].clone(),
        shares: parse_grouped_int(&row[1])?,
        date_reported: parse_reported_date(&row[2])?,
        pct_out: parse_percent(&row[3])?,
        value: parse_grouped_int(&row[4])?,
    })
}
