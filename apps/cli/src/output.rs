//! Plain-text tables for the terminal.

use std::fmt;

use tinkerbell_market_data::{Chart, HoldersBreakdown, HoldersTable};
use unicode_width::UnicodeWidthStr;

use crate::cli::format_timestamp;

/// Bordered table with an optional caption below it.
#[derive(Debug, Default)]
pub struct TextTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    caption: Option<String>,
}

impl TextTable {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0);

        (0..columns)
            .map(|i| {
                std::iter::once(&self.header)
                    .chain(&self.rows)
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.width())
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn write_border(f: &mut fmt::Formatter<'_>, widths: &[usize]) -> fmt::Result {
    for width in widths {
        write!(f, "+{}", "-".repeat(width + 2))?;
    }
    writeln!(f, "+")
}

fn write_row(f: &mut fmt::Formatter<'_>, widths: &[usize], row: &[String]) -> fmt::Result {
    for (i, width) in widths.iter().enumerate() {
        let cell = row.get(i).map(String::as_str).unwrap_or("");
        let padding = width.saturating_sub(cell.width());
        write!(f, "| {}{} ", cell, " ".repeat(padding))?;
    }
    writeln!(f, "|")
}

impl fmt::Display for TextTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();

        write_border(f, &widths)?;
        write_row(f, &widths, &self.header)?;
        write_border(f, &widths)?;
        for row in &self.rows {
            write_row(f, &widths, row)?;
        }
        write_border(f, &widths)?;
        if let Some(caption) = &self.caption {
            writeln!(f, "{}", caption)?;
        }
        Ok(())
    }
}

pub fn chart_table(chart: &Chart) -> TextTable {
    let mut table = TextTable::new(["Date", "Open", "High", "Low", "Close", "Volume"])
        .caption(format!("History of '{}'.", chart.ticker));
    for point in &chart.points {
        table.push(vec![
            format_timestamp(&point.timestamp),
            format!("{:.2}", point.open),
            format!("{:.2}", point.high),
            format!("{:.2}", point.low),
            format!("{:.2}", point.close),
            point.volume.to_string(),
        ]);
    }
    table
}

pub fn breakdown_table<'a>(breakdowns: impl IntoIterator<Item = &'a HoldersBreakdown>) -> TextTable {
    let mut table = TextTable::new([
        "Name",
        "% of Shares Held by All Insider",
        "% of Shares Held by Institutions",
        "% of Float Held by Institutions",
        "Number of Institutions Holding Shares",
    ])
    .caption("Major Holders Breakdown.");
    for breakdown in breakdowns {
        table.push(vec![
            breakdown.ticker.clone(),
            format!("{:.2}", breakdown.pct_shares_held_by_insiders),
            format!("{:.2}", breakdown.pct_shares_held_by_institutions),
            format!("{:.2}", breakdown.pct_float_held_by_institutions),
            breakdown.institutions_count.to_string(),
        ]);
    }
    table
}

pub fn holders_table(holders: &HoldersTable, title: &str) -> TextTable {
    let mut table = TextTable::new(["Holder", "Shares", "Date Reported", "% Out", "Value"])
        .caption(format!("{} '{}'.", title, holders.ticker));
    for row in &holders.rows {
        table.push(vec![
            row.holder.clone(),
            row.shares.to_string(),
            row.date_reported.to_string(),
            format!("{:.2}", row.pct_out),
            row.value.to_string(),
        ]);
    }
    table
}
