use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tinkerbell_market_data::{PipelineConfig, ProviderKind};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Parser, Debug)]
#[command(
    name = "tb",
    version,
    about = "Get price history and holder information for the given tickers"
)]
pub struct Cli {
    #[command(flatten)]
    pub options: CommonOptions,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print tables of price history (OHLC) for the selected tickers.
    Chart(ChartArgs),
    /// Print holders breakdown and top holders for the selected tickers.
    Hold,
}

#[derive(Args, Debug)]
pub struct ChartArgs {
    /// Start of the range (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS, UTC). Defaults to 7 days ago.
    #[arg(long, env = "TB_FROM", value_parser = parse_date)]
    pub from: Option<DateTime<Utc>>,

    /// End of the range (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS, UTC). Defaults to now.
    #[arg(long, env = "TB_TO", value_parser = parse_date)]
    pub to: Option<DateTime<Utc>>,

    /// Bar interval: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
    #[arg(long, env = "TB_INTERVAL", default_value = "1d")]
    pub interval: String,
}

impl ChartArgs {
    /// Resolve the requested range against `now`.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = self.from.unwrap_or(now - chrono::Duration::days(7));
        let to = self.to.unwrap_or(now);
        (from, to)
    }
}

#[derive(Args, Debug)]
pub struct CommonOptions {
    /// Market data provider: yahoo, iex or coingecko.
    #[arg(long, global = true, env = "TB_PROVIDER", default_value = "yahoo")]
    pub provider: ProviderKind,

    /// Yahoo Finance base URL (holders pages).
    #[arg(long, global = true, env = "TB_YAHOO_FINANCE_URL")]
    pub yahoo_finance_url: Option<String>,

    /// Yahoo Finance query URL (charts).
    #[arg(long, global = true, env = "TB_YAHOO_FINANCE_QUERY_URL")]
    pub yahoo_finance_query_url: Option<String>,

    /// IEX Cloud query URL.
    #[arg(long, global = true, env = "TB_IEX_CLOUD_QUERY_URL")]
    pub iex_cloud_query_url: Option<String>,

    /// Secret token for the IEX Cloud API.
    #[arg(long, global = true, env = "TB_IEX_CLOUD_SECRET_TOKEN", hide_env_values = true)]
    pub iex_cloud_secret_token: Option<String>,

    /// CoinGecko query URL.
    #[arg(long, global = true, env = "TB_COINGECKO_QUERY_URL")]
    pub coingecko_query_url: Option<String>,

    /// Secret token for the paid CoinGecko API.
    #[arg(long, global = true, env = "TB_COINGECKO_SECRET_TOKEN", hide_env_values = true)]
    pub coingecko_secret_token: Option<String>,

    /// Comma separated ticker names.
    #[arg(long, global = true, env = "TB_TICKERS", value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// Timeout for connecting to a provider, e.g. 5s or 500ms.
    #[arg(long, global = true, env = "TB_DIAL_TIMEOUT", value_parser = parse_duration)]
    pub dial_timeout: Option<Duration>,

    /// Timeout for a whole request, e.g. 5s or 1m.
    #[arg(long, global = true, env = "TB_REQUEST_TIMEOUT", value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Allow bursts of at most N requests.
    #[arg(long, global = true, env = "TB_BURSTS")]
    pub bursts: Option<u32>,

    /// Print the effective configuration to stderr.
    #[arg(long, global = true)]
    pub print_config: bool,

    /// Log provider calls at debug level.
    #[arg(long, global = true, env = "TB_DEBUG")]
    pub debug: bool,
}

impl CommonOptions {
    /// Overlay the given flags on the default configuration.
    pub fn to_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            provider: self.provider,
            yahoo_finance_url: self
                .yahoo_finance_url
                .clone()
                .unwrap_or(defaults.yahoo_finance_url),
            yahoo_finance_query_url: self
                .yahoo_finance_query_url
                .clone()
                .unwrap_or(defaults.yahoo_finance_query_url),
            iex_cloud_query_url: self
                .iex_cloud_query_url
                .clone()
                .unwrap_or(defaults.iex_cloud_query_url),
            iex_cloud_secret_token: self.iex_cloud_secret_token.clone(),
            coingecko_query_url: self
                .coingecko_query_url
                .clone()
                .unwrap_or(defaults.coingecko_query_url),
            coingecko_secret_token: self.coingecko_secret_token.clone(),
            dial_timeout: self.dial_timeout.unwrap_or(defaults.dial_timeout),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            bursts: self.bursts.unwrap_or(defaults.bursts),
            tickers: self
                .tickers
                .iter()
                .map(|ticker| ticker.trim())
                .filter(|ticker| !ticker.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Parse `YYYY-MM-DD` (midnight UTC) or `YYYY-MM-DDTHH:MM:SS` (UTC).
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
        .map(|dt| dt.and_utc())
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS", value))
}

/// Parse a duration such as `500ms`, `5s`, `2m` or a bare number of seconds.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount: u64 = amount
        .parse()
        .with_context(|| format!("Invalid duration '{}'", value))?;

    match unit {
        "" | "s" => Ok(Duration::from_secs(amount)),
        "ms" => Ok(Duration::from_millis(amount)),
        "m" => Ok(Duration::from_secs(amount * 60)),
        other => bail!("Unknown duration unit '{}' in '{}'", other, value),
    }
}

/// Format as a date when `timestamp` is midnight UTC, else as date and time.
pub fn format_timestamp<Tz: chrono::TimeZone>(timestamp: &DateTime<Tz>) -> String {
    let utc = timestamp.with_timezone(&Utc);
    if utc.time() == chrono::NaiveTime::MIN {
        utc.format(DATE_FORMAT).to_string()
    } else {
        utc.format(DATE_TIME_FORMAT).to_string()
    }
}
