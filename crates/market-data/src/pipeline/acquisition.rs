use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::errors::{ErrorCategory, MarketDataError};
use crate::models::{Chart, Holders, Interval, OhlcPoint, Ticker, TimeWindow};
use crate::provider::{build_client, build_provider, MarketDataProvider};

use super::rate_limiter::RateLimiter;

/// Upper bound on series buffered in a batch sink before producers wait.
const SINK_CAPACITY: usize = 64;

/// Outcome counts of one batch, available once the sink has closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Tickers asked for.
    pub requested: usize,
    /// Series delivered to the sink.
    pub delivered: usize,
    /// Tickers dropped because their fetch failed.
    pub failed: usize,
    /// Whether the batch's cancellation token fired before completion.
    pub cancelled: bool,
}

/// Receiving side of a batch.
///
/// Drain [`recv`](Self::recv) until it returns `None`; the sink closes only
/// after every fetch of the batch has finished. Arrival order across
/// tickers is unspecified.
#[derive(Debug)]
pub struct BatchReceiver {
    charts: mpsc::Receiver<Chart>,
    completion: JoinHandle<BatchSummary>,
}

impl BatchReceiver {
    /// Next delivered series, or `None` once the batch is complete.
    pub async fn recv(&mut self) -> Option<Chart> {
        self.charts.recv().await
    }

    /// Wait for the batch supervisor and return its counts.
    ///
    /// Undelivered series still buffered in the sink are discarded.
    pub async fn summary(self) -> BatchSummary {
        drop(self.charts);
        self.completion.await.unwrap_or_else(|e| {
            warn!("Batch supervisor did not finish cleanly: {}", e);
            BatchSummary::default()
        })
    }

    /// Drain the sink until it closes, then return everything with the counts.
    pub async fn collect(mut self) -> (Vec<Chart>, BatchSummary) {
        let mut charts = Vec::new();
        while let Some(chart) = self.recv().await {
            charts.push(chart);
        }
        (charts, self.summary().await)
    }
}

/// Single entry point for fetching market data through the configured provider.
///
/// Every upstream request first takes a permit from the provider's rate
/// limiter. All waits, both for permits and for responses, end early with
/// [`MarketDataError::Cancelled`] when the caller's token fires.
pub struct AcquisitionPipeline {
    provider: Arc<dyn MarketDataProvider>,
    limiter: Arc<RateLimiter>,
}

impl AcquisitionPipeline {
    /// Validate `config` and bind the provider it selects.
    pub fn new(config: &PipelineConfig) -> Result<Self, MarketDataError> {
        config.validate()?;

        let client = build_client(config.dial_timeout, config.request_timeout)?;
        let provider = build_provider(config, client);
        info!(
            "Acquisition pipeline using {} (bursts: {})",
            provider.id(),
            config.bursts
        );

        Ok(Self::with_provider(provider, config.bursts))
    }

    /// Bind an already constructed provider.
    pub fn with_provider(provider: Arc<dyn MarketDataProvider>, bursts: u32) -> Self {
        let limiter = RateLimiter::new(provider.id(), provider.rate_limit(), bursts);
        Self {
            provider,
            limiter: Arc::new(limiter),
        }
    }

    pub fn provider(&self) -> &Arc<dyn MarketDataProvider> {
        &self.provider
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Fetch the OHLC series of one ticker.
    ///
    /// `interval` and the window are validated before any permit is taken.
    pub async fn get_ohlc(
        &self,
        ticker: &str,
        interval: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<OhlcPoint>, MarketDataError> {
        let interval: Interval = interval.parse()?;
        let window = TimeWindow::new(from, to)?;

        self.limiter.acquire(cancel).await?;
        cancellable(cancel, self.provider.get_ohlc(ticker, interval, &window)).await
    }

    /// Fetch the shareholder composition of one ticker.
    pub async fn get_holders(
        &self,
        ticker: &str,
        cancel: &CancellationToken,
    ) -> Result<Holders, MarketDataError> {
        if !self.provider.capabilities().supports_holders {
            return Err(MarketDataError::not_supported("holders", self.provider.id()));
        }

        self.limiter.acquire(cancel).await?;
        cancellable(cancel, self.provider.get_holders(ticker)).await
    }

    /// Fetch the series of many tickers concurrently.
    ///
    /// Only validation can fail the call itself. Each ticker whose fetch
    /// fails is logged and left out of the sink without affecting the
    /// others. Series already delivered stay delivered if `cancel` fires.
    ///
    /// The batch runs on the current Tokio runtime; called from outside one,
    /// this returns [`MarketDataError::InvalidConfig`] instead of starting.
    pub fn get_ohlc_batch(
        &self,
        tickers: Vec<Ticker>,
        interval: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Result<BatchReceiver, MarketDataError> {
        let interval: Interval = interval.parse()?;
        let window = TimeWindow::new(from, to)?;
        let runtime = Handle::try_current().map_err(|_| MarketDataError::InvalidConfig {
            message: "Batch requests must be started from within a Tokio runtime".to_string(),
        })?;

        let (sink, charts) = mpsc::channel(tickers.len().clamp(1, SINK_CAPACITY));
        let batch = Batch {
            provider: Arc::clone(&self.provider),
            limiter: Arc::clone(&self.limiter),
            interval,
            window,
            cancel,
        };
        let completion = runtime.spawn(batch.run(tickers, sink));

        Ok(BatchReceiver { charts, completion })
    }
}

/// Race `future` against cancellation, preferring cancellation.
async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T, MarketDataError>>,
) -> Result<T, MarketDataError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MarketDataError::Cancelled),
        result = future => result,
    }
}

fn log_failure(ticker: &str, error: &MarketDataError) {
    match error.category() {
        ErrorCategory::Cancelled => debug!("Dropping {}: {}", ticker, error),
        category => warn!("Dropping {} ({}): {}", ticker, category, error),
    }
}

/// Everything a batch supervisor and its workers share.
#[derive(Clone)]
struct Batch {
    provider: Arc<dyn MarketDataProvider>,
    limiter: Arc<RateLimiter>,
    interval: Interval,
    window: TimeWindow,
    cancel: CancellationToken,
}

impl Batch {
    /// Supervise the batch; `sink` is dropped, closing the channel, only
    /// once every worker has finished.
    async fn run(self, tickers: Vec<Ticker>, sink: mpsc::Sender<Chart>) -> BatchSummary {
        let requested = tickers.len();
        let delivered = if tickers.is_empty() {
            0
        } else if self.provider.capabilities().supports_batch {
            self.run_native(tickers, &sink).await
        } else {
            self.run_fan_out(tickers, &sink).await
        };
        drop(sink);

        let summary = BatchSummary {
            requested,
            delivered,
            failed: requested.saturating_sub(delivered),
            cancelled: self.cancel.is_cancelled(),
        };
        info!(
            "{} batch finished: {} delivered, {} failed of {} requested",
            self.provider.id(),
            summary.delivered,
            summary.failed,
            summary.requested
        );
        summary
    }

    /// Hand the whole set to the provider under a single permit.
    async fn run_native(&self, tickers: Vec<Ticker>, sink: &mpsc::Sender<Chart>) -> usize {
        debug!("Delegating {} tickers to {} batch", tickers.len(), self.provider.id());

        let result = match self.limiter.acquire(&self.cancel).await {
            Ok(()) => {
                cancellable(
                    &self.cancel,
                    self.provider
                        .get_ohlc_batch(&tickers, self.interval, &self.window, sink.clone()),
                )
                .await
            }
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            log_failure(&format!("{} tickers", tickers.len()), &e);
            0
        })
    }

    /// One rate-limited worker per ticker.
    async fn run_fan_out(&self, tickers: Vec<Ticker>, sink: &mpsc::Sender<Chart>) -> usize {
        let mut workers = JoinSet::new();
        for ticker in tickers {
            let batch = self.clone();
            let sink = sink.clone();
            workers.spawn(async move {
                let result = batch.fetch_one(&ticker, &sink).await;
                (ticker, result)
            });
        }

        let mut delivered = 0;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((_, Ok(()))) => delivered += 1,
                Ok((ticker, Err(e))) => log_failure(&ticker, &e),
                Err(e) => warn!("Batch worker panicked or was aborted: {}", e),
            }
        }
        delivered
    }

    async fn fetch_one(&self, ticker: &str, sink: &mpsc::Sender<Chart>) -> Result<(), MarketDataError> {
        self.limiter.acquire(&self.cancel).await?;
        let points = cancellable(
            &self.cancel,
            self.provider.get_ohlc(ticker, self.interval, &self.window),
        )
        .await?;

        debug!("Delivering {} points for {}", points.len(), ticker);
        sink.send(Chart::new(ticker, points))
            .await
            .map_err(|_| MarketDataError::Cancelled)
    }
}
