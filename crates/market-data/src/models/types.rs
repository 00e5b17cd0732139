use std::borrow::Cow;

/// Provider identifier - static constants such as "YAHOO" or "IEX"
pub type ProviderId = Cow<'static, str>;

/// Ticker symbol as understood by the selected provider (e.g. "AAPL", "bitcoin")
pub type Ticker = String;
