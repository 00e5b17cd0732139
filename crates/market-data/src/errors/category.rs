/// Coarse classification of a [`MarketDataError`](super::MarketDataError).
///
/// The pipeline uses it to log isolated per-ticker failures without
/// matching on every variant.
///
/// | Category | Raised | Network touched? |
/// |----------|--------|------------------|
/// | `Validation` | before any request | No |
/// | `Unsupported` | before any request | No |
/// | `Transport` | connect, timeout, non-success status | Yes |
/// | `Decode` | malformed payload or missing structure | Yes |
/// | `Cancelled` | caller aborted a permit wait or request | Maybe |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorCategory {
    /// Bad input: unknown interval, reversed window, unusable configuration.
    Validation,

    /// The provider lacks the requested capability.
    Unsupported,

    /// Connection failure, timeout, or non-success HTTP status.
    Transport,

    /// The provider answered but the payload could not be understood.
    Decode,

    /// The caller's cancellation signal fired.
    Cancelled,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Transport => write!(f, "transport"),
            Self::Decode => write!(f, "decode"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
