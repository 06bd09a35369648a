/// Classification for retry policy.
///
/// Used by [`BackoffPolicy`](crate::throttle::BackoffPolicy) to decide whether a
/// failed upstream round trip is worth repeating.
///
/// # Behavior Summary
///
/// | Class | Retry after a delay? |
/// |-------|----------------------|
/// | `Never` | No |
/// | `WithBackoff` | Yes, until the attempt budget is spent |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - missing credentials, invalid request or a 4xx answer.
    /// The call is fundamentally wrong and repeating it won't help.
    Never,

    /// Retry with exponential backoff.
    ///
    /// Used for transport failures: timeouts, dropped connections, 5xx and
    /// HTTP 429 answers, or bodies that could not be decoded. Payload-level
    /// throttling is not an error and never reaches this classification;
    /// it is handled by key rotation instead.
    WithBackoff,
}
