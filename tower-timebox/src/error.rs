/// Errors produced by the timeout middleware itself.
///
/// Handler timeouts are not errors at this level: the fallback response is
/// written and the call succeeds. Handler writes after a timeout fail with
/// [`timebox::SinkError::HandlerTimeout`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum TimeoutError {
    /// The handler task was cancelled by the runtime before it finished,
    /// typically because the runtime is shutting down.
    #[error("handler task was aborted before completing")]
    Aborted,
}
