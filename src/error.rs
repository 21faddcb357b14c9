use thiserror::Error;

/// Errors that cross the engine's API boundary.
///
/// Everything recoverable is reported through `StatementResult::warnings`
/// instead; a parse only fails outright when its inputs are unusable.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bank profile failed validation (bad regex, unknown strategy,
    /// missing strategy config).
    #[error("invalid bank profile: {0}")]
    ProfileInvalid(String),

    /// The token stream violated its ordering contract and could not be
    /// normalized.
    #[error("invalid token stream: {0}")]
    StreamInvalid(String),

    /// Cancellation was requested before any line was processed.
    ///
    /// A cancellation mid-parse does not produce this error; it returns a
    /// `StatementResult` with `partial` set instead.
    #[error("parse cancelled")]
    Cancelled,
}
