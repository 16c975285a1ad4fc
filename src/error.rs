use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Failure to bring up the supervised threat-matching server.
///
/// Fatal to resolver construction: callers must not issue lookups against a
/// resolver whose server never came up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to spawn threat-matching server: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("threat-matching server not reachable after {0:?}")]
    Timeout(Duration),
}

/// Failure of a single threat lookup. Never retried.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("threat lookup request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("threat-matching server answered {0}")]
    Status(StatusCode),
}
