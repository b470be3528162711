use thiserror::Error;

/// Reasons a remote address could not be split into host and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AddrError {
    #[error("missing port in address")]
    MissingPort,
    #[error("too many colons in address")]
    TooManyColons,
    #[error("missing ']' in address")]
    MissingBracket,
    #[error("unexpected '[' or ']' in address")]
    UnexpectedBracket,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid port override: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    #[error("logging.category must not be empty")]
    EmptyCategory,

    #[error("invalid request id header name: {0:?}")]
    InvalidHeaderName(String),

    #[error("unknown log format {0:?} (expected \"json\" or \"pretty\")")]
    UnknownLogFormat(String),
}
