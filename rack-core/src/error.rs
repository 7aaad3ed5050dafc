use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or building table configuration.
///
/// Ticking never fails: once a table is built, the engine only panics on a
/// broken grid invariant.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// No file with that name under the loader's base path.
    #[error("configuration not found: {0}")]
    NotFound(String),

    /// A `custom` rule names a handler the caller did not provide.
    #[error("unknown collision handler: {0}")]
    UnknownHandler(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
