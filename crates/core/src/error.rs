use thiserror::Error;

pub type WreckshopResult<T> = Result<T, WreckshopError>;

#[derive(Error, Debug)]
pub enum WreckshopError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
