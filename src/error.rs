use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("unknown gate type \"{0}\"")]
    UnknownGate(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
