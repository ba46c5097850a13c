use thiserror::Error;

// Errors raised by the host-owned strategy registry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("congestion control name must not be empty")]
    EmptyName,

    #[error("congestion control `{0}` is already registered")]
    AlreadyRegistered(String),

    #[error("congestion control `{0}` is not registered")]
    NotFound(String),

    #[error("congestion control `{0}` is built in and cannot be unregistered")]
    Builtin(String),

    #[error("private state of `{name}` is {size} bytes, the host reserves {capacity}")]
    PrivateStateTooLarge {
        name: String,
        size: usize,
        capacity: usize,
    },
}

// Errors raised while loading congestion control configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown congestion control algorithm: {0}")]
    UnknownAlgorithm(String),
}
