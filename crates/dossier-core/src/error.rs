use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Errors raised while building or querying the platform capability registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read platforms file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse platforms file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid platform registry: {0}")]
    Validation(String),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}
