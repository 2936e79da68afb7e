//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Provider setup error.
    #[error("provider error: {0}")]
    Provider(#[from] reshuffle_providers::ProviderError),

    /// Secret reference could not be resolved.
    #[error("secret error: {0}")]
    Secret(String),

    /// The run finished with errors; the transcript says which.
    #[error("run failed")]
    RunFailed,

    /// Output could not be rendered.
    #[error("output error: {0}")]
    Output(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_convert() {
        let err: ClientError = reshuffle_providers::ProviderError::configuration("bad token")
            .with_provider("google")
            .into();
        assert_eq!(
            err.to_string(),
            "provider error: [google] configuration_error: bad token"
        );
    }
}
