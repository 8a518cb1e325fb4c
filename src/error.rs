use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Kubelet transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Kubelet returned unexpected status {code}: {body}")]
    UpstreamStatus { code: u16, body: String },

    #[error("Failed to decode stats summary: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
