use thiserror::Error;

#[derive(Error, Debug)]
pub enum CirclogError {
    #[error("API request failed with status {status}")]
    Api { status: u16 },

    #[error("Unexpected response shape: {0}")]
    Schema(String),

    #[error("No project configured; pass --project or set one in the config file")]
    NoProjectConfigured,

    #[error("Malformed project {0:?}; expected <vcs>/<username>/<reponame>")]
    MalformedProjectIdentity(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CirclogError>;
