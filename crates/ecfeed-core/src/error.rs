use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response body: {0}")]
    Body(#[source] std::io::Error),

    #[error("Cannot read credential file {path}: {source}")]
    Credential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection failed: {0}")]
    Connection(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Model id is empty")]
    EmptyModel,

    #[error("File not found: {0}")]
    MissingFile(PathBuf),

    #[error("No keystore found, searched: {}", display_paths(.searched))]
    KeystoreNotFound { searched: Vec<PathBuf> },

    #[error("Keystore {0} must be converted to PEM by a credential provider")]
    UnconvertedKeystore(PathBuf),

    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to spawn stream worker: {0}")]
    Spawn(#[source] std::io::Error),
}
