//! Provider configuration: service address, model and TLS credentials.
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_GENERATOR_ADDRESS: &str = "gen.ecfeed.com";
pub const DEFAULT_KEYSTORE_PASSWORD: &str = "changeit";

/// Where the TLS client credentials come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSource {
    /// PEM files already extracted from the keystore.
    Pem(PemPaths),
    /// A PKCS#12 keystore. `None` searches the default locations.
    Keystore {
        path: Option<PathBuf>,
        password: String,
    },
}

impl Default for CredentialSource {
    fn default() -> Self {
        CredentialSource::Keystore {
            path: None,
            password: DEFAULT_KEYSTORE_PASSWORD.to_string(),
        }
    }
}

/// Client certificate, private key and CA bundle, as PEM files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PemPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub ca: PathBuf,
}

impl PemPaths {
    pub fn new(
        cert: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
        ca: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
            ca: ca.into(),
        }
    }
}

/// Turns a keystore into the three PEM files the transport needs.
///
/// Extraction itself lives outside this crate.
pub trait CredentialProvider: Send + Sync {
    fn pem_paths(&self, keystore: &Path, password: &str) -> Result<PemPaths, ConfigError>;
}

/// Already-extracted PEM files; checks they exist and ignores the keystore.
impl CredentialProvider for PemPaths {
    fn pem_paths(&self, _keystore: &Path, _password: &str) -> Result<PemPaths, ConfigError> {
        self.validate()?;
        Ok(self.clone())
    }
}

impl PemPaths {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.cert, &self.key, &self.ca] {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.clone()));
            }
        }
        Ok(())
    }
}

/// Configuration for a [`crate::TestProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Model id used when a request does not override it.
    pub model: String,
    pub generator_address: String,
    /// Value of the `client` URL parameter.
    pub client_id: String,
    pub credentials: CredentialSource,
    /// Whole-request timeout. None waits as long as the stream lasts.
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            generator_address: DEFAULT_GENERATOR_ADDRESS.to_string(),
            client_id: "rust".to_string(),
            credentials: CredentialSource::default(),
            request_timeout_secs: None,
            connect_timeout_secs: Some(30),
        }
    }
}

impl ProviderConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Resolve PEM paths, converting a keystore through `provider` if needed.
    pub fn resolve_credentials(
        &self,
        provider: Option<&dyn CredentialProvider>,
    ) -> Result<PemPaths, ConfigError> {
        match &self.credentials {
            CredentialSource::Pem(pem) => {
                pem.validate()?;
                Ok(pem.clone())
            }
            CredentialSource::Keystore { path, password } => {
                let keystore = match path {
                    Some(path) if path.is_file() => path.clone(),
                    Some(path) => return Err(ConfigError::MissingFile(path.clone())),
                    None => locate_keystore(dirs::home_dir().as_deref())?,
                };
                match provider {
                    Some(provider) => provider.pem_paths(&keystore, password),
                    None => Err(ConfigError::UnconvertedKeystore(keystore)),
                }
            }
        }
    }
}

/// Default keystore locations under `home`, in search order.
pub fn keystore_candidates(home: &Path) -> Vec<PathBuf> {
    vec![
        home.join(".ecfeed").join("security.p12"),
        home.join("ecfeed").join("security.p12"),
    ]
}

/// First existing keystore among the default locations.
pub fn locate_keystore(home: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let searched = home.map(keystore_candidates).unwrap_or_default();
    let found = searched.iter().find(|p| p.is_file()).cloned();
    match found {
        Some(path) => Ok(path),
        None => Err(ConfigError::KeystoreNotFound { searched }),
    }
}
