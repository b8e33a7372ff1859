//! The on-disk credential store.

use std::{
    env,
    path::{Path, PathBuf},
};

use mcm_types::{Credential, Credentials};
use tracing::{debug, info};

use crate::{ClientError, ClientResult};

/// Environment variable overriding the store location.
pub const CREDENTIALS_ENV: &str = "MCM_CREDENTIALS";

const STORE_DIR: &str = "mcm";
const STORE_FILE: &str = "credentials.toml";

/// Location of the credential store, creating its directory if needed.
///
/// `$MCM_CREDENTIALS` wins; otherwise the per-user config directory is used
/// (`$HOME/.config/mcm` on Unix, `%APPDATA%\mcm` on Windows).
pub fn default_credentials_path() -> ClientResult<PathBuf> {
    let path = match env::var_os(CREDENTIALS_ENV).filter(|value| !value.is_empty()) {
        Some(value) => PathBuf::from(value),
        None => preferred_config_dir().join(STORE_DIR).join(STORE_FILE),
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        create_private_dir(parent)?;
    }
    Ok(path)
}

#[cfg(windows)]
fn preferred_config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| fallback_home().join("Application Data"))
}

#[cfg(not(windows))]
fn preferred_config_dir() -> PathBuf {
    fallback_home().join(".config")
}

fn fallback_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn create_private_dir(dir: &Path) -> ClientResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)
            .map_err(|err| ClientError::store(dir, err))?;
    }
    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir).map_err(|err| ClientError::store(dir, err))?;
    }
    debug!(dir = %dir.display(), "created credential directory");
    Ok(())
}

/// Loaded credential store.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    document: Credentials,
}

impl CredentialStore {
    /// Parse the store at `path`, writing an empty one first if it does not exist.
    pub fn load_or_create(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let document = match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).map_err(|source| ClientError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let document = Credentials::default();
                std::fs::write(&path, toml::to_string(&document)?).map_err(|err| ClientError::store(&path, err))?;
                info!(path = %path.display(), "created empty credential store");
                document
            }
            Err(err) => return Err(ClientError::store(path, err)),
        };
        debug!(path = %path.display(), count = document.credentials.len(), "loaded credential store");
        Ok(Self { document })
    }

    /// Look up a credential by alias.
    pub fn get(&self, alias: &str) -> ClientResult<&Credential> {
        self.document
            .find(alias)
            .ok_or_else(|| ClientError::NotFound(alias.to_string()))
    }

    /// Aliases in file order.
    pub fn aliases(&self) -> Vec<String> {
        self.document.aliases().map(str::to_string).collect()
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.document.credentials
    }
}
