//! Master keys - generation and lookup
//!
//! A secrets file is encrypted with exactly one master key. The key is
//! resolved, highest precedence first, from:
//!
//! 1. an explicit key passed by the caller
//! 2. the `MASTER_KEY` environment variable (trimmed, ignored when empty)
//! 3. a `master.key` file beside the secrets file
//! 4. a `master.key` file in the parent directory
//!
//! CI and deploy environments inject the key through the environment
//! without touching the filesystem; local checkouts keep a key file next
//! to (or one level above) the secrets it unlocks.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use envseal_core::KeyConfig;
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Result, SecretsError};

/// Default key file name
pub const MASTER_KEY_FILE: &str = "master.key";

/// Default environment variable holding the key
pub const MASTER_KEY_ENV: &str = "MASTER_KEY";

/// Number of random bytes behind a generated key
const KEY_BYTES: usize = 32;

/// A symmetric master key, as stored in key files (base64url text).
///
/// The bytes are wiped on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterKey(Zeroizing<Vec<u8>>);

impl MasterKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for MasterKey {
    fn from(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }
}

impl From<String> for MasterKey {
    fn from(value: String) -> Self {
        Self::from_bytes(value.into_bytes())
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Generate a new random master key
pub fn generate_key() -> MasterKey {
    let mut raw = Zeroizing::new([0u8; KEY_BYTES]);
    OsRng.fill_bytes(&mut raw[..]);
    MasterKey::from(URL_SAFE.encode(&raw[..]))
}

/// Generate a key and write it to `dir/file_name`, replacing any existing file
pub fn new_master_key_file(dir: &Path, file_name: &str) -> Result<MasterKey> {
    let key = generate_key();
    let path = dir.join(file_name);
    fs::write(&path, key.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }

    debug!(path = %path.display(), "Wrote new master key file");
    Ok(key)
}

/// Source of environment variables.
///
/// Key lookup reads the environment through this trait so callers (and
/// tests) can supply their own variables instead of the process ones.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: EnvSource + ?Sized> EnvSource for &T {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// Where a resolved key came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Passed in by the caller
    Override,
    /// Read from the named environment variable
    Environment(String),
    /// Read from a key file
    File(PathBuf),
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => write!(f, "explicit key"),
            Self::Environment(var) => write!(f, "environment variable {}", var),
            Self::File(path) => write!(f, "key file {}", path.display()),
        }
    }
}

/// Resolves and creates master keys
#[derive(Debug, Clone)]
pub struct KeyStore<E = ProcessEnv> {
    file_name: String,
    env_var: String,
    env: E,
}

impl KeyStore {
    /// Key store reading the process environment, with default names
    pub fn new() -> Self {
        Self::with_env(ProcessEnv)
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EnvSource> KeyStore<E> {
    pub fn with_env(env: E) -> Self {
        Self {
            file_name: MASTER_KEY_FILE.to_string(),
            env_var: MASTER_KEY_ENV.to_string(),
            env,
        }
    }

    /// Key store using the names from the tool configuration
    pub fn from_config(config: &KeyConfig, env: E) -> Self {
        Self {
            file_name: config.file.clone(),
            env_var: config.env.clone(),
            env,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_env_var(mut self, env_var: impl Into<String>) -> Self {
        self.env_var = env_var.into();
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Generate a key and write it into `dir`, replacing any existing key file
    pub fn write_new_key_file(&self, dir: &Path) -> Result<MasterKey> {
        new_master_key_file(dir, &self.file_name)
    }

    /// Resolve the key for secrets living in `scope`, failing if there is none
    pub fn resolve(&self, scope: &Path, override_key: Option<&MasterKey>) -> Result<MasterKey> {
        self.resolve_with_source(scope, override_key)
            .map(|(key, _)| key)
    }

    /// Like [`resolve`](Self::resolve), also reporting where the key was found
    pub fn resolve_with_source(
        &self,
        scope: &Path,
        override_key: Option<&MasterKey>,
    ) -> Result<(MasterKey, KeySource)> {
        self.lookup(scope, override_key)?
            .ok_or_else(|| SecretsError::KeyNotFound {
                file: self.file_name.clone(),
                env: self.env_var.clone(),
            })
    }

    /// Look up the key for `scope` without requiring one to exist.
    ///
    /// An empty environment variable is skipped. A key file that holds only
    /// whitespace counts as no key at all.
    pub fn lookup(
        &self,
        scope: &Path,
        override_key: Option<&MasterKey>,
    ) -> Result<Option<(MasterKey, KeySource)>> {
        if let Some(key) = override_key {
            debug!("Using explicitly provided master key");
            return Ok(Some((key.clone(), KeySource::Override)));
        }

        if let Some(value) = self.env.var(&self.env_var) {
            let value = value.trim();
            if !value.is_empty() {
                debug!(var = %self.env_var, "Using master key from environment");
                return Ok(Some((
                    MasterKey::from(value),
                    KeySource::Environment(self.env_var.clone()),
                )));
            }
        }

        let Some(path) = self.find_key_file(scope) else {
            debug!(scope = %scope.display(), "No master key found");
            return Ok(None);
        };

        let key = read_key_file(&path)?;
        if key.is_some() {
            debug!(path = %path.display(), "Using master key file");
        }
        Ok(key.map(|key| (key, KeySource::File(path))))
    }

    /// Read the key file in `dir` only, ignoring the environment and the
    /// parent directory
    pub fn key_file(&self, dir: &Path) -> Result<Option<MasterKey>> {
        let path = dir.join(&self.file_name);
        if !path.is_file() {
            return Ok(None);
        }
        read_key_file(&path)
    }

    fn find_key_file(&self, scope: &Path) -> Option<PathBuf> {
        let local = scope.join(&self.file_name);
        if local.is_file() {
            return Some(local);
        }

        scope
            .parent()
            .map(|parent| parent.join(&self.file_name))
            .filter(|path| path.is_file())
    }
}

fn read_key_file(path: &Path) -> Result<Option<MasterKey>> {
    let content = Zeroizing::new(fs::read(path)?);
    let trimmed = content.trim_ascii();
    if trimmed.is_empty() {
        debug!(path = %path.display(), "Master key file is empty");
        return Ok(None);
    }
    Ok(Some(MasterKey::from_bytes(trimmed)))
}
