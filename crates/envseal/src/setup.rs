//! Environment scaffolding
//!
//! Lays out a config directory with one folder per environment:
//!
//! ```text
//! config/
//! ├── master.key            (shared key, omitted with --split)
//! ├── development/
//! ├── production/
//! │   └── secrets.enc.toml
//! └── testing/
//! ```
//!
//! With split keys, development and production each get their own
//! `master.key` and `secrets.enc.toml`, so a leaked development key does
//! not unlock production.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::SecretsError;
use crate::file::SecretsFile;
use crate::keys::{EnvSource, KeyStore, MasterKey};

/// Environments created by [`init_environments`]
pub const ENVIRONMENTS: [&str; 3] = ["development", "production", "testing"];

/// Name of the encrypted secrets file inside an environment directory
pub const SECRETS_FILE: &str = "secrets.enc.toml";

/// Starting content for a new secrets file
pub const DEFAULT_SECRETS: &str = "\
# Secrets for this environment, in TOML.
# Only the key names show up unencrypted in the file header.
#
# [database]
# password = \"...\"
";

/// What scaffolding created and what already existed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub created: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Create the environment directories under `root`, with their key and
/// secrets files.
///
/// Existing key or secrets files are left alone; overwriting a key would
/// make the secrets it protects unreadable.
pub fn init_environments<E: EnvSource + Clone>(
    root: &Path,
    split: bool,
    keys: &KeyStore<E>,
) -> Result<SetupReport> {
    let mut report = SetupReport::default();
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create {}", root.display()))?;

    let shared_key = if split {
        None
    } else {
        Some(ensure_key_file(root, keys, &mut report)?)
    };

    for env in ENVIRONMENTS {
        let dir = root.join(env);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let gets_secrets = match env {
            "production" => true,
            "development" => split,
            _ => false,
        };
        if !gets_secrets {
            continue;
        }

        let key = match &shared_key {
            Some(key) => key.clone(),
            None => ensure_key_file(&dir, keys, &mut report)?,
        };
        ensure_secrets_file(&dir, keys, key, &mut report)?;
    }

    Ok(report)
}

/// Return the key stored in `dir`, generating the key file if it is missing
fn ensure_key_file<E: EnvSource>(
    dir: &Path,
    keys: &KeyStore<E>,
    report: &mut SetupReport,
) -> Result<MasterKey> {
    let path = dir.join(keys.file_name());
    if path.exists() {
        warn!(path = %path.display(), "Key file already exists, keeping it");
        let key = keys
            .key_file(dir)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .ok_or_else(|| SecretsError::KeyNotFound {
                file: keys.file_name().to_string(),
                env: keys.env_var().to_string(),
            })
            .with_context(|| format!("{} is empty", path.display()))?;
        report.skipped.push(path);
        return Ok(key);
    }

    let key = keys
        .write_new_key_file(dir)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Created master key");
    report.created.push(path);
    Ok(key)
}

/// Write the secrets template with the environment's own key file, never
/// with a key picked up from the process environment
fn ensure_secrets_file<E: EnvSource + Clone>(
    dir: &Path,
    keys: &KeyStore<E>,
    key: MasterKey,
    report: &mut SetupReport,
) -> Result<()> {
    let path = dir.join(SECRETS_FILE);
    if path.exists() {
        warn!(path = %path.display(), "Secrets file already exists, keeping it");
        report.skipped.push(path);
        return Ok(());
    }

    SecretsFile::with_key_store(&path, keys.clone())
        .master_key(key)
        .write(DEFAULT_SECRETS)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Created secrets file");
    report.created.push(path);
    Ok(())
}
