//! Encrypted secrets files
//!
//! On disk a secrets file looks like this:
//!
//! ```text
//! # This file was generated by envseal and its content is encrypted.
//! # Edit it with `envseal edit <path>`; never change the payload by hand.
//! #  [database]
//! #  password = "..."
//! #
//! gAAAAABl...
//! ```
//!
//! Every line before the payload is a comment. Reading strips all comment
//! lines and decrypts what is left, so the skeleton header is purely for
//! humans and never parsed back.
//!
//! Writes replace the file in place with no locking: when two processes
//! write the same file at once, the last one wins.

use regex::bytes::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

use crate::codec::Fernet;
use crate::error::{Result, SecretsError};
use crate::keys::{EnvSource, KeyStore, MasterKey, ProcessEnv};
use crate::skeleton::Skeleton;

/// Banner marking a file as envseal-encrypted
pub const ENCRYPTED_HEADER: &str = "# This file was generated by envseal and its content is encrypted.\n\
# Edit it with `envseal edit <path>`; never change the payload by hand.\n";

/// Line separating the header from the encrypted payload
const SEPARATOR: &str = "#\n";

fn comment_line() -> &'static Regex {
    static COMMENT_LINE: OnceLock<Regex> = OnceLock::new();
    COMMENT_LINE.get_or_init(|| Regex::new(r"\s*#[^\n]*\n").expect("comment pattern is valid"))
}

/// Remove every comment line and surrounding whitespace, leaving the payload
pub fn strip_comments(raw: &[u8]) -> Vec<u8> {
    comment_line().replace_all(raw, &b""[..]).trim_ascii().to_vec()
}

/// An encrypted secrets file and the settings used to open it
#[derive(Debug, Clone)]
pub struct SecretsFile<E = ProcessEnv> {
    path: PathBuf,
    keys: KeyStore<E>,
    skeleton: Skeleton,
    master_key: Option<MasterKey>,
}

impl SecretsFile {
    /// Secrets file using the process environment and default key names
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_key_store(path, KeyStore::new())
    }
}

impl<E: EnvSource> SecretsFile<E> {
    pub fn with_key_store(path: impl Into<PathBuf>, keys: KeyStore<E>) -> Self {
        Self {
            path: path.into(),
            keys,
            skeleton: Skeleton::default(),
            master_key: None,
        }
    }

    /// Use this key instead of looking one up
    pub fn master_key(mut self, key: MasterKey) -> Self {
        self.master_key = Some(key);
        self
    }

    pub fn skeleton(mut self, skeleton: Skeleton) -> Self {
        self.skeleton = skeleton;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Directory where key files are looked up
    pub fn scope(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn key_store(&self) -> &KeyStore<E> {
        &self.keys
    }

    /// Resolve the master key for this file
    pub fn resolve_key(&self) -> Result<MasterKey> {
        self.keys.resolve(self.scope(), self.master_key.as_ref())
    }

    /// Decrypt the file.
    ///
    /// A file without a payload (a freshly created placeholder) reads as
    /// `default`, and no key is needed for that.
    pub fn read(&self, default: &str) -> Result<String> {
        if !self.path.exists() {
            return Err(SecretsError::SecretsNotFound(self.path.clone()));
        }

        let payload = strip_comments(&fs::read(&self.path)?);
        if payload.is_empty() {
            debug!(path = %self.path.display(), "Secrets file has no payload, using default");
            return Ok(default.to_string());
        }

        let key = self.resolve_key()?;
        let plaintext = Fernet::new(&key)?.decrypt(&payload)?;
        debug!(path = %self.path.display(), "Decrypted secrets");
        Ok(String::from_utf8(plaintext)?)
    }

    /// Encrypt `content` and replace the file with it.
    ///
    /// The previous file is not backed up.
    pub fn write(&self, content: &str) -> Result<()> {
        let key = self.resolve_key()?;
        let payload = Fernet::new(&key)?.encrypt(content.as_bytes());

        let header = self.skeleton.header(content);
        let mut out = Vec::with_capacity(
            ENCRYPTED_HEADER.len() + header.len() + SEPARATOR.len() + payload.len() + 1,
        );
        out.extend_from_slice(ENCRYPTED_HEADER.as_bytes());
        if !header.is_empty() {
            out.extend_from_slice(header.as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(SEPARATOR.as_bytes());
        out.extend_from_slice(&payload);

        fs::write(&self.path, out)?;
        debug!(
            path = %self.path.display(),
            skeleton = !header.is_empty(),
            "Wrote encrypted secrets"
        );
        Ok(())
    }
}

/// Decrypt the secrets at `path`, looking the key up in the usual places
pub fn read_secrets(path: impl Into<PathBuf>, default: &str) -> Result<String> {
    SecretsFile::new(path).read(default)
}

/// Encrypt `content` into `path`, looking the key up in the usual places
pub fn save_secrets(path: impl Into<PathBuf>, content: &str) -> Result<()> {
    SecretsFile::new(path).write(content)
}
