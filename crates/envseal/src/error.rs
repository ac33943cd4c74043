//! Error types for reading and writing secrets

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

/// Errors raised by the secrets engine
#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("I went looking for `{}` but it does not exist. You must specify the path of your secrets file.", .0.display())]
    SecretsNotFound(PathBuf),

    #[error(
        "Key not found. Either pass a master key explicitly, put a `{file}` beside your secrets \
         file or in its parent folder, or set the environment variable `{env}` with the key value \
         (the environment variable takes precedence over the file)."
    )]
    KeyNotFound { file: String, env: String },

    #[error("Invalid master key: {0}")]
    InvalidKey(String),

    #[error("Decryption failed: invalid key or corrupted data")]
    Decryption,

    #[error("Decrypted secrets are not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CodecError> for SecretsError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidKey(reason) => Self::InvalidKey(reason),
            CodecError::Decryption => Self::Decryption,
        }
    }
}

pub type Result<T, E = SecretsError> = std::result::Result<T, E>;
