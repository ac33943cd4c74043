//! envseal - encrypted configuration secrets per environment
//!
//! "Commit the secrets, keep the key."
//!
//! Secrets live in an encrypted file next to the rest of an environment's
//! configuration and can be committed with it. The master key that opens
//! them comes from the `MASTER_KEY` environment variable or from a
//! `master.key` file beside (or one level above) the secrets, which stays
//! out of version control.
//!
//! Uses Fernet (AES-128-CBC + HMAC-SHA256).

pub mod codec;
pub mod edit;
pub mod error;
pub mod file;
pub mod keys;
pub mod setup;
pub mod skeleton;
pub mod token;

pub use codec::{CodecError, Fernet};
pub use edit::{edit_secrets, Editor, ExternalEditor};
pub use error::SecretsError;
pub use file::{read_secrets, save_secrets, SecretsFile, ENCRYPTED_HEADER};
pub use keys::{
    generate_key, new_master_key_file, EnvSource, KeySource, KeyStore, MasterKey, ProcessEnv,
    MASTER_KEY_ENV, MASTER_KEY_FILE,
};
pub use setup::{init_environments, SetupReport, DEFAULT_SECRETS, SECRETS_FILE};
pub use skeleton::Skeleton;
pub use token::{generate_token, SECRET_LENGTH};
