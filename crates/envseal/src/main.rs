//! envseal - encrypted configuration secrets per environment
//!
//! Commands:
//! - init <DIR>: Create environment directories, key and secrets files
//! - edit <PATH>: Edit an encrypted secrets file in your editor
//! - show <PATH>: Print decrypted secrets
//! - encrypt <PATH>: Encrypt plaintext from stdin or a file into PATH
//! - key new|generate|which: Create keys or show which key applies
//! - token [LENGTH]: Print a random token for a new secret value

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use envseal::{
    edit_secrets, generate_key, generate_token, init_environments, ExternalEditor, KeyStore,
    ProcessEnv, SecretsFile, Skeleton, DEFAULT_SECRETS, SECRET_LENGTH,
};
use envseal_core::Config;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const EDIT_INTRO: &str = "You can edit your secrets now, do not forget to save your changes.\n\
Close the editor to proceed.";

const EDIT_OUTRO: &str = "Your secrets are safe.";

#[derive(Parser)]
#[command(name = "envseal")]
#[command(about = "Encrypted configuration secrets - commit the secrets, keep the key")]
#[command(version)]
#[command(after_help = r#"KEY LOOKUP (first match wins):
    1. MASTER_KEY environment variable
    2. master.key beside the secrets file
    3. master.key in the parent directory

SECURITY:
    - Secrets are encrypted with Fernet (AES-128-CBC + HMAC-SHA256)
    - Never commit master.key; add it to .gitignore
    - Only key names appear unencrypted, in the file header"#)]
struct Cli {
    /// Config file (default: ~/.config/envseal/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create development/production/testing directories with keys and secrets
    Init {
        /// Config directory to create
        dir: PathBuf,
        /// One key per environment instead of a shared key
        #[arg(long)]
        split: bool,
    },

    /// Decrypt secrets, open them in your editor, and encrypt them again
    Edit {
        /// Encrypted secrets file
        path: PathBuf,
    },

    /// Print decrypted secrets
    Show {
        /// Encrypted secrets file
        path: PathBuf,
        /// Print the TOML document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encrypt plaintext into a secrets file (reads stdin unless --input)
    Encrypt {
        /// Encrypted secrets file to write
        path: PathBuf,
        /// Plaintext file to encrypt
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Manage master keys
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Print a random token to use as a new secret value
    Token {
        /// Number of characters
        #[arg(default_value_t = SECRET_LENGTH)]
        length: usize,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Write a new master key file into a directory
    New {
        /// Directory for the key file
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Replace an existing key file (secrets encrypted with it become unreadable)
        #[arg(long)]
        force: bool,
    },

    /// Print a new master key without saving it
    Generate,

    /// Show where the key for a secrets file comes from
    Which {
        /// Encrypted secrets file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Init { dir, split } => cmd_init(&config, &dir, split),
        Commands::Edit { path } => cmd_edit(&config, &path),
        Commands::Show { path, json } => cmd_show(&config, &path, json),
        Commands::Encrypt { path, input } => cmd_encrypt(&config, &path, input.as_deref()),
        Commands::Key { command } => match command {
            KeyCommands::New { dir, force } => cmd_key_new(&config, &dir, force),
            KeyCommands::Generate => cmd_key_generate(),
            KeyCommands::Which { path } => cmd_key_which(&config, &path),
        },
        Commands::Token { length } => cmd_token(length),
    }
}

fn key_store(config: &Config) -> KeyStore {
    KeyStore::from_config(&config.key, ProcessEnv)
}

fn secrets_file(config: &Config, path: &Path) -> SecretsFile {
    SecretsFile::with_key_store(path, key_store(config))
        .skeleton(Skeleton::from_config(&config.skeleton))
}

/// Scaffold environment directories
fn cmd_init(config: &Config, dir: &Path, split: bool) -> Result<()> {
    let keys = key_store(config);
    let report = init_environments(dir, split, &keys)?;

    for path in &report.created {
        println!("success: Created {}", path.display());
    }
    for path in &report.skipped {
        println!("warning: Kept existing {}", path.display());
    }

    println!();
    println!("Add `{}` to your .gitignore.", keys.file_name());
    Ok(())
}

/// Edit secrets in the user's editor
fn cmd_edit(config: &Config, path: &Path) -> Result<()> {
    let file = secrets_file(config, path);
    let editor = ExternalEditor::detect(config.editor.as_deref());

    println!("{}", EDIT_INTRO);
    edit_secrets(&file, DEFAULT_SECRETS, &editor)?;
    println!("{}", EDIT_OUTRO);
    Ok(())
}

/// Print decrypted secrets
fn cmd_show(config: &Config, path: &Path, json: bool) -> Result<()> {
    let content = secrets_file(config, path).read("")?;

    if json {
        let document: toml::Table =
            toml::from_str(&content).context("Secrets are not a valid TOML document")?;
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", content);
        if !content.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

/// Encrypt plaintext into a secrets file
fn cmd_encrypt(config: &Config, path: &Path, input: Option<&Path>) -> Result<()> {
    let content = match input {
        Some(input) => fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read plaintext from stdin")?;
            buffer
        }
    };

    secrets_file(config, path).write(&content)?;
    println!("success: Encrypted {}", path.display());
    Ok(())
}

/// Write a new key file
fn cmd_key_new(config: &Config, dir: &Path, force: bool) -> Result<()> {
    let keys = key_store(config);
    let path = dir.join(keys.file_name());

    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to replace it; secrets encrypted with it will become unreadable.",
            path.display()
        );
    }

    fs::create_dir_all(dir)?;
    keys.write_new_key_file(dir)?;
    println!("success: Wrote {}", path.display());
    println!("Keep it out of version control.");
    Ok(())
}

/// Print a fresh key
fn cmd_key_generate() -> Result<()> {
    let key = generate_key();
    println!("{}", String::from_utf8_lossy(key.as_bytes()));
    Ok(())
}

/// Show which key a secrets file would use
fn cmd_key_which(config: &Config, path: &Path) -> Result<()> {
    let file = secrets_file(config, path);
    let (_, source) = file.key_store().resolve_with_source(file.scope(), None)?;
    println!("{}", source);
    Ok(())
}

/// Print a random token
fn cmd_token(length: usize) -> Result<()> {
    println!("{}", generate_token(length));
    Ok(())
}
