//! Interactive editing of encrypted secrets
//!
//! The plaintext only ever lives in a private temporary file while the
//! editor is open.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::error::SecretsError;
use crate::file::SecretsFile;
use crate::keys::{EnvSource, ProcessEnv};

/// Editor used when nothing else is configured
const FALLBACK_EDITOR: &str = "vi";

/// Something that lets a human change text
pub trait Editor {
    /// Return the edited version of `content`. `extension` (e.g. `.toml`)
    /// hints at the format for syntax highlighting.
    fn edit(&self, content: &str, extension: &str) -> Result<String>;
}

/// Runs an external editor command on a temporary file.
///
/// The command is split on whitespace into a program and its arguments,
/// with no shell quoting: `code --wait` works, but a program path that
/// contains spaces has to be reached through a wrapper script or `PATH`.
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Pick the editor: configured command, then `$VISUAL`, then `$EDITOR`,
    /// then `vi`.
    pub fn detect(configured: Option<&str>) -> Self {
        Self::detect_with(configured, &ProcessEnv)
    }

    fn detect_with(configured: Option<&str>, env: &impl EnvSource) -> Self {
        let command = configured
            .map(str::to_string)
            .or_else(|| env.var("VISUAL"))
            .or_else(|| env.var("EDITOR"))
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_EDITOR.to_string());
        Self::new(command)
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Editor for ExternalEditor {
    fn edit(&self, content: &str, extension: &str) -> Result<String> {
        let mut file = tempfile::Builder::new()
            .prefix("envseal-")
            .suffix(extension)
            .tempfile()
            .context("Failed to create temporary file")?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        let mut parts = self.command.split_whitespace();
        let program = parts.next().context("Editor command is empty")?;

        debug!(editor = %self.command, "Opening editor");
        let status = Command::new(program)
            .args(parts)
            .arg(file.path())
            .status()
            .with_context(|| format!("Failed to run editor `{}`", self.command))?;

        if !status.success() {
            bail!("Editor `{}` exited with {}", self.command, status);
        }

        fs::read_to_string(file.path()).context("Failed to read edited file")
    }
}

/// File suffix used as the editor's format hint, e.g. `.toml`
pub fn extension_hint(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Decrypt `file`, hand it to `editor` once, and encrypt the result back.
///
/// If the editor fails nothing is written.
pub fn edit_secrets<E: EnvSource>(
    file: &SecretsFile<E>,
    default: &str,
    editor: &dyn Editor,
) -> Result<()> {
    if !file.exists() {
        bail!(SecretsError::SecretsNotFound(file.path().to_path_buf()));
    }

    let content = file.read(default)?;
    let edited = editor.edit(&content, &extension_hint(file.path()))?;
    file.write(&edited)?;

    debug!(path = %file.path().display(), "Saved edited secrets");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_key, KeyStore};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Records what it was given and returns a fixed replacement
    struct ScriptedEditor {
        replacement: String,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl ScriptedEditor {
        fn new(replacement: &str) -> Self {
            Self {
                replacement: replacement.to_string(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Editor for ScriptedEditor {
        fn edit(&self, content: &str, extension: &str) -> Result<String> {
            self.calls
                .borrow_mut()
                .push((content.to_string(), extension.to_string()));
            Ok(self.replacement.clone())
        }
    }

    struct FailingEditor;

    impl Editor for FailingEditor {
        fn edit(&self, _content: &str, _extension: &str) -> Result<String> {
            bail!("editor crashed")
        }
    }

    fn secrets_file(dir: &Path) -> SecretsFile<HashMap<String, String>> {
        SecretsFile::with_key_store(
            dir.join("secrets.enc.toml"),
            KeyStore::with_env(HashMap::new()),
        )
        .master_key(generate_key())
    }

    #[test]
    fn test_edit_roundtrip() {
        let dir = TempDir::new().unwrap();
        let file = secrets_file(dir.path());
        file.write("api_key = \"old\"").unwrap();

        let editor = ScriptedEditor::new("api_key = \"new\"");
        edit_secrets(&file, "", &editor).unwrap();

        let calls = editor.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("api_key = \"old\"".to_string(), ".toml".to_string()));
        assert_eq!(file.read("").unwrap(), "api_key = \"new\"");
    }

    #[test]
    fn test_edit_placeholder_starts_from_default() {
        let dir = TempDir::new().unwrap();
        let file = secrets_file(dir.path());
        fs::write(file.path(), "").unwrap();

        let editor = ScriptedEditor::new("token = \"t\"");
        edit_secrets(&file, "# add secrets\n", &editor).unwrap();

        assert_eq!(editor.calls.borrow()[0].0, "# add secrets\n");
        assert_eq!(file.read("").unwrap(), "token = \"t\"");
    }

    #[test]
    fn test_edit_missing_file() {
        let dir = TempDir::new().unwrap();
        let file = secrets_file(dir.path());
        let editor = ScriptedEditor::new("x = 1");

        let err = edit_secrets(&file, "", &editor).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SecretsError>(),
            Some(SecretsError::SecretsNotFound(_))
        ));
        assert!(editor.calls.borrow().is_empty());
    }

    #[test]
    fn test_failed_edit_keeps_file() {
        let dir = TempDir::new().unwrap();
        let file = secrets_file(dir.path());
        file.write("a = 1").unwrap();
        let before = fs::read(file.path()).unwrap();

        assert!(edit_secrets(&file, "", &FailingEditor).is_err());
        assert_eq!(fs::read(file.path()).unwrap(), before);
    }

    #[test]
    fn test_extension_hint() {
        assert_eq!(extension_hint(Path::new("config/secrets.enc.toml")), ".toml");
        assert_eq!(extension_hint(Path::new("secrets.yaml")), ".yaml");
        assert_eq!(extension_hint(Path::new("secrets")), "");
    }

    #[test]
    fn test_detect_editor() {
        let env: HashMap<String, String> = [
            ("VISUAL".to_string(), "code --wait".to_string()),
            ("EDITOR".to_string(), "nano".to_string()),
        ]
        .into();
        assert_eq!(ExternalEditor::detect_with(Some("hx"), &env).command(), "hx");
        assert_eq!(ExternalEditor::detect_with(None, &env).command(), "code --wait");

        let env: HashMap<String, String> = [("EDITOR".to_string(), "nano".to_string())].into();
        assert_eq!(ExternalEditor::detect_with(None, &env).command(), "nano");

        let env: HashMap<String, String> = HashMap::new();
        assert_eq!(ExternalEditor::detect_with(None, &env).command(), "vi");
    }

    #[cfg(unix)]
    #[test]
    fn test_external_editor_exit_status() {
        let unchanged = ExternalEditor::new("true").edit("a = 1\n", ".toml").unwrap();
        assert_eq!(unchanged, "a = 1\n");

        assert!(ExternalEditor::new("false").edit("a = 1\n", ".toml").is_err());
        assert!(ExternalEditor::new("   ").edit("a = 1\n", ".toml").is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_external_editor_command_is_split_on_whitespace() {
        let edited = ExternalEditor::new("sed  -i  s/1/2/").edit("a = 1\n", ".toml").unwrap();
        assert_eq!(edited, "a = 2\n");

        let quoted = ExternalEditor::new("\"/opt/My Editor/bin/edit\" --wait");
        assert!(quoted.edit("a = 1\n", ".toml").is_err());
    }
}
