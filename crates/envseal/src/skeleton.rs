//! Skeleton headers
//!
//! An encrypted secrets file starts with a commented, value-free copy of
//! its document so readers can see which keys exist without decrypting:
//!
//! ```text
//! #  [database]
//! #  password = "..."
//! #  replica = "..."
//! ```

use envseal_core::SkeletonConfig;
use toml::{Table, Value};
use tracing::warn;

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_PLACEHOLDER: &str = "...";

/// Prefix of every skeleton header line
const LINE_PREFIX: &str = "#  ";

/// Renders redacted copies of secrets documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    max_depth: usize,
    placeholder: String,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_PLACEHOLDER)
    }
}

impl Skeleton {
    pub fn new(max_depth: usize, placeholder: impl Into<String>) -> Self {
        Self {
            max_depth,
            placeholder: placeholder.into(),
        }
    }

    pub fn from_config(config: &SkeletonConfig) -> Self {
        Self::new(config.max_depth, config.placeholder.clone())
    }

    /// Copy `document`, keeping tables down to `max_depth` levels and
    /// replacing every other value with the placeholder.
    ///
    /// Top-level keys sit at depth 1, so with the default depth of 2
    /// `{a: {b: {c: "x"}}}` becomes `{a: {b: "..."}}`.
    pub fn render(&self, document: &Table) -> Table {
        let mut skeleton = document.clone();
        self.redact(&mut skeleton, 1);
        skeleton
    }

    fn redact(&self, table: &mut Table, depth: usize) {
        for (_, value) in table.iter_mut() {
            match value {
                Value::Table(inner) if depth < self.max_depth => self.redact(inner, depth + 1),
                other => *other = Value::String(self.placeholder.clone()),
            }
        }
    }

    /// Build the comment header for `content`.
    ///
    /// Returns an empty string when `content` is not valid TOML (the file is
    /// still written, just without a skeleton) or has no keys.
    pub fn header(&self, content: &str) -> String {
        let document: Table = match toml::from_str(content) {
            Ok(document) => document,
            Err(_) => {
                // The parse error quotes the offending line, so it stays out of the log
                warn!("The encrypted config has syntax errors and is not a valid TOML file");
                return String::new();
            }
        };

        let rendered = match toml::to_string(&self.render(&document)) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(error = %e, "Could not render skeleton header");
                return String::new();
            }
        };

        rendered
            .trim_end()
            .lines()
            .map(|line| format!("{}{}", LINE_PREFIX, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(source: &str) -> Table {
        toml::from_str(source).unwrap()
    }

    #[test]
    fn test_nested_values_collapse_past_max_depth() {
        let document = table("[a.b]\nc = \"secret-value\"\n");
        let skeleton = Skeleton::default().render(&document);
        assert_eq!(skeleton, table("[a]\nb = \"...\"\n"));
    }

    #[test]
    fn test_every_leaf_type_is_replaced() {
        let document = table(
            r#"
            name = "app"
            port = 5432
            ratio = 0.5
            debug = true
            hosts = ["a", "b"]
            point = { x = 1, y = 2 }
            "#,
        );
        let skeleton = Skeleton::default().render(&document);

        assert_eq!(skeleton.len(), 6);
        for key in ["name", "port", "ratio", "debug", "hosts"] {
            assert_eq!(skeleton[key], Value::String("...".to_string()), "{}", key);
        }
        assert_eq!(skeleton["point"], Value::Table(table("x = \"...\"\ny = \"...\"")));
    }

    #[test]
    fn test_key_order_is_preserved() {
        let document = table("zeta = 1\nalpha = 2\nmid = 3\n");
        let skeleton = Skeleton::default().render(&document);
        let keys: Vec<&str> = skeleton.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_render_leaves_input_untouched() {
        let document = table("token = \"abc\"\n");
        let _ = Skeleton::default().render(&document);
        assert_eq!(document["token"].as_str(), Some("abc"));
    }

    #[test]
    fn test_custom_depth_and_placeholder() {
        let document = table("[a.b]\nc = \"secret\"\n");

        let flat = Skeleton::new(1, "<hidden>").render(&document);
        assert_eq!(flat, table("a = \"<hidden>\""));

        let deep = Skeleton::new(3, "*").render(&document);
        assert_eq!(deep, table("[a.b]\nc = \"*\""));
    }

    #[test]
    fn test_header_single_value() {
        let header = Skeleton::default().header("db_password = \"hunter2\"");
        assert_eq!(header, "#  db_password = \"...\"");
    }

    #[test]
    fn test_header_hides_values() {
        let content = r#"
            api_key = "sk-live-123"

            [database]
            password = "hunter2"

            [database.replica]
            host = "10.0.0.7"
        "#;
        let header = Skeleton::default().header(content);

        assert!(header.lines().all(|line| line.starts_with('#')));
        assert!(header.contains("[database]"));
        assert!(header.contains("api_key"));
        assert!(header.contains("password"));
        assert!(header.contains("replica"));
        for secret in ["sk-live-123", "hunter2", "10.0.0.7", "host"] {
            assert!(!header.contains(secret), "leaked {}", secret);
        }
    }

    #[test]
    fn test_header_prefixes_blank_lines() {
        let header = Skeleton::default().header("token = \"t\"\n\n[database]\npassword = \"p\"\n");
        let lines: Vec<&str> = header.lines().collect();
        assert!(lines.contains(&"#  "), "{:?}", lines);
        assert!(lines.iter().all(|line| line.starts_with(LINE_PREFIX)));
        assert_eq!(lines.last(), Some(&"#  password = \"...\""));
    }

    #[test]
    fn test_header_for_invalid_toml_is_empty() {
        assert_eq!(Skeleton::default().header("this is = = not toml"), "");
    }

    #[test]
    fn test_header_for_empty_document_is_empty() {
        assert_eq!(Skeleton::default().header(""), "");
        assert_eq!(Skeleton::default().header("# only a comment\n"), "");
    }

    #[test]
    fn test_datetimes_are_copied_and_hidden() {
        let content = "created = 1979-05-27T07:32:00-08:00\n[window]\nstart = 07:32:00\n";
        let document = table(content);
        let skeleton = Skeleton::default().render(&document);

        assert!(matches!(document["created"], Value::Datetime(_)));
        assert_eq!(skeleton["created"].as_str(), Some("..."));

        let header = Skeleton::default().header(content);
        assert!(!header.contains("1979"));
        assert!(!header.contains("07:32"));
    }

    #[test]
    fn test_from_config() {
        let config = SkeletonConfig {
            max_depth: 4,
            placeholder: "?".to_string(),
        };
        assert_eq!(Skeleton::from_config(&config), Skeleton::new(4, "?"));
    }
}
