//! Standard paths used by envseal

use std::path::PathBuf;

/// Standard envseal paths
pub struct Paths {
    /// Config directory (~/.config/envseal)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("envseal");

        Self { config }
    }

    /// Path of the tool configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_config_dir() {
        let paths = Paths::new();
        let file = paths.config_file();
        assert!(file.starts_with(&paths.config));
        assert_eq!(file.file_name().unwrap(), "config.toml");
        assert!(paths.config.ends_with("envseal"));
    }
}
