use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_PREFIX: &str = "gsheet-export";

const DEFAULT_SPREADSHEET_ID: &str = "154RKTCB7q5C6QUsVSuRo2_8AXGyrX_rKi0ZQ5xEflD8";
const DEFAULT_SHEET_NAME: &str = "Doentes";
const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com";

// Changing scopes invalidates any cached token that does not cover them.
pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub sheet: SheetConfig,
    pub auth: AuthConfig,
    pub export: ExportConfig,
    /// Directory that relative paths below are resolved against.
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheet: SheetConfig::default(),
            auth: AuthConfig::default(),
            export: ExportConfig::default(),
            project_root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SheetConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub api_base_url: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.to_string(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub scopes: Vec<String>,
    pub client_secret_file: PathBuf,
    pub token_file: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            scopes: vec![READONLY_SCOPE.to_string()],
            client_secret_file: PathBuf::from(".secrets/credentials_gsheet.json"),
            token_file: PathBuf::from(".secrets/token.json"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub output_filename: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("input/google_sheet"),
            output_filename: "doentes".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the XDG config file when no
    /// path is given. A missing default file yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_file(p),
            None => Self::load_optional(Self::find_config_file().as_deref()),
        }
    }

    fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_file(p),
            None => Ok(Self::default()),
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found at {:?}",
                path
            )));
        }

        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sheet.spreadsheet_id.trim().is_empty() {
            return Err(AppError::Config("spreadsheet_id must be set".to_string()));
        }

        if self.sheet.sheet_name.trim().is_empty() {
            return Err(AppError::Config("sheet_name must be set".to_string()));
        }

        if self.auth.scopes.is_empty() {
            return Err(AppError::Config(
                "At least one OAuth scope must be set".to_string(),
            ));
        }

        validate_output_filename(&self.export.output_filename)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.project_root.join(path)
    }

    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve(&self.auth.client_secret_file)
    }

    pub fn token_path(&self) -> PathBuf {
        self.resolve(&self.auth.token_file)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.export.output_dir)
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Existing config file in the XDG config directories. Lookup only, so
    /// nothing is created on disk.
    pub fn find_config_file() -> Option<PathBuf> {
        Self::xdg_dirs().find_config_file("config.toml")
    }
}

/// Output names become `<name>.csv` inside the output directory, so they
/// must be a single non-empty path component.
pub fn validate_output_filename(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::Config("Output filename must not be empty".to_string()));
    }

    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(AppError::Config(format!(
            "Output filename '{}' must not contain path separators",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = Config {
            project_root: PathBuf::from("/project"),
            ..Default::default()
        };

        assert_eq!(config.sheet.sheet_name, "Doentes");
        assert_eq!(config.auth.scopes, vec![READONLY_SCOPE.to_string()]);
        assert_eq!(
            config.client_secret_path(),
            PathBuf::from("/project/.secrets/credentials_gsheet.json")
        );
        assert_eq!(
            config.token_path(),
            PathBuf::from("/project/.secrets/token.json")
        );
        assert_eq!(
            config.output_dir(),
            PathBuf::from("/project/input/google_sheet")
        );
        assert_eq!(config.export.output_filename, "doentes");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::parse(
            r#"
            [sheet]
            spreadsheet_id = "abc123"

            [export]
            output_dir = "out"
            "#,
        )
        .unwrap();

        assert_eq!(config.sheet.spreadsheet_id, "abc123");
        assert_eq!(config.sheet.sheet_name, "Doentes");
        assert_eq!(config.export.output_dir, PathBuf::from("out"));
        assert_eq!(config.export.output_filename, "doentes");
        assert_eq!(
            config.auth.token_file,
            PathBuf::from(".secrets/token.json")
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized = Config::parse(&serialized).unwrap();

        assert_eq!(config.sheet.spreadsheet_id, deserialized.sheet.spreadsheet_id);
        assert_eq!(config.auth.scopes, deserialized.auth.scopes);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::parse("[sheet\nspreadsheet_id = ").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_explicit_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sheet]\nsheet_name = \"Other\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sheet.sheet_name, "Other");
    }

    #[test]
    fn test_no_config_file_uses_defaults() {
        let config = Config::load_optional(None).unwrap();

        assert_eq!(config.sheet.spreadsheet_id, DEFAULT_SPREADSHEET_ID);
        assert_eq!(config.export.output_filename, "doentes");
    }

    #[test]
    fn test_load_reads_without_creating_anything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[export]\noutput_filename = \"pacientes\"\n").unwrap();

        let config = Config::load_optional(Some(&path)).unwrap();

        assert_eq!(config.export.output_filename, "pacientes");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "only the config file should exist");
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.sheet.spreadsheet_id = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.scopes.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.output_filename = "../escape".to_string();
        assert!(config.validate().is_err());
    }
}
