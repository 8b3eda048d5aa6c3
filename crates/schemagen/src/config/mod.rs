//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{GeneratorError, Result};
use std::path::Path;

impl GeneratorConfig {
    /// Load configuration from a file.
    ///
    /// Automatically detects the format based on file extension:
    /// - `.json` files are parsed as JSON
    /// - `.yaml` or `.yml` files are parsed as YAML
    /// - Other extensions default to YAML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_json::from_str(json)
            .map_err(|e| GeneratorError::Config(format!("Failed to parse JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_YAML: &str = r#"
dialect: postgres
uuid: v7
mode: smart
out_dir: db/migrations
"#;

    const VALID_JSON: &str = r#"{
  "dialect": "mariadb",
  "uuid": "v4",
  "mode": "create_only",
  "out_dir": "db/migrations"
}"#;

    #[test]
    fn test_from_yaml_valid() {
        let config = GeneratorConfig::from_yaml(VALID_YAML).unwrap();
        assert_eq!(config.dialect, SqlDialect::Postgres);
        assert_eq!(config.uuid, UuidStrategy::V7);
        assert_eq!(config.mode, GenerationMode::Smart);
        assert_eq!(config.out_dir.to_str().unwrap(), "db/migrations");
    }

    #[test]
    fn test_from_json_valid() {
        let config = GeneratorConfig::from_json(VALID_JSON).unwrap();
        assert_eq!(config.dialect, SqlDialect::MariaDb);
        assert_eq!(config.uuid, UuidStrategy::V4);
        assert_eq!(config.mode, GenerationMode::CreateOnly);
    }

    #[test]
    fn test_from_json_invalid_syntax() {
        let result = GeneratorConfig::from_json(r#"{ "dialect": broken }"#);
        assert!(matches!(result.unwrap_err(), GeneratorError::Config(_)));
    }

    #[test]
    fn test_from_yaml_missing_out_dir() {
        let result = GeneratorConfig::from_yaml("dialect: postgres\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_defaults_applied() {
        let config = GeneratorConfig::from_yaml("out_dir: out\n").unwrap();
        assert_eq!(config.dialect, SqlDialect::Postgres);
        assert_eq!(config.uuid, UuidStrategy::V7);
        assert_eq!(config.mode, GenerationMode::Smart);
    }

    #[test]
    fn test_load_json_extension() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(VALID_JSON.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = GeneratorConfig::load(file.path()).unwrap();
        assert_eq!(config.dialect, SqlDialect::MariaDb);
    }

    #[test]
    fn test_load_yaml_extension() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(VALID_YAML.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = GeneratorConfig::load(file.path()).unwrap();
        assert_eq!(config.dialect, SqlDialect::Postgres);
    }

    #[test]
    fn test_load_unknown_extension_defaults_to_yaml() {
        let mut file = NamedTempFile::with_suffix(".conf").unwrap();
        file.write_all(VALID_YAML.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = GeneratorConfig::load(file.path()).unwrap();
        assert_eq!(config.mode, GenerationMode::Smart);
    }
}
