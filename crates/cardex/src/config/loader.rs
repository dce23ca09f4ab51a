use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::secrets::has_secret_source;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.storage.directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "storage.directory must not be empty".to_string(),
        });
    }

    let gemini = &config.gemini;
    if gemini.model.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "gemini.model must not be empty".to_string(),
        });
    }
    if gemini.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "gemini.timeout_secs must be positive".to_string(),
        });
    }
    if !has_secret_source(
        gemini.api_key.as_deref(),
        gemini.api_key_file.as_deref(),
        gemini.api_key_env_var.as_deref(),
    ) {
        return Err(ConfigError::Validation {
            message: "gemini needs one of api_key, api_key_file or api_key_env_var".to_string(),
        });
    }

    if config.upload.max_image_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "upload.max_image_bytes must be positive".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "storage": { "directory": "/srv/cardex/blobs" }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.storage.directory, "/srv/cardex/blobs");
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "storage": { "directory": "/srv/cardex/blobs" },
            "database": { "path": "/srv/cardex/cardex.db" },
            "gemini": {
                "model": "gemini-2.0-flash",
                "endpoint": "http://localhost:8080",
                "api_key_file": "/run/secrets/gemini",
                "timeout_secs": 15
            },
            "upload": { "max_image_bytes": 5242880 },
            "logging": { "level": "debug", "json": true }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.database.path.as_deref(), Some("/srv/cardex/cardex.db"));
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.gemini.endpoint, "http://localhost:8080");
        assert_eq!(config.gemini.timeout_secs, 15);
        assert_eq!(config.upload.max_image_bytes, 5_242_880);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_missing_storage_fails_schema() {
        let result = load_config_from_str(r#"{"version": "1.0"}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_wrong_version_fails_schema() {
        let result =
            load_config_from_str(r#"{"version": "2.0", "storage": {"directory": "/x"}}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_unknown_key_fails_schema() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "storage": {"directory": "/x"}, "gemini": {"apiKey": "k"}}"#,
        );
        match result {
            Err(ConfigError::SchemaValidation { errors }) => assert!(errors.contains("apiKey")),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_timeout_fails_schema() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "storage": {"directory": "/x"}, "gemini": {"timeout_secs": 0}}"#,
        );
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_blank_secret_sources_fail_validation() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "storage": {"directory": "/x"},
                "gemini": {"api_key": "", "api_key_env_var": ""}}"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_blank_storage_directory_fails_validation() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "storage": {"directory": "  "}}"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cardex.json");
        std::fs::write(
            &path,
            r#"{"version": "1.0", "storage": {"directory": "/x"}}"#,
        )
        .unwrap();

        assert!(load_config(&path).is_ok());
        assert!(matches!(
            load_config(dir.path().join("missing.json")),
            Err(ConfigError::ReadFile { .. })
        ));
    }
}
