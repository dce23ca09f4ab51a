//! API key resolution from config, secret files, or the environment.
//!
//! Sources are tried in order and the first configured one wins:
//!
//! 1. **Inline value** (`api_key`) for quick local runs
//! 2. **File** (`api_key_file`), e.g. a mounted Docker/Kubernetes secret
//! 3. **Environment variable** (`api_key_env_var`, `GEMINI_API_KEY` by default)
//!
//! A configured source that fails (missing file, unset variable, blank
//! content) is an error; later sources are not consulted.

use secrecy::SecretString;

use crate::config::schema::expand_home;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source configured (need an inline value, a file path, or an env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },

    #[error("Secret from {origin} is empty")]
    Empty { origin: String },
}

fn configured(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_blank(value: &str, origin: impl FnOnce() -> String) -> Result<SecretString, SecretError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SecretError::Empty { origin: origin() });
    }
    Ok(SecretString::from(trimmed))
}

/// Resolves a secret from the first configured source.
///
/// Whitespace around file contents and env values is trimmed.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString, SecretError> {
    if let Some(value) = configured(direct) {
        return non_blank(value, || "inline value".to_string());
    }

    if let Some(path) = configured(file_path) {
        let expanded = expand_home(path);
        let content = std::fs::read_to_string(&expanded).map_err(|e| SecretError::FileRead {
            path: expanded.display().to_string(),
            source: e,
        })?;
        return non_blank(&content, || format!("file '{}'", expanded.display()));
    }

    if let Some(name) = configured(env_var) {
        return match std::env::var(name) {
            Ok(value) => non_blank(&value, || format!("env var '{}'", name)),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// True if at least one source is configured. Used by config validation.
pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    configured(direct).is_some() || configured(file_path).is_some() || configured(env_var).is_some()
}
