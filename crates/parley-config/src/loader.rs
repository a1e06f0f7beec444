//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the user config (`~/.parley/config.toml` or `$PARLEY_HOME/config.toml`)
//! 3. Merge `{workspace}/.parley/config.toml`
//! 4. Apply env var fallbacks for fields no file set
//! 5. Deserialize merged tree → `Config`
//! 6. Validate

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration plus the files that contributed to it.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Config files that were found and merged, in merge order.
    pub loaded_files: Vec<String>,
}

/// Load the configuration using the process environment.
///
/// `parley_home_override`, when set, is treated as the `.parley` directory
/// itself (its `config.toml` is the user layer).
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(
    workspace_root: Option<&Path>,
    parley_home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();
    load_with_env(workspace_root, parley_home_override, &env_vars)
}

/// Load the configuration against an explicit environment snapshot.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    workspace_root: Option<&Path>,
    parley_home_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut file_fields = HashSet::new();
    let mut loaded_files = Vec::new();

    // 2. User config.
    let user_path = match parley_home_override {
        Some(home) => home.join("config.toml"),
        None => match env_vars.get("PARLEY_HOME").filter(|v| !v.is_empty()) {
            Some(home) => PathBuf::from(home).join("config.toml"),
            None => home_directory()?.join(".parley").join("config.toml"),
        },
    };
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge_tracking(&mut merged, &overlay, "", &mut file_fields);
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    // 3. Workspace config.
    if let Some(ws_root) = workspace_root {
        let ws_path = ws_root.join(".parley").join("config.toml");
        if let Some(overlay) = try_load_file(&ws_path)? {
            deep_merge_tracking(&mut merged, &overlay, "", &mut file_fields);
            loaded_files.push(ws_path.display().to_string());
            info!(path = %ws_path.display(), "loaded workspace config");
        }
    }

    // 4. Env fallbacks.
    let env_count = apply_env_fallbacks(&mut merged, &file_fields, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 5. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 6. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
    })
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len(),
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// Deep-merge `overlay` into `base`, recording every leaf path the overlay
/// set. Tables merge per field; scalars and arrays replace.
fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    fields: &mut HashSet<String>,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };

                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge_tracking(base_val, overlay_val, &path, fields);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_all_leaves(overlay_val, &path, fields);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            fields.insert(prefix.to_owned());
        },
    }
}

fn record_all_leaves(val: &toml::Value, prefix: &str, fields: &mut HashSet<String>) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_all_leaves(child, &format!("{prefix}.{key}"), fields);
        }
    } else {
        fields.insert(prefix.to_owned());
    }
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.memory.max_turns, 6);
        assert_eq!(config.attachments.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.discord.status_interval_secs, 3600);
    }

    #[test]
    fn test_load_with_only_defaults() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load_with_env(None, Some(home.path()), &no_env()).unwrap();
        assert!(resolved.loaded_files.is_empty());
        assert!(resolved.config.llm.api_key.is_none());
    }

    #[test]
    fn test_workspace_overrides_user() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[llm]\nmodel = \"user-model\"\nmax_tokens = 100\n",
        )
        .unwrap();

        let ws = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(ws.path().join(".parley")).unwrap();
        std::fs::write(
            ws.path().join(".parley").join("config.toml"),
            "[llm]\nmodel = \"ws-model\"\n",
        )
        .unwrap();

        let resolved = load_with_env(Some(ws.path()), Some(home.path()), &no_env()).unwrap();
        assert_eq!(resolved.config.llm.model, "ws-model");
        assert_eq!(resolved.config.llm.max_tokens, 100);
        assert_eq!(resolved.loaded_files.len(), 2);
    }

    #[test]
    fn test_env_fallback_applies_when_file_silent() {
        let home = tempfile::tempdir().unwrap();
        let env: HashMap<String, String> = [
            ("OPENAI_API_KEY".to_owned(), "sk-env".to_owned()),
            ("DISCORD_TOKEN".to_owned(), "tok".to_owned()),
        ]
        .into_iter()
        .collect();
        let resolved = load_with_env(None, Some(home.path()), &env).unwrap();
        assert_eq!(resolved.config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(resolved.config.discord.bot_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_env_does_not_override_file() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("config.toml"), "[llm]\napi_key = \"sk-file\"\n").unwrap();
        let env: HashMap<String, String> = [("OPENAI_API_KEY".to_owned(), "sk-env".to_owned())]
            .into_iter()
            .collect();
        let resolved = load_with_env(None, Some(home.path()), &env).unwrap();
        assert_eq!(resolved.config.llm.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("config.toml"), "[llm\nmodel = ").unwrap();
        let err = load_with_env(None, Some(home.path()), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_invalid_value_fails_validation() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("config.toml"), "[memory]\nmax_turns = 0\n").unwrap();
        let err = load_with_env(None, Some(home.path()), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }
}
