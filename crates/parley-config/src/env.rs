//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only fill fields that no
//! config file set.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PARLEY_LLM_URL",
        field_path: "llm.endpoint_url",
    },
    EnvMapping {
        var_name: "PARLEY_API_KEY",
        field_path: "llm.api_key",
    },
    EnvMapping {
        var_name: "OPENAI_API_KEY",
        field_path: "llm.api_key",
    },
    EnvMapping {
        var_name: "PARLEY_MODEL",
        field_path: "llm.model",
    },
    EnvMapping {
        var_name: "PARLEY_MEMORY_FILE",
        field_path: "memory.path",
    },
    EnvMapping {
        var_name: "DISCORD_TOKEN",
        field_path: "discord.bot_token",
    },
    EnvMapping {
        var_name: "PARLEY_ADMIN_IDS",
        field_path: "discord.admin_user_ids",
    },
];

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Apply environment variable fallbacks to fields not in `file_fields`.
///
/// Returns the number of env vars applied. Empty values are ignored.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    file_fields: &HashSet<String>,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;
    let mut applied: HashSet<&'static str> = HashSet::new();

    for mapping in ENV_MAPPINGS {
        if file_fields.contains(mapping.field_path) || applied.contains(mapping.field_path) {
            continue;
        }

        let Some(val) = env_vars.get(mapping.var_name).filter(|v| !v.trim().is_empty()) else {
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, coerce_to_toml_value(mapping.field_path, val));
        applied.insert(mapping.field_path);
        count = count.saturating_add(1);
    }

    count
}

/// Convert an env var string to the TOML type the field expects.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    match path {
        "discord.admin_user_ids" => toml::Value::Array(
            val.split(',')
                .filter_map(|entry| {
                    let trimmed = entry.trim();
                    if trimmed.is_empty() {
                        return None;
                    }
                    match trimmed.parse::<i64>() {
                        Ok(id) => Some(toml::Value::Integer(id)),
                        Err(e) => {
                            warn!(
                                value = trimmed,
                                error = %e,
                                "ignoring unparseable entry in PARLEY_ADMIN_IDS"
                            );
                            None
                        },
                    }
                })
                .collect(),
        ),
        _ => toml::Value::String(val.to_owned()),
    }
}

/// Set a dotted-path field, creating intermediate tables as needed.
fn set_field(root: &mut toml::Value, path: &str, new_val: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), new_val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn env_fills_unset_field() {
        let mut merged: toml::Value = toml::from_str("[llm]\nmodel = \"m\"").unwrap();
        let count = apply_env_fallbacks(
            &mut merged,
            &HashSet::new(),
            &env(&[("OPENAI_API_KEY", "sk-1")]),
        );
        assert_eq!(count, 1);
        assert_eq!(merged["llm"]["api_key"].as_str(), Some("sk-1"));
    }

    #[test]
    fn file_value_wins_over_env() {
        let mut merged: toml::Value = toml::from_str("[llm]\napi_key = \"from-file\"").unwrap();
        let file_fields: HashSet<String> = ["llm.api_key".to_owned()].into_iter().collect();
        let count = apply_env_fallbacks(
            &mut merged,
            &file_fields,
            &env(&[("OPENAI_API_KEY", "sk-env")]),
        );
        assert_eq!(count, 0);
        assert_eq!(merged["llm"]["api_key"].as_str(), Some("from-file"));
    }

    #[test]
    fn parley_key_takes_precedence_over_openai_key() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        apply_env_fallbacks(
            &mut merged,
            &HashSet::new(),
            &env(&[("PARLEY_API_KEY", "primary"), ("OPENAI_API_KEY", "secondary")]),
        );
        assert_eq!(merged["llm"]["api_key"].as_str(), Some("primary"));
    }

    #[test]
    fn admin_ids_are_split_and_parsed() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        apply_env_fallbacks(
            &mut merged,
            &HashSet::new(),
            &env(&[("PARLEY_ADMIN_IDS", "12, 34,abc,,56")]),
        );
        let ids: Vec<i64> = merged["discord"]["admin_user_ids"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(toml::Value::as_integer)
            .collect();
        assert_eq!(ids, vec![12, 34, 56]);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let count = apply_env_fallbacks(
            &mut merged,
            &HashSet::new(),
            &env(&[("DISCORD_TOKEN", "  ")]),
        );
        assert_eq!(count, 0);
    }
}
