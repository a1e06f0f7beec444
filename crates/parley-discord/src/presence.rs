//! Rotating "Playing ..." presence.

use std::path::Path;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serenity::gateway::ActivityData;
use serenity::prelude::Context;
use tracing::{debug, info, warn};

/// One entry of the status file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    /// Shown as the "Playing" activity.
    pub title: String,
}

/// Statuses written when the file is missing or malformed.
#[must_use]
pub fn default_statuses() -> Vec<GameStatus> {
    ["Minecraft", "Half-Life 2"]
        .into_iter()
        .map(|title| GameStatus {
            title: title.to_owned(),
        })
        .collect()
}

/// Load statuses from `path`, writing the defaults if it is missing,
/// malformed, or empty.
pub fn load_statuses(path: &Path) -> Vec<GameStatus> {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str::<Vec<GameStatus>>(&text).map_err(|e| e.to_string()));

    match parsed {
        Ok(statuses) if !statuses.is_empty() => {
            debug!(path = %path.display(), count = statuses.len(), "loaded statuses");
            statuses
        },
        Ok(_) => write_defaults(path),
        Err(reason) => {
            debug!(path = %path.display(), reason = %reason, "status file unusable, writing defaults");
            write_defaults(path)
        },
    }
}

fn write_defaults(path: &Path) -> Vec<GameStatus> {
    let defaults = default_statuses();
    match serde_json::to_string_pretty(&defaults) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                warn!(path = %path.display(), error = %e, "failed to write default status file");
            }
        },
        Err(e) => warn!(error = %e, "failed to serialize default statuses"),
    }
    defaults
}

/// Pick a random title.
#[must_use]
pub fn pick_title(statuses: &[GameStatus]) -> Option<String> {
    statuses
        .choose(&mut rand::thread_rng())
        .map(|status| status.title.clone())
}

/// Set a random status now and every `interval` after, until the task is
/// dropped with the runtime.
pub fn spawn_rotation(
    ctx: Context,
    statuses: Vec<GameStatus>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(count = statuses.len(), every = ?interval, "starting presence rotation");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Some(title) = pick_title(&statuses) {
                debug!(title = %title, "changing presence");
                ctx.set_activity(Some(ActivityData::playing(title)));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");
        let statuses = load_statuses(&path);
        assert_eq!(statuses, default_statuses());

        let written: Vec<GameStatus> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, default_statuses());
    }

    #[test]
    fn malformed_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");
        std::fs::write(&path, "[{\"name\": 1}").unwrap();
        assert_eq!(load_statuses(&path), default_statuses());
    }

    #[test]
    fn custom_statuses_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");
        std::fs::write(&path, r#"[{"title": "Portal"}]"#).unwrap();
        let statuses = load_statuses(&path);
        assert_eq!(statuses.len(), 1);
        assert_eq!(pick_title(&statuses).as_deref(), Some("Portal"));
    }

    #[test]
    fn pick_from_empty_is_none() {
        assert!(pick_title(&[]).is_none());
    }
}
