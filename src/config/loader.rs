//! Multi-source config loading.
//!
//! Priority, lowest to highest:
//! 1. built-in defaults
//! 2. user config (`<config dir>/wiregraph/config.yaml`)
//! 3. project config (`<root>/wiregraph.yaml`)
//! 4. an explicit file passed by the caller
//! 5. `WIREGRAPH_*` environment variables
//!
//! YAML layers merge key by key, so a layer only overrides what it sets.

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::schema::EngineConfig;
use crate::error::{Result, WireGraphError};

pub const PROJECT_CONFIG_FILE: &str = "wiregraph.yaml";
pub const USER_CONFIG_FILE: &str = "config.yaml";

pub const ENV_MAX_DEPTH: &str = "WIREGRAPH_MAX_DEPTH";
pub const ENV_PROGRESS_INTERVAL: &str = "WIREGRAPH_PROGRESS_INTERVAL";
pub const ENV_SOLDER_PIN: &str = "WIREGRAPH_SOLDER_PIN";

/// Location of the per-user config file, if the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "wiregraph")
        .map(|dirs| dirs.config_dir().join(USER_CONFIG_FILE))
}

/// Load and validate the effective configuration.
///
/// Missing user/project files are skipped; a missing explicit file is an
/// error.
pub fn load_config(explicit: Option<&Path>, project_root: Option<&Path>) -> Result<EngineConfig> {
    load_with(
        user_config_path().as_deref(),
        explicit,
        project_root,
        |key| std::env::var(key).ok(),
    )
}

fn load_with(
    user: Option<&Path>,
    explicit: Option<&Path>,
    project_root: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<EngineConfig> {
    let mut merged = serde_yaml::to_value(EngineConfig::default())?;

    if let Some(path) = user {
        merge_file(&mut merged, path, false)?;
    }
    if let Some(root) = project_root {
        merge_file(&mut merged, &root.join(PROJECT_CONFIG_FILE), false)?;
    }
    if let Some(path) = explicit {
        merge_file(&mut merged, path, true)?;
    }

    let mut config: EngineConfig = serde_yaml::from_value(merged)?;
    apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

fn merge_file(base: &mut Value, path: &Path, required: bool) -> Result<()> {
    if !path.exists() {
        if required {
            return Err(WireGraphError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(());
    }
    let text = std::fs::read_to_string(path)?;
    let layer: Value = serde_yaml::from_str(&text)?;
    tracing::debug!("Loaded config layer from {}", path.display());
    merge_values(base, layer);
    Ok(())
}

/// Deep-merge `layer` into `base`; mappings merge per key, everything else
/// replaces.
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn apply_env_overrides(
    config: &mut EngineConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(raw) = env(ENV_MAX_DEPTH) {
        config.traversal.max_depth = parse_env(ENV_MAX_DEPTH, &raw)?;
    }
    if let Some(raw) = env(ENV_PROGRESS_INTERVAL) {
        config.batch.progress_interval = parse_env(ENV_PROGRESS_INTERVAL, &raw)?;
    }
    if let Some(raw) = env(ENV_SOLDER_PIN) {
        config.traversal.solder_pin = raw.trim().to_string();
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| WireGraphError::Config(format!("{key} is not a valid number: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_when_nothing_present() {
        let tmp = TempDir::new().unwrap();
        let config = load_with(None, None, Some(tmp.path()), no_env).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn project_file_overrides_user_file_per_key() {
        let tmp = TempDir::new().unwrap();
        let user = write(
            tmp.path(),
            "user.yaml",
            "traversal:\n  max_depth: 7\n  solder_pin: S\n",
        );
        write(tmp.path(), PROJECT_CONFIG_FILE, "traversal:\n  max_depth: 9\n");

        let config = load_with(Some(&user), None, Some(tmp.path()), no_env).unwrap();
        assert_eq!(config.traversal.max_depth, 9);
        assert_eq!(config.traversal.solder_pin, "S");
    }

    #[test]
    fn explicit_file_wins_over_project() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), PROJECT_CONFIG_FILE, "batch:\n  progress_interval: 5\n");
        let explicit = write(tmp.path(), "explicit.yaml", "batch:\n  progress_interval: 50\n");

        let config = load_with(None, Some(&explicit), Some(tmp.path()), no_env).unwrap();
        assert_eq!(config.batch.progress_interval, 50);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("absent.yaml");
        let err = load_with(None, Some(&missing), None, no_env).unwrap_err();
        assert!(matches!(err, WireGraphError::Config(_)));
    }

    #[test]
    fn empty_file_is_ignored() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), PROJECT_CONFIG_FILE, "");
        let config = load_with(None, None, Some(tmp.path()), no_env).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn env_overrides_win() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), PROJECT_CONFIG_FILE, "traversal:\n  max_depth: 9\n");
        let env: HashMap<&str, &str> = [
            (ENV_MAX_DEPTH, "3"),
            (ENV_PROGRESS_INTERVAL, " 25 "),
            (ENV_SOLDER_PIN, "x"),
        ]
        .into_iter()
        .collect();

        let config = load_with(None, None, Some(tmp.path()), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.traversal.max_depth, 3);
        assert_eq!(config.batch.progress_interval, 25);
        assert_eq!(config.traversal.solder_pin, "x");
    }

    #[test]
    fn bad_env_number_is_config_error() {
        let err = load_with(None, None, None, |k| {
            (k == ENV_MAX_DEPTH).then(|| "deep".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, WireGraphError::Config(_)));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), PROJECT_CONFIG_FILE, "traversal:\n  max_depth: 0\n");
        let err = load_with(None, None, Some(tmp.path()), no_env).unwrap_err();
        assert!(matches!(err, WireGraphError::Config(_)));
    }
}
