//! Configuration file discovery and loading.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

use cloudarch_core::config::AppConfig;

/// Name of the project-local configuration file.
pub const LOCAL_CONFIG: &str = "cloudarch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse TOML configuration {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Find and load configuration.
///
/// Search order:
/// 1. Explicit path if provided (must exist)
/// 2. `cloudarch.toml` in the working directory
/// 3. `<config dir>/cloudarch/config.toml`
/// 4. Defaults
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_from(explicit_path, Path::new("."), dirs::config_dir())
}

fn load_config_from(
    explicit_path: Option<&Path>,
    working_dir: &Path,
    config_dir: Option<PathBuf>,
) -> Result<AppConfig, ConfigError> {
    if let Some(path) = explicit_path {
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local = working_dir.join(LOCAL_CONFIG);
    if local.is_file() {
        info!(path = local.display().to_string(); "Loading configuration from local path");
        return load_config_file(&local);
    }

    match config_dir {
        Some(dir) => {
            let system = dir.join("cloudarch").join("config.toml");
            if system.is_file() {
                info!(path = system.display().to_string(); "Loading configuration from system path");
                return load_config_file(&system);
            }
            debug!(path = system.display().to_string(); "System configuration file not found");
        }
        None => debug!("Could not determine platform-specific config directory"),
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudarch_core::model::Direction;

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config_from(Some(&missing), dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(p) if p == missing));
    }

    #[test]
    fn falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(None, dir.path(), Some(dir.path().join("cfg"))).unwrap();
        assert!(config.render().dot().is_none());
        assert_eq!(config.style().direction(), Direction::LeftRight);
    }

    #[test]
    fn local_file_wins_over_system_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(LOCAL_CONFIG),
            "[style]\ndirection = \"TB\"\n",
        )
        .unwrap();
        let system_dir = dir.path().join("system");
        fs::create_dir_all(system_dir.join("cloudarch")).unwrap();
        fs::write(
            system_dir.join("cloudarch").join("config.toml"),
            "[style]\ndirection = \"BT\"\n",
        )
        .unwrap();

        let config = load_config_from(None, dir.path(), Some(system_dir.clone())).unwrap();
        assert_eq!(config.style().direction(), Direction::TopBottom);

        fs::remove_file(dir.path().join(LOCAL_CONFIG)).unwrap();
        let config = load_config_from(None, dir.path(), Some(system_dir)).unwrap();
        assert_eq!(config.style().direction(), Direction::BottomTop);
    }

    #[test]
    fn parses_every_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.toml");
        fs::write(
            &path,
            r#"
[render]
dot = "/usr/local/bin/dot"
keep_dir = "/tmp/architecture_diagrams"

[style]
direction = "rl"
icons_dir = "/opt/cloudarch/icons"
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path), dir.path(), None).unwrap();
        assert_eq!(config.render().dot(), Some(Path::new("/usr/local/bin/dot")));
        assert_eq!(
            config.render().keep_dir(),
            Some(Path::new("/tmp/architecture_diagrams"))
        );
        assert_eq!(config.style().direction(), Direction::RightLeft);
        assert_eq!(
            config.style().icons_dir(),
            Some(Path::new("/opt/cloudarch/icons"))
        );
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[render]\nengine = \"neato\"\n").unwrap();
        let err = load_config_from(Some(&path), dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("engine"));
    }
}
