use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kfjob_img::{DEFAULT_OWNER, DEFAULT_PROGRAM};
use serde::Deserialize;
use tracing::debug;

const CONFIG_DIR: &str = ".kfjob";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Namespace every generated job is placed in
    pub namespace: String,
    pub builder: BuilderConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BuilderConfig {
    /// "img" or "mock"
    pub provider: String,
    pub owner: String,
    pub program: String,
    pub keep_workdir: bool,
    pub work_root: Option<PathBuf>,
    /// Framework name to Dockerfile path, replacing the built-in recipe
    pub templates: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: DEFAULT_NAMESPACE.to_string(),
            builder: BuilderConfig::default(),
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            provider: "img".to_string(),
            owner: DEFAULT_OWNER.to_string(),
            program: DEFAULT_PROGRAM.to_string(),
            keep_workdir: false,
            work_root: None,
            templates: BTreeMap::new(),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Loads the config from `path`, or from `~/.kfjob/config.toml` when no path is given.
///
/// An explicit path must exist. The default file is optional and falls back to defaults.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                debug!("no config file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn parse(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(parse("").unwrap(), Config::default());
        assert_eq!(Config::default().builder.provider, "img");
        assert_eq!(Config::default().builder.program, "img");
    }

    #[test]
    fn parses_every_key() {
        let config = parse(
            r#"
            namespace = "kubeflow"

            [builder]
            provider = "mock"
            owner = "team-ml"
            program = "/usr/local/bin/img"
            keep-workdir = true
            work-root = "/var/tmp"

            [builder.templates]
            pytorch = "docker/pytorch.Dockerfile"
            "#,
        )
        .unwrap();

        assert_eq!(config.namespace, "kubeflow");
        assert_eq!(config.builder.provider, "mock");
        assert_eq!(config.builder.owner, "team-ml");
        assert_eq!(config.builder.program, "/usr/local/bin/img");
        assert!(config.builder.keep_workdir);
        assert_eq!(config.builder.work_root, Some(PathBuf::from("/var/tmp")));
        assert_eq!(
            config.builder.templates.get("pytorch"),
            Some(&PathBuf::from("docker/pytorch.Dockerfile"))
        );
    }

    #[test]
    fn partial_builder_section_keeps_other_defaults() {
        let config = parse("[builder]\nowner = \"someone\"\n").unwrap();
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.builder.owner, "someone");
        assert_eq!(config.builder.provider, "img");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/kfjob/config.toml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }
}
