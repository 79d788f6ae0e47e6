use std::{fs, io, path::Path};

use dita_core::config::{default_config_path, ConvertConfig};
use thiserror::Error;
use tracing::debug;

pub const SOURCE_VAR: &str = "KBCONVERT_SOURCE";
pub const OUTPUT_VAR: &str = "KBCONVERT_OUTPUT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

fn read_file(path: &Path) -> Result<ConvertConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Loads the configuration from `explicit`, else from the per-user config
/// file when it exists, else the defaults. Environment overrides apply last.
pub fn load(explicit: Option<&Path>) -> Result<ConvertConfig, ConfigError> {
    let mut config = match explicit {
        Some(path) => read_file(path)?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => read_file(&path)?,
            None => ConvertConfig::default(),
        },
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn apply_env(config: &mut ConvertConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(source) = var(SOURCE_VAR).filter(|s| !s.is_empty()) {
        debug!(source = %source, "source directory from environment");
        config.source_dir = source.into();
    }
    if let Some(output) = var(OUTPUT_VAR).filter(|s| !s.is_empty()) {
        debug!(output = %output, "output directory from environment");
        config.output_dir = output.into();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn reads_partial_file_with_rule_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kbconvert.toml");
        fs::write(
            &path,
            r#"
source_dir = "dita"
workers = 3

[rules]
remove = ["prolog"]
translate = { term = "em" }
"#,
        )
        .unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.media_url, "/media");
        assert_eq!(config.rules.remove, vec!["prolog".to_string()]);
        assert_eq!(config.rules.translate.get("term").map(String::as_str), Some("em"));
    }

    #[test]
    fn explicit_file_must_exist_and_parse() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(Some(&dir.path().join("none.toml"))),
            Err(ConfigError::Io { .. })
        ));
        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "workers = \"many\"").unwrap();
        assert!(matches!(load(Some(&bad)), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn environment_overrides_directories() {
        let mut config = ConvertConfig::default();
        apply_env(&mut config, |key| match key {
            SOURCE_VAR => Some("/data/topics".to_string()),
            OUTPUT_VAR => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.source_dir, PathBuf::from("/data/topics"));
        assert_eq!(config.output_dir, ConvertConfig::default().output_dir);
    }
}
