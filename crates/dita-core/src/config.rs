use std::{collections::HashMap, path::PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const QUALIFIER: &str = "org";
pub const ORGANIZATION: &str = "knowledgebase";
pub const APPLICATION: &str = "kbconvert";
pub const CONFIG_FILE: &str = "kbconvert.toml";

const DEFAULT_DOWNLOADS: &[&str] = &["pdf", "doc", "xml", "rtf", "zip", "exe"];

pub fn config_root() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).map(|p| p.config_dir().to_path_buf())
}

pub fn default_config_path() -> Option<PathBuf> {
    config_root().map(|dir| dir.join(CONFIG_FILE))
}

/// Additions merged into the built-in rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOverrides {
    pub translate: HashMap<String, String>,
    pub remove: Vec<String>,
    pub unwrap: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    /// URL prefix under which inlined media is served.
    pub media_url: String,
    pub workers: Option<usize>,
    /// Extensions (without the dot) that turn a `format` link into a download.
    pub download_extensions: Vec<String>,
    pub rules: RuleOverrides,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("topics"),
            output_dir: PathBuf::from("pages"),
            media_url: "/media".to_string(),
            workers: None,
            download_extensions: DEFAULT_DOWNLOADS.iter().map(|s| s.to_string()).collect(),
            rules: RuleOverrides::default(),
        }
    }
}

impl ConvertConfig {
    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|n| *n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }

    pub fn is_download(&self, href: &str) -> bool {
        let file = href.rsplit('/').next().unwrap_or(href);
        let Some((_, ext)) = file.rsplit_once('.') else {
            return false;
        };
        self.download_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downloads_match_extension_case_insensitively() {
        let config = ConvertConfig::default();
        assert!(config.is_download("files/Manual.PDF"));
        assert!(config.is_download("setup.exe"));
        assert!(!config.is_download("guide.html"));
        assert!(!config.is_download("folder.pdf/readme"));
    }

    #[test]
    fn worker_count_is_never_zero() {
        let config = ConvertConfig {
            workers: Some(0),
            ..ConvertConfig::default()
        };
        assert!(config.worker_count() >= 1);
    }
}
