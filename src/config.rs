use std::path;

use lazy_static::lazy_static;
use serde_derive::Deserialize;

/// Raw-viewer palette, one color per lexical class. Values are CSS-style hex
/// strings so GUI adapters can feed them straight to their styling layer.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Highlight {
    pub default_color: String,
    pub number_color: String,
    pub tag_color: String,
    pub value_color: String,
    pub attribute_color: String,
}

impl Default for Highlight {
    fn default() -> Highlight {
        Highlight {
            default_color: "#000000".to_string(),
            number_color: "#007f7f".to_string(),
            tag_color: "#007f7f".to_string(),
            value_color: "#7f0000".to_string(),
            attribute_color: "#ff5733".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Where autosave drafts go. Defaults to a "drafts" directory under the
    /// XDG data home.
    pub scratch_dir: Option<path::PathBuf>,
    pub autosave: bool,
    pub highlight: Highlight,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            scratch_dir: None,
            autosave: true,
            highlight: Highlight::default(),
        }
    }
}

lazy_static! {
    static ref INSTANCE: parking_lot::RwLock<Config> = parking_lot::RwLock::new(Config::load());
}

impl Config {
    fn load() -> Config {
        let file = xdg::BaseDirectories::with_prefix("bower")
            .ok()
            .and_then(|dirs| dirs.find_config_file("config.toml"));

        let Some(file) = file else {
            return Config::default();
        };

        match std::fs::read_to_string(&file).map_err(|e| e.to_string()).and_then(|text| toml::from_str(&text).map_err(|e| e.to_string())) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring unreadable config file {}: {}", file.display(), e);
                Config::default()
            },
        }
    }

    pub fn copy() -> Config {
        INSTANCE.read().clone()
    }

    pub fn set(config: Config) {
        *INSTANCE.write() = config;
    }

    pub fn scratch_dir(&self) -> path::PathBuf {
        match &self.scratch_dir {
            Some(dir) => dir.clone(),
            None => xdg::BaseDirectories::with_prefix("bower")
                .map(|dirs| dirs.get_data_home().join("drafts"))
                .unwrap_or_else(|_| std::env::temp_dir().join("bower-drafts")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str("autosave = false").unwrap();
        assert!(!config.autosave);
        assert_eq!(config.highlight, Highlight::default());
        assert_eq!(config.scratch_dir, None);
    }

    #[test]
    fn test_palette_override() {
        let config: Config = toml::from_str("[highlight]\ntag_color = \"#123456\"").unwrap();
        assert_eq!(config.highlight.tag_color, "#123456");
        assert_eq!(config.highlight.value_color, Highlight::default().value_color);
    }

    #[test]
    fn test_explicit_scratch_dir_wins() {
        let config: Config = toml::from_str("scratch_dir = \"/tmp/elsewhere\"").unwrap();
        assert_eq!(config.scratch_dir(), path::PathBuf::from("/tmp/elsewhere"));
    }
}
