use crate::settings::SETTINGS_FILE;
use crate::theme::{ApplyMode, ResourceBundle};

use anyhow::{anyhow, Result};
use ini::Ini;
use log::LevelFilter;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "it-beacon.ini";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: LevelFilter,
    pub log_file: Option<String>,
    pub settings_file: String,
    pub theme_bundles: Option<(String, String)>,
    pub watch_theme: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            log_file: None,
            settings_file: SETTINGS_FILE.to_string(),
            theme_bundles: None,
            watch_theme: true,
        }
    }
}

impl Config {
    /// Loads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let conf = Ini::load_from_file(path)
            .map_err(|err| anyhow!("Failed to load config '{}', {err}", path.display()))?;
        Ok(Self::from_ini(&conf))
    }

    pub fn from_ini(conf: &Ini) -> Self {
        let mut config = Self::default();
        if let Some(section) = conf.section(Some("log")) {
            if let Some(v) = section.get("level") {
                match Self::parse_log_level(v) {
                    Some(level) => config.log_level = level,
                    None => warn!("Invalid log level '{v}', using {}", config.log_level),
                }
            }
            if let Some(v) = section.get("path").map(|v| v.trim()) {
                if !v.is_empty() {
                    config.log_file = Some(v.to_string());
                }
            }
        }
        if let Some(section) = conf.section(Some("settings")) {
            if let Some(v) = section.get("path").map(|v| v.trim()) {
                if !v.is_empty() {
                    config.settings_file = v.to_string();
                }
            }
        }
        if let Some(section) = conf.section(Some("theme")) {
            match section.get("mode").map(|v| v.trim().to_ascii_lowercase()) {
                Some(mode) if mode == "bundles" => {
                    let light = section.get("light").unwrap_or("Themes/Light.xaml");
                    let dark = section.get("dark").unwrap_or("Themes/Dark.xaml");
                    config.theme_bundles = Some((light.to_string(), dark.to_string()));
                }
                Some(mode) if mode != "palette" => {
                    warn!("Invalid theme mode '{mode}', using palette")
                }
                _ => {}
            }
            if let Some(v) = section.get("watch") {
                match Self::to_bool(v) {
                    Some(v) => config.watch_theme = v,
                    None => warn!("Invalid theme watch '{v}', using {}", config.watch_theme),
                }
            }
        }
        config
    }

    pub fn to_bool(v: &str) -> Option<bool> {
        match v.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "on" | "1" => Some(true),
            "no" | "false" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn parse_log_level(v: &str) -> Option<LevelFilter> {
        v.trim().parse().ok()
    }

    pub fn settings_path(&self, base: &Path) -> PathBuf {
        base.join(&self.settings_file)
    }

    pub fn log_path(&self, base: &Path) -> Option<PathBuf> {
        self.log_file.as_ref().map(|v| base.join(v))
    }

    pub fn apply_mode(&self) -> ApplyMode {
        match &self.theme_bundles {
            Some((light, dark)) => ApplyMode::Bundles {
                light: ResourceBundle::new(light),
                dark: ResourceBundle::new(dark),
            },
            None => ApplyMode::Palette,
        }
    }
}
