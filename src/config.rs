// src/config.rs
//
// Optional user settings, read from `~/.config/dualshot/config.json`
// (platform config dir). The file is never written by us.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_CONFIG_DIR_NAME: &str = "dualshot";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// File name marker for the high-density image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixPattern {
    /// `name@2x.png`
    #[default]
    At,
    /// `name_2x.png`
    Underscore,
}

impl SuffixPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuffixPattern::At => "@2x",
            SuffixPattern::Underscore => "_2x",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where screenshots go when no file is given. Desktop when unset.
    pub save_dir: Option<PathBuf>,
    /// Held while dragging to move the box instead of resizing it.
    pub move_key: char,
    /// Switches every overlay between mouse and window selection.
    pub toggle_key: char,
    pub suffix: SuffixPattern,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            save_dir: None,
            move_key: ' ',
            toggle_key: ' ',
            suffix: SuffixPattern::default(),
        }
    }
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Missing file gives defaults; a broken one is reported and ignored.
    pub fn load() -> Config {
        let Some(path) = Self::path() else {
            return Config::default();
        };
        match Self::load_from(&path) {
            Ok(config) => {
                debug!("loaded config from {}", path.display());
                config
            }
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                warn!("ignoring {}: {e}", path.display());
                Config::default()
            }
        }
    }

    /// Config first, then the system screenshot location, then the desktop.
    pub fn resolved_save_dir(&self) -> PathBuf {
        self.save_dir
            .clone()
            .or_else(system_screenshot_dir)
            .or_else(dirs::desktop_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Where the system screenshot tool saves, from the `location` key of the
/// `com.apple.screencapture` defaults domain.
#[cfg(target_os = "macos")]
fn system_screenshot_dir() -> Option<PathBuf> {
    let output = std::process::Command::new("defaults")
        .args(["read", "com.apple.screencapture", "location"])
        .output()
        .ok()?;
    if !output.status.success() {
        // key not set
        return None;
    }
    let location = parse_location(&String::from_utf8_lossy(&output.stdout), dirs::home_dir().as_deref())?;
    debug!("system screenshot location is {}", location.display());
    location.is_dir().then_some(location)
}

#[cfg(not(target_os = "macos"))]
fn system_screenshot_dir() -> Option<PathBuf> {
    None
}

/// Trims the value and expands a leading `~`.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_location(raw: &str, home: Option<&Path>) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.strip_prefix('~') {
        Some(rest) => Some(home?.join(rest.trim_start_matches('/'))),
        None => Some(PathBuf::from(raw)),
    }
}
