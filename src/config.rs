use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_daemon_addr() -> String {
    "127.0.0.1:3700".to_string()
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UiThemeMode {
    Dark,
    Light,
}

impl Default for UiThemeMode {
    fn default() -> Self {
        Self::Dark
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SavedWindow {
    pub outer_pos: [f32; 2],
    pub inner_size: [f32; 2],
    #[serde(default)]
    pub maximized: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Overrides the username reported by the daemon, mainly for development
    /// against a shared daemon.
    #[serde(default)]
    pub username_override: Option<String>,
    #[serde(default = "default_daemon_addr")]
    pub daemon_addr: String,
    #[serde(default)]
    pub ui_theme_mode: UiThemeMode,
    #[serde(default)]
    pub saved_window: Option<SavedWindow>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            username_override: None,
            daemon_addr: default_daemon_addr(),
            ui_theme_mode: UiThemeMode::Dark,
            saved_window: None,
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    // Prefer a stable per-user location: $XDG_CONFIG_HOME/loftsync or
    // ~/.config/loftsync, with APPDATA covering Windows.
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .or_else(|| std::env::var_os("APPDATA").map(PathBuf::from))
        .map(|base| base.join("loftsync"))
}

pub fn config_path() -> PathBuf {
    if let Some(dir) = config_dir() {
        return dir.join("config.json");
    }
    PathBuf::from("config.json")
}

pub fn load() -> AppConfig {
    let path = config_path();
    let Ok(bytes) = fs::read(&path) else {
        return AppConfig::default();
    };
    serde_json::from_slice::<AppConfig>(&bytes).unwrap_or_default()
}

pub fn save(cfg: &AppConfig) {
    let path = config_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let Ok(json) = serde_json::to_vec_pretty(cfg) else {
        return;
    };

    // Best-effort atomic write.
    let tmp = path.with_extension("json.tmp");
    if fs::write(&tmp, json).is_ok() {
        let _ = fs::rename(&tmp, &path).or_else(|_| {
            // If rename fails (e.g. cross-device), fall back.
            match fs::read(&tmp) {
                Ok(bytes) => fs::write(&path, bytes).and_then(|_| fs::remove_file(&tmp)),
                Err(_) => fs::remove_file(&tmp),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.daemon_addr, "127.0.0.1:3700");
        assert_eq!(cfg.ui_theme_mode, UiThemeMode::Dark);
        assert!(cfg.username_override.is_none());
        assert!(cfg.saved_window.is_none());
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut cfg = AppConfig::default();
        cfg.username_override = Some("alice".to_string());
        cfg.saved_window = Some(SavedWindow {
            outer_pos: [10.0, 20.0],
            inner_size: [800.0, 600.0],
            maximized: false,
        });
        let json = serde_json::to_string(&cfg).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.username_override.as_deref(), Some("alice"));
        assert_eq!(back.saved_window.unwrap().inner_size, [800.0, 600.0]);
    }
}
