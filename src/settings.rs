// ============================================================================
// ENGINE SETTINGS — key=value file in the platform config directory
// ============================================================================

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::codec::DEFAULT_JPEG_QUALITY;
use crate::command::WorkspaceOptions;
use crate::persist::DEFAULT_MAX_DIMENSION;

const SETTINGS_FILE: &str = "pixelgraph_settings.cfg";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    /// JPEG output quality, 1–100.
    pub jpeg_quality: u8,
    /// Longest accepted side for any image a script creates or reads.
    pub max_dimension: usize,
    /// Write the session log file.
    pub session_log: bool,
    /// Print "Line <n>: <keyword> done" for each succeeded line.
    pub echo_success: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
            session_log: true,
            echo_success: true,
        }
    }
}

impl EngineSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelgraph/pixelgraph_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelGraph\pixelgraph_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelGraph/pixelgraph_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("pixelgraph");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("PixelGraph").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixelGraph")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Load from the default location (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`. Unknown keys and malformed values are ignored.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "jpeg_quality" => {
                    if let Ok(q) = val.parse::<u8>()
                        && (1..=100).contains(&q)
                    {
                        s.jpeg_quality = q;
                    }
                }
                "max_dimension" => {
                    if let Ok(d) = val.parse::<usize>()
                        && d > 0
                    {
                        s.max_dimension = d;
                    }
                }
                "session_log" => s.session_log = val == "true",
                "echo_success" => s.echo_success = val == "true",
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "jpeg_quality={}\n\
             max_dimension={}\n\
             session_log={}\n\
             echo_success={}\n",
            self.jpeg_quality, self.max_dimension, self.session_log, self.echo_success,
        )
    }

    /// Write the settings file, creating its directory.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_config_string())
    }

    pub fn workspace_options(&self) -> WorkspaceOptions {
        WorkspaceOptions {
            jpeg_quality: self.jpeg_quality,
            max_dimension: self.max_dimension,
        }
    }
}
