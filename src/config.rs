//! Library defaults — TOML-based, platform-aware paths.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::protocol;

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# blink1-control defaults — changes made outside the library may be overwritten.\n\n";

/// Tunable defaults for blink(1) controllers.
///
/// Every field has a built-in fallback, so a partial (or absent) config
/// file is fine. Apply to a controller with
/// [`Blink1::with_defaults`](crate::controller::Blink1::with_defaults) or
/// [`Blink1::from_defaults`](crate::controller::Blink1::from_defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Default color (hex or name). Default: "#FFFFFF" (white).
    #[serde(default = "default_color")]
    pub color: String,

    /// Default fade duration in milliseconds. Default: 300.
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u16,

    /// Default blink half-cycle delay in milliseconds. Default: 500.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u16,

    /// Default blink repetition count. Default: 3.
    #[serde(default = "default_repeat")]
    pub repeat: u8,

    /// Preferred device serial number. Empty = auto-select first device.
    #[serde(default)]
    pub device_serial: String,
}

fn default_color() -> String {
    "#FFFFFF".into()
}
fn default_fade_ms() -> u16 {
    protocol::DEFAULT_FADE_MS
}
fn default_delay_ms() -> u16 {
    protocol::DEFAULT_DELAY_MS
}
fn default_repeat() -> u8 {
    protocol::DEFAULT_REPEAT
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            color: default_color(),
            fade_ms: default_fade_ms(),
            delay_ms: default_delay_ms(),
            repeat: default_repeat(),
            device_serial: String::new(),
        }
    }
}

impl Defaults {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("blink1-control"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load defaults from disk, or return the built-ins if not found.
    pub fn load() -> Self {
        let (defaults, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        defaults
    }

    /// Load from the default path, returning the defaults and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Load from an arbitrary path, returning the defaults and any parse warnings.
    ///
    /// Returns `(built-ins, [])` if the file doesn't exist.
    /// Returns `(built-ins, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(defaults) => (defaults, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using built-in defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Save to an arbitrary path atomically (write to temp file, then rename).
    ///
    /// A header comment is prepended to warn that manual edits may be overwritten.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Save to the default platform path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config directory",
            ));
        };
        self.save_to(&path)
    }

    /// Parse the `color` field into an [`Rgb`].
    pub fn resolved_color(&self) -> crate::error::Result<Rgb> {
        crate::color::parse_color(&self.color)
    }
}
