use crate::render::{PixelRatio, RenderSettings};
use crate::scene::animation::CoreSpin;
use crate::scene::color::linear_from_hex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "VAULT_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub window: WindowConfig,
    pub viewport: ViewportConfig,
    pub animation: AnimationConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vault".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_pixel_ratio: f64,
    pub max_pixel_ratio: f64,
    pub msaa_samples: u32,
    pub background: String,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        let ratio = PixelRatio::default();
        Self {
            min_pixel_ratio: ratio.min,
            max_pixel_ratio: ratio.max,
            msaa_samples: 4,
            background: "#050716".to_string(),
        }
    }
}

impl ViewportConfig {
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            pixel_ratio: PixelRatio {
                min: self.min_pixel_ratio,
                max: self.max_pixel_ratio,
            },
            msaa_samples: self.msaa_samples.max(1),
            background: linear_from_hex(&self.background),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub core_spin: CoreSpin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub directory: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("screenshots"),
        }
    }
}

impl CaptureConfig {
    /// Screenshot path for the given frame of the current mount.
    pub fn screenshot_path(&self, frame: u64) -> PathBuf {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.directory
            .join(format!("vault-{stamp}-f{frame:06}.png"))
    }
}

pub fn load_config_from_file(path: &Path) -> Result<VaultConfig> {
    let json = std::fs::read_to_string(path)?;
    parse_config(&json)
}

pub fn parse_config(json: &str) -> Result<VaultConfig> {
    let config: VaultConfig = serde_json::from_str(json)?;
    Ok(config)
}

/// First CLI argument, else `VAULT_CONFIG`.
pub fn config_path(
    mut args: impl Iterator<Item = String>,
    env_value: Option<String>,
) -> Option<PathBuf> {
    args.next()
        .or(env_value)
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

/// Load the configuration named on the command line or in the environment.
/// Failures are logged and defaults used.
pub fn load() -> VaultConfig {
    let path = config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok());
    let Some(path) = path else {
        return VaultConfig::default();
    };
    match load_config_from_file(&path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(err) => {
            log::error!("Failed to load config {}: {err}; using defaults", path.display());
            VaultConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{config_path, parse_config, ConfigError, VaultConfig};
    use crate::scene::animation::CoreSpin;
    use std::path::PathBuf;

    #[test]
    fn empty_object_yields_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config, VaultConfig::default());
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.viewport.msaa_samples, 4);
        assert_eq!(config.animation.core_spin, CoreSpin::PerFrame);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"{
                "window": { "title": "Lobby" },
                "animation": { "core_spin": "per_second" },
                "viewport": { "max_pixel_ratio": 1.5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.window.title, "Lobby");
        assert_eq!(config.window.height, 720);
        assert_eq!(config.animation.core_spin, CoreSpin::PerSecond);
        let settings = config.viewport.render_settings();
        assert_eq!(settings.pixel_ratio.clamp(3.0), 1.5);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = parse_config("{ \"window\": ").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        let err = parse_config(r#"{ "animation": { "core_spin": "sometimes" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn cli_argument_wins_over_environment() {
        let args = vec!["a.json".to_string()].into_iter();
        assert_eq!(
            config_path(args, Some("b.json".to_string())),
            Some(PathBuf::from("a.json"))
        );
        assert_eq!(
            config_path(std::iter::empty(), Some("b.json".to_string())),
            Some(PathBuf::from("b.json"))
        );
        assert_eq!(config_path(std::iter::empty(), Some("  ".to_string())), None);
        assert_eq!(config_path(std::iter::empty(), None), None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = super::load_config_from_file(std::path::Path::new("/nonexistent/vault.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn screenshot_lands_in_capture_directory() {
        let config = VaultConfig::default();
        let path = config.capture.screenshot_path(42);
        assert!(path.starts_with("screenshots"));
        assert!(path.to_string_lossy().ends_with("-f000042.png"));
    }
}
