use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::asset::{self, AssetBatch};
use crate::error::ConfigError;
use crate::preload::PreloadSettings;
use crate::viewport::ViewportPolicy;

const DEFAULT_ASSET_ROOT: &str = "public";
const CONFIG_FILE_NAME: &str = "showreel.json";

/// Everything the loading screen and the lazy media slots are tuned by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub videos: Vec<String>,
    pub images: Vec<String>,
    pub preload: PreloadSettings,
    pub viewport: ViewportPolicy,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            videos: [
                "/videos/hero-1.mp4",
                "/videos/hero-2.mp4",
                "/videos/hero-3.mp4",
                "/videos/hero-4.mp4",
                "/videos/feature-1.mp4",
                "/videos/feature-2.mp4",
                "/videos/feature-3.mp4",
                "/videos/feature-4.mp4",
                "/videos/feature-5.mp4",
            ]
            .map(String::from)
            .to_vec(),
            images: [
                "/img/logo.webp",
                "/img/about.webp",
                "/img/entrance.webp",
                "/img/contact-1.webp",
                "/img/contact-2.webp",
                "/img/swordman.webp",
                "/img/swordman-partial.webp",
                "/img/prologue-1.webp",
                "/img/prologue-2.webp",
                "/img/prologue-3.webp",
                "/img/prologue-4.webp",
            ]
            .map(String::from)
            .to_vec(),
            preload: PreloadSettings::default(),
            viewport: ViewportPolicy::default(),
        }
    }
}

impl SiteConfig {
    pub fn batch(&self) -> AssetBatch {
        AssetBatch::new(self.videos.iter().cloned(), self.images.iter().cloned())
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: Self = serde_json::from_str(&content)?;
                Ok(config.without_remote_images())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Images are decoded from disk only. Remote videos stay, GStreamer streams them.
    fn without_remote_images(mut self) -> Self {
        self.images.retain(|locator| {
            let remote = asset::is_remote(locator);
            if remote {
                log::warn!("Dropping remote image {}: only local images are supported", locator);
            }
            !remote
        });
        self
    }
}

/// Where assets are served from: `$SHOWREEL_ASSETS`, else `./public`.
pub fn asset_root() -> PathBuf {
    std::env::var_os("SHOWREEL_ASSETS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_ROOT))
}

/// `$SHOWREEL_CONFIG`, else `showreel.json` inside the asset root.
pub fn config_path(root: &Path) -> PathBuf {
    std::env::var_os("SHOWREEL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME))
}

/// Load the site config, falling back to defaults when the file is unusable.
pub fn load_or_default(path: &Path) -> SiteConfig {
    match SiteConfig::load(path) {
        Ok(config) => {
            log::info!(
                "Config loaded: {} videos, {} images",
                config.videos.len(),
                config.images.len()
            );
            config
        }
        Err(e) => {
            log::warn!("Ignoring {}: {}", path.display(), e);
            SiteConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preload::ReadinessPolicy;

    #[test]
    fn defaults_cover_the_landing_page_assets() {
        let config = SiteConfig::default();
        assert_eq!(config.videos.len(), 9);
        assert_eq!(config.images.len(), 11);
        assert_eq!(config.batch().len(), 20);
        assert_eq!(config.preload.image_timeout_ms, 10_000);
        assert_eq!(config.preload.video_timeout_ms, 15_000);
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SiteConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"{
                "videos": ["/videos/only.mp4"],
                "preload": {
                    "display_delay_ms": 300,
                    "readiness": {
                        "mode": "critical",
                        "locators": ["/videos/only.mp4"],
                        "max_wait_ms": 5000
                    }
                },
                "viewport": { "max_jitter_ms": 0 }
            }"#,
        )
        .unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.videos, vec!["/videos/only.mp4".to_string()]);
        assert_eq!(config.images.len(), 11);
        assert_eq!(config.preload.display_delay_ms, 300);
        assert_eq!(config.preload.video_timeout_ms, 15_000);
        assert!(matches!(
            config.preload.readiness,
            ReadinessPolicy::Critical { max_wait_ms: 5000, .. }
        ));
        assert_eq!(config.viewport.max_jitter_ms, 0);
        assert_eq!(config.viewport.load.margin, 50.0);
    }

    #[test]
    fn remote_images_are_dropped_but_remote_videos_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"{
                "videos": ["https://cdn.example.com/videos/hero-1.mp4"],
                "images": ["https://cdn.example.com/img/logo.webp", "/img/about.webp"]
            }"#,
        )
        .unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(
            config.videos,
            vec!["https://cdn.example.com/videos/hero-1.mp4".to_string()]
        );
        assert_eq!(config.images, vec!["/img/about.webp".to_string()]);
        assert_eq!(config.batch().len(), 2);
    }

    #[test]
    fn malformed_file_is_an_error_but_load_or_default_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(SiteConfig::load(&path), Err(ConfigError::Parse(_))));
        assert_eq!(load_or_default(&path), SiteConfig::default());
    }
}
