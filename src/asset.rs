use std::fmt;
use std::path::Path;

use url::Url;

use crate::error::MediaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Video,
    Image,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Video => f.write_str("video"),
            AssetKind::Image => f.write_str("image"),
        }
    }
}

/// A single asset the loading screen waits for. Identified by its locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetDescriptor {
    pub locator: String,
    pub kind: AssetKind,
}

impl AssetDescriptor {
    pub fn video(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            kind: AssetKind::Video,
        }
    }

    pub fn image(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            kind: AssetKind::Image,
        }
    }
}

/// Ordered batch of assets: all videos first, then all images.
#[derive(Debug, Clone, Default)]
pub struct AssetBatch {
    assets: Vec<AssetDescriptor>,
}

impl AssetBatch {
    pub fn new<V, I>(videos: V, images: I) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let assets = videos
            .into_iter()
            .map(AssetDescriptor::video)
            .chain(images.into_iter().map(AssetDescriptor::image))
            .collect();
        Self { assets }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetDescriptor> {
        self.assets.iter()
    }

    /// Keep only the assets whose locator appears in `locators`, preserving order.
    pub fn retain_locators(&self, locators: &[String]) -> AssetBatch {
        let assets = self
            .assets
            .iter()
            .filter(|asset| locators.contains(&asset.locator))
            .cloned()
            .collect();
        AssetBatch { assets }
    }
}

/// True for absolute URLs that do not point at the local filesystem.
pub fn is_remote(locator: &str) -> bool {
    Url::parse(locator).is_ok_and(|url| url.scheme() != "file")
}

/// Resolve a locator into a URL the media backends understand.
///
/// Absolute URLs pass through untouched. Site-relative locators such as
/// `/videos/hero-1.mp4` are joined onto `root` and turned into `file://` URLs.
pub fn resolve(locator: &str, kind: AssetKind, root: &Path) -> Result<Url, MediaError> {
    if let Ok(url) = Url::parse(locator) {
        return Ok(url);
    }

    let relative = locator.trim_start_matches('/');
    let joined = root.join(relative);
    let absolute = std::path::absolute(&joined).map_err(|e| MediaError::load(locator, kind, e))?;

    Url::from_file_path(&absolute)
        .map_err(|_| MediaError::load(locator, kind, "locator is not a valid file path"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_orders_videos_before_images() {
        let batch = AssetBatch::new(["/videos/a.mp4", "/videos/b.mp4"], ["/img/logo.webp"]);
        let kinds: Vec<_> = batch.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![AssetKind::Video, AssetKind::Video, AssetKind::Image]
        );
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn retain_keeps_only_named_locators() {
        let batch = AssetBatch::new(["/videos/a.mp4", "/videos/b.mp4"], ["/img/logo.webp"]);
        let critical = batch.retain_locators(&["/videos/b.mp4".to_string()]);
        assert_eq!(critical.len(), 1);
        assert_eq!(
            critical.iter().next().map(|a| a.locator.as_str()),
            Some("/videos/b.mp4")
        );
    }

    #[test]
    fn relative_locator_resolves_under_root() {
        let root = std::path::absolute("public").unwrap();
        let url = resolve("/videos/hero-1.mp4", AssetKind::Video, &root).unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("public/videos/hero-1.mp4"));
    }

    #[test]
    fn absolute_url_passes_through() {
        let url = resolve(
            "https://cdn.example.com/img/logo.webp",
            AssetKind::Image,
            Path::new("public"),
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn only_non_file_urls_are_remote() {
        assert!(is_remote("https://cdn.example.com/img/logo.webp"));
        assert!(!is_remote("file:///srv/public/img/logo.webp"));
        assert!(!is_remote("/img/logo.webp"));
    }
}
