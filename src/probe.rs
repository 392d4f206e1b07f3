//! Native load probes for the preload batch.
//!
//! A probe resolves once its asset's "native event" has fired: an image has
//! finished decoding, or a video pipeline has prerolled far enough to know its
//! metadata. Racing that against a timeout is the batch loader's job.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use gstreamer::prelude::*;

use crate::asset::{self, AssetDescriptor, AssetKind};
use crate::error::MediaError;
use crate::media_log;

#[async_trait]
pub trait Probe: Send + Sync + 'static {
    async fn probe(&self, asset: &AssetDescriptor) -> Result<(), MediaError>;
}

// GStreamer element construction is serialised the same way the player does it
static GSTREAMER_INIT_LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();

pub fn gstreamer_lock() -> Arc<Mutex<()>> {
    GSTREAMER_INIT_LOCK
        .get_or_init(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Probe backed by the `image` decoder and a headless GStreamer `playbin`.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    root: PathBuf,
    /// Upper bound for the blocking bus wait so abandoned workers exit.
    video_budget: Duration,
}

impl MediaProbe {
    pub fn new(root: impl Into<PathBuf>, video_budget: Duration) -> Self {
        Self {
            root: root.into(),
            video_budget,
        }
    }
}

#[async_trait]
impl Probe for MediaProbe {
    async fn probe(&self, asset: &AssetDescriptor) -> Result<(), MediaError> {
        let url = asset::resolve(&asset.locator, asset.kind, &self.root)?;
        let locator = asset.locator.clone();
        let start = media_log::log_probe_start(&locator, asset.kind);

        let result = match asset.kind {
            AssetKind::Image => {
                let path = url
                    .to_file_path()
                    .map_err(|_| MediaError::load(&locator, AssetKind::Image, "only local images can be decoded"))?;
                let locator = locator.clone();
                tokio::task::spawn_blocking(move || decode_image(&locator, path))
                    .await
                    .unwrap_or_else(|e| Err(MediaError::load(&asset.locator, AssetKind::Image, e)))
            }
            AssetKind::Video => {
                let uri = url.to_string();
                let locator = locator.clone();
                let budget = self.video_budget;
                tokio::task::spawn_blocking(move || preroll_video(&locator, &uri, budget))
                    .await
                    .unwrap_or_else(|e| Err(MediaError::load(&asset.locator, AssetKind::Video, e)))
            }
        };

        media_log::log_probe_complete(&locator, asset.kind, result.is_ok(), start);
        result
    }
}

fn decode_image(locator: &str, path: PathBuf) -> Result<(), MediaError> {
    let reader = image::ImageReader::open(&path)
        .map_err(|e| MediaError::load(locator, AssetKind::Image, e))?
        .with_guessed_format()
        .map_err(|e| MediaError::load(locator, AssetKind::Image, e))?;

    let decoded = reader
        .decode()
        .map_err(|e| MediaError::load(locator, AssetKind::Image, e))?;

    log::trace!(
        "Decoded {}: {}x{}",
        locator,
        decoded.width(),
        decoded.height()
    );
    Ok(())
}

/// Preroll `uri` into `PAUSED` with fake sinks and wait for ASYNC_DONE.
fn preroll_video(locator: &str, uri: &str, budget: Duration) -> Result<(), MediaError> {
    let load_err = |reason: String| MediaError::load(locator, AssetKind::Video, reason);

    let playbin = {
        let lock = gstreamer_lock();
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        gstreamer::init().map_err(|e| load_err(e.to_string()))?;

        let video_sink = gstreamer::ElementFactory::make("fakesink")
            .build()
            .map_err(|e| load_err(e.to_string()))?;
        let audio_sink = gstreamer::ElementFactory::make("fakesink")
            .build()
            .map_err(|e| load_err(e.to_string()))?;

        gstreamer::ElementFactory::make("playbin")
            .property("uri", uri)
            .property("video-sink", video_sink)
            .property("audio-sink", audio_sink)
            .build()
            .map_err(|e| load_err(e.to_string()))?
    };

    let bus = playbin
        .bus()
        .ok_or_else(|| load_err("playbin has no bus".to_string()))?;

    if let Err(e) = playbin.set_state(gstreamer::State::Paused) {
        let _ = playbin.set_state(gstreamer::State::Null);
        return Err(load_err(e.to_string()));
    }

    let timeout = gstreamer::ClockTime::from_mseconds(budget.as_millis() as u64);
    let result = match bus.timed_pop_filtered(
        timeout,
        &[gstreamer::MessageType::AsyncDone, gstreamer::MessageType::Error],
    ) {
        Some(msg) => {
            use gstreamer::MessageView;

            match msg.view() {
                MessageView::Error(err) => Err(load_err(format!(
                    "{} (debug: {:?})",
                    err.error(),
                    err.debug()
                ))),
                _ => Ok(()),
            }
        }
        None => Err(MediaError::LoadTimeout {
            locator: locator.to_string(),
            kind: AssetKind::Video,
            budget,
        }),
    };

    let _ = playbin.set_state(gstreamer::State::Null);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_image_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let probe = MediaProbe::new(dir.path(), Duration::from_secs(1));

        let err = probe
            .probe(&AssetDescriptor::image("/img/missing.webp"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MediaError::LoadError {
                kind: AssetKind::Image,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn valid_png_decodes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("img")).unwrap();
        let path = dir.path().join("img").join("dot.png");
        image::RgbImage::new(2, 2).save(&path).unwrap();

        let probe = MediaProbe::new(dir.path(), Duration::from_secs(1));
        probe
            .probe(&AssetDescriptor::image("/img/dot.png"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn garbage_image_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

        let probe = MediaProbe::new(dir.path(), Duration::from_secs(1));
        assert!(probe
            .probe(&AssetDescriptor::image("broken.png"))
            .await
            .is_err());
    }
}
