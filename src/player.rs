use std::path::Path;

use iced::widget::image;
use iced_video_player::Video;

use crate::asset::{self, AssetKind};
use crate::error::MediaError;
use crate::lazy_media::{Effect, LazyMedia, MediaProps, Preload};
use crate::media_log;
use crate::probe;
use crate::site::SlotId;
use crate::viewport::ViewportPolicy;

/// One on-page video element and the controller that decides when it loads.
pub struct MediaSlot {
    pub id: SlotId,
    pub controller: LazyMedia,
    pub video: Option<Video>,
    pub poster: Option<image::Handle>,
}

impl MediaSlot {
    pub fn mount(
        id: SlotId,
        props: MediaProps,
        policy: ViewportPolicy,
        root: &Path,
    ) -> (Self, Vec<Effect>) {
        let poster = poster_handle(&props, root);
        let (controller, effects) = LazyMedia::mount(props, policy);
        let slot = MediaSlot {
            id,
            controller,
            video: None,
            poster,
        };
        (slot, effects)
    }

    /// Build the pipeline for `locator` and report the outcome to the controller.
    pub fn assign_source(&mut self, locator: &str, preload: Preload, root: &Path) -> Vec<Effect> {
        let start = media_log::log_load_start(self.id, locator);
        log::trace!("Slot {} preload hint {:?}", self.id, preload);

        let result = asset::resolve(locator, AssetKind::Video, root).and_then(|url| {
            // Serialise pipeline creation with the preload probes
            let lock = probe::gstreamer_lock();
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Video::new(&url).map_err(|e| MediaError::load(locator, AssetKind::Video, e))
        });

        media_log::log_load_complete(self.id, result.is_ok(), start);

        match result {
            Ok(mut video) => {
                let props = self.controller.props();
                video.set_looping(props.looping);
                video.set_muted(props.muted);
                // Playback is started by the controller, never by the pipeline
                video.set_paused(true);
                self.video = Some(video);
                self.controller.can_play()
            }
            Err(e) => {
                self.video = None;
                self.controller.failed(&e)
            }
        }
    }

    /// The pipeline reported an error after it was built.
    pub fn fail(&mut self, reason: &str) -> Vec<Effect> {
        let locator = self
            .controller
            .source()
            .unwrap_or(&self.controller.props().locator)
            .to_string();
        let error = MediaError::load(locator, AssetKind::Video, reason);
        self.controller.failed(&error)
    }

    /// Release the pipeline so the poster takes its place.
    pub fn show_poster(&mut self) {
        if self.video.take().is_some() {
            log::debug!("Slot {} released its pipeline", self.id);
        }
    }

    pub fn play(&mut self) -> Result<(), MediaError> {
        match self.video.as_mut() {
            Some(video) => {
                video.set_paused(false);
                media_log::log_playback_toggle(self.id, false);
                Ok(())
            }
            None => Err(MediaError::PlaybackBlocked {
                locator: self.controller.props().locator.clone(),
                reason: "no pipeline".to_string(),
            }),
        }
    }

    /// Play, swallowing any refusal.
    pub fn start_playback(&mut self) {
        if let Err(e) = self.play() {
            media_log::log_playback_blocked(self.id, &e.to_string());
            self.controller.play_rejected(&e);
        }
    }

    pub fn pause(&mut self) {
        if let Some(video) = self.video.as_mut() {
            if !video.paused() {
                video.set_paused(true);
                media_log::log_playback_toggle(self.id, true);
            }
        }
    }

    pub fn set_props(&mut self, props: MediaProps, root: &Path) -> Vec<Effect> {
        if props.poster != self.controller.props().poster {
            self.poster = poster_handle(&props, root);
        }
        self.controller.set_props(props)
    }
}

impl Drop for MediaSlot {
    fn drop(&mut self) {
        self.controller.unmount();
    }
}

fn poster_handle(props: &MediaProps, root: &Path) -> Option<image::Handle> {
    image_handle(props.poster.as_deref()?, root)
}

/// Image handles for static page images, resolved once.
pub fn image_handle(locator: &str, root: &Path) -> Option<image::Handle> {
    let url = asset::resolve(locator, AssetKind::Image, root).ok()?;
    let path = url.to_file_path().ok()?;
    Some(image::Handle::from_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazy_media::Phase;

    fn mounted(props: MediaProps) -> (MediaSlot, Vec<Effect>) {
        MediaSlot::mount(7, props, ViewportPolicy::default(), Path::new("public"))
    }

    #[test]
    fn play_without_pipeline_is_blocked_and_swallowed() {
        let (mut slot, _) = mounted(MediaProps::new("/videos/feature-1.mp4").priority(true));
        assert!(matches!(
            slot.play(),
            Err(MediaError::PlaybackBlocked { .. })
        ));

        slot.start_playback();
        assert!(!slot.controller.is_playing());
        assert_eq!(slot.controller.phase(), Phase::Loading);
    }

    #[test]
    fn poster_is_resolved_on_mount() {
        let (slot, _) = mounted(MediaProps::new("/videos/a.mp4").poster("/videos/a-poster.webp"));
        assert!(slot.poster.is_some());

        let (slot, _) = mounted(MediaProps::new("/videos/a.mp4"));
        assert!(slot.poster.is_none());
    }

    #[test]
    fn pipeline_error_falls_back_to_the_poster() {
        let (mut slot, _) = mounted(
            MediaProps::new("/videos/a.mp4")
                .poster("/videos/a-poster.webp")
                .priority(true),
        );

        let effects = slot.fail("Internal data stream error");
        assert_eq!(effects, vec![Effect::ShowPoster]);
        slot.show_poster();

        assert!(slot.video.is_none());
        assert_eq!(slot.controller.phase(), Phase::Failed);
        assert!(slot.controller.shows_poster());
        assert!(slot.fail("again").is_empty());
    }

    #[test]
    fn dropping_a_slot_cancels_its_timers() {
        let (slot, _) = mounted(MediaProps::new("/videos/a.mp4"));
        let token = slot.controller.cancellation();
        drop(slot);
        assert!(token.is_cancelled());
    }
}
