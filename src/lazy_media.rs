//! Viewport-gated lifecycle of a single media element.
//!
//! The controller never touches a pipeline itself. Each input returns the
//! [`Effect`]s the owner must carry out, which keeps every transition testable
//! without GStreamer or a window.
//!
//! ```text
//! Unobserved --(enters load boundary)--> Entered --(jitter)--> Loading --(can play)--> Ready
//!      \______________(priority)___________________________/        \
//!                                                            (error) `--> Failed
//! ```
//!
//! Once `Loading` is reached the element never goes back to not-loading; only
//! play and pause flip, driven by the stricter playback boundary.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::MediaError;
use crate::viewport::{Rect, ViewportPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preload {
    #[default]
    None,
    Metadata,
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaProps {
    pub locator: String,
    pub poster: Option<String>,
    /// Skip the viewport gate and load on mount.
    pub priority: bool,
    pub autoplay: bool,
    pub looping: bool,
    pub muted: bool,
    pub preload: Preload,
}

impl MediaProps {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            poster: None,
            priority: false,
            autoplay: true,
            looping: true,
            muted: true,
            preload: Preload::None,
        }
    }

    pub fn poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    pub fn priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn preload(mut self, preload: Preload) -> Self {
        self.preload = preload;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unobserved,
    Entered,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Call [`LazyMedia::load_due`] after this delay.
    ScheduleLoad { after: Duration },
    AssignSource { locator: String, preload: Preload },
    Play { when_idle: bool },
    Pause,
    ShowPoster,
    /// First frame is available; notify whoever cares.
    LoadedData,
}

#[derive(Debug)]
pub struct LazyMedia {
    props: MediaProps,
    policy: ViewportPolicy,
    phase: Phase,
    visible_now: bool,
    playing: bool,
    loaded_data_sent: bool,
    mounted: bool,
    cancel: CancellationToken,
}

impl LazyMedia {
    pub fn mount(props: MediaProps, policy: ViewportPolicy) -> (Self, Vec<Effect>) {
        let mut media = Self {
            props,
            policy,
            phase: Phase::Unobserved,
            visible_now: false,
            playing: false,
            loaded_data_sent: false,
            mounted: true,
            cancel: CancellationToken::new(),
        };

        let effects = if media.props.priority {
            // Priority elements are assumed on screen until geometry says otherwise
            media.visible_now = true;
            media.start_loading()
        } else {
            Vec::new()
        };

        (media, effects)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn props(&self) -> &MediaProps {
        &self.props
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_visible(&self) -> bool {
        self.visible_now
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Token cancelled on unmount. Timers scheduled for this element select on it.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The locator the pipeline should be playing, once loading has started.
    pub fn source(&self) -> Option<&str> {
        match self.phase {
            Phase::Loading | Phase::Ready => Some(&self.props.locator),
            _ => None,
        }
    }

    /// Poster stays up until the first playable frame, and for good after an error.
    pub fn shows_poster(&self) -> bool {
        self.props.poster.is_some() && self.phase != Phase::Ready
    }

    /// Feed the element's current rectangle and the scroll viewport.
    pub fn observe<R: Rng + ?Sized>(
        &mut self,
        element: Rect,
        viewport: Rect,
        rng: &mut R,
    ) -> Vec<Effect> {
        if !self.mounted || self.phase == Phase::Failed {
            return Vec::new();
        }

        let mut effects = Vec::new();

        if self.phase == Phase::Unobserved && self.policy.load.intersects(element, viewport) {
            self.phase = Phase::Entered;
            let after = jitter(self.policy.max_jitter(), rng);
            log::trace!("{} entered viewport, loading in {:?}", self.props.locator, after);
            effects.push(Effect::ScheduleLoad { after });
        }

        // Tracked from first entry so `can_play` knows whether to start;
        // effects only follow once loading has started.
        if self.phase != Phase::Unobserved {
            let visible = self.policy.playback.intersects(element, viewport);
            if visible != self.visible_now {
                self.visible_now = visible;
                effects.extend(self.visibility_changed());
            }
        }

        effects
    }

    /// The jitter delay scheduled by [`Effect::ScheduleLoad`] has elapsed.
    pub fn load_due(&mut self) -> Vec<Effect> {
        if !self.mounted || self.phase != Phase::Entered {
            return Vec::new();
        }
        self.start_loading()
    }

    /// The pipeline can start playing.
    pub fn can_play(&mut self) -> Vec<Effect> {
        if !self.mounted || self.phase != Phase::Loading {
            return Vec::new();
        }
        self.phase = Phase::Ready;

        if self.props.autoplay && self.visible_now {
            self.playing = true;
            vec![Effect::Play { when_idle: true }]
        } else {
            Vec::new()
        }
    }

    pub fn frame_presented(&mut self) -> Vec<Effect> {
        if !self.mounted || self.phase != Phase::Ready || self.loaded_data_sent {
            return Vec::new();
        }
        self.loaded_data_sent = true;
        vec![Effect::LoadedData]
    }

    /// Playback reached the end of a non-looping source.
    pub fn ended(&mut self) {
        if !self.props.looping {
            self.playing = false;
        }
    }

    /// Native load error. Terminal for this element's playback.
    pub fn failed(&mut self, error: &MediaError) -> Vec<Effect> {
        if !self.mounted || self.phase == Phase::Failed {
            return Vec::new();
        }
        log::warn!("{}", error);
        self.phase = Phase::Failed;
        self.playing = false;
        vec![Effect::ShowPoster]
    }

    /// The platform refused to start playback. Best-effort, so just forget it.
    pub fn play_rejected(&mut self, error: &MediaError) {
        log::debug!("{}", error);
        self.playing = false;
    }

    pub fn set_props(&mut self, props: MediaProps) -> Vec<Effect> {
        if !self.mounted || props == self.props {
            return Vec::new();
        }

        let locator_changed = props.locator != self.props.locator;
        let became_priority = props.priority && !self.props.priority;
        self.props = props;

        match self.phase {
            Phase::Failed => Vec::new(),
            Phase::Unobserved | Phase::Entered if became_priority => {
                self.visible_now = true;
                self.start_loading()
            }
            Phase::Loading | Phase::Ready if locator_changed => {
                let mut effects = Vec::new();
                if self.playing {
                    self.playing = false;
                    effects.push(Effect::Pause);
                }
                self.loaded_data_sent = false;
                effects.extend(self.start_loading());
                effects
            }
            _ => Vec::new(),
        }
    }

    /// Stop reacting to anything. Pending timers are cancelled.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.playing = false;
        self.cancel.cancel();
    }

    fn start_loading(&mut self) -> Vec<Effect> {
        self.phase = Phase::Loading;
        vec![Effect::AssignSource {
            locator: self.props.locator.clone(),
            preload: self.props.preload,
        }]
    }

    fn visibility_changed(&mut self) -> Vec<Effect> {
        if !self.visible_now && self.playing {
            self.playing = false;
            vec![Effect::Pause]
        } else if self.visible_now
            && !self.playing
            && self.props.autoplay
            && self.phase == Phase::Ready
        {
            self.playing = true;
            vec![Effect::Play { when_idle: false }]
        } else {
            Vec::new()
        }
    }
}

fn jitter<R: Rng + ?Sized>(max: Duration, rng: &mut R) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.random_range(0..max_ms))
}
