use std::collections::VecDeque;
use std::sync::Arc;

use iced::event;
use iced::{Element, Subscription, Task};
use tokio_util::sync::CancellationToken;

use crate::asset::AssetKind;
use crate::config;
use crate::lazy_media::Effect;
use crate::message::Message;
use crate::player::{self, MediaSlot};
use crate::preload::{BatchLoader, RunOutcome};
use crate::probe::MediaProbe;
use crate::site::{Block, PageLayout, SlotId};
use crate::state::{App, Screen};
use crate::ui;

impl App {
    /// Load configuration and start the preload run behind the loading screen.
    pub fn boot() -> (Self, Task<Message>) {
        let asset_root = config::asset_root();
        let config = config::load_or_default(&config::config_path(&asset_root));

        let cancel = CancellationToken::new();
        let (progress_tx, progress_rx) = futures::channel::mpsc::unbounded();

        let probe = MediaProbe::new(
            &asset_root,
            config.preload.timeout_for(AssetKind::Video),
        );
        let loader = BatchLoader::new(Arc::new(probe), config.preload.clone());
        let batch = config.batch();
        let run_cancel = cancel.clone();

        let run = Task::perform(
            async move { loader.run(&batch, &progress_tx, &run_cancel).await },
            Message::PreloadFinished,
        );
        let progress = Task::run(progress_rx, Message::PreloadProgress);

        let app = App::new(config, asset_root, cancel);
        (app, Task::batch([progress, run]))
    }

    /// Handle UI messages and state updates.
    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PreloadProgress(percent) => {
                if let Screen::Loading { progress, .. } = &mut self.screen {
                    *progress = (*progress).max(percent);
                }
                Task::none()
            }
            Message::PreloadFinished(RunOutcome::Completed(report)) => {
                if !self.is_loading() {
                    return Task::none();
                }
                self.report = Some(report);
                self.mount_page()
            }
            Message::PreloadFinished(RunOutcome::Cancelled) => {
                log::debug!("Preload run ended after cancellation");
                Task::none()
            }
            Message::SkipLoading => {
                let Screen::Loading { cancel, .. } = &self.screen else {
                    return Task::none();
                };
                log::info!("Loading screen skipped");
                cancel.cancel();
                self.mount_page()
            }
            Message::Scrolled(viewport) => {
                let offset = viewport.absolute_offset();
                let bounds = viewport.bounds();
                self.viewport.x = offset.x;
                self.viewport.y = offset.y;
                self.viewport.width = bounds.width;
                self.viewport.height = bounds.height;
                self.observe_all()
            }
            Message::WindowResized(size) => {
                self.viewport.width = size.width;
                self.viewport.height = size.height;
                self.observe_all()
            }
            Message::LoadDue(slot, fired) => {
                if !fired {
                    return Task::none();
                }
                match self.slots.get_mut(slot) {
                    Some(media) => {
                        let effects = media.controller.load_due();
                        self.apply(slot, effects)
                    }
                    None => Task::none(),
                }
            }
            Message::IdlePlay(slot) => {
                if let Some(media) = self.slots.get_mut(slot) {
                    // It may have scrolled out while waiting for idle
                    let controller = &media.controller;
                    if controller.is_mounted() && controller.is_playing() && controller.is_visible()
                    {
                        media.start_playback();
                    } else {
                        log::trace!(
                            "Slot {} skipped idle play in {:?}",
                            slot,
                            media.controller.phase()
                        );
                    }
                }
                Task::none()
            }
            Message::NewFrame(slot) => match self.slots.get_mut(slot) {
                Some(media) => {
                    let effects = media.controller.frame_presented();
                    self.apply(slot, effects)
                }
                None => Task::none(),
            },
            Message::EndOfStream(slot) => {
                if let Some(media) = self.slots.get_mut(slot) {
                    media.controller.ended();
                }
                Task::none()
            }
            Message::PipelineFailed(slot, reason) => match self.slots.get_mut(slot) {
                Some(media) => {
                    let effects = media.fail(&reason);
                    self.apply(slot, effects)
                }
                None => Task::none(),
            },
            Message::NextHeroVideo => {
                let mut tasks = Vec::new();
                for (slot, props) in self.page.advance_hero() {
                    if let Some(media) = self.slots.get_mut(slot) {
                        let effects = media.set_props(props, &self.asset_root);
                        tasks.push(self.apply(slot, effects));
                    }
                }
                log::info!("Hero now on video {}", self.page.hero_index());
                tasks.push(self.observe_all());
                Task::batch(tasks)
            }
        }
    }

    /// Subscribe to window resizes; scrolling arrives through the scrollable.
    pub fn subscription(&self) -> Subscription<Message> {
        event::listen_with(|event, _status, _window| match event {
            iced::Event::Window(iced::window::Event::Resized(size)) => {
                Some(Message::WindowResized(size))
            }
            _ => None,
        })
    }

    /// Render the view.
    pub fn view(&self) -> Element<'_, Message> {
        ui::render_main_view(self)
    }

    /// Swap the loading screen for the page and mount every media slot.
    fn mount_page(&mut self) -> Task<Message> {
        self.screen = Screen::Site;

        for block in self.page.blocks() {
            if let Block::Image(locator) = block {
                if let Some(handle) = player::image_handle(locator, &self.asset_root) {
                    self.images.insert(*locator, handle);
                }
            }
        }

        let mut tasks = Vec::new();
        for (slot, props) in self.page.slot_props() {
            debug_assert_eq!(slot, self.slots.len());
            let (media, effects) =
                MediaSlot::mount(slot, props, self.config.viewport, &self.asset_root);
            self.slots.push(media);
            tasks.push(self.apply(slot, effects));
        }
        log::info!("Page mounted with {} media slots", self.slots.len());

        tasks.push(self.observe_all());
        Task::batch(tasks)
    }

    /// Feed current geometry to every slot.
    fn observe_all(&mut self) -> Task<Message> {
        let layout = PageLayout::new(self.viewport.width, self.viewport.height);
        let rects = layout.slot_rects(self.page.blocks());
        let mut rng = rand::rng();

        let mut tasks = Vec::new();
        for (slot, rect) in rects {
            if let Some(media) = self.slots.get_mut(slot) {
                let effects = media.controller.observe(rect, self.viewport, &mut rng);
                tasks.push(self.apply(slot, effects));
            }
        }
        Task::batch(tasks)
    }

    /// Carry out controller effects for one slot.
    fn apply(&mut self, slot: SlotId, effects: Vec<Effect>) -> Task<Message> {
        let mut queue: VecDeque<Effect> = effects.into();
        let mut tasks = Vec::new();

        while let Some(effect) = queue.pop_front() {
            let Some(media) = self.slots.get_mut(slot) else {
                break;
            };

            match effect {
                Effect::ScheduleLoad { after } => {
                    let cancel = media.controller.cancellation();
                    tasks.push(Task::perform(
                        async move {
                            tokio::select! {
                                _ = cancel.cancelled() => false,
                                _ = tokio::time::sleep(after) => true,
                            }
                        },
                        move |fired| Message::LoadDue(slot, fired),
                    ));
                }
                Effect::AssignSource { locator, preload } => {
                    queue.extend(media.assign_source(&locator, preload, &self.asset_root));
                }
                Effect::Play { when_idle: true } => {
                    tasks.push(Task::perform(tokio::task::yield_now(), move |_| {
                        Message::IdlePlay(slot)
                    }));
                }
                Effect::Play { when_idle: false } => media.start_playback(),
                Effect::Pause => media.pause(),
                Effect::ShowPoster => media.show_poster(),
                Effect::LoadedData => {
                    self.loaded_media += 1;
                    log::info!(
                        "Slot {} has data ({} media ready)",
                        slot,
                        self.loaded_media
                    );
                }
            }
        }

        Task::batch(tasks)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use iced::Size;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::SiteConfig;
    use crate::lazy_media::{MediaProps, Phase};
    use crate::preload::BatchReport;
    use crate::viewport::Rect;

    fn app() -> App {
        App::new(
            SiteConfig::default(),
            PathBuf::from("public"),
            CancellationToken::new(),
        )
    }

    fn progress(app: &App) -> Option<u8> {
        match app.screen {
            Screen::Loading { progress, .. } => Some(progress),
            Screen::Site => None,
        }
    }

    fn report() -> BatchReport {
        BatchReport {
            total: 3,
            loaded: 3,
            errored: 0,
            timed_out: 0,
            capped: false,
            elapsed: Duration::from_millis(1100),
        }
    }

    /// Show the page without mounting the landing slots, then add one lazy slot.
    fn site_with_lazy_slot(app: &mut App) -> SlotId {
        app.screen = Screen::Site;
        let id = app.slots.len();
        let props = MediaProps::new("/videos/feature-1.mp4").poster("/videos/feature-1-poster.webp");
        let (media, effects) =
            MediaSlot::mount(id, props, app.config.viewport, &app.asset_root);
        assert!(effects.is_empty());
        app.slots.push(media);
        id
    }

    fn enter_viewport(app: &mut App, slot: SlotId) {
        let viewport = app.viewport;
        let element = Rect::new(0.0, 0.0, viewport.width, viewport.height);
        let mut rng = StdRng::seed_from_u64(7);
        let _ = app.slots[slot].controller.observe(element, viewport, &mut rng);
        assert_eq!(app.slots[slot].controller.phase(), Phase::Entered);
    }

    /// Drive the controller to Ready and playing without building a pipeline.
    fn ready_and_playing(app: &mut App, slot: SlotId) {
        enter_viewport(app, slot);
        let controller = &mut app.slots[slot].controller;
        let _ = controller.load_due();
        let _ = controller.can_play();
        assert!(controller.is_playing());
    }

    #[test]
    fn progress_never_moves_backwards() {
        let mut app = app();
        let _ = app.update(Message::PreloadProgress(40));
        let _ = app.update(Message::PreloadProgress(20));
        assert_eq!(progress(&app), Some(40));

        let _ = app.update(Message::PreloadProgress(66));
        assert_eq!(progress(&app), Some(66));
    }

    #[test]
    fn cancelled_run_keeps_the_loading_screen() {
        let mut app = app();
        let _ = app.update(Message::PreloadFinished(RunOutcome::Cancelled));

        assert!(app.is_loading());
        assert!(app.report.is_none());
        assert!(app.slots.is_empty());
    }

    #[test]
    fn late_completion_after_the_page_is_shown_is_ignored() {
        let mut app = app();
        // The page is already up, as after Skip.
        app.screen = Screen::Site;

        let _ = app.update(Message::PreloadFinished(RunOutcome::Completed(report())));

        assert!(app.report.is_none());
        assert!(app.slots.is_empty());
    }

    #[test]
    fn skip_after_the_page_is_shown_does_nothing() {
        let mut app = app();
        app.screen = Screen::Site;

        let _ = app.update(Message::SkipLoading);

        assert!(!app.is_loading());
        assert!(app.slots.is_empty());
    }

    #[test]
    fn cancelled_load_timer_does_not_start_loading() {
        let mut app = app();
        let slot = site_with_lazy_slot(&mut app);
        enter_viewport(&mut app, slot);

        let _ = app.update(Message::LoadDue(slot, false));
        assert_eq!(app.slots[slot].controller.phase(), Phase::Entered);
        assert!(app.slots[slot].video.is_none());

        // Unknown slots are ignored.
        let _ = app.update(Message::LoadDue(99, true));
    }

    #[test]
    fn idle_play_skips_a_slot_that_scrolled_out() {
        let mut app = app();
        let slot = site_with_lazy_slot(&mut app);
        ready_and_playing(&mut app, slot);

        let viewport = app.viewport;
        let below = Rect::new(0.0, viewport.height * 4.0, viewport.width, viewport.height);
        let mut rng = StdRng::seed_from_u64(7);
        let _ = app.slots[slot].controller.observe(below, viewport, &mut rng);
        assert!(!app.slots[slot].controller.is_visible());

        let _ = app.update(Message::IdlePlay(slot));

        let controller = &app.slots[slot].controller;
        assert!(!controller.is_playing());
        assert_eq!(controller.phase(), Phase::Ready);
    }

    #[test]
    fn pipeline_error_switches_the_slot_to_its_poster() {
        let mut app = app();
        let slot = site_with_lazy_slot(&mut app);
        ready_and_playing(&mut app, slot);

        let _ = app.update(Message::PipelineFailed(slot, "decoder error".into()));

        let media = &app.slots[slot];
        assert_eq!(media.controller.phase(), Phase::Failed);
        assert!(!media.controller.is_playing());
        assert!(media.controller.shows_poster());
        assert!(media.video.is_none());
    }

    #[test]
    fn resize_observes_mounted_slots() {
        let mut app = app();
        // Slot 0 sits where the hero is laid out, at the top of the page.
        let slot = site_with_lazy_slot(&mut app);
        assert_eq!(slot, 0);

        let _ = app.update(Message::WindowResized(Size::new(1024.0, 768.0)));

        assert_eq!(app.viewport.width, 1024.0);
        assert_eq!(app.slots[slot].controller.phase(), Phase::Entered);
    }
}
