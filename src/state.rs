use std::collections::HashMap;
use std::path::PathBuf;

use iced::widget::image;
use tokio_util::sync::CancellationToken;

use crate::config::SiteConfig;
use crate::player::MediaSlot;
use crate::preload::BatchReport;
use crate::site::Page;
use crate::viewport::Rect;

pub const WINDOW_WIDTH: f32 = 1280.0;
pub const WINDOW_HEIGHT: f32 = 720.0;

pub enum Screen {
    /// Preload run in flight. Cancelling the token ends the run silently.
    Loading { progress: u8, cancel: CancellationToken },
    Site,
}

/// Application state: the loading screen, then the page and its media slots.
pub struct App {
    pub config: SiteConfig,
    pub asset_root: PathBuf,
    pub screen: Screen,
    pub page: Page,
    /// Indexed by slot id. Empty until the page is mounted.
    pub slots: Vec<MediaSlot>,
    pub images: HashMap<&'static str, image::Handle>,
    /// Scroll viewport in page-content coordinates.
    pub viewport: Rect,
    pub report: Option<BatchReport>,
    pub loaded_media: usize,
}

impl App {
    pub fn new(config: SiteConfig, asset_root: PathBuf, cancel: CancellationToken) -> Self {
        App {
            config,
            asset_root,
            screen: Screen::Loading {
                progress: 0,
                cancel,
            },
            page: Page::landing(),
            slots: Vec::new(),
            images: HashMap::new(),
            viewport: Rect::new(0.0, 0.0, WINDOW_WIDTH, WINDOW_HEIGHT),
            report: None,
            loaded_media: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.screen, Screen::Loading { .. })
    }
}
