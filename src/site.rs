//! Landing page composition and layout.
//!
//! The page is a single column of fixed-height blocks. The same arithmetic
//! drives both the rendered column and the rectangles fed to the lazy media
//! controllers, so what is measured is what is drawn.

use crate::lazy_media::{MediaProps, Preload};
use crate::viewport::Rect;

pub type SlotId = usize;

pub const HERO_MAIN: SlotId = 0;
pub const HERO_PREVIEW: SlotId = 1;
const FIRST_FEATURE: SlotId = 2;

pub const HERO_VIDEOS: usize = 4;
const FEATURE_VIDEOS: usize = 5;

pub const PREVIEW_SIZE: f32 = 256.0;
pub const HEADING_HEIGHT: f32 = 160.0;
pub const TILE_HEIGHT: f32 = 480.0;
pub const IMAGE_HEIGHT: f32 = 420.0;
pub const FOOTER_HEIGHT: f32 = 120.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Full-viewport hero with a main video and a centred preview of the next one.
    Hero,
    Heading {
        title: &'static str,
        blurb: &'static str,
    },
    Video(SlotId),
    Image(&'static str),
    Footer,
}

#[derive(Debug, Clone)]
pub struct Page {
    blocks: Vec<Block>,
    /// 1-based index of the hero video currently in the main slot.
    hero_index: usize,
}

impl Page {
    pub fn landing() -> Self {
        let mut blocks = vec![
            Block::Hero,
            Block::Heading {
                title: "Welcome to Zentry",
                blurb: "Discover the world's largest shared adventure",
            },
            Block::Image("/img/about.webp"),
            Block::Heading {
                title: "Into the Metagame Layer",
                blurb: "Immerse yourself in a rich and ever-expanding universe.",
            },
        ];
        blocks.extend((0..FEATURE_VIDEOS).map(|i| Block::Video(FIRST_FEATURE + i)));
        blocks.extend([
            Block::Heading {
                title: "The Story of a Hidden Realm",
                blurb: "Where realms converge, lies Zentry and the boundless pillar.",
            },
            Block::Image("/img/entrance.webp"),
            Block::Heading {
                title: "Let's build the new era of gaming together",
                blurb: "",
            },
            Block::Image("/img/contact-1.webp"),
            Block::Footer,
        ]);

        Self {
            blocks,
            hero_index: 1,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn hero_index(&self) -> usize {
        self.hero_index
    }

    /// Props for every media slot, in slot order.
    pub fn slot_props(&self) -> Vec<(SlotId, MediaProps)> {
        let (main, preview) = hero_props(self.hero_index);
        let mut slots = vec![(HERO_MAIN, main), (HERO_PREVIEW, preview)];
        slots.extend((0..FEATURE_VIDEOS).map(|i| {
            let locator = format!("/videos/feature-{}.mp4", i + 1);
            let props = MediaProps::new(&locator)
                .poster(locator.replace(".mp4", "-poster.webp"))
                .preload(Preload::Metadata);
            (FIRST_FEATURE + i, props)
        }));
        slots
    }

    /// Rotate the hero: the preview becomes the main video.
    pub fn advance_hero(&mut self) -> [(SlotId, MediaProps); 2] {
        self.hero_index = upcoming(self.hero_index);
        let (main, preview) = hero_props(self.hero_index);
        [(HERO_MAIN, main), (HERO_PREVIEW, preview)]
    }
}

fn upcoming(index: usize) -> usize {
    index % HERO_VIDEOS + 1
}

fn hero_props(index: usize) -> (MediaProps, MediaProps) {
    let main = MediaProps::new(format!("/videos/hero-{index}.mp4"))
        .poster(format!("/videos/hero-{index}-poster.webp"))
        .priority(true)
        .preload(Preload::Auto);

    let next = upcoming(index);
    let preview = MediaProps::new(format!("/videos/hero-{next}.mp4"))
        .poster(format!("/videos/hero-{next}-poster.webp"))
        .looping(false)
        .preload(Preload::Metadata);

    (main, preview)
}

/// Vertical stacking of [`Block`]s for a given window size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub hero_height: f32,
}

impl PageLayout {
    pub fn new(width: f32, hero_height: f32) -> Self {
        Self { width, hero_height }
    }

    pub fn block_height(&self, block: &Block) -> f32 {
        match block {
            Block::Hero => self.hero_height,
            Block::Heading { .. } => HEADING_HEIGHT,
            Block::Video(_) => TILE_HEIGHT,
            Block::Image(_) => IMAGE_HEIGHT,
            Block::Footer => FOOTER_HEIGHT,
        }
    }

    /// Rectangle of every media slot in page-content coordinates.
    pub fn slot_rects(&self, blocks: &[Block]) -> Vec<(SlotId, Rect)> {
        let mut rects = Vec::new();
        let mut top = 0.0;

        for block in blocks {
            let height = self.block_height(block);
            match block {
                Block::Hero => {
                    rects.push((HERO_MAIN, Rect::new(0.0, top, self.width, height)));
                    rects.push((
                        HERO_PREVIEW,
                        Rect::new(
                            (self.width - PREVIEW_SIZE) / 2.0,
                            top + (height - PREVIEW_SIZE) / 2.0,
                            PREVIEW_SIZE,
                            PREVIEW_SIZE,
                        ),
                    ));
                }
                Block::Video(slot) => rects.push((*slot, Rect::new(0.0, top, self.width, height))),
                _ => {}
            }
            top += height;
        }

        rects
    }
}
