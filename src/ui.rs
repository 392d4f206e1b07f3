use iced::widget::{
    button, center, column, container, image, mouse_area, progress_bar, scrollable, stack, text,
};
use iced::{Alignment, Color, ContentFit, Element, Length, Theme};
use iced_video_player::VideoPlayer;

use crate::message::Message;
use crate::site::{Block, PREVIEW_SIZE, PageLayout, SlotId, HERO_MAIN, HERO_PREVIEW};
use crate::state::{App, Screen};

const LOADING_BACKGROUND: Color = Color::from_rgb(0.96, 0.95, 1.0);
const LOADING_ACCENT: Color = Color::from_rgb(0.71, 0.64, 0.98);

/// Render the loading screen or the page.
pub fn render_main_view(app: &App) -> Element<'_, Message> {
    match &app.screen {
        Screen::Loading { progress, .. } => render_loading(*progress),
        Screen::Site => render_site(app),
    }
}

/// Progress bar with its label, plus a way past it.
fn render_loading<'a>(progress: u8) -> Element<'a, Message> {
    let bar = container(progress_bar(0.0..=100.0, f32::from(progress))).width(Length::Fixed(256.0));

    let content = column![
        bar,
        text(format!("Loading assets... {}%", progress))
            .size(14)
            .color(LOADING_ACCENT),
        button(text("Skip").size(12))
            .on_press(Message::SkipLoading)
            .padding(6),
    ]
    .spacing(12)
    .align_x(Alignment::Center);

    container(center(content))
        .style(|_theme: &Theme| container::Style {
            background: Some(LOADING_BACKGROUND.into()),
            ..Default::default()
        })
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn render_site(app: &App) -> Element<'_, Message> {
    let layout = PageLayout::new(app.viewport.width, app.viewport.height);
    let mut content = column![].width(Length::Fill);

    for block in app.page.blocks() {
        let cell: Element<'_, Message> = match block {
            Block::Hero => render_hero(app),
            Block::Heading { title, blurb } => column![text(*title).size(32), text(*blurb).size(16)]
                .spacing(8)
                .padding(24)
                .into(),
            Block::Video(slot) => render_media(app, *slot),
            Block::Image(locator) => match app.images.get(locator) {
                Some(handle) => image(handle)
                    .content_fit(ContentFit::Cover)
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .into(),
                None => placeholder("Image unavailable"),
            },
            Block::Footer => render_footer(app),
        };

        content = content.push(
            container(cell)
                .width(Length::Fill)
                .height(Length::Fixed(layout.block_height(block))),
        );
    }

    scrollable(content)
        .on_scroll(Message::Scrolled)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Main hero video with the clickable preview of the next one on top.
fn render_hero(app: &App) -> Element<'_, Message> {
    let preview = mouse_area(
        container(render_media(app, HERO_PREVIEW))
            .width(Length::Fixed(PREVIEW_SIZE))
            .height(Length::Fixed(PREVIEW_SIZE)),
    )
    .on_press(Message::NextHeroVideo);

    stack![render_media(app, HERO_MAIN), center(preview)].into()
}

/// A media slot: the video once it can play, its poster until then or after an error.
fn render_media(app: &App, slot: SlotId) -> Element<'_, Message> {
    let Some(media) = app.slots.get(slot) else {
        return placeholder("");
    };

    if let Some(video) = media.video.as_ref().filter(|_| !media.controller.shows_poster()) {
        return container(
            VideoPlayer::new(video)
                .on_end_of_stream(Message::EndOfStream(slot))
                .on_new_frame(Message::NewFrame(slot))
                .on_error(move |error| Message::PipelineFailed(slot, error.to_string())),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into();
    }

    match &media.poster {
        Some(handle) => image(handle)
            .content_fit(ContentFit::Cover)
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        None => placeholder("Video unavailable"),
    }
}

fn render_footer(app: &App) -> Element<'_, Message> {
    let preload = match &app.report {
        Some(report) => format!(
            "Preloaded {} of {} assets ({} failed, {} timed out) in {:.1}s",
            report.loaded,
            report.total,
            report.errored,
            report.timed_out,
            report.elapsed.as_secs_f64()
        ),
        None => "Preload skipped".to_string(),
    };

    column![
        text(preload).size(12),
        text(format!("{} videos ready", app.loaded_media)).size(12),
    ]
    .spacing(4)
    .padding(24)
    .into()
}

fn placeholder<'a>(label: &'a str) -> Element<'a, Message> {
    container(text(label).size(14).color(Color::from_rgb(0.5, 0.5, 0.5)))
        .style(|_theme: &Theme| container::Style {
            background: Some(Color::from_rgb(0.08, 0.08, 0.1).into()),
            ..Default::default()
        })
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}
