mod app;
mod asset;
mod config;
mod error;
mod lazy_media;
mod media_log;
mod message;
mod player;
mod preload;
mod probe;
mod site;
mod state;
mod ui;
mod viewport;

use state::{App, WINDOW_HEIGHT, WINDOW_WIDTH};

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application(App::boot, App::update, App::view)
        .title("Showreel")
        .subscription(App::subscription)
        .window_size((WINDOW_WIDTH, WINDOW_HEIGHT))
        .run()
}
