use iced::Size;
use iced::widget::scrollable;

use crate::preload::RunOutcome;
use crate::site::SlotId;

#[derive(Clone, Debug)]
pub enum Message {
    PreloadProgress(u8),
    PreloadFinished(RunOutcome),
    SkipLoading,
    Scrolled(scrollable::Viewport),
    WindowResized(Size),
    LoadDue(SlotId, bool), // slot, timer fired (false when cancelled)
    IdlePlay(SlotId),
    NewFrame(SlotId),
    EndOfStream(SlotId),
    PipelineFailed(SlotId, String),
    NextHeroVideo,
}
