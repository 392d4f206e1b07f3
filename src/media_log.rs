//! Media operation logging and timing instrumentation.
//!
//! Probes, source assignment and playback toggles all go through here so a
//! slow pipeline shows up in the log with its category and elapsed time.

use std::time::Instant;

use crate::asset::AssetKind;

/// Log categories for filtering
enum LogCategory {
    Probe,
    Load,
    Playback,
}

impl LogCategory {
    fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Probe => "PROBE",
            LogCategory::Load => "LOAD",
            LogCategory::Playback => "PLAYBACK",
        }
    }
}

/// Log the start of a preload probe
pub fn log_probe_start(locator: &str, kind: AssetKind) -> Instant {
    log::trace!(
        "[{}] {} {} START",
        LogCategory::Probe.as_str(),
        kind,
        locator
    );
    Instant::now()
}

/// Log the completion of a preload probe with timing
pub fn log_probe_complete(locator: &str, kind: AssetKind, ok: bool, start: Instant) {
    let elapsed_ms = start.elapsed().as_millis();

    if !ok {
        log::debug!(
            "[{}] {} {} FAILED after {}ms",
            LogCategory::Probe.as_str(),
            kind,
            locator,
            elapsed_ms
        );
    } else if elapsed_ms > 5000 {
        log::warn!(
            "[{}] {} {} SLOW: {}ms",
            LogCategory::Probe.as_str(),
            kind,
            locator,
            elapsed_ms
        );
    } else {
        log::debug!(
            "[{}] {} {} COMPLETE: {}ms",
            LogCategory::Probe.as_str(),
            kind,
            locator,
            elapsed_ms
        );
    }
}

/// Log the start of a source assignment for a lazy slot
pub fn log_load_start(slot: usize, locator: &str) -> Instant {
    log::info!(
        "[{}] Slot {} source assigned: {}",
        LogCategory::Load.as_str(),
        slot,
        locator
    );
    Instant::now()
}

/// Log the outcome of a source assignment
pub fn log_load_complete(slot: usize, ok: bool, start: Instant) {
    let elapsed_ms = start.elapsed().as_millis();

    if !ok {
        log::warn!(
            "[{}] Slot {} pipeline FAILED after {}ms",
            LogCategory::Load.as_str(),
            slot,
            elapsed_ms
        );
    } else if elapsed_ms > 1000 {
        log::warn!(
            "[{}] Slot {} pipeline ready SLOW: {}ms",
            LogCategory::Load.as_str(),
            slot,
            elapsed_ms
        );
    } else {
        log::debug!(
            "[{}] Slot {} pipeline ready: {}ms",
            LogCategory::Load.as_str(),
            slot,
            elapsed_ms
        );
    }
}

/// Log a play/pause toggle
pub fn log_playback_toggle(slot: usize, paused: bool) {
    log::debug!(
        "[{}] Slot {} paused={}",
        LogCategory::Playback.as_str(),
        slot,
        paused
    );
}

/// Log a swallowed play failure
pub fn log_playback_blocked(slot: usize, reason: &str) {
    log::debug!(
        "[{}] Slot {} play ignored: {}",
        LogCategory::Playback.as_str(),
        slot,
        reason
    );
}
