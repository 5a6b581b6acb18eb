//! Delayed actions requested by the widget
//!
//! The widget never sleeps. It queues `ScheduledTimer`s; the host waits out
//! each delay and hands the timer back through `ChallengeWidget::on_timer`.

use std::time::Duration;

/// Synthetic network latency between checking the box and the challenge
pub const LOADING_DELAY: Duration = Duration::from_millis(1000);
/// Pause before the first digit is played
pub const PLAYBACK_LEAD_IN: Duration = Duration::from_millis(500);
/// Pause between spoken digits
pub const DIGIT_GAP: Duration = Duration::from_millis(800);
/// How long a wrong audio answer stays on screen
pub const AUDIO_CLEAR_DELAY: Duration = Duration::from_millis(2000);
pub const HINT_DURATION: Duration = Duration::from_millis(5000);
pub const SUCCESS_BANNER_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    LoadingComplete,
    PlaybackStep,
    ClearAudioInput,
    HideHint,
    HideSuccessBanner,
}

/// A callback the host must deliver after `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimer {
    /// Widget generation at scheduling time; stale timers are ignored
    pub generation: u64,
    pub kind: TimerKind,
    pub delay: Duration,
}
