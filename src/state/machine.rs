//! Core state machine implementation
//!
//! Handles transitions between Idle, Loading, ChallengeVisual,
//! ChallengeAudio and Verified in response to user requests and timers.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ResolutionMode, GRID_SIZE};
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{
    AssetSoundPlayer, AudioView, CellView, CheckboxView, Cue, Feedback, GridView,
    MemoryPreferenceStore, NullRenderer, PreferenceStore, Preferences, Renderer, SoundPlayer,
    View, CHECKBOX_LABEL, VERIFIED_LABEL,
};
use crate::config::WidgetOptions;
use crate::events::{Status, WidgetEvent};
use crate::random::{RandomSource, SeededRandom};
use crate::session::{AnalyticsState, AudioChallengeState, AudioStatus, Outcome, SessionState};
use crate::verify::{self, DepleteSelection};

use super::refusal::Refusal;
use super::timer::{
    ScheduledTimer, TimerKind, AUDIO_CLEAR_DELAY, DIGIT_GAP, HINT_DURATION, LOADING_DELAY,
    PLAYBACK_LEAD_IN, SUCCESS_BANNER_DURATION,
};

/// The five states of the widget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Checkbox unchecked, nothing open
    #[default]
    Idle,
    /// Box checked, waiting out the synthetic delay
    Loading,
    ChallengeVisual,
    ChallengeAudio,
    /// Solved; stays here until reset
    Verified,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "idle"),
            State::Loading => write!(f, "loading"),
            State::ChallengeVisual => write!(f, "challenge-visual"),
            State::ChallengeAudio => write!(f, "challenge-audio"),
            State::Verified => write!(f, "verified"),
        }
    }
}

/// The checkbox widget and everything it owns
pub struct ChallengeWidget {
    /// Current state
    state: State,
    /// When the current state was entered
    state_entered_at: Instant,
    options: WidgetOptions,
    catalog: Catalog,
    session: Option<SessionState>,
    audio: Option<AudioChallengeState>,
    analytics: AnalyticsState,
    status: Status,
    checked: bool,
    hint: Option<String>,
    success_banner: bool,
    /// Shown on the next render only
    feedback: Option<Feedback>,
    /// Bumped whenever pending timers must stop mattering
    generation: u64,
    timers: Vec<ScheduledTimer>,
    rng: Box<dyn RandomSource>,
    clock: Box<dyn Clock>,
    renderer: Box<dyn Renderer>,
    sound: Box<dyn SoundPlayer>,
    preferences: Box<dyn PreferenceStore>,
    /// Channel for emitting widget events
    event_tx: broadcast::Sender<WidgetEvent>,
}

impl ChallengeWidget {
    /// Create a widget with entropy-seeded randomness, the system clock and
    /// silent collaborators; swap them with the `with_*` methods.
    pub fn new(
        options: WidgetOptions,
        catalog: Catalog,
        event_tx: broadcast::Sender<WidgetEvent>,
    ) -> Self {
        let clock = SystemClock;
        Self {
            state: State::Idle,
            state_entered_at: clock.now(),
            options,
            catalog,
            session: None,
            audio: None,
            analytics: AnalyticsState::new(),
            status: Status::Unverified,
            checked: false,
            hint: None,
            success_banner: false,
            feedback: None,
            generation: 0,
            timers: Vec::new(),
            rng: Box::new(SeededRandom::from_entropy()),
            clock: Box::new(clock),
            renderer: Box::new(NullRenderer),
            sound: Box::new(AssetSoundPlayer::new(None)),
            preferences: Box::new(MemoryPreferenceStore::new()),
            event_tx,
        }
    }

    pub fn with_random(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.state_entered_at = clock.now();
        self.clock = Box::new(clock);
        self
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_sound(mut self, sound: impl SoundPlayer + 'static) -> Self {
        self.sound = Box::new(sound);
        self
    }

    /// Attach a preference store; saved preferences override the options
    pub fn with_preferences(mut self, store: impl PreferenceStore + 'static) -> Self {
        match store.load() {
            Ok(Some(prefs)) => {
                debug!(?prefs, "preferences loaded");
                self.options.sound_enabled = prefs.sound_enabled;
                self.options.dark_mode = prefs.dark_mode;
            }
            Ok(None) => {}
            Err(e) => warn!(?e, "failed to load preferences, using defaults"),
        }
        self.preferences = Box::new(store);
        self
    }

    /// Get the current state
    pub fn state(&self) -> State {
        self.state
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// `"true"` once verified, `"null"` otherwise
    pub fn get_status(&self) -> &'static str {
        self.status.as_str()
    }

    pub fn is_valid(&self) -> bool {
        self.status == Status::Verified
    }

    /// Snapshot of the running statistics
    pub fn analytics(&self) -> AnalyticsState {
        self.analytics.clone()
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn audio(&self) -> Option<&AudioChallengeState> {
        self.audio.as_ref()
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Seconds since the open challenge started
    pub fn elapsed_secs(&self) -> Option<u64> {
        self.session
            .as_ref()
            .map(|s| s.elapsed_secs(self.clock.now()))
    }

    /// Drain the timers queued since the last call
    pub fn take_timers(&mut self) -> Vec<ScheduledTimer> {
        std::mem::take(&mut self.timers)
    }

    /// Check the box: `idle -> loading`
    pub fn check(&mut self) -> Result<(), Refusal> {
        if self.status == Status::Verified {
            return Err(Refusal::AlreadyVerified);
        }
        if self.state != State::Idle {
            return Err(Refusal::WrongState(self.state));
        }

        self.checked = true;
        self.generation += 1;
        self.cue(Cue::Click);
        self.transition_to(State::Loading);
        self.schedule(TimerKind::LoadingComplete, LOADING_DELAY);
        self.render();
        Ok(())
    }

    /// Deliver a timer the host scheduled earlier
    pub fn on_timer(&mut self, timer: ScheduledTimer) {
        if timer.generation != self.generation {
            debug!(
                kind = ?timer.kind,
                generation = timer.generation,
                current = self.generation,
                "ignoring stale timer"
            );
            return;
        }

        match timer.kind {
            TimerKind::LoadingComplete => {
                if self.state != State::Loading {
                    return;
                }
                self.open_challenge();
            }
            TimerKind::PlaybackStep => self.playback_step(),
            TimerKind::ClearAudioInput => {
                if let Some(audio) = self.audio.as_mut() {
                    audio.clear_input();
                }
            }
            TimerKind::HideHint => self.hint = None,
            TimerKind::HideSuccessBanner => self.success_banner = false,
        }
        self.render();
    }

    /// Pick a grid cell
    pub fn select(&mut self, index: usize) -> Result<(), Refusal> {
        self.require(State::ChallengeVisual)?;
        if index >= GRID_SIZE {
            return Err(Refusal::OutOfRange(index));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(Refusal::WrongState(self.state));
        };

        match session.challenge().mode {
            ResolutionMode::FixedSelection => {
                let selected = session.toggle(index);
                debug!(index, selected, "cell toggled");
            }
            ResolutionMode::DepleteUntilNone => {
                session.mark_pending();
                match verify::deplete_select(session.challenge_mut(), index, self.rng.as_mut()) {
                    DepleteSelection::Hit {
                        replacement,
                        remaining,
                    } => {
                        debug!(index, %replacement, remaining, "target cleared");
                        self.feedback = Some(Feedback::Replaced { index });
                    }
                    DepleteSelection::Miss => {
                        debug!(index, "not a target");
                        self.feedback = Some(Feedback::Miss { index });
                    }
                }
            }
        }

        self.cue(Cue::Click);
        self.render();
        Ok(())
    }

    /// Verify the grid challenge; returns whether it was solved
    pub fn verify(&mut self) -> Result<bool, Refusal> {
        self.require(State::ChallengeVisual)?;
        let Some(session) = self.session.as_mut() else {
            return Err(Refusal::WrongState(self.state));
        };
        if !verify::can_verify_grid(session) {
            return Err(Refusal::NothingToVerify);
        }

        let attempts = session.record_attempt();
        self.analytics.record_attempt();
        let correct = verify::verify_grid(session);
        info!(
            attempts,
            max_attempts = self.options.max_attempts,
            correct,
            "grid verification"
        );

        self.conclude(correct);
        Ok(correct)
    }

    /// Draw a different grid challenge; attempts are kept
    pub fn refresh(&mut self) -> Result<(), Refusal> {
        self.require(State::ChallengeVisual)?;
        self.refresh_challenge();
        self.cue(Cue::Refresh);
        self.render();
        Ok(())
    }

    /// Show a hint for the grid challenge
    pub fn hint(&mut self) -> Result<String, Refusal> {
        self.require(State::ChallengeVisual)?;
        let Some(session) = self.session.as_ref() else {
            return Err(Refusal::WrongState(self.state));
        };

        let text = verify::hint(session);
        self.hint = Some(text.clone());
        self.cue(Cue::Hint);
        self.schedule(TimerKind::HideHint, HINT_DURATION);
        self.render();
        Ok(text)
    }

    /// `challenge-visual -> challenge-audio` with a fresh secret
    pub fn switch_to_audio(&mut self) -> Result<(), Refusal> {
        self.require(State::ChallengeVisual)?;
        if !self.options.challenge_type.allows_audio() {
            return Err(Refusal::ModeDisabled("audio"));
        }
        self.enter_audio();
        self.render();
        Ok(())
    }

    /// `challenge-audio -> challenge-visual`
    pub fn back_to_visual(&mut self) -> Result<(), Refusal> {
        self.require(State::ChallengeAudio)?;
        let refusal = if !self.options.challenge_type.allows_visual() {
            Some(Refusal::ModeDisabled("visual"))
        } else if self.is_playing() {
            Some(Refusal::PlaybackInProgress)
        } else {
            None
        };
        if let Some(refusal) = refusal {
            self.cue(Cue::Error);
            return Err(refusal);
        }

        self.generation += 1;
        self.audio = None;
        self.transition_to(State::ChallengeVisual);
        self.render();
        Ok(())
    }

    /// Replay the digit sequence
    pub fn play_again(&mut self) -> Result<(), Refusal> {
        self.require(State::ChallengeAudio)?;
        if self.is_playing() {
            return Err(Refusal::PlaybackInProgress);
        }
        self.start_playback();
        self.render();
        Ok(())
    }

    /// Replace the typed answer; non-digits are dropped
    pub fn audio_input(&mut self, text: &str) -> Result<(), Refusal> {
        self.require(State::ChallengeAudio)?;
        if let Some(audio) = self.audio.as_mut() {
            audio.set_input(text);
        }
        if let Some(session) = self.session.as_mut() {
            session.mark_pending();
        }
        self.render();
        Ok(())
    }

    /// Verify the typed digits; returns whether they matched
    pub fn verify_audio(&mut self) -> Result<bool, Refusal> {
        self.require(State::ChallengeAudio)?;
        let (Some(audio), Some(session)) = (self.audio.as_ref(), self.session.as_mut()) else {
            return Err(Refusal::WrongState(self.state));
        };
        if audio.input().is_empty() {
            return Err(Refusal::NothingToVerify);
        }

        let correct = verify::audio_matches(audio.input(), &audio.secret_string());
        let attempts = session.record_attempt();
        self.analytics.record_attempt();
        info!(
            attempts,
            max_attempts = self.options.max_attempts,
            correct,
            "audio verification"
        );

        self.conclude(correct);
        Ok(correct)
    }

    /// Close the challenge without verifying; the box unchecks
    pub fn close(&mut self) -> Result<(), Refusal> {
        match self.state {
            State::Loading | State::ChallengeVisual | State::ChallengeAudio => {}
            State::Verified => return Err(Refusal::AlreadyVerified),
            State::Idle => return Err(Refusal::WrongState(State::Idle)),
        }
        if self.is_playing() {
            return Err(Refusal::PlaybackInProgress);
        }

        self.generation += 1;
        self.session = None;
        self.audio = None;
        self.hint = None;
        self.checked = false;
        self.transition_to(State::Idle);
        self.render();
        Ok(())
    }

    /// Return to `idle` from anywhere
    pub fn reset(&mut self) {
        self.reset_widget();
        self.render();
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.options.sound_enabled = enabled;
        self.save_preferences();
        self.render();
    }

    pub fn set_dark_mode(&mut self, dark: bool) {
        self.options.dark_mode = dark;
        self.save_preferences();
        self.render();
    }

    /// Build the render model for the current state
    pub fn view(&self) -> View {
        let verified = self.status == Status::Verified;

        let grid = match (self.state, &self.session) {
            (State::ChallengeVisual, Some(session)) => Some(self.grid_view(session)),
            _ => None,
        };
        let audio = match (self.state, &self.audio) {
            (State::ChallengeAudio, Some(audio)) => Some(AudioView {
                input: audio.input().to_string(),
                playing: audio.is_playing(),
                status: audio.status(),
                can_go_back: self.options.challenge_type.allows_visual() && !audio.is_playing(),
            }),
            _ => None,
        };

        View {
            state: self.state,
            status: self.status,
            checkbox: CheckboxView {
                checked: self.checked,
                locked: verified,
                label: if verified { VERIFIED_LABEL } else { CHECKBOX_LABEL }.to_string(),
            },
            dark_mode: self.options.dark_mode,
            sound_enabled: self.options.sound_enabled,
            grid,
            audio,
            hint: self.hint.clone(),
            success_banner: self.success_banner,
            feedback: self.feedback,
            analytics: self.analytics.summary(),
        }
    }

    /// Redraw the current view
    pub fn render(&mut self) {
        let view = self.view();
        self.renderer.render(&view);
        self.feedback = None;
    }

    fn grid_view(&self, session: &SessionState) -> GridView {
        let challenge = session.challenge();
        let fixed = challenge.mode == ResolutionMode::FixedSelection;
        GridView {
            title: challenge.title.clone(),
            difficulty: challenge.difficulty,
            cells: challenge
                .categories
                .iter()
                .enumerate()
                .map(|(i, label)| CellView {
                    label: label.clone(),
                    selected: fixed && session.selected().contains(&i),
                })
                .collect(),
            attempts: session.attempts(),
            max_attempts: self.options.max_attempts,
            progress: verify::progress_percent(session),
            can_verify: verify::can_verify_grid(session),
            elapsed_secs: session.elapsed_secs(self.clock.now()),
        }
    }

    fn require(&self, expected: State) -> Result<(), Refusal> {
        if self.state == expected {
            Ok(())
        } else if self.state == State::Verified {
            Err(Refusal::AlreadyVerified)
        } else {
            Err(Refusal::WrongState(self.state))
        }
    }

    fn is_playing(&self) -> bool {
        self.audio.as_ref().is_some_and(|a| a.is_playing())
    }

    /// `loading -> challenge-*`: draw an entry and copy it into a new session
    fn open_challenge(&mut self) {
        let index = self.catalog.draw(self.rng.as_mut());
        let Some(definition) = self.catalog.get(index) else {
            warn!(index, "catalog draw out of range");
            return;
        };
        info!(
            title = %definition.title,
            difficulty = %definition.difficulty,
            "challenge opened"
        );
        self.session = Some(SessionState::open(index, definition, self.clock.now()));
        self.hint = None;

        if self.options.challenge_type.allows_visual() {
            self.transition_to(State::ChallengeVisual);
        } else {
            self.enter_audio();
        }
    }

    fn refresh_challenge(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let next = self
            .catalog
            .draw_other(session.catalog_index(), self.rng.as_mut());
        if let Some(definition) = self.catalog.get(next) {
            info!(title = %definition.title, "challenge refreshed");
            session.replace_challenge(next, definition);
        }
        self.generation += 1;
        self.hint = None;
    }

    fn enter_audio(&mut self) {
        self.generation += 1;
        self.audio = Some(AudioChallengeState::generate(self.rng.as_mut()));
        self.hint = None;
        self.transition_to(State::ChallengeAudio);
        self.start_playback();
    }

    fn start_playback(&mut self) {
        let Some(audio) = self.audio.as_mut() else {
            return;
        };
        audio.start_playback();
        self.schedule(TimerKind::PlaybackStep, PLAYBACK_LEAD_IN);
    }

    /// Play one digit, then queue the next step; digits never overlap
    fn playback_step(&mut self) {
        let next = match self.audio.as_mut() {
            Some(audio) => audio.advance_playback(),
            None => return,
        };
        match next {
            Some(digit) => {
                if let Err(e) = self.sound.play_digit(digit) {
                    warn!(?e, "digit playback failed, falling back to speech");
                    self.sound.speak(digit);
                }
                self.schedule(TimerKind::PlaybackStep, DIGIT_GAP);
            }
            None => debug!("audio sequence finished"),
        }
    }

    fn conclude(&mut self, correct: bool) {
        if correct {
            self.succeed();
        } else {
            self.fail();
        }
        self.render();
    }

    /// `challenge-* -> verified`
    fn succeed(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.set_outcome(Outcome::Success);
        let time_spent = session.elapsed_secs(self.clock.now());
        let difficulty = session.challenge().difficulty;
        let attempts = session.attempts();
        self.analytics.record_success(time_spent, difficulty);
        debug!(outcome = ?session.outcome(), time_spent, "session closed");

        self.audio = None;
        self.hint = None;
        self.generation += 1;
        self.checked = true;
        self.success_banner = true;
        self.transition_to(State::Verified);
        self.set_status(Status::Verified);
        self.cue(Cue::Success);
        self.schedule(TimerKind::HideSuccessBanner, SUCCESS_BANNER_DURATION);
        self.emit(WidgetEvent::Verified {
            verified: true,
            time_spent,
            attempts,
            difficulty,
        });
    }

    /// Retry with a new challenge, or reset once attempts run out
    fn fail(&mut self) {
        self.cue(Cue::Error);
        self.feedback = Some(Feedback::Failed);

        let attempts = match self.session.as_mut() {
            Some(session) => {
                session.set_outcome(Outcome::Failure);
                session.attempts()
            }
            None => return,
        };

        if attempts >= self.options.max_attempts {
            info!(attempts, "attempts exhausted");
            self.reset_widget();
            return;
        }

        if self.state == State::ChallengeAudio {
            if let Some(audio) = self.audio.as_mut() {
                audio.set_status(AudioStatus::Incorrect);
            }
            self.schedule(TimerKind::ClearAudioInput, AUDIO_CLEAR_DELAY);
        } else {
            self.refresh_challenge();
        }
    }

    fn reset_widget(&mut self) {
        self.generation += 1;
        self.session = None;
        self.audio = None;
        self.hint = None;
        self.success_banner = false;
        self.checked = false;
        self.transition_to(State::Idle);
        self.set_status(Status::Unverified);
        self.cue(Cue::Refresh);
        self.emit(WidgetEvent::Reset { reset: true });
    }

    fn set_status(&mut self, status: Status) {
        if self.status != status {
            self.status = status;
            self.emit(WidgetEvent::StatusChanged { status });
        }
    }

    fn save_preferences(&mut self) {
        let prefs = Preferences {
            sound_enabled: self.options.sound_enabled,
            dark_mode: self.options.dark_mode,
        };
        if let Err(e) = self.preferences.save(&prefs) {
            warn!(?e, "failed to save preferences");
        }
    }

    fn cue(&mut self, cue: Cue) {
        if self.options.sound_enabled {
            self.sound.play_cue(cue);
        }
    }

    fn schedule(&mut self, kind: TimerKind, delay: std::time::Duration) {
        debug!(?kind, ?delay, generation = self.generation, "timer scheduled");
        self.timers.push(ScheduledTimer {
            generation: self.generation,
            kind,
            delay,
        });
    }

    /// Perform a state transition
    fn transition_to(&mut self, new_state: State) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }
        let now = self.clock.now();
        let duration_ms = now.saturating_duration_since(self.state_entered_at).as_millis() as u64;

        info!(
            from = %old_state,
            to = %new_state,
            duration_ms,
            generation = self.generation,
            "state transition"
        );

        self.state = new_state;
        self.state_entered_at = now;
    }

    fn emit(&self, event: WidgetEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;
    use crate::catalog::Difficulty;
    use crate::clock::ManualClock;
    use crate::collaborators::{RecordingRenderer, RecordingSound, SoundCall};
    use crate::config::ChallengeType;
    use crate::random::ScriptedRandom;

    struct Harness {
        widget: ChallengeWidget,
        events: broadcast::Receiver<WidgetEvent>,
        sound: RecordingSound,
        renderer: RecordingRenderer,
        clock: ManualClock,
        prefs: MemoryPreferenceStore,
    }

    fn create_widget_with(
        options: WidgetOptions,
        script: impl IntoIterator<Item = usize>,
        sound: RecordingSound,
        prefs: MemoryPreferenceStore,
    ) -> Harness {
        let (tx, events) = broadcast::channel(64);
        let renderer = RecordingRenderer::new();
        let clock = ManualClock::new();
        let widget = ChallengeWidget::new(options, Catalog::builtin(), tx)
            .with_random(ScriptedRandom::new(script))
            .with_clock(clock.clone())
            .with_renderer(renderer.clone())
            .with_sound(sound.clone())
            .with_preferences(prefs.clone());
        Harness {
            widget,
            events,
            sound,
            renderer,
            clock,
            prefs,
        }
    }

    fn create_widget(script: impl IntoIterator<Item = usize>) -> Harness {
        create_widget_with(
            WidgetOptions::default(),
            script,
            RecordingSound::new(),
            MemoryPreferenceStore::new(),
        )
    }

    fn fire(widget: &mut ChallengeWidget, kind: TimerKind) {
        let (matching, rest): (Vec<_>, Vec<_>) =
            widget.take_timers().into_iter().partition(|t| t.kind == kind);
        widget.timers.extend(rest);
        for timer in matching {
            widget.on_timer(timer);
        }
    }

    fn finish_playback(widget: &mut ChallengeWidget) {
        while widget.timers.iter().any(|t| t.kind == TimerKind::PlaybackStep) {
            fire(widget, TimerKind::PlaybackStep);
        }
    }

    fn open(widget: &mut ChallengeWidget) {
        widget.check().unwrap();
        fire(widget, TimerKind::LoadingComplete);
    }

    fn drain(events: &mut broadcast::Receiver<WidgetEvent>) -> Vec<WidgetEvent> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    #[test]
    fn test_initial_state() {
        let h = create_widget([]);
        assert_eq!(h.widget.state(), State::Idle);
        assert_eq!(h.widget.get_status(), "null");
        assert!(!h.widget.is_valid());
        assert!(h.widget.session().is_none());
    }

    #[test]
    fn test_check_loads_then_opens_visual() {
        let mut h = create_widget([0]);
        h.widget.check().unwrap();
        assert_eq!(h.widget.state(), State::Loading);
        assert!(h.widget.is_checked());

        let timers = h.widget.take_timers();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].kind, TimerKind::LoadingComplete);
        assert_eq!(timers[0].delay, LOADING_DELAY);

        h.widget.on_timer(timers[0]);
        assert_eq!(h.widget.state(), State::ChallengeVisual);
        let session = h.widget.session().unwrap();
        assert_eq!(session.attempts(), 0);
        assert!(session.selected().is_empty());
        assert_eq!(session.challenge().title, "Select all text boxes with cars");
    }

    #[test]
    fn test_check_twice_is_refused() {
        let mut h = create_widget([0]);
        h.widget.check().unwrap();
        assert_eq!(h.widget.check(), Err(Refusal::WrongState(State::Loading)));
    }

    #[test]
    fn test_exact_selection_verifies() {
        let mut h = create_widget([0]);
        open(&mut h.widget);
        h.clock.advance(Duration::from_secs(12));
        for i in [0, 2, 5] {
            h.widget.select(i).unwrap();
        }

        assert_eq!(h.widget.verify(), Ok(true));
        assert_eq!(h.widget.state(), State::Verified);
        assert!(h.widget.is_valid());
        assert_eq!(h.widget.get_status(), "true");
        assert!(h.widget.session().is_none());

        let events = drain(&mut h.events);
        assert_eq!(
            events,
            vec![
                WidgetEvent::StatusChanged {
                    status: Status::Verified
                },
                WidgetEvent::Verified {
                    verified: true,
                    time_spent: 12,
                    attempts: 1,
                    difficulty: Difficulty::Easy,
                },
            ]
        );

        let analytics = h.widget.analytics();
        assert_eq!(analytics.total_attempts, 1);
        assert_eq!(analytics.success_rate, 100.0);
        assert_eq!(analytics.average_time, 12.0);
        assert_eq!(analytics.difficulty_counts.easy, 1);

        let view = h.renderer.last().unwrap();
        assert!(view.checkbox.locked);
        assert_eq!(view.checkbox.label, VERIFIED_LABEL);
        assert!(view.success_banner);
        assert_eq!(h.sound.cues().last(), Some(&Cue::Success));
    }

    #[test]
    fn test_partial_selection_fails_and_refreshes() {
        // 0: cars; redraw picks offset 2 of the other seven -> crosswalks
        let mut h = create_widget([0, 2]);
        open(&mut h.widget);
        h.widget.select(0).unwrap();
        h.widget.select(2).unwrap();

        assert_eq!(h.widget.verify(), Ok(false));
        assert_eq!(h.widget.state(), State::ChallengeVisual);
        let session = h.widget.session().unwrap();
        assert_eq!(session.attempts(), 1);
        assert_eq!(session.catalog_index(), 3);
        assert!(session.selected().is_empty());
        assert_eq!(h.widget.analytics().total_attempts, 1);
        assert_eq!(h.widget.analytics().success_rate, 0.0);
        assert!(h.renderer.views().iter().any(|v| v.feedback == Some(Feedback::Failed)));
        assert!(h.sound.cues().contains(&Cue::Error));
        assert!(drain(&mut h.events).is_empty());
    }

    #[test]
    fn test_verify_needs_a_selection() {
        let mut h = create_widget([0]);
        open(&mut h.widget);
        assert_eq!(h.widget.verify(), Err(Refusal::NothingToVerify));
        assert_eq!(h.widget.session().unwrap().attempts(), 0);
        assert_eq!(h.widget.analytics().total_attempts, 0);
    }

    #[test]
    fn test_attempt_exhaustion_resets() {
        let mut h = create_widget([0]);
        open(&mut h.widget);
        for expected in 1..=2 {
            h.widget.select(0).unwrap();
            assert_eq!(h.widget.verify(), Ok(false));
            assert_eq!(h.widget.session().unwrap().attempts(), expected);
        }
        h.widget.select(0).unwrap();
        assert_eq!(h.widget.verify(), Ok(false));

        assert_eq!(h.widget.state(), State::Idle);
        assert!(h.widget.session().is_none());
        assert!(!h.widget.is_checked());
        assert_eq!(h.widget.get_status(), "null");
        assert!(!h.widget.is_valid());
        assert_eq!(h.widget.analytics().total_attempts, 3);
        assert_eq!(drain(&mut h.events), vec![WidgetEvent::Reset { reset: true }]);
    }

    #[test]
    fn test_audio_attempt_exhaustion_resets() {
        let mut h = create_widget([0, 4, 8, 2, 1]);
        open(&mut h.widget);
        h.widget.switch_to_audio().unwrap();
        finish_playback(&mut h.widget);

        for expected in 1..=2 {
            h.widget.audio_input("0000").unwrap();
            assert_eq!(h.widget.verify_audio(), Ok(false));
            assert_eq!(h.widget.state(), State::ChallengeAudio);
            assert_eq!(h.widget.session().unwrap().attempts(), expected);
            fire(&mut h.widget, TimerKind::ClearAudioInput);
        }
        h.widget.audio_input("0000").unwrap();
        assert_eq!(h.widget.verify_audio(), Ok(false));

        assert_eq!(h.widget.state(), State::Idle);
        assert!(h.widget.session().is_none());
        assert!(h.widget.audio().is_none());
        assert!(!h.widget.is_checked());
        assert!(!h.widget.is_valid());
        assert_eq!(h.widget.analytics().total_attempts, 3);
        assert_eq!(drain(&mut h.events), vec![WidgetEvent::Reset { reset: true }]);

        // Exhaustion leaves no input clear behind
        assert!(h.widget.take_timers().is_empty());
    }

    #[test]
    fn test_verified_until_reset() {
        let mut h = create_widget([0]);
        open(&mut h.widget);
        for i in [0, 2, 5] {
            h.widget.select(i).unwrap();
        }
        h.widget.verify().unwrap();
        drain(&mut h.events);

        assert_eq!(h.widget.check(), Err(Refusal::AlreadyVerified));
        assert_eq!(h.widget.close(), Err(Refusal::AlreadyVerified));
        assert!(h.widget.is_valid());

        h.widget.reset();
        assert_eq!(h.widget.state(), State::Idle);
        assert_eq!(h.widget.get_status(), "null");
        assert!(!h.widget.is_valid());
        assert_eq!(
            drain(&mut h.events),
            vec![
                WidgetEvent::StatusChanged {
                    status: Status::Unverified
                },
                WidgetEvent::Reset { reset: true },
            ]
        );
    }

    #[test]
    fn test_deplete_scenario() {
        // 6: cars until none left; then three decoy draws
        let mut h = create_widget([6, 0, 1, 2]);
        open(&mut h.widget);

        h.widget.select(0).unwrap();
        let session = h.widget.session().unwrap();
        assert_eq!(session.challenge().targets, vec![2, 5]);
        assert_eq!(session.challenge().categories[0], "tree");
        assert!(h.renderer.views().iter().any(|v| v.feedback == Some(Feedback::Replaced { index: 0 })));

        h.widget.select(0).unwrap();
        assert_eq!(h.widget.session().unwrap().challenge().targets, vec![2, 5]);
        assert!(h.renderer.views().iter().any(|v| v.feedback == Some(Feedback::Miss { index: 0 })));
        assert_eq!(h.widget.verify(), Err(Refusal::NothingToVerify));

        h.widget.select(2).unwrap();
        h.widget.select(5).unwrap();
        assert!(h.widget.session().unwrap().challenge().targets.is_empty());
        assert!(h.renderer.last().unwrap().grid.unwrap().can_verify);

        assert_eq!(h.widget.verify(), Ok(true));
        assert_eq!(h.widget.state(), State::Verified);
        assert_eq!(h.widget.analytics().difficulty_counts.extreme, 1);

        // The catalog entry was never touched
        let entry = h.widget.catalog.get(6).unwrap();
        assert_eq!(entry.targets, vec![0, 2, 5]);
        assert_eq!(entry.categories[0], "car");
    }

    #[test]
    fn test_audio_scenario() {
        let mut h = create_widget([0, 4, 8, 2, 1]);
        open(&mut h.widget);
        h.widget.switch_to_audio().unwrap();
        assert_eq!(h.widget.state(), State::ChallengeAudio);
        assert_eq!(h.widget.audio().unwrap().secret_string(), "4821");
        assert!(h.widget.audio().unwrap().is_playing());

        assert_eq!(h.widget.back_to_visual(), Err(Refusal::PlaybackInProgress));
        assert_eq!(h.widget.close(), Err(Refusal::PlaybackInProgress));
        assert_eq!(h.widget.play_again(), Err(Refusal::PlaybackInProgress));
        assert_eq!(h.widget.state(), State::ChallengeAudio);

        finish_playback(&mut h.widget);
        assert!(!h.widget.audio().unwrap().is_playing());
        let digits: Vec<SoundCall> = h
            .sound
            .calls()
            .into_iter()
            .filter(|c| !matches!(c, SoundCall::Cue(_)))
            .collect();
        assert_eq!(
            digits,
            vec![
                SoundCall::Digit(4),
                SoundCall::Digit(8),
                SoundCall::Digit(2),
                SoundCall::Digit(1)
            ]
        );

        h.widget.audio_input("48-21").unwrap();
        assert_eq!(h.widget.audio().unwrap().input(), "4821");
        assert_eq!(h.widget.session().unwrap().attempts(), 0);

        assert_eq!(h.widget.verify_audio(), Ok(true));
        assert_eq!(h.widget.state(), State::Verified);
        assert!(h.widget.audio().is_none());
    }

    #[test]
    fn test_wrong_audio_answer_clears_input() {
        let mut h = create_widget([0, 4, 8, 2, 1]);
        open(&mut h.widget);
        h.widget.switch_to_audio().unwrap();
        finish_playback(&mut h.widget);

        h.widget.audio_input("4820").unwrap();
        assert_eq!(h.widget.session().unwrap().attempts(), 0);
        assert_eq!(h.widget.verify_audio(), Ok(false));
        assert_eq!(h.widget.state(), State::ChallengeAudio);
        assert_eq!(h.widget.session().unwrap().attempts(), 1);
        assert_eq!(h.widget.audio().unwrap().status(), AudioStatus::Incorrect);
        assert_eq!(h.widget.audio().unwrap().input(), "4820");

        fire(&mut h.widget, TimerKind::ClearAudioInput);
        assert_eq!(h.widget.audio().unwrap().input(), "");
        assert_eq!(h.widget.audio().unwrap().status(), AudioStatus::None);
        assert_eq!(h.widget.verify_audio(), Err(Refusal::NothingToVerify));
    }

    #[test]
    fn test_back_to_visual_keeps_session() {
        let mut h = create_widget([1, 0, 0, 0, 0]);
        open(&mut h.widget);
        h.widget.switch_to_audio().unwrap();
        finish_playback(&mut h.widget);
        h.widget.audio_input("1").unwrap();
        h.widget.verify_audio().unwrap();
        fire(&mut h.widget, TimerKind::ClearAudioInput);

        h.widget.back_to_visual().unwrap();
        assert_eq!(h.widget.state(), State::ChallengeVisual);
        assert!(h.widget.audio().is_none());
        let session = h.widget.session().unwrap();
        assert_eq!(session.catalog_index(), 1);
        assert_eq!(session.attempts(), 1);
    }

    #[test]
    fn test_visual_only_refuses_audio() {
        let options = WidgetOptions {
            challenge_type: ChallengeType::Visual,
            ..WidgetOptions::default()
        };
        let mut h = create_widget_with(
            options,
            [0],
            RecordingSound::new(),
            MemoryPreferenceStore::new(),
        );
        open(&mut h.widget);
        assert_eq!(h.widget.switch_to_audio(), Err(Refusal::ModeDisabled("audio")));
        assert_eq!(h.widget.state(), State::ChallengeVisual);
        assert!(h.widget.audio().is_none());
    }

    #[test]
    fn test_audio_only_opens_audio() {
        let options = WidgetOptions {
            challenge_type: ChallengeType::Audio,
            ..WidgetOptions::default()
        };
        let mut h = create_widget_with(
            options,
            [3, 9, 9, 9, 9],
            RecordingSound::new(),
            MemoryPreferenceStore::new(),
        );
        open(&mut h.widget);
        assert_eq!(h.widget.state(), State::ChallengeAudio);
        assert_eq!(h.widget.session().unwrap().challenge().difficulty, Difficulty::Hard);

        finish_playback(&mut h.widget);
        assert_eq!(h.widget.back_to_visual(), Err(Refusal::ModeDisabled("visual")));
        assert_eq!(h.widget.state(), State::ChallengeAudio);
        assert_eq!(h.sound.cues().last(), Some(&Cue::Error));

        h.widget.audio_input("9999").unwrap();
        h.widget.verify_audio().unwrap();
        assert_eq!(h.widget.analytics().difficulty_counts.hard, 1);
    }

    #[test]
    fn test_failed_digit_falls_back_to_speech() {
        let mut h = create_widget_with(
            WidgetOptions::default(),
            [0, 4, 8, 2, 1],
            RecordingSound::new().failing_digits([8]),
            MemoryPreferenceStore::new(),
        );
        open(&mut h.widget);
        h.widget.switch_to_audio().unwrap();
        finish_playback(&mut h.widget);
        let calls = h.sound.calls();
        assert!(calls.contains(&SoundCall::Spoken(8)));
        assert!(!calls.contains(&SoundCall::Digit(8)));
        assert!(calls.contains(&SoundCall::Digit(1)));
    }

    #[test]
    fn test_stale_loading_timer_ignored() {
        let mut h = create_widget([0]);
        h.widget.check().unwrap();
        let timers = h.widget.take_timers();
        h.widget.reset();
        for timer in timers {
            h.widget.on_timer(timer);
        }
        assert_eq!(h.widget.state(), State::Idle);
        assert!(h.widget.session().is_none());
    }

    #[test]
    fn test_stale_playback_after_reset() {
        let mut h = create_widget([0, 1, 2, 3, 4]);
        open(&mut h.widget);
        h.widget.switch_to_audio().unwrap();
        let timers = h.widget.take_timers();
        h.widget.reset();
        for timer in timers {
            h.widget.on_timer(timer);
        }
        assert!(!h
            .sound
            .calls()
            .iter()
            .any(|c| matches!(c, SoundCall::Digit(_) | SoundCall::Spoken(_))));
    }

    #[test]
    fn test_close_unchecks_without_reset_event() {
        let mut h = create_widget([0]);
        open(&mut h.widget);
        h.widget.close().unwrap();
        assert_eq!(h.widget.state(), State::Idle);
        assert!(!h.widget.is_checked());
        assert!(h.widget.session().is_none());
        assert!(drain(&mut h.events).is_empty());
        assert_eq!(h.widget.close(), Err(Refusal::WrongState(State::Idle)));
    }

    #[test]
    fn test_manual_refresh_keeps_attempts() {
        let mut h = create_widget([0, 3, 0]);
        open(&mut h.widget);
        h.widget.select(1).unwrap();
        h.widget.verify().unwrap();
        let before = h.widget.session().unwrap().catalog_index();

        h.widget.refresh().unwrap();
        let session = h.widget.session().unwrap();
        assert_ne!(session.catalog_index(), before);
        assert_eq!(session.attempts(), 1);
        assert_eq!(h.sound.cues().last(), Some(&Cue::Refresh));
    }

    #[test]
    fn test_hint_shown_then_hidden() {
        let mut h = create_widget([0]);
        open(&mut h.widget);
        h.widget.select(0).unwrap();
        let text = h.widget.hint().unwrap();
        assert_eq!(text, "You need to select 2 more text box(es).");
        assert_eq!(h.renderer.last().unwrap().hint.as_deref(), Some(text.as_str()));

        fire(&mut h.widget, TimerKind::HideHint);
        assert!(h.renderer.last().unwrap().hint.is_none());
    }

    #[test]
    fn test_out_of_range_cell() {
        let mut h = create_widget([0]);
        open(&mut h.widget);
        assert_eq!(h.widget.select(9), Err(Refusal::OutOfRange(9)));
    }

    #[test]
    fn test_success_banner_hides() {
        let mut h = create_widget([0]);
        open(&mut h.widget);
        for i in [0, 2, 5] {
            h.widget.select(i).unwrap();
        }
        h.widget.verify().unwrap();
        fire(&mut h.widget, TimerKind::HideSuccessBanner);
        let view = h.renderer.last().unwrap();
        assert!(!view.success_banner);
        assert_eq!(view.state, State::Verified);
    }

    #[test]
    fn test_preferences_loaded_and_saved() {
        let prefs = MemoryPreferenceStore::with(Preferences {
            sound_enabled: false,
            dark_mode: true,
        });
        let mut h = create_widget_with(WidgetOptions::default(), [0], RecordingSound::new(), prefs);
        assert!(!h.widget.options().sound_enabled);
        assert!(h.widget.options().dark_mode);

        open(&mut h.widget);
        h.widget.select(0).unwrap();
        assert!(h.sound.cues().is_empty());

        h.widget.set_sound_enabled(true);
        h.widget.set_dark_mode(false);
        assert_eq!(
            h.prefs.saved(),
            Some(Preferences {
                sound_enabled: true,
                dark_mode: false,
            })
        );
        h.widget.select(1).unwrap();
        assert_eq!(h.sound.cues(), vec![Cue::Click]);
    }

    #[test]
    fn test_elapsed_is_computed_on_demand() {
        let mut h = create_widget([0]);
        assert_eq!(h.widget.elapsed_secs(), None);
        open(&mut h.widget);
        h.clock.advance(Duration::from_millis(65_400));
        assert_eq!(h.widget.elapsed_secs(), Some(65));
        assert_eq!(h.widget.view().grid.unwrap().elapsed_secs, 65);
    }

    fn fixed_only_widget(max_attempts: u32, seed: u64) -> ChallengeWidget {
        let (tx, _) = broadcast::channel(16);
        let catalog = Catalog::new(Catalog::builtin().entries()[..6].to_vec()).unwrap();
        let options = WidgetOptions {
            max_attempts,
            ..WidgetOptions::default()
        };
        ChallengeWidget::new(options, catalog, tx).with_random(SeededRandom::new(seed))
    }

    proptest! {
        #[test]
        fn prop_attempts_increment_and_stay_bounded(
            max_attempts in 1u32..6,
            seed in any::<u64>(),
            rounds in 1usize..16,
        ) {
            let mut widget = fixed_only_widget(max_attempts, seed);
            for _ in 0..rounds {
                if widget.state() == State::Idle {
                    open(&mut widget);
                }
                let before = widget.session().map(|s| s.attempts()).unwrap_or(0);

                // A single cell never matches a three-or-more target set
                widget.select(0).unwrap();
                prop_assert_eq!(widget.verify(), Ok(false));

                if before + 1 >= max_attempts {
                    prop_assert_eq!(widget.state(), State::Idle);
                    prop_assert!(widget.session().is_none());
                    prop_assert!(!widget.is_valid());
                } else {
                    let after = widget.session().map(|s| s.attempts()).unwrap_or(0);
                    prop_assert_eq!(after, before + 1);
                    prop_assert!(after < max_attempts);
                }
            }
        }
    }
}
