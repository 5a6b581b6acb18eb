//! Render model and renderer collaborator
//!
//! The widget builds a `View` after every transition; renderers only draw it.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::Difficulty;
use crate::events::Status;
use crate::session::AudioStatus;
use crate::state::State;

pub const CHECKBOX_LABEL: &str = "I'm not a robot";
pub const VERIFIED_LABEL: &str = "Verified ✓";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckboxView {
    pub checked: bool,
    /// Input disabled once verified
    pub locked: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub title: String,
    pub difficulty: Difficulty,
    pub cells: Vec<CellView>,
    pub attempts: u32,
    pub max_attempts: u32,
    /// 0..=100
    pub progress: f64,
    pub can_verify: bool,
    pub elapsed_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioView {
    pub input: String,
    pub playing: bool,
    pub status: AudioStatus,
    pub can_go_back: bool,
}

/// One-shot visual signal attached to a single render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feedback {
    /// Whole challenge shakes after a wrong answer
    Failed,
    /// A non-target cell was picked in a deplete challenge
    Miss { index: usize },
    /// A target cell faded out and was relabelled
    Replaced { index: usize },
}

/// Everything needed to draw the widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub state: State,
    pub status: Status,
    pub checkbox: CheckboxView,
    pub dark_mode: bool,
    pub sound_enabled: bool,
    /// Present while a visual challenge is showing
    pub grid: Option<GridView>,
    /// Present while the audio challenge is showing
    pub audio: Option<AudioView>,
    pub hint: Option<String>,
    pub success_banner: bool,
    pub feedback: Option<Feedback>,
    pub analytics: String,
}

/// Draws views; holds no widget state
pub trait Renderer: Send {
    fn render(&mut self, view: &View);
}

/// Discards every view
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _view: &View) {}
}

/// Writes a plain-text rendering to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn render(&mut self, view: &View) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", render_text(view)) {
            warn!(?e, "failed to write view");
        }
    }
}

/// Keeps every rendered view; clones share the history
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    views: Arc<Mutex<Vec<View>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views(&self) -> Vec<View> {
        self.views.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<View> {
        self.views
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, view: &View) {
        self.views
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(view.clone());
    }
}

/// Plain-text form of a view
pub fn render_text(view: &View) -> String {
    let mut out = String::new();
    let mark = if view.checkbox.checked { "x" } else { " " };
    out.push_str(&format!("[{mark}] {}  ({})\n", view.checkbox.label, view.state));

    if let Some(grid) = &view.grid {
        out.push_str(&format!(
            "{} [{}]  attempts {}/{}  progress {:.0}%  {:02}:{:02}\n",
            grid.title,
            grid.difficulty.to_string().to_uppercase(),
            grid.attempts,
            grid.max_attempts,
            grid.progress,
            grid.elapsed_secs / 60,
            grid.elapsed_secs % 60,
        ));
        for row in grid.cells.chunks(3) {
            let cells: Vec<String> = row
                .iter()
                .map(|c| format!("{:>14}{}", c.label, if c.selected { "*" } else { " " }))
                .collect();
            out.push_str(&cells.join("|"));
            out.push('\n');
        }
    }

    if let Some(audio) = &view.audio {
        let playing = if audio.playing { "playing..." } else { "ready" };
        out.push_str(&format!("audio [{playing}] input: {:?}\n", audio.input));
        match audio.status {
            AudioStatus::Incorrect => out.push_str("Incorrect. Please try again.\n"),
            AudioStatus::None => {}
        }
    }

    if let Some(hint) = &view.hint {
        out.push_str(&format!("hint: {hint}\n"));
    }
    if view.success_banner {
        out.push_str("Verification successful!\n");
    }
    out.push_str(&view.analytics);
    out
}
