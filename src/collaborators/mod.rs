//! External collaborators the widget drives
//!
//! Renderer, sound/speech and preference store are consumed through traits
//! only; the host picks implementations, tests use the recording doubles.

mod preferences;
mod renderer;
mod sound;

pub use preferences::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceError, PreferenceStore, Preferences,
};
pub use renderer::{
    render_text, AudioView, CellView, CheckboxView, Feedback, GridView, NullRenderer,
    RecordingRenderer, Renderer, TerminalRenderer, View, CHECKBOX_LABEL, VERIFIED_LABEL,
};
pub use sound::{AssetSoundPlayer, Cue, RecordingSound, SoundCall, SoundError, SoundPlayer};
