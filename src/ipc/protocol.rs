//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::collaborators::View;
use crate::events::{Status, WidgetEvent};
use crate::session::AnalyticsState;
use crate::state::{Refusal, State};

/// Largest frame either side will accept
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from a host page to the widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// `"true"` / `"null"` status plus validity
    GetStatus,

    IsValid,

    GetAnalytics,

    /// Full render model
    GetView,

    /// Reset the widget to idle
    Reset,

    /// Check the "I'm not a robot" box
    Check,

    /// Close the open challenge
    Close,

    Select { index: usize },

    Verify,

    Refresh,

    Hint,

    SwitchToAudio,

    BackToVisual,

    PlayAgain,

    AudioInput { text: String },

    VerifyAudio,

    SetSoundEnabled { enabled: bool },

    SetDarkMode { enabled: bool },

    /// Subscribe to widget event notifications
    Subscribe,
}

/// Responses from the widget to a host page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    Status { status: Status, valid: bool },

    Valid { valid: bool },

    Analytics {
        analytics: AnalyticsState,
        summary: String,
    },

    View { view: View },

    /// Request accepted; widget is now in `state`
    Ok { state: State },

    /// Outcome of a verify or verify_audio request
    Verification { correct: bool, state: State },

    Hint { text: String },

    /// Subscription confirmed
    Subscribed,

    /// Pushed to subscribed clients
    Notification { event: WidgetEvent },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<Refusal> for Response {
    fn from(refusal: Refusal) -> Self {
        Self::error(refusal.code(), refusal.to_string())
    }
}

/// Read one length-prefixed frame; `None` on a clean disconnect
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        bail!("frame of {len} bytes exceeds limit");
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    if msg_bytes.len() > MAX_FRAME_LEN {
        bail!("frame of {} bytes exceeds limit", msg_bytes.len());
    }
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}
