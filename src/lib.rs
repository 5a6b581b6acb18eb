//! captcha-widget: an "I'm not a robot" checkbox challenge widget
//!
//! - `state`: the widget controller and its five-state machine
//! - `catalog`, `verify`, `session`: challenges, answer checking, analytics
//! - `collaborators`: renderer, sound and preference seams
//! - `runtime`, `ipc`: the host process driving the widget over a socket

pub mod catalog;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod events;
pub mod ipc;
pub mod lifecycle;
pub mod random;
pub mod runtime;
pub mod session;
pub mod state;
pub mod verify;
