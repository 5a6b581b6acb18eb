//! IPC module for host-widget communication

mod protocol;
mod server;

pub use protocol::{read_frame, write_frame, Request, Response, MAX_FRAME_LEN};
pub use server::Server;
