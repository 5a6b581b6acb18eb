//! Unix domain socket server for IPC
//!
//! Provides request-response access to the widget and push notifications of
//! widget events to subscribed clients.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::events::WidgetEvent;
use crate::runtime::WidgetHandle;

use super::protocol::{read_frame, write_frame, Request, Response};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    widget: WidgetHandle,
    events: broadcast::Sender<WidgetEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind the socket, replacing a stale one
    pub fn new(
        socket_path: &Path,
        widget: WidgetHandle,
        events: broadcast::Sender<WidgetEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            widget,
            events,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let widget = self.widget.clone();
                    let events = self.events.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, widget, events) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        widget: WidgetHandle,
        events: broadcast::Sender<WidgetEvent>,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (req_tx, mut req_rx) = mpsc::channel(16);
        let reader_task = tokio::spawn(Self::read_requests(reader, req_tx));
        let mut subscription: Option<broadcast::Receiver<WidgetEvent>> = None;

        loop {
            tokio::select! {
                incoming = req_rx.recv() => {
                    let response = match incoming {
                        None => break,
                        Some(Err(message)) => Response::error("bad_request", message),
                        Some(Ok(Request::Subscribe)) => {
                            debug!("client subscribed to notifications");
                            subscription = Some(events.subscribe());
                            Response::Subscribed
                        }
                        Some(Ok(request)) => widget.request(request).await,
                    };
                    write_frame(&mut writer, &response).await?;
                }
                event = next_event(&mut subscription) => {
                    match event {
                        Ok(event) => {
                            write_frame(&mut writer, &Response::Notification { event }).await?;
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber lagged");
                        }
                        Err(RecvError::Closed) => {
                            subscription = None;
                        }
                    }
                }
            }
        }

        reader_task.abort();
        Ok(())
    }

    /// Decode frames until the client disconnects
    async fn read_requests(
        mut reader: OwnedReadHalf,
        req_tx: mpsc::Sender<std::result::Result<Request, String>>,
    ) {
        loop {
            let frame = match read_frame(&mut reader).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!("client disconnected");
                    return;
                }
                Err(e) => {
                    warn!(?e, "failed to read frame, disconnecting");
                    return;
                }
            };

            let request = serde_json::from_slice::<Request>(&frame).map_err(|e| e.to_string());
            if let Ok(request) = &request {
                debug!(?request, "received request");
            }
            if req_tx.send(request).await.is_err() {
                return;
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Next event for a subscribed client; pends forever otherwise
async fn next_event(
    subscription: &mut Option<broadcast::Receiver<WidgetEvent>>,
) -> std::result::Result<WidgetEvent, RecvError> {
    match subscription {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
