//! captcha-widget: host process for the checkbox challenge widget
//!
//! Runs the widget on its own task and exposes it over a Unix socket:
//! - Requests drive the widget (check, select, verify, audio, ...)
//! - Subscribed clients receive verified / reset / status events
//! - The current view is drawn to stdout after every change

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use captcha_widget::catalog::Catalog;
use captcha_widget::collaborators::{AssetSoundPlayer, FilePreferenceStore, TerminalRenderer};
use captcha_widget::config::Config;
use captcha_widget::events::WidgetEvent;
use captcha_widget::ipc::Server;
use captcha_widget::lifecycle::ShutdownSignal;
use captcha_widget::runtime;
use captcha_widget::state::ChallengeWidget;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout carries the rendered widget
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "captcha-widget starting");

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        socket_path = ?config.socket_path,
        challenge_type = ?config.challenge_type,
        max_attempts = config.max_attempts,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Widget -> IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<WidgetEvent>(64);

    let widget = ChallengeWidget::new(config.widget_options(), Catalog::builtin(), event_tx.clone())
        .with_renderer(TerminalRenderer)
        .with_sound(AssetSoundPlayer::new(config.sounds_dir.clone()))
        .with_preferences(FilePreferenceStore::new(config.preferences_path()));

    let (handle, widget_task) = runtime::spawn(widget);

    let server = Server::new(&config.socket_path, handle, event_tx.clone())?;
    let mut log_rx = event_tx.subscribe();

    info!("widget initialized, entering main loop");

    tokio::select! {
        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Log widget events
        _ = async {
            loop {
                match log_rx.recv().await {
                    Ok(event) => info!(%event, "widget event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("event logger exited");
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "signal handling failed"),
            }
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;
    widget_task.abort();

    info!("captcha-widget stopped");

    Ok(())
}
