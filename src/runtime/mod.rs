//! Widget task
//!
//! The widget lives on one task. Requests arrive over an mpsc channel with a
//! oneshot for the reply; timers the widget queues are slept out on their own
//! tasks and fed back through the same channel.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::ipc::{Request, Response};
use crate::state::{ChallengeWidget, Refusal, ScheduledTimer};

/// Messages processed by the widget task
#[derive(Debug)]
pub enum WidgetCommand {
    Request {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    TimerFired(ScheduledTimer),
}

/// Cloneable handle to a running widget task
#[derive(Debug, Clone)]
pub struct WidgetHandle {
    tx: mpsc::Sender<WidgetCommand>,
}

impl WidgetHandle {
    /// Send a request and wait for its response
    pub async fn request(&self, request: Request) -> Response {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(WidgetCommand::Request { request, reply })
            .await
            .is_err()
        {
            return Response::error("unavailable", "widget task has stopped");
        }
        rx.await
            .unwrap_or_else(|_| Response::error("unavailable", "widget task dropped the request"))
    }
}

/// Start the widget task; it runs until every handle is dropped
pub fn spawn(widget: ChallengeWidget) -> (WidgetHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(32);
    let timer_tx = tx.downgrade();
    let task = tokio::spawn(run(widget, rx, timer_tx));
    (WidgetHandle { tx }, task)
}

async fn run(
    mut widget: ChallengeWidget,
    mut rx: mpsc::Receiver<WidgetCommand>,
    timer_tx: mpsc::WeakSender<WidgetCommand>,
) {
    widget.render();
    info!(state = %widget.state(), "widget task started");

    while let Some(command) = rx.recv().await {
        match command {
            WidgetCommand::Request { request, reply } => {
                let response = dispatch(&mut widget, request);
                let _ = reply.send(response);
            }
            WidgetCommand::TimerFired(timer) => widget.on_timer(timer),
        }
        start_timers(&mut widget, &timer_tx);
    }

    info!("widget task exited");
}

fn start_timers(widget: &mut ChallengeWidget, timer_tx: &mpsc::WeakSender<WidgetCommand>) {
    for timer in widget.take_timers() {
        let timer_tx = timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timer.delay).await;
            if let Some(tx) = timer_tx.upgrade() {
                let _ = tx.send(WidgetCommand::TimerFired(timer)).await;
            }
        });
    }
}

/// Apply one request to the widget
pub fn dispatch(widget: &mut ChallengeWidget, request: Request) -> Response {
    debug!(?request, "dispatching request");

    let result = match request {
        Request::Ping => return Response::Pong,
        Request::GetStatus => {
            return Response::Status {
                status: widget.status(),
                valid: widget.is_valid(),
            }
        }
        Request::IsValid => {
            return Response::Valid {
                valid: widget.is_valid(),
            }
        }
        Request::GetAnalytics => {
            let analytics = widget.analytics();
            let summary = analytics.summary();
            return Response::Analytics { analytics, summary };
        }
        Request::GetView => return Response::View { view: widget.view() },
        Request::Subscribe => return Response::Subscribed,
        Request::Hint => {
            return match widget.hint() {
                Ok(text) => Response::Hint { text },
                Err(refusal) => refusal.into(),
            }
        }
        Request::Verify => return verification(widget.verify(), widget),
        Request::VerifyAudio => return verification(widget.verify_audio(), widget),
        Request::Reset => {
            widget.reset();
            Ok(())
        }
        Request::Check => widget.check(),
        Request::Close => widget.close(),
        Request::Select { index } => widget.select(index),
        Request::Refresh => widget.refresh(),
        Request::SwitchToAudio => widget.switch_to_audio(),
        Request::BackToVisual => widget.back_to_visual(),
        Request::PlayAgain => widget.play_again(),
        Request::AudioInput { text } => widget.audio_input(&text),
        Request::SetSoundEnabled { enabled } => {
            widget.set_sound_enabled(enabled);
            Ok(())
        }
        Request::SetDarkMode { enabled } => {
            widget.set_dark_mode(enabled);
            Ok(())
        }
    };

    match result {
        Ok(()) => Response::Ok {
            state: widget.state(),
        },
        Err(refusal) => {
            debug!(%refusal, "request refused");
            refusal.into()
        }
    }
}

fn verification(
    result: Result<bool, Refusal>,
    widget: &ChallengeWidget,
) -> Response {
    match result {
        Ok(correct) => Response::Verification {
            correct,
            state: widget.state(),
        },
        Err(refusal) => refusal.into(),
    }
}
