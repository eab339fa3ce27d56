use crate::api::client::SpotifyClient;
use crate::error::{AppError, AppResult};
use crate::events::{RenderUpdate, Renderer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What a single poll cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Dropped by the rate gate, a fetch in flight, or no usable token.
    Skipped,
    Rendered,
    NothingPlaying,
}

#[derive(Debug, Default)]
struct PollGate {
    last_fetch: Option<Instant>,
    in_flight: bool,
}

/// Clears the in-flight flag once the fetch that claimed the gate finishes.
struct FetchClaim<'a> {
    gate: &'a Mutex<PollGate>,
}

impl Drop for FetchClaim<'_> {
    fn drop(&mut self) {
        if let Ok(mut gate) = self.gate.lock() {
            gate.in_flight = false;
        }
    }
}

/// Keeps the renderer's snapshot in sync with Spotify without polling more
/// than once per spacing window.
pub struct PlaybackPoller {
    client: Arc<SpotifyClient>,
    renderer: Arc<dyn Renderer>,
    spacing: Duration,
    gate: Mutex<PollGate>,
    force_rerender: AtomicBool,
    triggers: watch::Sender<Instant>,
}

impl PlaybackPoller {
    pub fn new(client: Arc<SpotifyClient>, renderer: Arc<dyn Renderer>, spacing: Duration) -> Self {
        let (triggers, _) = watch::channel(Instant::now());
        Self {
            client,
            renderer,
            spacing,
            gate: Mutex::new(PollGate::default()),
            force_rerender: AtomicBool::new(false),
            triggers,
        }
    }

    /// Record a refresh request. The poll loop decides whether it turns into
    /// a network fetch.
    pub fn trigger(&self) {
        self.triggers.send_replace(Instant::now());
    }

    pub fn subscribe(&self) -> watch::Receiver<Instant> {
        self.triggers.subscribe()
    }

    /// Fire one trigger after `delay`, letting Spotify settle a change first.
    pub fn schedule_refresh(self: &Arc<Self>, delay: Duration) -> JoinHandle<()> {
        let poller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            poller.trigger();
        })
    }

    /// Flag the next rendered snapshot so the renderer replays its animation.
    pub fn request_force_rerender(&self) {
        self.force_rerender.store(true, Ordering::SeqCst);
    }

    fn try_claim(&self) -> Option<FetchClaim<'_>> {
        let mut gate = self.gate.lock().ok()?;
        let now = Instant::now();
        if gate.in_flight {
            return None;
        }
        if let Some(last) = gate.last_fetch {
            if now.duration_since(last) < self.spacing {
                return None;
            }
        }
        gate.in_flight = true;
        gate.last_fetch = Some(now);
        Some(FetchClaim { gate: &self.gate })
    }

    /// Run one cycle. Errors end the cycle only; the previous snapshot stays
    /// on screen.
    pub async fn poll_once(&self) -> AppResult<PollOutcome> {
        if self.client.tokens().bearer().await.is_none() {
            return Ok(PollOutcome::Skipped);
        }

        let Some(_claim) = self.try_claim() else {
            log::debug!("Dropping poll trigger inside the rate window");
            return Ok(PollOutcome::Skipped);
        };

        let Some(snapshot) = self.client.current_playback().await? else {
            log::debug!("Nothing is playing");
            return Ok(PollOutcome::NothingPlaying);
        };

        let force_rerender = if self.force_rerender.swap(false, Ordering::SeqCst) {
            Some(chrono::Utc::now().timestamp_millis())
        } else {
            None
        };

        self.renderer.update(RenderUpdate {
            snapshot: Some(snapshot),
            data_provided: true,
            force_rerender,
        });
        Ok(PollOutcome::Rendered)
    }

    /// Poll on every trigger until `cancel` fires.
    pub async fn run(
        self: Arc<Self>,
        mut triggers: watch::Receiver<Instant>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = triggers.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    match self.poll_once().await {
                        Ok(outcome) => log::debug!("Poll cycle: {:?}", outcome),
                        Err(AppError::Unauthorized) => {
                            log::info!("Poll rejected, keeping the last snapshot")
                        }
                        Err(e) => log::warn!("Poll cycle failed: {}", e),
                    }
                }
            }
        }
        log::info!("Playback poller stopped");
    }
}
