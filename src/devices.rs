use crate::api::client::SpotifyClient;
use crate::api::models::DeviceDescriptor;
use crate::error::{AppError, AppResult};
use crate::events::{OverlayAnchor, OverlayHost, OverlayId, UiHost};
use crate::poller::PlaybackPoller;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_ANCHOR_Y: f64 = 15.0;
const ANCHOR_GAP: f64 = 10.0;

/// Geometry of the page when the picker is opened.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub canvas_left: f64,
}

/// Position of the control that opened the picker. Either coordinate may be
/// unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorPoint {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl OverlayAnchor {
    pub fn compute(layout: &Layout, point: &AnchorPoint) -> Self {
        Self {
            bottom: layout.viewport_height - point.y.unwrap_or(DEFAULT_ANCHOR_Y) + ANCHOR_GAP,
            left: layout.canvas_left,
            width: point.x.unwrap_or(layout.viewport_width) - layout.canvas_left,
        }
    }
}

/// Releases the overlay exactly once: removes it from the page and frees
/// the single picker slot.
struct OverlayGuard {
    id: OverlayId,
    overlay: Arc<dyn OverlayHost>,
    slot: Arc<AtomicBool>,
    shown: bool,
    released: bool,
}

impl OverlayGuard {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.shown {
            self.overlay.remove(self.id);
        }
        self.slot.store(false, Ordering::SeqCst);
    }

    async fn fade_out(&mut self, fade: Duration) {
        if self.released {
            return;
        }
        if self.shown {
            self.overlay.begin_fade_out(self.id);
            tokio::time::sleep(fade).await;
        }
        self.release();
    }
}

impl Drop for OverlayGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Lists Spotify Connect devices and moves playback to the chosen one.
pub struct DeviceTransferFlow {
    client: Arc<SpotifyClient>,
    poller: Arc<PlaybackPoller>,
    overlay: Arc<dyn OverlayHost>,
    ui: Arc<dyn UiHost>,
    slot: Arc<AtomicBool>,
    fade: Duration,
    settle: Duration,
    haptic_ms: u64,
}

impl DeviceTransferFlow {
    pub fn new(
        client: Arc<SpotifyClient>,
        poller: Arc<PlaybackPoller>,
        overlay: Arc<dyn OverlayHost>,
        ui: Arc<dyn UiHost>,
        fade: Duration,
        settle: Duration,
        haptic_ms: u64,
    ) -> Self {
        Self {
            client,
            poller,
            overlay,
            ui,
            slot: Arc::new(AtomicBool::new(false)),
            fade,
            settle,
            haptic_ms,
        }
    }

    pub fn is_open(&self) -> bool {
        self.slot.load(Ordering::SeqCst)
    }

    /// Fetch the device list and show the picker next to `point`.
    ///
    /// Only one picker can be open at a time; a second call while one is
    /// showing fails with [`AppError::TransferInProgress`]. Returns
    /// `Ok(None)` when there is no anchor to attach the overlay to.
    pub async fn open(
        &self,
        layout: Layout,
        point: Option<AnchorPoint>,
    ) -> AppResult<Option<DevicePicker>> {
        if self
            .slot
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Device picker already open");
            return Err(AppError::TransferInProgress);
        }

        let mut guard = OverlayGuard {
            id: Uuid::new_v4(),
            overlay: Arc::clone(&self.overlay),
            slot: Arc::clone(&self.slot),
            shown: false,
            released: false,
        };

        let devices = self.client.devices().await?;
        let Some(point) = point else {
            return Ok(None);
        };

        let anchor = OverlayAnchor::compute(&layout, &point);
        self.ui.vibrate(self.haptic_ms);
        self.overlay.show_devices(guard.id, anchor, &devices);
        guard.shown = true;
        log::info!("Showing {} playback devices", devices.len());

        Ok(Some(DevicePicker {
            client: Arc::clone(&self.client),
            poller: Arc::clone(&self.poller),
            ui: Arc::clone(&self.ui),
            devices,
            guard,
            fade: self.fade,
            settle: self.settle,
            haptic_ms: self.haptic_ms,
        }))
    }
}

/// An open device overlay. Dropping it removes the overlay immediately.
pub struct DevicePicker {
    client: Arc<SpotifyClient>,
    poller: Arc<PlaybackPoller>,
    ui: Arc<dyn UiHost>,
    devices: Vec<DeviceDescriptor>,
    guard: OverlayGuard,
    fade: Duration,
    settle: Duration,
    haptic_ms: u64,
}

impl DevicePicker {
    pub fn id(&self) -> OverlayId {
        self.guard.id
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Transfer playback to `device_id`, close the overlay and schedule a
    /// refresh once Spotify has had time to switch.
    ///
    /// If the transfer fails the overlay stays open so another device can be
    /// picked.
    pub async fn select(mut self, device_id: &str) -> Result<(), (Self, AppError)> {
        let result = self.client.transfer_playback(device_id).await;
        if let Err(e) = result {
            log::warn!("Playback transfer failed: {}", e);
            return Err((self, e));
        }
        log::info!("Transferred playback to {}", device_id);

        self.fade_out().await;
        self.poller.schedule_refresh(self.settle);
        Ok(())
    }

    pub async fn close(mut self) {
        self.fade_out().await;
    }

    async fn fade_out(&mut self) {
        self.ui.vibrate(self.haptic_ms);
        self.guard.fade_out(self.fade).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::client;
    use crate::api::transport::testing::{reply, ScriptedTransport};
    use crate::events::testing::{FakeUi, OverlayEvent, RecordingOverlay, RecordingRenderer};
    use reqwest::Method;
    use tokio::time::Instant;

    const DEVICES: &str = r#"{"devices":[
        {"id":"laptop","name":"Laptop","type":"Computer"},
        {"id":"phone","name":"Phone","type":"Smartphone"}
    ]}"#;

    struct Fixture {
        flow: DeviceTransferFlow,
        poller: Arc<PlaybackPoller>,
        transport: Arc<ScriptedTransport>,
        overlay: Arc<RecordingOverlay>,
    }

    async fn fixture() -> Fixture {
        let transport = Arc::new(ScriptedTransport::new(|_| reply(200, "{}")));
        let client = Arc::new(client(Arc::clone(&transport)).await);
        transport.respond_with(|req| {
            if req.url.ends_with("/devices") {
                reply(200, DEVICES)
            } else {
                reply(204, "")
            }
        });
        let poller = Arc::new(PlaybackPoller::new(
            Arc::clone(&client),
            Arc::new(RecordingRenderer::default()),
            Duration::from_millis(4500),
        ));
        let overlay = Arc::new(RecordingOverlay::default());
        let flow = DeviceTransferFlow::new(
            client,
            Arc::clone(&poller),
            overlay.clone(),
            Arc::new(FakeUi::new(true)),
            Duration::from_millis(210),
            Duration::from_millis(300),
            300,
        );
        Fixture {
            flow,
            poller,
            transport,
            overlay,
        }
    }

    fn layout() -> Layout {
        Layout {
            viewport_width: 1280.0,
            viewport_height: 800.0,
            canvas_left: 40.0,
        }
    }

    fn point() -> Option<AnchorPoint> {
        Some(AnchorPoint {
            x: Some(640.0),
            y: Some(700.0),
        })
    }

    #[test]
    fn anchor_sits_above_the_control() {
        let anchor = OverlayAnchor::compute(&layout(), &point().unwrap());
        assert_eq!(anchor.bottom, 110.0);
        assert_eq!(anchor.left, 40.0);
        assert_eq!(anchor.width, 600.0);

        let fallback = OverlayAnchor::compute(&layout(), &AnchorPoint::default());
        assert_eq!(fallback.bottom, 795.0);
        assert_eq!(fallback.width, 1240.0);
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_a_device_transfers_then_refreshes() {
        let fx = fixture().await;
        let mut triggers = fx.poller.subscribe();

        let picker = fx.flow.open(layout(), point()).await.unwrap().unwrap();
        assert_eq!(picker.devices().len(), 2);
        let id = picker.id();

        let start = Instant::now();
        picker.select("phone").await.map_err(|(_, e)| e).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(210));

        let transfer = fx.transport.requests().pop().unwrap();
        assert_eq!(transfer.method, Method::PUT);
        assert!(transfer.url.ends_with("/me/player"));

        let selected = Instant::now();
        triggers.changed().await.unwrap();
        assert!(selected.elapsed() >= Duration::from_millis(300));

        assert_eq!(
            fx.overlay.events(),
            vec![
                OverlayEvent::Shown(id, 2),
                OverlayEvent::Fading(id),
                OverlayEvent::Removed(id),
            ]
        );
        assert!(!fx.flow.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn second_picker_is_refused_while_one_is_open() {
        let fx = fixture().await;
        let picker = fx.flow.open(layout(), point()).await.unwrap().unwrap();

        assert!(matches!(
            fx.flow.open(layout(), point()).await,
            Err(AppError::TransferInProgress)
        ));
        assert_eq!(fx.transport.count("/devices"), 1);

        picker.close().await;
        assert!(fx.flow.open(layout(), point()).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_picker_removes_the_overlay() {
        let fx = fixture().await;
        let picker = fx.flow.open(layout(), point()).await.unwrap().unwrap();
        let id = picker.id();

        drop(picker);
        assert_eq!(
            fx.overlay.events(),
            vec![OverlayEvent::Shown(id, 2), OverlayEvent::Removed(id)]
        );
        assert!(!fx.flow.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_transfer_keeps_the_picker_open() {
        let fx = fixture().await;
        let picker = fx.flow.open(layout(), point()).await.unwrap().unwrap();
        fx.transport.respond_with(|_| reply(404, "no device"));

        let (picker, err) = picker.select("gone").await.unwrap_err();
        assert!(matches!(err, AppError::Dispatch { status: 404, .. }));
        assert!(fx.flow.is_open());
        assert_eq!(fx.overlay.events().len(), 1);
        drop(picker);
        assert!(!fx.flow.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failure_frees_the_slot() {
        let fx = fixture().await;
        fx.transport.respond_with(|_| reply(500, ""));

        assert!(fx.flow.open(layout(), point()).await.is_err());
        assert!(!fx.flow.is_open());
        assert!(fx.overlay.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_anchor_shows_nothing() {
        let fx = fixture().await;
        assert!(fx.flow.open(layout(), None).await.unwrap().is_none());
        assert!(fx.overlay.events().is_empty());
        assert!(!fx.flow.is_open());
    }
}
