//! Contracts of the collaborators that live outside the controller: the
//! playback renderer, the hosting page and the device overlay.

use crate::api::models::{DeviceDescriptor, PlaybackSnapshot};
use serde::Serialize;
use uuid::Uuid;

/// Full state handed to the renderer on every update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderUpdate {
    pub snapshot: Option<PlaybackSnapshot>,
    /// Tells the renderer it may start its time-based effects.
    pub data_provided: bool,
    /// Millisecond timestamp asking the renderer to replay its animation even
    /// if the snapshot did not change.
    pub force_rerender: Option<i64>,
}

pub trait Renderer: Send + Sync {
    fn update(&self, update: RenderUpdate);
}

/// The page the controller is embedded in.
pub trait UiHost: Send + Sync {
    /// Open the authorization popup. Returns `false` when the browser blocked it.
    fn open_authorization_window(&self, url: &str) -> bool;

    fn alert(&self, message: &str);

    fn vibrate(&self, _duration_ms: u64) {}
}

pub type OverlayId = Uuid;

/// Placement of the device overlay, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayAnchor {
    pub bottom: f64,
    pub left: f64,
    pub width: f64,
}

pub trait OverlayHost: Send + Sync {
    fn show_devices(&self, id: OverlayId, anchor: OverlayAnchor, devices: &[DeviceDescriptor]);

    /// Start the fade-out transition; the overlay stays in the document.
    fn begin_fade_out(&self, id: OverlayId);

    fn remove(&self, id: OverlayId);
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatePayload {
    pub stage: crate::session::FlowStage,
    pub authenticated: bool,
}
