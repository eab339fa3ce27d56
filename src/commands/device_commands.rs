use crate::devices::{AnchorPoint, DevicePicker, Layout};
use crate::error::AppError;
use crate::AppState;

/// Open the "Transfer playback" overlay next to the control at `point`.
pub async fn open_device_picker(
    state: &AppState,
    layout: Layout,
    point: Option<AnchorPoint>,
) -> Result<Option<DevicePicker>, AppError> {
    state.devices.open(layout, point).await
}

/// Pick a device from an open overlay. A failed transfer hands the picker
/// back so the user can try another device or close it.
pub async fn transfer_playback(
    picker: DevicePicker,
    device_id: &str,
) -> Result<(), (DevicePicker, AppError)> {
    picker.select(device_id).await
}
