use crate::api::player::PlaybackCommand;
use crate::error::AppError;
use crate::AppState;

/// Send a transport control and refresh the snapshot once Spotify has
/// applied it. On failure the caller gets the error and no haptic cue fires.
pub async fn send_playback_command(
    state: &AppState,
    command: PlaybackCommand,
) -> Result<(), AppError> {
    log::info!("[send_playback_command] {:?}", command);
    state.spotify_client.send_command(command).await?;

    let (haptic_ms, settle) = {
        let config = state.config.read().await;
        (config.haptic_ms, config.settle_delay())
    };
    state.ui.vibrate(haptic_ms);
    state.poller.schedule_refresh(settle);
    Ok(())
}

/// Explicit refresh requested by the renderer.
pub fn refresh_playback(state: &AppState) {
    state.poller.trigger();
}

/// Browsers throttle background tabs, so catch up when focus returns.
pub fn window_focused(state: &AppState) {
    log::debug!("Window regained focus");
    state.poller.trigger();
}

/// Ask the renderer to replay its animation on the next snapshot.
pub fn force_rerender(state: &AppState) {
    state.poller.request_force_rerender();
    state.poller.trigger();
}
