use crate::error::AppError;
use crate::events::{AuthStatePayload, RenderUpdate};
use crate::gateway::WindowMessage;
use crate::session::FlowStage;
use crate::AppState;

pub async fn check_auth_status(state: &AppState) -> AuthStatePayload {
    let stage = state.tokens.stage().await;
    AuthStatePayload {
        stage,
        authenticated: stage == FlowStage::Authenticated,
    }
}

/// "Connect to Spotify": open the PKCE authorization popup.
pub async fn login(state: &AppState) -> Result<(), AppError> {
    state.tokens.begin_login(state.ui.as_ref()).await
}

/// Entry point for every `message` event the hosting window receives.
/// Anything that is not an authorization code from our own origin is
/// dropped without a trace.
pub async fn handle_window_message(
    state: &AppState,
    message: WindowMessage,
) -> Result<(), AppError> {
    let Some(code) = state.gateway.accept(&message) else {
        return Ok(());
    };

    state.tokens.complete_login(&code).await?;

    if state.tokens.stage().await == FlowStage::Authenticated {
        state.poller.trigger();
    }
    Ok(())
}

/// "Manually add metadata": skip Spotify entirely.
pub async fn use_manual_metadata(state: &AppState) {
    state.tokens.enter_manual().await;
    state.renderer.update(RenderUpdate {
        snapshot: None,
        data_provided: true,
        force_rerender: None,
    });
}

/// Swap the default public client id for one the user registered.
pub async fn set_custom_client_id(state: &AppState, client_id: String) -> Result<(), AppError> {
    let snapshot = {
        let mut config = state.config.write().await;
        config.apply_custom_client_id(&client_id)?;
        config.clone()
    };
    log::info!("Using custom client id");

    tokio::task::spawn_blocking(move || snapshot.save())
        .await
        .map_err(|e| AppError::Config(format!("Failed to save config: {}", e)))?
}
