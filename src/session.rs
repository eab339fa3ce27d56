use crate::api::auth::{self, PkceChallenge};
use crate::api::transport::HttpTransport;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::events::UiHost;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowStage {
    Unauthenticated,
    AwaitingAuthorizationCode,
    Exchanging,
    Authenticated,
    RefreshingToken,
    /// The user chose to type metadata by hand; nothing talks to Spotify.
    Manual,
}

#[derive(Default)]
struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    code_verifier: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("code_verifier", &self.code_verifier.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug)]
struct AuthState {
    stage: FlowStage,
    session: Session,
}

/// Owns the session and every transition of the login flow.
pub struct TokenManager {
    transport: Arc<dyn HttpTransport>,
    config: Arc<RwLock<AppConfig>>,
    state: RwLock<AuthState>,
}

impl TokenManager {
    pub fn new(transport: Arc<dyn HttpTransport>, config: Arc<RwLock<AppConfig>>) -> Self {
        Self {
            transport,
            config,
            state: RwLock::new(AuthState {
                stage: FlowStage::Unauthenticated,
                session: Session::default(),
            }),
        }
    }

    pub async fn stage(&self) -> FlowStage {
        self.state.read().await.stage
    }

    /// Access token usable for an API call right now, if any.
    pub async fn bearer(&self) -> Option<String> {
        let state = self.state.read().await;
        match state.stage {
            FlowStage::Authenticated => state.session.access_token.clone(),
            _ => None,
        }
    }

    /// Generate a PKCE pair and open the authorization popup.
    pub async fn begin_login(&self, ui: &dyn UiHost) -> AppResult<()> {
        let stage = self.stage().await;
        if !matches!(
            stage,
            FlowStage::Unauthenticated | FlowStage::AwaitingAuthorizationCode
        ) {
            log::warn!("Ignoring login request while {:?}", stage);
            return Ok(());
        }

        let pkce = PkceChallenge::generate();
        let url = {
            let config = self.config.read().await;
            auth::build_auth_url(&config, &pkce.challenge)?
        };

        if !ui.open_authorization_window(&url) {
            ui.alert(
                "We tried to open a window to log in with Spotify, but your browser has blocked it.",
            );
            return Err(AppError::AuthorizationDenied(
                "authorization window was blocked".into(),
            ));
        }

        let mut state = self.state.write().await;
        state.session.code_verifier = Some(pkce.verifier);
        state.stage = FlowStage::AwaitingAuthorizationCode;
        log::info!("Waiting for authorization code");
        Ok(())
    }

    /// Trade the authorization code delivered by the popup for tokens.
    pub async fn complete_login(&self, code: &str) -> AppResult<()> {
        let verifier = {
            let mut state = self.state.write().await;
            let verifier = match (state.stage, state.session.code_verifier.clone()) {
                (FlowStage::AwaitingAuthorizationCode, Some(verifier)) => verifier,
                (stage, _) => {
                    log::debug!("Dropping authorization code received while {:?}", stage);
                    return Ok(());
                }
            };
            state.stage = FlowStage::Exchanging;
            verifier
        };

        let config = self.config.read().await.clone();
        let result = auth::exchange_code(self.transport.as_ref(), &config, code, &verifier).await;

        let mut state = self.state.write().await;
        if state.stage != FlowStage::Exchanging {
            log::info!("Discarding token exchange result, flow moved to {:?}", state.stage);
            return Ok(());
        }

        match result {
            Ok(token) => {
                state.session.access_token = Some(token.access_token);
                if let Some(rt) = token.refresh_token {
                    state.session.refresh_token = Some(rt);
                }
                state.session.code_verifier = None;
                state.stage = FlowStage::Authenticated;
                log::info!("Authenticated with Spotify");
                Ok(())
            }
            Err(e) => {
                state.stage = FlowStage::AwaitingAuthorizationCode;
                log::error!("Token exchange failed: {}", e);
                Err(e)
            }
        }
    }

    /// Replace a rejected access token using the stored refresh token.
    ///
    /// Without a refresh token nothing is sent: the rejected token is dropped
    /// and the flow falls back to `Unauthenticated` so the user can log in
    /// again. A call made while another refresh is in flight returns
    /// immediately and leaves that refresh to finish. On failure the access
    /// token stays unset until the user logs in again.
    pub async fn refresh(&self) -> AppResult<()> {
        let refresh_token = {
            let mut state = self.state.write().await;
            match state.stage {
                FlowStage::Authenticated => {}
                FlowStage::RefreshingToken => {
                    log::debug!("Token refresh already in flight");
                    return Ok(());
                }
                stage => {
                    log::debug!("Not refreshing token while {:?}", stage);
                    return Ok(());
                }
            }
            let Some(rt) = state.session.refresh_token.clone() else {
                log::warn!("Access token rejected and no refresh token is stored");
                state.session.access_token = None;
                state.stage = FlowStage::Unauthenticated;
                return Err(AppError::NotAuthenticated);
            };
            state.session.access_token = None;
            state.stage = FlowStage::RefreshingToken;
            rt
        };

        log::info!("Refreshing access token");
        let config = self.config.read().await.clone();
        let result =
            auth::refresh_user_token(self.transport.as_ref(), &config, &refresh_token).await;

        let mut state = self.state.write().await;
        if state.stage != FlowStage::RefreshingToken {
            log::info!("Discarding token refresh result, flow moved to {:?}", state.stage);
            return Ok(());
        }

        match result {
            Ok(token) => {
                state.session.access_token = Some(token.access_token);
                if let Some(rt) = token.refresh_token {
                    state.session.refresh_token = Some(rt);
                }
                state.stage = FlowStage::Authenticated;
                log::info!("Access token refreshed");
                Ok(())
            }
            Err(e) => {
                state.session.access_token = None;
                state.stage = FlowStage::Unauthenticated;
                log::warn!("Token refresh failed: {}. User will need to re-login.", e);
                Err(e)
            }
        }
    }

    pub async fn enter_manual(&self) {
        let mut state = self.state.write().await;
        state.session = Session::default();
        state.stage = FlowStage::Manual;
        log::info!("Switched to manual metadata mode");
    }
}
