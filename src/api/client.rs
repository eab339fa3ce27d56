use crate::api::transport::{ApiRequest, ApiResponse, HttpTransport, RequestBody};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::session::TokenManager;
use reqwest::Method;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Authenticated request dispatcher for the Spotify Web API.
pub struct SpotifyClient {
    transport: Arc<dyn HttpTransport>,
    config: Arc<RwLock<AppConfig>>,
    tokens: Arc<TokenManager>,
}

impl SpotifyClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: Arc<RwLock<AppConfig>>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            transport,
            config,
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Send one request with the current access token.
    ///
    /// A 401 hands control to the token manager's refresh path and fails the
    /// call with [`AppError::Unauthorized`]; the request itself is never
    /// replayed.
    pub async fn dispatch(
        &self,
        path: &str,
        method: Method,
        body: Option<serde_json::Value>,
    ) -> AppResult<ApiResponse> {
        let token = self.tokens.bearer().await.ok_or(AppError::NotAuthenticated)?;
        let url = {
            let config = self.config.read().await;
            format!("{}{}", config.api_url.trim_end_matches('/'), path)
        };

        let request = ApiRequest {
            method: method.clone(),
            url,
            bearer: Some(token),
            body: body.map(RequestBody::Json).unwrap_or(RequestBody::Empty),
        };

        let response = self.transport.send(request).await?;

        if response.status == 401 {
            log::info!("{} {} was rejected, refreshing token", method, path);
            if let Err(e) = self.tokens.refresh().await {
                log::warn!("Refresh after 401 failed: {}", e);
            }
            return Err(AppError::Unauthorized);
        }

        self.check_response(response)
    }

    fn check_response(&self, response: ApiResponse) -> AppResult<ApiResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            let message = if response.body.is_empty() {
                "Unknown error".to_string()
            } else {
                response.body
            };
            Err(AppError::Dispatch {
                status: response.status,
                message,
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::transport::testing::{reply, ScriptedTransport};
    use crate::session::tests::authenticated;
    use crate::session::FlowStage;

    pub(crate) async fn client(transport: Arc<ScriptedTransport>) -> SpotifyClient {
        let tokens = Arc::new(authenticated(Arc::clone(&transport)).await);
        SpotifyClient::new(
            transport,
            Arc::new(RwLock::new(AppConfig::default())),
            tokens,
        )
    }

    #[tokio::test]
    async fn attaches_bearer_and_base_url() {
        let transport = Arc::new(ScriptedTransport::new(|_| reply(200, "{}")));
        let client = client(Arc::clone(&transport)).await;
        transport.respond_with(|_| reply(204, ""));

        client
            .dispatch("/me/player/next", Method::POST, None)
            .await
            .unwrap();

        let req = transport.requests().pop().unwrap();
        assert_eq!(req.url, "https://api.spotify.com/v1/me/player/next");
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.bearer.as_deref(), Some("first-access"));
        assert_eq!(req.body, RequestBody::Empty);
    }

    #[tokio::test]
    async fn unauthorized_refreshes_once_and_does_not_retry() {
        let transport = Arc::new(ScriptedTransport::new(|_| reply(200, "{}")));
        let client = client(Arc::clone(&transport)).await;
        transport.respond_with(|req| {
            if req.url.ends_with("/api/token") {
                reply(200, r#"{"access_token":"second-access"}"#)
            } else {
                reply(401, r#"{"error":{"status":401}}"#)
            }
        });

        let err = client
            .dispatch("/me/player/pause", Method::PUT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        assert_eq!(transport.count("/me/player/pause"), 1);
        assert_eq!(transport.count("/api/token"), 2);
        assert_eq!(client.tokens().bearer().await.as_deref(), Some("second-access"));
    }

    #[tokio::test]
    async fn other_failures_surface_without_touching_the_session() {
        let transport = Arc::new(ScriptedTransport::new(|_| reply(200, "{}")));
        let client = client(Arc::clone(&transport)).await;
        transport.respond_with(|_| reply(404, ""));

        let err = client
            .dispatch("/me/player/play", Method::PUT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Dispatch { status: 404, .. }));
        assert_eq!(client.tokens().stage().await, FlowStage::Authenticated);
        assert_eq!(transport.count("/api/token"), 1);
    }

    #[tokio::test]
    async fn redirect_statuses_are_not_failures() {
        let transport = Arc::new(ScriptedTransport::new(|_| reply(200, "{}")));
        let client = client(Arc::clone(&transport)).await;
        transport.respond_with(|_| reply(304, ""));

        let response = client
            .dispatch("/me/player", Method::GET, None)
            .await
            .unwrap();
        assert_eq!(response.status, 304);

        transport.respond_with(|_| reply(400, "bad request"));
        let err = client
            .dispatch("/me/player", Method::GET, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Dispatch { status: 400, .. }));
    }

    #[tokio::test]
    async fn refuses_to_dispatch_without_a_token() {
        let transport = Arc::new(ScriptedTransport::new(|_| reply(204, "")));
        let tokens = Arc::new(crate::session::tests::manager(Arc::clone(&transport)));
        let client = SpotifyClient::new(
            transport.clone(),
            Arc::new(RwLock::new(AppConfig::default())),
            tokens,
        );

        let err = client
            .dispatch("/me/player", Method::GET, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotAuthenticated));
        assert!(transport.requests().is_empty());
    }
}
