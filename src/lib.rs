pub mod api;
pub mod commands;
pub mod config;
pub mod devices;
pub mod error;
pub mod events;
pub mod gateway;
pub mod poller;
pub mod session;

use api::client::SpotifyClient;
use api::transport::{HttpTransport, ReqwestTransport};
use config::AppConfig;
use devices::DeviceTransferFlow;
use error::AppResult;
use events::{OverlayHost, Renderer, UiHost};
use gateway::MessageGateway;
use poller::PlaybackPoller;
use session::TokenManager;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything one hosting page needs: the login flow, the dispatcher, the
/// poll loop and the device picker, wired to the page's collaborators.
pub struct AppState {
    pub config: Arc<RwLock<AppConfig>>,
    pub tokens: Arc<TokenManager>,
    pub spotify_client: Arc<SpotifyClient>,
    pub poller: Arc<PlaybackPoller>,
    pub devices: DeviceTransferFlow,
    pub gateway: MessageGateway,
    pub renderer: Arc<dyn Renderer>,
    pub ui: Arc<dyn UiHost>,
    cancel: CancellationToken,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn HttpTransport>,
        renderer: Arc<dyn Renderer>,
        ui: Arc<dyn UiHost>,
        overlay: Arc<dyn OverlayHost>,
    ) -> AppResult<Self> {
        let gateway = MessageGateway::new(config.host_origin()?);
        let spacing = config.poll_spacing();
        let fade = config.overlay_fade();
        let settle = config.settle_delay();
        let haptic_ms = config.haptic_ms;

        let config = Arc::new(RwLock::new(config));
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&transport),
            Arc::clone(&config),
        ));
        let spotify_client = Arc::new(SpotifyClient::new(
            transport,
            Arc::clone(&config),
            Arc::clone(&tokens),
        ));
        let poller = Arc::new(PlaybackPoller::new(
            Arc::clone(&spotify_client),
            Arc::clone(&renderer),
            spacing,
        ));
        let devices = DeviceTransferFlow::new(
            Arc::clone(&spotify_client),
            Arc::clone(&poller),
            overlay,
            Arc::clone(&ui),
            fade,
            settle,
            haptic_ms,
        );

        Ok(Self {
            config,
            tokens,
            spotify_client,
            poller,
            devices,
            gateway,
            renderer,
            ui,
            cancel: CancellationToken::new(),
        })
    }

    /// Build a controller that talks to Spotify over HTTPS.
    pub fn with_reqwest(
        config: AppConfig,
        renderer: Arc<dyn Renderer>,
        ui: Arc<dyn UiHost>,
        overlay: Arc<dyn OverlayHost>,
    ) -> AppResult<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        Self::new(config, transport, renderer, ui, overlay)
    }

    /// Spawn the poll loop. It runs until [`AppState::shutdown`].
    pub fn start(&self) -> JoinHandle<()> {
        let triggers = self.poller.subscribe();
        tokio::spawn(Arc::clone(&self.poller).run(triggers, self.cancel.clone()))
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Install the `env_logger` backend. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("playerify_lib=info"),
    )
    .try_init();
}
