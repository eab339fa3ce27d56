use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Token exchange failed: {status} - {message}")]
    TokenExchange { status: u16, message: String },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Access token rejected")]
    Unauthorized,

    #[error("Spotify API error: {status} - {message}")]
    Dispatch { status: u16, message: String },

    #[error("A device picker is already open")]
    TransferInProgress,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl AppError {
    pub fn kind(&self) -> &str {
        match self {
            AppError::Http(_) => "http",
            AppError::Json(_) => "json",
            AppError::AuthorizationDenied(_) => "authorization_denied",
            AppError::TokenExchange { .. } => "token_exchange",
            AppError::NotAuthenticated => "not_authenticated",
            AppError::Unauthorized => "unauthorized",
            AppError::Dispatch { .. } => "dispatch",
            AppError::TransferInProgress => "transfer_in_progress",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
